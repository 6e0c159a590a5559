//! tabfloat Host Adapters
//!
//! Concrete implementations of the capabilities `tabfloat-core` consumes,
//! for hosts running as a native process:
//! - [`JsonFileStore`]: key-value storage in a JSON file
//! - [`CompanionNotifier`]: launches the companion and speaks native messaging

mod notifier;
mod store;

pub use notifier::CompanionNotifier;
pub use store::JsonFileStore;
