//! Trigger dispatch.
//!
//! The host delivers three kinds of triggers: the toolbar action was clicked,
//! a named keyboard command fired, or a window's bounds changed. Each one maps
//! to at most one tracker operation.

use crate::capability::{NativeNotifier, SettingsStore, WindowCreator};
use crate::tracker::FloatingWindowTracker;
use crate::Window;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error};

/// Keyboard commands declared by the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerCommand {
    FloatTab,
    UnfloatTab,
}

impl TriggerCommand {
    pub fn name(self) -> &'static str {
        match self {
            Self::FloatTab => "float-tab",
            Self::UnfloatTab => "unfloat-tab",
        }
    }
}

impl fmt::Display for TriggerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for command names that are not [`TriggerCommand`]s.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for TriggerCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float-tab" => Ok(Self::FloatTab),
            "unfloat-tab" => Ok(Self::UnfloatTab),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// A trigger delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    /// The toolbar action was clicked.
    ActionClicked,
    /// A keyboard command fired, by name.
    Command(String),
    /// A window was moved or resized.
    BoundsChanged(Window),
}

impl<W, S, N> FloatingWindowTracker<W, S, N>
where
    W: WindowCreator,
    S: SettingsStore,
    N: NativeNotifier,
{
    /// Dispatch one host trigger.
    ///
    /// Failures end up in the log only; there is nobody to report them to.
    pub async fn handle_event(&mut self, event: BrowserEvent) {
        match event {
            BrowserEvent::ActionClicked => self.run_command(TriggerCommand::FloatTab).await,
            BrowserEvent::Command(name) => match name.parse::<TriggerCommand>() {
                Ok(command) => self.run_command(command).await,
                Err(e) => debug!("Ignoring command: {}", e),
            },
            BrowserEvent::BoundsChanged(window) => {
                self.settings().on_bounds_changed(&window).await;
            }
        }
    }

    async fn run_command(&mut self, command: TriggerCommand) {
        let result = match command {
            TriggerCommand::FloatTab => self.float().await.map(|outcome| {
                debug!("{}: {:?}", command, outcome);
            }),
            TriggerCommand::UnfloatTab => self.unfloat(None).await.map(|outcome| {
                debug!("{}: {:?}", command, outcome);
            }),
        };

        if let Err(e) = result {
            error!("Command {} failed: {}", command, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!("float-tab".parse(), Ok(TriggerCommand::FloatTab));
        assert_eq!("unfloat-tab".parse(), Ok(TriggerCommand::UnfloatTab));
        assert_eq!(
            "Float-Tab".parse::<TriggerCommand>(),
            Err(UnknownCommand("Float-Tab".to_string()))
        );
        assert!("_execute_action".parse::<TriggerCommand>().is_err());
    }

    #[test]
    fn test_command_name_roundtrip() {
        for command in [TriggerCommand::FloatTab, TriggerCommand::UnfloatTab] {
            assert_eq!(command.to_string().parse(), Ok(command));
        }
    }
}
