//! Controller configuration
//!
//! Everything that tunes the controller travels in one [`ControllerConfig`]
//! value handed to [`crate::Controller::new`]. There is no global state.

use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Environment variable: command timeout in milliseconds, `0` waits forever
pub const ENV_COMMAND_TIMEOUT_MS: &str = "EDU_COMMAND_TIMEOUT_MS";
/// Environment variable: interrupt dispatch mode, `per-bit` or `exact`
pub const ENV_IRQ_DISPATCH: &str = "EDU_IRQ_DISPATCH";
/// Environment variable: debug level, interrupt-path events log above 2
pub const ENV_DEBUG: &str = "EDU_DEBUG";

/// How the interrupt demultiplexer routes a status snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Test each known cause bit independently. A snapshot carrying several
    /// causes completes every matching channel.
    #[default]
    PerBit,
    /// Route only a snapshot that equals exactly one known cause. Anything
    /// else, including several causes at once, is acknowledged without
    /// completing any channel.
    ExactMatch,
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-bit" | "perbit" | "bitwise" => Ok(Self::PerBit),
            "exact" | "exact-match" => Ok(Self::ExactMatch),
            other => Err(format!("unknown dispatch mode {other:?}")),
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Longest a command waits for its completion interrupt. `None` waits
    /// forever.
    pub command_timeout: Option<Duration>,

    /// Interrupt routing policy
    pub dispatch: DispatchMode,

    /// Verbosity of interrupt-path logging; events are emitted above 2
    pub debug_level: u8,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            command_timeout: Some(Duration::from_secs(5)),
            dispatch: DispatchMode::PerBit,
            debug_level: 0,
        }
    }
}

impl ControllerConfig {
    /// Default configuration overridden by `EDU_*` environment variables
    ///
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_COMMAND_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => config.command_timeout = None,
                Ok(ms) => config.command_timeout = Some(Duration::from_millis(ms)),
                Err(e) => warn!("Ignoring {ENV_COMMAND_TIMEOUT_MS}={raw:?}: {e}"),
            }
        }

        if let Some(raw) = lookup(ENV_IRQ_DISPATCH) {
            match raw.parse() {
                Ok(mode) => config.dispatch = mode,
                Err(e) => warn!("Ignoring {ENV_IRQ_DISPATCH}: {e}"),
            }
        }

        if let Some(raw) = lookup(ENV_DEBUG) {
            match raw.trim().parse::<u8>() {
                Ok(level) => config.debug_level = level,
                Err(e) => warn!("Ignoring {ENV_DEBUG}={raw:?}: {e}"),
            }
        }

        config
    }

    /// Set the command timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the interrupt dispatch mode
    #[must_use]
    pub const fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Set the debug level
    #[must_use]
    pub const fn with_debug_level(mut self, level: u8) -> Self {
        self.debug_level = level;
        self
    }

    /// Whether interrupt-path events are logged
    pub const fn verbose(&self) -> bool {
        self.debug_level > 2
    }
}
