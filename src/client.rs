//! Tag client abstraction.
//!
//! The controller protocol is not implemented here. A backend provides a
//! [`Connector`] that opens one [`TagSession`] per device; the orchestration
//! code only talks to these traits.
//!
//! # Sessions
//!
//! A session is opened for a single device and a single iteration, then
//! closed. Sessions are never shared across devices or reused across
//! iterations. Each call produces exactly one request and one response:
//! no automatic retries, caching, or reconnection.
//!
//! # Example
//!
//! ```
//! use tagflood::{ClientConfig, Connector, TagSession, TagValue};
//! use tagflood::simulator::{SimulatedDevice, SimulatedFleet};
//!
//! let fleet = SimulatedFleet::new();
//! fleet.insert(
//!     "10.0.0.5",
//!     SimulatedDevice::new().with_tag("Program:Main.Speed", "DINT", TagValue::Int(1200)),
//! );
//!
//! let mut session = fleet.connect("10.0.0.5", &ClientConfig::default())?;
//! assert_eq!(session.read_tag("Program:Main.Speed")?, TagValue::Int(1200));
//! session.write_tag("Program:Main.Speed", &TagValue::Int(900))?;
//! session.close();
//! # Ok::<(), tagflood::TagError>(())
//! ```

use std::time::Duration;

use crate::error::Result;
use crate::tag::TagInfo;
use crate::value::TagValue;

/// Default EtherNet/IP explicit messaging port.
pub const DEFAULT_PORT: u16 = 44818;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Processor slot used by controller emulators.
pub const EMULATOR_SLOT: u8 = 2;

/// Connection settings shared by every device in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Controller port.
    pub port: u16,
    /// Processor slot, when the backplane route needs one.
    pub slot: Option<u8>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            slot: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration with default port, no slot and default timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom port (default is 44818).
    ///
    /// # Example
    ///
    /// ```
    /// use tagflood::ClientConfig;
    ///
    /// let config = ClientConfig::new().with_port(44819);
    /// assert_eq!(config.port, 44819);
    /// ```
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the processor slot.
    pub fn with_slot(mut self, slot: u8) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Routes to the emulator processor slot.
    ///
    /// # Example
    ///
    /// ```
    /// use tagflood::{ClientConfig, EMULATOR_SLOT};
    ///
    /// assert_eq!(ClientConfig::new().emulated().slot, Some(EMULATOR_SLOT));
    /// ```
    pub fn emulated(self) -> Self {
        self.with_slot(EMULATOR_SLOT)
    }

    /// Sets a custom timeout (default is 5 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An open session with one controller.
pub trait TagSession {
    /// Enumerates every tag the controller exposes, in controller order.
    ///
    /// # Errors
    ///
    /// Returns `TagError::Timeout` if the controller does not answer.
    fn list_tags(&mut self) -> Result<Vec<TagInfo>>;

    /// Reads the current value of a tag.
    ///
    /// Structured types are returned as [`TagValue::Raw`].
    fn read_tag(&mut self, name: &str) -> Result<TagValue>;

    /// Writes a value to a tag.
    fn write_tag(&mut self, name: &str, value: &TagValue) -> Result<()>;

    /// Closes the session. Further calls are not expected.
    fn close(&mut self);
}

/// Opens sessions to controllers.
pub trait Connector {
    /// Session type produced by this connector.
    type Session: TagSession;

    /// Opens a session to the controller at `ip`.
    ///
    /// # Errors
    ///
    /// Returns `TagError::Connection` or `TagError::Timeout` if the
    /// controller cannot be reached.
    fn connect(&self, ip: &str, config: &ClientConfig) -> Result<Self::Session>;
}

impl<C: Connector + ?Sized> Connector for &C {
    type Session = C::Session;

    fn connect(&self, ip: &str, config: &ClientConfig) -> Result<Self::Session> {
        (**self).connect(ip, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.slot, None);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_client_config_builders() {
        let config = ClientConfig::new()
            .with_port(2222)
            .with_slot(0)
            .with_timeout(Duration::from_millis(250));
        assert_eq!(config.port, 2222);
        assert_eq!(config.slot, Some(0));
        assert_eq!(config.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_emulated_slot() {
        assert_eq!(ClientConfig::new().emulated().slot, Some(2));
    }
}
