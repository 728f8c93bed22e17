//! Finding recorder boards on the serial ports and talking to them.

pub mod discovery;
pub mod monitor;

pub use discovery::{discover, Device, DeviceModel, ModelTable, UsbInfo};
pub use monitor::{spawn_keyboard_forwarder, LineAssembler, Monitor};

use std::{borrow::Cow, fmt, io};

/// Errors of device discovery and the serial monitor.
#[derive(Debug)]
pub enum SerialError {
    /// Returned when io on a port, a log file or sysfs fails.
    IoError(io::Error),

    /// Returned when a model table cannot be deserialized.
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            Self::IoError(error) => Cow::from(format!("io error: {}", error)),
            Self::RonSpannedError(error) => Cow::from(format!("model table: {}", error)),
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for SerialError {}

impl From<io::Error> for SerialError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<ron::de::SpannedError> for SerialError {
    fn from(value: ron::de::SpannedError) -> Self {
        Self::RonSpannedError(value)
    }
}
