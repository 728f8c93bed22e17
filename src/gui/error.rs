use std::{error::Error, fmt::Display};

/// Failures of the terminal user interface.
#[derive(Debug)]
pub enum GuiError {
    /// Formatting a widget failed.
    FmtError(std::fmt::Error),
    /// Terminal io failed.
    IOError(std::io::Error),
    /// There is nothing to select from.
    NoDevices,
}

impl Display for GuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuiError::NoDevices => write!(f, "no devices to select from"),
            other => write!(f, "{:#?}", other),
        }
    }
}

impl Error for GuiError {}

impl From<std::fmt::Error> for GuiError {
    fn from(value: std::fmt::Error) -> Self {
        Self::FmtError(value)
    }
}

impl From<std::io::Error> for GuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}
