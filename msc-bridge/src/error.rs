//! Startup error taxonomy.

use crate::config::ConfigError;
use core::fmt;

/// Errors that can abort [`UsbSdBridge::start`](crate::UsbSdBridge::start).
///
/// Staging-buffer allocation failure is deliberately absent: it degrades
/// the bounce buffer to a single sector and startup continues.
///
/// On error no partial state is retained; the device and endpoint handles
/// are dropped along with the error.
#[derive(Debug)]
#[non_exhaustive]
pub enum StartupError<E> {
    /// The configuration failed validation.
    Config(ConfigError),
    /// The backing store failed to initialize.
    Device(E),
    /// The backing store reported a capacity of zero sectors.
    ZeroCapacity,
}

impl<E: fmt::Display> fmt::Display for StartupError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Invalid configuration: {}", e),
            Self::Device(e) => write!(f, "Backing store initialization failed: {}", e),
            Self::ZeroCapacity => write!(f, "Backing store reported zero capacity"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> core::error::Error for StartupError<E> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<ConfigError> for StartupError<E> {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}
