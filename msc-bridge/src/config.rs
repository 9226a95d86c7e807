//! Bridge configuration and host-visible identity.

use core::fmt;
use sector_device::BusConfig;

/// Default number of sectors staged per bounce-buffer transfer.
pub const DEFAULT_BOUNCE_SECTORS: u32 = 8;

const VENDOR_LEN: usize = 8;
const PRODUCT_LEN: usize = 16;
const REVISION_LEN: usize = 4;

/// Which identity field a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdentityField {
    /// Vendor string (8 bytes on the wire).
    Vendor,
    /// Product string (16 bytes on the wire).
    Product,
    /// Revision string (4 bytes on the wire).
    Revision,
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vendor => write!(f, "vendor"),
            Self::Product => write!(f, "product"),
            Self::Revision => write!(f, "revision"),
        }
    }
}

/// Errors that can occur when building an [`Identity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdentityError {
    /// Field exceeds its wire-format length.
    TooLong {
        /// The offending field.
        field: IdentityField,
        /// Length of the supplied string.
        len: usize,
        /// Maximum length of the field.
        max: usize,
    },
    /// Field contains bytes outside printable ASCII.
    NotPrintable {
        /// The offending field.
        field: IdentityField,
    },
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong { field, len, max } => {
                write!(f, "{} string is {} bytes, limit is {}", field, len, max)
            }
            Self::NotPrintable { field } => {
                write!(f, "{} string contains non-printable bytes", field)
            }
        }
    }
}

impl core::error::Error for IdentityError {}

fn pack<const N: usize>(s: &str, field: IdentityField) -> Result<[u8; N], IdentityError> {
    let bytes = s.as_bytes();
    if bytes.len() > N {
        return Err(IdentityError::TooLong {
            field,
            len: bytes.len(),
            max: N,
        });
    }
    if !bytes.iter().all(|b| (0x20..=0x7e).contains(b)) {
        return Err(IdentityError::NotPrintable { field });
    }
    let mut out = [b' '; N];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

fn unpad(field: &[u8]) -> &str {
    let end = field.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    // Construction guarantees printable ASCII.
    core::str::from_utf8(&field[..end]).unwrap_or("")
}

/// Identity strings advertised to the host.
///
/// Fields are space-padded printable ASCII with the classic INQUIRY limits:
/// vendor 8, product 16, revision 4 bytes.
///
/// # Examples
///
/// ```
/// use msc_bridge::Identity;
///
/// let id = Identity::new("Acme", "Card Reader", "2.1").unwrap();
/// assert_eq!(id.vendor(), "Acme");
/// assert_eq!(id.vendor_padded(), b"Acme    ");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    vendor: [u8; VENDOR_LEN],
    product: [u8; PRODUCT_LEN],
    revision: [u8; REVISION_LEN],
}

impl Identity {
    /// Build an identity, validating length and character set.
    pub fn new(vendor: &str, product: &str, revision: &str) -> Result<Self, IdentityError> {
        Ok(Self {
            vendor: pack(vendor, IdentityField::Vendor)?,
            product: pack(product, IdentityField::Product)?,
            revision: pack(revision, IdentityField::Revision)?,
        })
    }

    /// Vendor string without padding.
    pub fn vendor(&self) -> &str {
        unpad(&self.vendor)
    }

    /// Product string without padding.
    pub fn product(&self) -> &str {
        unpad(&self.product)
    }

    /// Revision string without padding.
    pub fn revision(&self) -> &str {
        unpad(&self.revision)
    }

    /// Vendor field as advertised on the wire (space-padded).
    pub const fn vendor_padded(&self) -> &[u8; VENDOR_LEN] {
        &self.vendor
    }

    /// Product field as advertised on the wire (space-padded).
    pub const fn product_padded(&self) -> &[u8; PRODUCT_LEN] {
        &self.product
    }

    /// Revision field as advertised on the wire (space-padded).
    pub const fn revision_padded(&self) -> &[u8; REVISION_LEN] {
        &self.revision
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            vendor: *b"Generic ",
            product: *b"SD Card         ",
            revision: *b"1.0 ",
        }
    }
}

/// Errors that can occur when validating a [`BridgeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `bounce_sectors` must be at least 1.
    ZeroBounceSectors,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroBounceSectors => write!(f, "bounce_sectors must be at least 1"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Bridge startup configuration.
///
/// Immutable once handed to [`UsbSdBridge::start`](crate::UsbSdBridge::start).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Connection parameters forwarded verbatim to the device.
    pub bus: BusConfig,
    /// Identity advertised to the host.
    pub identity: Identity,
    /// Reject all writes and advertise the unit as non-writable.
    pub read_only: bool,
    /// Activate the endpoint at the end of startup.
    pub start_transport: bool,
    /// Sectors staged per backing-store call. Must be at least 1.
    pub bounce_sectors: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            identity: Identity::default(),
            read_only: true,
            start_transport: true,
            bounce_sectors: DEFAULT_BOUNCE_SECTORS,
        }
    }
}

impl BridgeConfig {
    /// Check the parts of the configuration the bridge interprets itself.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.bounce_sectors == 0 {
            return Err(ConfigError::ZeroBounceSectors);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_pads_and_unpads() {
        let id = Identity::new("Acme", "Pocket Store", "0.9").unwrap();
        assert_eq!(id.vendor_padded(), b"Acme    ");
        assert_eq!(id.product_padded(), b"Pocket Store    ");
        assert_eq!(id.revision_padded(), b"0.9 ");
        assert_eq!(id.vendor(), "Acme");
        assert_eq!(id.product(), "Pocket Store");
        assert_eq!(id.revision(), "0.9");
    }

    #[test]
    fn test_identity_rejects_over_length_fields() {
        let err = Identity::new("NineChars", "p", "r").unwrap_err();
        assert_eq!(
            err,
            IdentityError::TooLong {
                field: IdentityField::Vendor,
                len: 9,
                max: 8,
            }
        );

        assert!(Identity::new("v", "seventeen chars!!", "r").is_err());
        assert!(Identity::new("v", "p", "10.01").is_err());
    }

    #[test]
    fn test_identity_rejects_non_printable() {
        let err = Identity::new("v\n", "p", "r").unwrap_err();
        assert_eq!(
            err,
            IdentityError::NotPrintable {
                field: IdentityField::Vendor,
            }
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.read_only);
        assert!(config.start_transport);
        assert_eq!(config.bounce_sectors, 8);
    }

    #[test]
    fn test_zero_bounce_sectors_rejected() {
        let config = BridgeConfig {
            bounce_sectors: 0,
            ..BridgeConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBounceSectors));
    }

    #[test]
    fn test_identity_error_display() {
        let msg = format!(
            "{}",
            IdentityError::TooLong {
                field: IdentityField::Product,
                len: 20,
                max: 16,
            }
        );
        assert!(msg.contains("product"));
        assert!(msg.contains("16"));
    }
}
