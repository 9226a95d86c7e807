//! Byte-range to sector translation bridge.
//!
//! A mass-storage host endpoint addresses its medium with arbitrary byte
//! ranges; a card or disk image only moves whole 512-byte sectors. This
//! crate owns the adapter in between: it splits every request into an
//! unaligned head, an aligned body batched through a bounce buffer, and a
//! sub-sector tail, with read-modify-write on the partial sectors and
//! well-defined accounting when the backing store faults mid-transfer.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────┐
//! │  host transport           │  (USB MSC class device, ...)
//! │  implements               │
//! │  ProtocolEndpoint         │
//! └────────────┬──────────────┘
//!              │ on_read / on_write / on_start_stop
//!              ▼
//! ┌───────────────────────────┐
//! │  UsbSdBridge              │  ◄── this crate
//! │  (bounce buffer, scratch, │
//! │   media state, policy)    │
//! └────────────┬──────────────┘
//!              │ read_sectors / write_sectors
//!              ▼
//! ┌───────────────────────────┐
//! │  SectorDevice             │  (SD/MMC card, disk image, RAM)
//! └───────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use msc_bridge::{BridgeConfig, Identity, UsbSdBridge};
//!
//! let config = BridgeConfig {
//!     identity: Identity::new("Acme", "Card Reader", "1.0")?,
//!     read_only: false,
//!     ..BridgeConfig::default()
//! };
//!
//! let mut bridge = UsbSdBridge::start(card, usb_msc, config).await?;
//!
//! // The transport invokes the handlers per host command:
//! let transferred = bridge.on_read(lba, offset, &mut buf).await;
//!
//! // Teardown hands the device back:
//! let (card, usb_msc) = bridge.shutdown();
//! ```
//!
//! # Failure semantics
//!
//! Handlers speak the transport's numeric convention: non-negative is the
//! byte count transferred, [`TRANSFER_FAILED`] means nothing completed.
//! When the device faults mid-request the handler stops immediately and
//! reports the bytes that completed before the fault; no further device
//! calls are made for that request.
//!
//! # Features
//!
//! - `alloc`: multi-sector bounce staging (enabled by default); without it
//!   every aligned transfer moves one sector at a time
//! - `std`: implies `alloc`
//! - `log`: enable logging support
//! - `defmt`: enable defmt support for embedded

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![allow(async_fn_in_trait)]

mod bounce;
mod bridge;
mod config;
mod endpoint;
mod error;
mod lba;

pub use bridge::{MediaState, StartStopRequest, TRANSFER_FAILED, UsbSdBridge};
pub use config::{
    BridgeConfig, ConfigError, DEFAULT_BOUNCE_SECTORS, Identity, IdentityError, IdentityField,
};
pub use endpoint::{Geometry, ProtocolEndpoint};
pub use error::StartupError;
pub use lba::Lba;

// Re-export the backing-store port so users can depend on this crate alone.
pub use sector_device::{
    self, BusConfig, BusWidth, SECTOR_SIZE, Sector, SectorDevice, SendSectorDevice,
    sectors_to_slice, sectors_to_slice_mut,
};
