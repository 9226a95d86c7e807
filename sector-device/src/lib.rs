//! Sector-addressable storage device trait.
//!
//! A [`SectorDevice`] is a backing store (SD/MMC card, disk image, RAM disk)
//! that transfers data only in whole 512-byte sectors addressed by LBA.
//! Transfer buffers are [`Aligned`] so implementations can DMA directly out
//! of them.
//!
//! Every call either fully succeeds or fully fails; sub-sector access is the
//! caller's responsibility.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![allow(async_fn_in_trait)]

use aligned::{Aligned, Alignment};

/// Fixed sector size of every [`SectorDevice`], in bytes.
pub const SECTOR_SIZE: usize = 512;

/// One sector with the alignment the device requires.
pub type Sector<A> = Aligned<A, [u8; SECTOR_SIZE]>;

/// Data bus width of the connection to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusWidth {
    /// Single data line.
    #[default]
    Single,
    /// Four data lines.
    Quad,
}

/// Connection parameters handed to [`SectorDevice::init`].
///
/// Consumers pass these through untouched; only the device itself interprets
/// them. Devices without a configurable bus (streams, RAM disks) ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Data bus width.
    pub width: BusWidth,
    /// Bus clock in kHz.
    pub clock_khz: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            width: BusWidth::Single,
            clock_khz: 10_000,
        }
    }
}

/// A sector-addressable storage device.
///
/// # Examples
///
/// ```ignore
/// let mut card = SdCard::new(pins);
/// let sectors = card.init(&BusConfig::default()).await?;
///
/// let mut buf = [Aligned([0u8; SECTOR_SIZE]); 4];
/// card.read_sectors(0, &mut buf).await?;
/// ```
#[trait_variant::make(SendSectorDevice: Send)]
pub trait SectorDevice {
    /// Error type returned by the device.
    type Error: core::fmt::Debug;
    /// Alignment the device requires of transfer buffers.
    type Align: Alignment;

    /// Bring the device up and report its total capacity in sectors.
    async fn init(&mut self, bus: &BusConfig) -> Result<u64, Self::Error>;

    /// Read `dst.len()` whole sectors starting at `start_lba`.
    async fn read_sectors(
        &mut self,
        start_lba: u32,
        dst: &mut [Sector<Self::Align>],
    ) -> Result<(), Self::Error>;

    /// Write `src.len()` whole sectors starting at `start_lba`.
    async fn write_sectors(
        &mut self,
        start_lba: u32,
        src: &[Sector<Self::Align>],
    ) -> Result<(), Self::Error>;
}

/// View a slice of sectors as one contiguous byte slice.
pub fn sectors_to_slice<A: Alignment>(sectors: &[Sector<A>]) -> &[u8] {
    // Sector<A> occupies exactly SECTOR_SIZE bytes for every alignment that
    // divides the sector size, so the elements are contiguous bytes.
    debug_assert_eq!(core::mem::size_of::<Sector<A>>(), SECTOR_SIZE);
    unsafe { core::slice::from_raw_parts(sectors.as_ptr().cast(), sectors.len() * SECTOR_SIZE) }
}

/// View a slice of sectors as one contiguous mutable byte slice.
pub fn sectors_to_slice_mut<A: Alignment>(sectors: &mut [Sector<A>]) -> &mut [u8] {
    debug_assert_eq!(core::mem::size_of::<Sector<A>>(), SECTOR_SIZE);
    unsafe {
        core::slice::from_raw_parts_mut(sectors.as_mut_ptr().cast(), sectors.len() * SECTOR_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aligned::A4;

    #[test]
    fn test_byte_views_cover_every_sector() {
        let mut sectors: Vec<Sector<A4>> = (0..3).map(|_| Aligned([0u8; SECTOR_SIZE])).collect();

        let bytes = sectors_to_slice_mut(&mut sectors);
        assert_eq!(bytes.len(), 3 * SECTOR_SIZE);
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }

        assert_eq!(sectors[1][0], (SECTOR_SIZE % 251) as u8);
        assert_eq!(
            sectors_to_slice(&sectors)[2 * SECTOR_SIZE],
            (2 * SECTOR_SIZE % 251) as u8
        );
    }

    #[test]
    fn test_bus_config_defaults() {
        let bus = BusConfig::default();
        assert_eq!(bus.width, BusWidth::Single);
        assert_eq!(bus.clock_khz, 10_000);
    }
}
