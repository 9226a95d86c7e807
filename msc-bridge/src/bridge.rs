//! The block-translation bridge.

use crate::{
    bounce::BounceBuffer,
    config::BridgeConfig,
    endpoint::{Geometry, ProtocolEndpoint},
    error::StartupError,
    lba::Lba,
};
use aligned::Aligned;
use sector_device::{SECTOR_SIZE, Sector, SectorDevice, sectors_to_slice, sectors_to_slice_mut};

/// Handler status for a transfer that failed before any byte completed.
pub const TRANSFER_FAILED: i32 = -1;

/// Whether the medium is available for transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MediaState {
    /// Medium is present; transfers may proceed.
    Present,
    /// Medium was removed; every transfer is rejected.
    Removed,
}

/// A recorded START STOP UNIT request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartStopRequest {
    /// Requested power condition.
    pub power_condition: u8,
    /// Host asked the unit to start.
    pub start: bool,
    /// Host asked for a load/eject.
    pub load_eject: bool,
}

/// Transfer stopped by a device fault after `completed` bytes reached the
/// caller's buffer (or the store, for writes).
struct Faulted {
    completed: usize,
}

fn status(result: Result<usize, Faulted>) -> i32 {
    match result {
        Ok(transferred) => transferred as i32,
        Err(Faulted { completed }) if completed > 0 => completed as i32,
        Err(_) => TRANSFER_FAILED,
    }
}

/// Bridges byte-range host transfers onto a whole-sector backing store.
///
/// The host side addresses the store by `(lba, byte offset within sector,
/// length)`; the store only moves whole 512-byte sectors. Each request is
/// split into up to three phases:
///
/// 1. an unaligned *head* handled through a single-sector scratch buffer,
/// 2. an aligned *body* batched through the bounce buffer, and
/// 3. a sub-sector *tail*, again through scratch.
///
/// Partial-sector writes are read-modify-write so bytes outside the
/// requested range survive. On a device fault the transfer stops at the
/// fault and the handler reports the bytes that completed before it.
///
/// A bridge value exists only after successful [`start`](Self::start);
/// [`shutdown`](Self::shutdown) consumes it. Handlers take `&mut self`, so
/// the endpoint's serialized-invocation contract is enforced by the borrow
/// checker for safe code.
///
/// # Examples
///
/// ```ignore
/// let bridge = UsbSdBridge::start(card, usb_msc, BridgeConfig::default()).await?;
/// // the transport now routes host reads into:
/// let n = bridge.on_read(lba, offset, &mut buf).await;
/// ```
pub struct UsbSdBridge<D: SectorDevice, E: ProtocolEndpoint> {
    device: D,
    endpoint: E,
    geometry: Geometry,
    media: MediaState,
    read_only: bool,
    bounce: BounceBuffer<D::Align>,
    scratch: Sector<D::Align>,
    last_start_stop: Option<StartStopRequest>,
}

impl<D: SectorDevice, E: ProtocolEndpoint> UsbSdBridge<D, E> {
    /// Bring the bridge up.
    ///
    /// Validates the configuration, stages the bounce buffer (degrading to
    /// a single sector if the allocation fails), initializes the backing
    /// store, and registers identity and capacity with the endpoint exactly
    /// once. When `config.start_transport` is set the endpoint is activated
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, on backing-store initialization
    /// failure, and on a reported capacity of zero. No partial state is
    /// retained on failure.
    pub async fn start(
        mut device: D,
        mut endpoint: E,
        config: BridgeConfig,
    ) -> Result<Self, StartupError<D::Error>> {
        config.validate()?;

        let bounce = BounceBuffer::allocate(config.bounce_sectors);

        let num_sectors = device
            .init(&config.bus)
            .await
            .map_err(StartupError::Device)?;
        if num_sectors == 0 {
            return Err(StartupError::ZeroCapacity);
        }
        let geometry = Geometry::new(num_sectors);

        // Identity and capacity must reach the transport before it starts
        // servicing host commands.
        endpoint.register(&config.identity, geometry, !config.read_only);
        endpoint.set_media_present(true);
        if config.start_transport {
            endpoint.activate();
        }

        #[cfg(feature = "log")]
        log::debug!(
            "bridge up: {} sectors, staging {} per transfer",
            num_sectors,
            bounce.sectors()
        );

        Ok(Self {
            device,
            endpoint,
            geometry,
            media: MediaState::Present,
            read_only: config.read_only,
            bounce,
            scratch: Aligned([0u8; SECTOR_SIZE]),
            last_start_stop: None,
        })
    }

    /// Tear the bridge down, returning the device and endpoint handles.
    ///
    /// The bounce buffer is released here. Consuming `self` makes a second
    /// teardown, or a transfer after teardown, a compile error.
    pub fn shutdown(self) -> (D, E) {
        (self.device, self.endpoint)
    }

    /// Capacity advertised to the host.
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Total capacity in sectors.
    pub const fn num_sectors(&self) -> u64 {
        self.geometry.num_sectors()
    }

    /// Sector size in bytes. Fixed at 512.
    pub const fn sector_size(&self) -> u16 {
        self.geometry.sector_size()
    }

    /// Whether writes are rejected outright.
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Current media availability.
    pub const fn media_state(&self) -> MediaState {
        self.media
    }

    /// Actual staging capacity in sectors, after any allocation fallback.
    pub fn bounce_sectors(&self) -> usize {
        self.bounce.sectors()
    }

    /// The most recent START STOP UNIT request, if any.
    pub const fn last_start_stop(&self) -> Option<StartStopRequest> {
        self.last_start_stop
    }

    /// Mark the medium present or removed. Transfers are rejected while it
    /// is removed.
    pub fn set_media_present(&mut self, present: bool) {
        self.media = if present {
            MediaState::Present
        } else {
            MediaState::Removed
        };
    }

    /// Get a reference to the backing store.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Get a mutable reference to the backing store.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Service a host read of `buf.len()` bytes starting `offset` bytes
    /// into sector `lba`.
    ///
    /// Returns the number of bytes placed in `buf`, or [`TRANSFER_FAILED`].
    /// A short non-negative count means the device faulted after partial
    /// progress; no device call is issued past the fault. `offset` must be
    /// below the sector size.
    pub async fn on_read(&mut self, lba: u32, offset: u32, buf: &mut [u8]) -> i32 {
        if self.media != MediaState::Present {
            return TRANSFER_FAILED;
        }
        if offset as usize >= SECTOR_SIZE {
            return TRANSFER_FAILED;
        }
        status(self.read_range(Lba::new(lba), offset as usize, buf).await)
    }

    /// Service a host write of `buf.len()` bytes starting `offset` bytes
    /// into sector `lba`.
    ///
    /// Same return convention as [`on_read`](Self::on_read). Rejected with
    /// [`TRANSFER_FAILED`] and zero side effects when the bridge is
    /// read-only.
    pub async fn on_write(&mut self, lba: u32, offset: u32, buf: &[u8]) -> i32 {
        if self.media != MediaState::Present {
            return TRANSFER_FAILED;
        }
        if self.read_only {
            return TRANSFER_FAILED;
        }
        if offset as usize >= SECTOR_SIZE {
            return TRANSFER_FAILED;
        }
        status(self.write_range(Lba::new(lba), offset as usize, buf).await)
    }

    /// Service a START STOP UNIT request.
    ///
    /// The request is recorded (see [`last_start_stop`](Self::last_start_stop))
    /// and acknowledged with the unit ready. Some hosts send an early stop
    /// during enumeration; dropping readiness here would detach the medium
    /// before the session starts, so the unit stays ready regardless of
    /// what was asked.
    pub fn on_start_stop(&mut self, power_condition: u8, start: bool, load_eject: bool) -> bool {
        self.last_start_stop = Some(StartStopRequest {
            power_condition,
            start,
            load_eject,
        });
        true
    }

    async fn read_range(
        &mut self,
        mut lba: Lba,
        offset: usize,
        buf: &mut [u8],
    ) -> Result<usize, Faulted> {
        debug_assert!(offset < SECTOR_SIZE);
        let mut done = 0;

        // Unaligned head: one sector through scratch.
        if offset != 0 {
            self.device
                .read_sectors(lba.value(), core::slice::from_mut(&mut self.scratch))
                .await
                .map_err(|_| Faulted { completed: done })?;
            let chunk = buf.len().min(SECTOR_SIZE - offset);
            buf[..chunk].copy_from_slice(&self.scratch[offset..offset + chunk]);
            done += chunk;
            lba = lba.add(1);
        }

        // Aligned body: whole sectors batched through the bounce buffer.
        while buf.len() - done >= SECTOR_SIZE {
            let batch = ((buf.len() - done) / SECTOR_SIZE).min(self.bounce.sectors());
            let stage = self.bounce.stage_mut(batch);
            self.device
                .read_sectors(lba.value(), stage)
                .await
                .map_err(|_| Faulted { completed: done })?;
            let bytes = batch * SECTOR_SIZE;
            buf[done..done + bytes].copy_from_slice(sectors_to_slice(stage));
            done += bytes;
            lba = lba.add(batch as u32);
        }

        // Tail: whatever is left is shorter than one sector.
        let rest = buf.len() - done;
        if rest > 0 {
            self.device
                .read_sectors(lba.value(), core::slice::from_mut(&mut self.scratch))
                .await
                .map_err(|_| Faulted { completed: done })?;
            buf[done..].copy_from_slice(&self.scratch[..rest]);
            done += rest;
        }

        Ok(done)
    }

    async fn write_range(
        &mut self,
        mut lba: Lba,
        offset: usize,
        buf: &[u8],
    ) -> Result<usize, Faulted> {
        debug_assert!(offset < SECTOR_SIZE);
        let mut done = 0;

        // Unaligned head: read-modify-write so the bytes around the
        // requested range survive.
        if offset != 0 {
            self.device
                .read_sectors(lba.value(), core::slice::from_mut(&mut self.scratch))
                .await
                .map_err(|_| Faulted { completed: done })?;
            let chunk = buf.len().min(SECTOR_SIZE - offset);
            self.scratch[offset..offset + chunk].copy_from_slice(&buf[..chunk]);
            self.device
                .write_sectors(lba.value(), core::slice::from_ref(&self.scratch))
                .await
                .map_err(|_| Faulted { completed: done })?;
            done += chunk;
            lba = lba.add(1);
        }

        // Aligned body: whole sectors are replaced outright, no prior read.
        while buf.len() - done >= SECTOR_SIZE {
            let batch = ((buf.len() - done) / SECTOR_SIZE).min(self.bounce.sectors());
            let bytes = batch * SECTOR_SIZE;
            let stage = self.bounce.stage_mut(batch);
            sectors_to_slice_mut(stage).copy_from_slice(&buf[done..done + bytes]);
            self.device
                .write_sectors(lba.value(), stage)
                .await
                .map_err(|_| Faulted { completed: done })?;
            done += bytes;
            lba = lba.add(batch as u32);
        }

        // Tail: read-modify-write of the final partial sector.
        let rest = buf.len() - done;
        if rest > 0 {
            self.device
                .read_sectors(lba.value(), core::slice::from_mut(&mut self.scratch))
                .await
                .map_err(|_| Faulted { completed: done })?;
            self.scratch[..rest].copy_from_slice(&buf[done..]);
            self.device
                .write_sectors(lba.value(), core::slice::from_ref(&self.scratch))
                .await
                .map_err(|_| Faulted { completed: done })?;
            done += rest;
        }

        Ok(done)
    }
}
