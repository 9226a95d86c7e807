//! Transfer staging buffer with graceful degradation.

use aligned::{Aligned, Alignment};
use sector_device::{SECTOR_SIZE, Sector};

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Staging buffer between the caller's byte range and whole-sector device
/// transfers.
///
/// Allocation is fallible: when the multi-sector buffer cannot be obtained
/// (or `alloc` is disabled), the buffer degrades to a single inline sector
/// and aligned-body transfers proceed one sector at a time. Throughput
/// drops; nothing else changes.
///
/// The buffer is sized once and owned exclusively by the bridge; dropping
/// the bridge releases it on every teardown path.
pub(crate) enum BounceBuffer<A: Alignment> {
    /// Multi-sector staging area.
    #[cfg(feature = "alloc")]
    Dma(Vec<Sector<A>>),
    /// Single-sector fallback.
    Fallback(Sector<A>),
}

impl<A: Alignment> BounceBuffer<A> {
    /// Allocate a buffer of `sectors` sectors, degrading to the fallback
    /// when the allocation fails.
    pub(crate) fn allocate(sectors: u32) -> Self {
        #[cfg(feature = "alloc")]
        {
            let mut staging: Vec<Sector<A>> = Vec::new();
            if staging.try_reserve_exact(sectors as usize).is_ok() {
                for _ in 0..sectors {
                    staging.push(Aligned([0u8; SECTOR_SIZE]));
                }
                return Self::Dma(staging);
            }
            #[cfg(feature = "log")]
            log::warn!(
                "staging allocation of {} sectors failed, degrading to single-sector transfers",
                sectors
            );
        }
        let _ = sectors;
        Self::Fallback(Aligned([0u8; SECTOR_SIZE]))
    }

    /// Staging capacity in sectors.
    pub(crate) fn sectors(&self) -> usize {
        match self {
            #[cfg(feature = "alloc")]
            Self::Dma(staging) => staging.len(),
            Self::Fallback(_) => 1,
        }
    }

    /// Mutable view of the first `n` staged sectors.
    pub(crate) fn stage_mut(&mut self, n: usize) -> &mut [Sector<A>] {
        debug_assert!(n >= 1 && n <= self.sectors());
        match self {
            #[cfg(feature = "alloc")]
            Self::Dma(staging) => &mut staging[..n],
            Self::Fallback(sector) => core::slice::from_mut(sector),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aligned::A4;

    #[cfg(feature = "alloc")]
    #[test]
    fn test_allocate_holds_requested_sectors() {
        let mut bounce = BounceBuffer::<A4>::allocate(8);
        assert_eq!(bounce.sectors(), 8);
        assert_eq!(bounce.stage_mut(3).len(), 3);
    }

    #[test]
    fn test_fallback_is_single_sector() {
        let mut bounce = BounceBuffer::<A4>::Fallback(Aligned([0u8; SECTOR_SIZE]));
        assert_eq!(bounce.sectors(), 1);
        assert_eq!(bounce.stage_mut(1).len(), 1);
    }
}
