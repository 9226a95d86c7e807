//! Platform [`SectorDevice`](sector_device::SectorDevice) implementations.
//!
//! [`StreamSectorDevice`] adapts any async byte stream (a file handle, an
//! in-memory image) into a whole-sector device, for host-side tooling and
//! for tests that stand in for a real card.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![allow(async_fn_in_trait)]

mod stream;

pub use stream::StreamSectorDevice;
