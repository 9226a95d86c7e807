//! Stream-backed sector device.

use aligned::A4;
use embedded_io_async::{Read, Seek, SeekFrom, Write};
use sector_device::{BusConfig, SECTOR_SIZE, Sector, SectorDevice};

/// Sector device over any async I/O stream.
///
/// Wraps a type implementing `embedded_io_async::{Read, Write, Seek}` and
/// exposes it sector-by-sector. Useful for disk images and in-memory
/// buffers standing in for real cards.
///
/// # Example
///
/// ```ignore
/// use msc_platform::StreamSectorDevice;
/// use embedded_io_adapters::tokio_1::FromTokio;
///
/// let file = tokio::fs::File::open("disk.img").await?;
/// let mut device = StreamSectorDevice::new(FromTokio::new(file));
/// let sectors = device.init(&BusConfig::default()).await?;
/// ```
pub struct StreamSectorDevice<T> {
    inner: T,
}

impl<T> StreamSectorDevice<T> {
    /// Wrap the given stream.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Get a reference to the inner stream.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Get a mutable reference to the inner stream.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the wrapper and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> SectorDevice for StreamSectorDevice<T>
where
    T: Read + Write + Seek,
{
    type Error = T::Error;
    type Align = A4;

    async fn init(&mut self, _bus: &BusConfig) -> Result<u64, Self::Error> {
        // Streams have no bus to configure; capacity is the stream length
        // in whole sectors.
        let bytes = self.inner.seek(SeekFrom::End(0)).await?;
        self.inner.seek(SeekFrom::Start(0)).await?;
        Ok(bytes / SECTOR_SIZE as u64)
    }

    async fn read_sectors(
        &mut self,
        start_lba: u32,
        dst: &mut [Sector<Self::Align>],
    ) -> Result<(), Self::Error> {
        self.inner
            .seek(SeekFrom::Start(start_lba as u64 * SECTOR_SIZE as u64))
            .await?;
        for sector in dst {
            let mut offset = 0;
            while offset < SECTOR_SIZE {
                let n = self.inner.read(&mut sector[offset..]).await?;
                if n == 0 {
                    break; // EOF
                }
                offset += n;
            }
        }
        Ok(())
    }

    async fn write_sectors(
        &mut self,
        start_lba: u32,
        src: &[Sector<Self::Align>],
    ) -> Result<(), Self::Error> {
        self.inner
            .seek(SeekFrom::Start(start_lba as u64 * SECTOR_SIZE as u64))
            .await?;
        for sector in src {
            let mut offset = 0;
            while offset < SECTOR_SIZE {
                let n = self.inner.write(&sector[offset..]).await?;
                if n == 0 {
                    break; // Can't write more
                }
                offset += n;
            }
        }
        // One call, one durable transfer; buffered streams must not defer.
        self.inner.flush().await
    }
}
