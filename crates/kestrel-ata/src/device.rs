use tracing::debug;

use crate::defs::{
    ChannelId, DmaTransferType, ErrorBits, PioTransferType, TransferMode,
    MAX_MULTIWORD_DMA_TRANSFER_MODE, MAX_PIO_DEFAULT_TRANSFER_MODE, MAX_PIO_TRANSFER_MODE,
    SECTOR_SIZE,
};
use crate::drivers::{AtaDeviceDriver, NullDriver};
use crate::registers::AtaRegisters;

/// One of the two device slots on a channel.
///
/// Owns the driver and the one-sector staging buffer used by the PIO
/// protocols. Register state lives on the channel.
pub struct AtaDevice {
    channel: ChannelId,
    index: usize,
    driver: Box<dyn AtaDeviceDriver>,
    buffer: [u8; SECTOR_SIZE],
    buffer_pos: usize,
}

impl AtaDevice {
    pub fn new(channel: ChannelId, index: usize) -> Self {
        Self {
            channel,
            index,
            driver: Box::new(NullDriver::new()),
            buffer: [0; SECTOR_SIZE],
            buffer_pos: 0,
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Replaces the driver and returns the previous one.
    pub fn attach(&mut self, driver: Box<dyn AtaDeviceDriver>) -> Box<dyn AtaDeviceDriver> {
        self.reset_buffer();
        std::mem::replace(&mut self.driver, driver)
    }

    pub fn driver(&self) -> &dyn AtaDeviceDriver {
        self.driver.as_ref()
    }

    pub fn driver_mut(&mut self) -> &mut dyn AtaDeviceDriver {
        self.driver.as_mut()
    }

    pub fn is_attached(&self) -> bool {
        self.driver.is_attached()
    }

    pub fn buffer(&self) -> &[u8; SECTOR_SIZE] {
        &self.buffer
    }

    /// Copies bytes out of the staging buffer at the cursor.
    ///
    /// Returns the number of bytes copied, which is short when the request
    /// crosses the end of the block.
    pub fn read_buffer(&mut self, dst: &mut [u8]) -> usize {
        let len = dst.len().min(self.remaining_buffer_len());
        dst[..len].copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + len]);
        self.buffer_pos += len;
        len
    }

    /// Copies bytes into the staging buffer at the cursor.
    pub fn write_buffer(&mut self, src: &[u8]) -> usize {
        let len = src.len().min(self.remaining_buffer_len());
        self.buffer[self.buffer_pos..self.buffer_pos + len].copy_from_slice(&src[..len]);
        self.buffer_pos += len;
        len
    }

    pub fn remaining_buffer_len(&self) -> usize {
        SECTOR_SIZE - self.buffer_pos
    }

    pub fn is_block_complete(&self) -> bool {
        self.buffer_pos == SECTOR_SIZE
    }

    /// Clears the buffer and rewinds the cursor.
    pub fn reset_buffer(&mut self) {
        self.buffer = [0; SECTOR_SIZE];
        self.buffer_pos = 0;
    }

    /// Replaces the buffer contents and rewinds the cursor.
    pub fn load_buffer(&mut self, block: &[u8; SECTOR_SIZE]) {
        self.buffer = *block;
        self.buffer_pos = 0;
    }

    /// [8.37.10] Set Transfer Mode.
    ///
    /// Validates the transfer type and mode encoded in the Sector Count
    /// register against the device's ceilings. An unsupported type or an
    /// out-of-range mode sets ABRT and leaves the negotiated modes unchanged.
    pub fn set_transfer_mode(&mut self, regs: &mut AtaRegisters) -> bool {
        let Some(request) = TransferMode::decode(regs.sector_count) else {
            debug!(
                channel = %self.channel,
                device = self.index,
                value = regs.sector_count,
                "invalid transfer type"
            );
            regs.error |= ErrorBits::ABRT;
            return false;
        };

        let ceiling = match request {
            TransferMode::Pio(PioTransferType::Default, _) => MAX_PIO_DEFAULT_TRANSFER_MODE,
            TransferMode::Pio(PioTransferType::FlowControl, _) => MAX_PIO_TRANSFER_MODE,
            TransferMode::Dma(DmaTransferType::MultiwordDma, _) => MAX_MULTIWORD_DMA_TRANSFER_MODE,
            TransferMode::Dma(DmaTransferType::UltraDma, _) => self.driver.max_ultra_dma_mode(),
        };

        let mode = match request {
            TransferMode::Pio(_, mode) | TransferMode::Dma(_, mode) => mode,
        };
        if mode > ceiling {
            debug!(
                channel = %self.channel,
                device = self.index,
                ?request,
                ceiling,
                "transfer mode out of range"
            );
            regs.error |= ErrorBits::ABRT;
            return false;
        }

        match request {
            TransferMode::Pio(ty, mode) => {
                debug!(channel = %self.channel, device = self.index, ?ty, mode, "setting PIO transfer mode");
                self.driver.set_pio_transfer_mode(ty, mode);
                true
            }
            TransferMode::Dma(ty, mode) => {
                debug!(channel = %self.channel, device = self.index, ?ty, mode, "setting DMA transfer mode");
                self.driver.set_dma_transfer_mode(ty, mode);
                true
            }
        }
    }
}

impl std::fmt::Debug for AtaDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtaDevice")
            .field("channel", &self.channel)
            .field("index", &self.index)
            .field("attached", &self.driver.is_attached())
            .field("buffer_pos", &self.buffer_pos)
            .finish_non_exhaustive()
    }
}
