//! Device drivers: the storage-facing half of an emulated ATA device.
//!
//! The protocol engine only talks to drivers through [`AtaDeviceDriver`]. A
//! driver owns persistent state (geometry, lock state, negotiated transfer
//! modes) and the media backend; the engine owns everything register-related.

mod dvd;
mod hard_drive;
mod null;

pub use dvd::DvdDrive;
pub use hard_drive::{image_geometry, DummyMedia, Geometry, HardDrive, HardDriveMedia, ImageMedia};
pub use null::NullDriver;

use kestrel_storage::Result as DiskResult;

use crate::defs::{DmaTransferType, PioTransferType, SECTOR_SIZE};
use crate::identify::IdentifyData;

/// Cylinder/head/sector address.
///
/// Sectors are counted from zero, matching the translation used by the
/// drivers' CHS⇄LBA conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chs {
    pub cylinder: u16,
    pub head: u8,
    pub sector: u8,
}

/// PIO and DMA modes negotiated through Set Features.
///
/// [8.37.10] PIO and DMA modes are tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferModes {
    pub pio_type: PioTransferType,
    pub pio_mode: u8,
    pub dma_type: DmaTransferType,
    pub dma_mode: u8,
}

impl TransferModes {
    /// Selected-mode bit for Identify word 63, if Multiword DMA is selected.
    pub fn multiword_dma_selected(&self) -> u16 {
        match self.dma_type {
            DmaTransferType::MultiwordDma => crate::identify::DMA_MODE_0_SELECTED << self.dma_mode,
            DmaTransferType::UltraDma => 0,
        }
    }

    /// Selected-mode bit for Identify word 88, if Ultra DMA is selected.
    pub fn ultra_dma_selected(&self) -> u16 {
        match self.dma_type {
            DmaTransferType::UltraDma => crate::identify::DMA_MODE_0_SELECTED << self.dma_mode,
            DmaTransferType::MultiwordDma => 0,
        }
    }
}

pub trait AtaDeviceDriver: Send {
    /// Whether a device is present behind this driver.
    fn is_attached(&self) -> bool;

    // ----- ATA commands -----

    fn identify_device(&self, data: &mut IdentifyData);

    /// Fills Identify Packet Device data. Returns `false` for devices that do
    /// not implement the PACKET command feature set.
    fn identify_packet_device(&self, data: &mut IdentifyData) -> bool;

    fn security_unlock(&mut self, unlock_data: &[u8; SECTOR_SIZE]) -> bool;

    /// Re-translates the logical CHS geometry.
    ///
    /// `heads` is the maximum head number (heads per cylinder minus one), as
    /// written to the Device/Head register by Initialize Device Parameters.
    fn set_device_parameters(&mut self, heads: u8, sectors_per_track: u8) -> bool;

    // ----- Transfer modes -----

    fn transfer_modes(&self) -> TransferModes;
    fn set_pio_transfer_mode(&mut self, ty: PioTransferType, mode: u8);
    fn set_dma_transfer_mode(&mut self, ty: DmaTransferType, mode: u8);

    /// Highest Ultra DMA mode this device advertises.
    fn max_ultra_dma_mode(&self) -> u8;

    // ----- Data access -----

    fn read(&mut self, byte_address: u64, buf: &mut [u8]) -> DiskResult<()>;
    fn write(&mut self, byte_address: u64, buf: &[u8]) -> DiskResult<()>;

    // ----- Feature sets -----

    fn supports_packet_commands(&self) -> bool;

    /// Size in bytes of a command packet, or zero for non-packet devices.
    fn packet_command_size(&self) -> usize {
        if self.supports_packet_commands() {
            12
        } else {
            0
        }
    }

    // ----- Addressing -----

    fn sector_capacity(&self) -> u32;
    fn is_lba_address_user_accessible(&self, lba: u32) -> bool;

    /// Converts using the current logical geometry.
    fn chs_to_lba(&self, chs: Chs) -> u32;
    fn lba_to_chs(&self, lba: u32) -> Chs;
}
