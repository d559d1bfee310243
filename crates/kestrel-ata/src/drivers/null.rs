use kestrel_storage::{DiskError, Result as DiskResult};

use super::{AtaDeviceDriver, Chs, TransferModes};
use crate::defs::{DmaTransferType, PioTransferType, SECTOR_SIZE};
use crate::identify::IdentifyData;

/// Stands in for an empty device slot.
#[derive(Debug, Default)]
pub struct NullDriver {
    modes: TransferModes,
}

impl NullDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AtaDeviceDriver for NullDriver {
    fn is_attached(&self) -> bool {
        false
    }

    fn identify_device(&self, data: &mut IdentifyData) {
        *data = IdentifyData::new();
    }

    fn identify_packet_device(&self, _data: &mut IdentifyData) -> bool {
        false
    }

    fn security_unlock(&mut self, _unlock_data: &[u8; SECTOR_SIZE]) -> bool {
        false
    }

    fn set_device_parameters(&mut self, _heads: u8, _sectors_per_track: u8) -> bool {
        false
    }

    fn transfer_modes(&self) -> TransferModes {
        self.modes
    }

    fn set_pio_transfer_mode(&mut self, ty: PioTransferType, mode: u8) {
        self.modes.pio_type = ty;
        self.modes.pio_mode = mode;
    }

    fn set_dma_transfer_mode(&mut self, ty: DmaTransferType, mode: u8) {
        self.modes.dma_type = ty;
        self.modes.dma_mode = mode;
    }

    fn max_ultra_dma_mode(&self) -> u8 {
        0
    }

    fn read(&mut self, _byte_address: u64, _buf: &mut [u8]) -> DiskResult<()> {
        Err(DiskError::NoMedium)
    }

    fn write(&mut self, _byte_address: u64, _buf: &[u8]) -> DiskResult<()> {
        Err(DiskError::NoMedium)
    }

    fn supports_packet_commands(&self) -> bool {
        false
    }

    fn sector_capacity(&self) -> u32 {
        0
    }

    fn is_lba_address_user_accessible(&self, _lba: u32) -> bool {
        false
    }

    fn chs_to_lba(&self, _chs: Chs) -> u32 {
        0
    }

    fn lba_to_chs(&self, _lba: u32) -> Chs {
        Chs::default()
    }
}
