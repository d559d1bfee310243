use kestrel_storage::Result as DiskResult;

use super::{AtaDeviceDriver, Chs, TransferModes};
use crate::defs::{
    DmaTransferType, PioTransferType, FIRMWARE_REVISION_LEN, MODEL_NUMBER_LEN, SECTOR_SIZE,
    SERIAL_NUMBER_LEN,
};
use crate::identify::{self, word, IdentifyData};

/// An empty DVD drive that implements the PACKET command feature set.
///
/// Media access is not modelled: reads return zeros and writes are accepted
/// and dropped.
#[derive(Debug)]
pub struct DvdDrive {
    serial_number: String,
    firmware_revision: String,
    model_number: String,
    modes: TransferModes,
}

impl DvdDrive {
    pub fn dummy() -> Self {
        Self {
            serial_number: "0123456789".to_string(),
            firmware_revision: "1.0.0".to_string(),
            model_number: "Kestrel DDVDD0010000".to_string(),
            modes: TransferModes::default(),
        }
    }
}

impl Default for DvdDrive {
    fn default() -> Self {
        Self::dummy()
    }
}

impl AtaDeviceDriver for DvdDrive {
    fn is_attached(&self) -> bool {
        true
    }

    fn identify_device(&self, data: &mut IdentifyData) {
        // Not reachable through Identify Device; packet devices abort it.
        *data = IdentifyData::new();
    }

    fn identify_packet_device(&self, data: &mut IdentifyData) -> bool {
        *data = IdentifyData::new();

        // Removable CD-ROM, DRQ within 3 ms, 12-byte packets.
        data.set_word(
            word::GENERAL_CONFIGURATION,
            identify::GENERAL_CONFIG_ATAPI_DEVICE
                | identify::GENERAL_CONFIG_CDROM_COMMAND_SET
                | identify::GENERAL_CONFIG_REMOVABLE_MEDIA
                | identify::GENERAL_CONFIG_DRQ_IN_3MS
                | identify::GENERAL_CONFIG_12_BYTE_PACKETS,
        );

        data.set_string(word::SERIAL_NUMBER, SERIAL_NUMBER_LEN, &self.serial_number);
        data.set_string(word::FIRMWARE_REVISION, FIRMWARE_REVISION_LEN, &self.firmware_revision);
        data.set_string(word::MODEL_NUMBER, MODEL_NUMBER_LEN, &self.model_number);

        data.set_word(
            word::CAPABILITIES,
            identify::CAPS_DMA | identify::CAPS_LBA | identify::CAPS_IORDY,
        );
        data.set_word(
            word::VALID_TRANSLATION,
            identify::VALID_TRANSFER_CYCLES | identify::VALID_ULTRA_DMA,
        );
        data.set_word(
            word::MULTIWORD_DMA,
            identify::DMA_MODES_0_TO_2_SUPPORTED | self.modes.multiword_dma_selected(),
        );
        data.set_word(word::ADVANCED_PIO_MODES, 0b10);
        data.set_word(word::MIN_MDMA_CYCLE, identify::MIN_CYCLE_TIME_NS);
        data.set_word(word::RECOMMENDED_MDMA_CYCLE, identify::MIN_CYCLE_TIME_NS);
        data.set_word(word::MIN_PIO_CYCLE, identify::MIN_CYCLE_TIME_NS);
        data.set_word(word::MIN_PIO_CYCLE_IORDY, identify::MIN_CYCLE_TIME_NS);

        data.set_word(
            word::MAJOR_VERSION,
            identify::MAJOR_VERSION_ATAPI4
                | identify::MAJOR_VERSION_ATA3
                | identify::MAJOR_VERSION_ATA2
                | identify::MAJOR_VERSION_ATA1,
        );
        data.set_word(word::MINOR_VERSION, identify::MINOR_VERSION_ATAPI4_REV17);
        data.set_word(word::QUEUE_DEPTH, 1);

        let command_sets = identify::CMD_SET_PACKET | identify::CMD_SET_DEVICE_RESET;
        data.set_word(word::COMMAND_SETS_SUPPORTED_1, command_sets);
        data.set_word(word::COMMAND_SETS_SUPPORTED_2, identify::CMD_SET_BIT14_ALWAYS_ONE);
        data.set_word(word::COMMAND_SETS_SUPPORTED_3, identify::CMD_SET_BIT14_ALWAYS_ONE);
        data.set_word(word::COMMAND_SETS_ENABLED_1, command_sets);
        data.set_word(word::COMMAND_SETS_ENABLED_2, 0);
        data.set_word(word::COMMAND_SETS_ENABLED_3, identify::CMD_SET_BIT14_ALWAYS_ONE);

        data.set_word(
            word::ULTRA_DMA,
            identify::DMA_MODES_0_TO_2_SUPPORTED | self.modes.ultra_dma_selected(),
        );
        true
    }

    fn security_unlock(&mut self, _unlock_data: &[u8; SECTOR_SIZE]) -> bool {
        true
    }

    fn set_device_parameters(&mut self, _heads: u8, _sectors_per_track: u8) -> bool {
        true
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
        2
    }

    fn read(&mut self, _byte_address: u64, buf: &mut [u8]) -> DiskResult<()> {
        buf.fill(0);
        Ok(())
    }

    fn write(&mut self, _byte_address: u64, _buf: &[u8]) -> DiskResult<()> {
        Ok(())
    }

    fn supports_packet_commands(&self) -> bool {
        true
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
