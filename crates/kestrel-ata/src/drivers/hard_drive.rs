use std::path::Path;

use kestrel_storage::{Result as DiskResult, StdFileBackend, StorageBackend};
use tracing::{info, warn};

use super::{AtaDeviceDriver, Chs, TransferModes};
use crate::defs::{
    DmaTransferType, PioTransferType, FIRMWARE_REVISION_LEN, MAX_CHS_SECTOR_CAPACITY,
    MAX_LBA_SECTOR_CAPACITY, MODEL_NUMBER_LEN, SECTOR_SIZE, SERIAL_NUMBER_LEN,
};
use crate::identify::{self, word, IdentifyData};

/// Cylinders, heads per cylinder and sectors per track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub cylinders: u32,
    pub heads: u32,
    pub sectors_per_track: u32,
}

impl Geometry {
    pub fn sectors(&self) -> u64 {
        u64::from(self.cylinders) * u64::from(self.heads) * u64::from(self.sectors_per_track)
    }
}

/// Byte-addressed media behind a [`HardDrive`].
pub trait HardDriveMedia: Send {
    fn read(&mut self, byte_address: u64, buf: &mut [u8]) -> DiskResult<()>;
    fn write(&mut self, byte_address: u64, buf: &[u8]) -> DiskResult<()>;
}

/// Media that reads as zeros and silently discards writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyMedia;

impl HardDriveMedia for DummyMedia {
    fn read(&mut self, _byte_address: u64, buf: &mut [u8]) -> DiskResult<()> {
        buf.fill(0);
        Ok(())
    }

    fn write(&mut self, _byte_address: u64, _buf: &[u8]) -> DiskResult<()> {
        Ok(())
    }
}

/// Raw disk image media.
#[derive(Debug)]
pub struct ImageMedia<B> {
    backend: B,
}

impl<B: StorageBackend> ImageMedia<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: StorageBackend> HardDriveMedia for ImageMedia<B> {
    fn read(&mut self, byte_address: u64, buf: &mut [u8]) -> DiskResult<()> {
        self.backend.read_at(byte_address, buf)
    }

    fn write(&mut self, byte_address: u64, buf: &[u8]) -> DiskResult<()> {
        // One sector per call at most.
        let len = buf.len().min(SECTOR_SIZE);
        self.backend.write_at(byte_address, &buf[..len])
    }
}

/// Computes the physical geometry for a raw image of `image_sectors` sectors.
///
/// Uses 63 sectors per track and the smallest head count from 16, 32, 64, 128
/// or 255 that keeps the image within 1024 cylinders.
pub fn image_geometry(image_sectors: u64) -> (Geometry, u32) {
    let capacity = if image_sectors > u64::from(MAX_LBA_SECTOR_CAPACITY) {
        warn!(
            image_sectors,
            limit = MAX_LBA_SECTOR_CAPACITY,
            "image is too big; limiting to the addressable sectors"
        );
        MAX_LBA_SECTOR_CAPACITY
    } else {
        image_sectors as u32
    };

    let sectors_per_track = 63;
    let mut heads = 16;
    while heads < 255 && u64::from(capacity) > 1024 * 63 * u64::from(heads) {
        heads = (heads * 2).min(255);
    }

    let geometry = Geometry {
        cylinders: capacity / sectors_per_track / heads,
        heads,
        sectors_per_track,
    };
    (geometry, capacity)
}

/// The hard drive model shared by the dummy and image-backed drives.
///
/// Xbox drives ship with the security feature set enabled and locked, so the
/// drive starts locked until Security Unlock succeeds. There is no logical
/// (CHS) translation until Initialize Device Parameters sets one.
#[derive(Debug)]
pub struct HardDrive<M> {
    media: M,

    serial_number: String,
    firmware_revision: String,
    model_number: String,

    physical: Geometry,
    logical: Geometry,
    sector_capacity: u32,

    locked: bool,
    modes: TransferModes,
    max_ultra_dma_mode: u8,
}

impl<M: HardDriveMedia> HardDrive<M> {
    pub fn new(media: M, physical: Geometry, sector_capacity: u32) -> Self {
        Self {
            media,
            serial_number: String::new(),
            firmware_revision: String::new(),
            model_number: String::new(),
            physical,
            logical: Geometry::default(),
            sector_capacity,
            locked: true,
            modes: TransferModes::default(),
            max_ultra_dma_mode: 2,
        }
    }

    pub fn with_identity(mut self, serial: &str, firmware: &str, model: &str) -> Self {
        self.serial_number = serial.to_string();
        self.firmware_revision = firmware.to_string();
        self.model_number = model.to_string();
        self
    }

    pub fn with_max_ultra_dma_mode(mut self, mode: u8) -> Self {
        self.max_ultra_dma_mode = mode;
        self
    }

    pub fn physical_geometry(&self) -> Geometry {
        self.physical
    }

    pub fn logical_geometry(&self) -> Geometry {
        self.logical
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl HardDrive<DummyMedia> {
    /// A 10 GiB drive (20480 cylinders, 16 heads, 63 sectors per track).
    pub fn dummy() -> Self {
        let physical = Geometry {
            cylinders: 20480,
            heads: 16,
            sectors_per_track: 63,
        };
        HardDrive::new(DummyMedia, physical, physical.sectors() as u32).with_identity(
            "0123456789",
            "1.0.0",
            "Kestrel DHDD0010000",
        )
    }
}

impl<B: StorageBackend> HardDrive<ImageMedia<B>> {
    pub fn from_backend(mut backend: B) -> DiskResult<Self> {
        let image_size = backend.len()?;
        let (physical, capacity) = image_geometry(image_size / SECTOR_SIZE as u64);
        info!(
            image_size,
            sectors = capacity,
            cylinders = physical.cylinders,
            heads = physical.heads,
            sectors_per_track = physical.sectors_per_track,
            "attached hard drive image"
        );
        Ok(
            HardDrive::new(ImageMedia::new(backend), physical, capacity).with_identity(
                "9876543210",
                "1.0.0",
                "Kestrel VHDD0010000",
            ),
        )
    }
}

impl HardDrive<ImageMedia<StdFileBackend>> {
    pub fn open_image(path: impl AsRef<Path>) -> DiskResult<Self> {
        let path = path.as_ref();
        let backend = StdFileBackend::open(path).inspect_err(|err| {
            warn!(path = %path.display(), %err, "could not open hard drive image");
        })?;
        Self::from_backend(backend)
    }
}

impl<M: HardDriveMedia> AtaDeviceDriver for HardDrive<M> {
    fn is_attached(&self) -> bool {
        true
    }

    fn identify_device(&self, data: &mut IdentifyData) {
        *data = IdentifyData::new();

        data.set_word(word::GENERAL_CONFIGURATION, identify::GENERAL_CONFIG_HARD_DRIVE);
        data.set_word(word::LOGICAL_CYLINDERS, self.physical.cylinders as u16);
        data.set_word(word::LOGICAL_HEADS, self.physical.heads as u16);
        data.set_word(word::LOGICAL_SECTORS_PER_TRACK, self.physical.sectors_per_track as u16);

        data.set_string(word::SERIAL_NUMBER, SERIAL_NUMBER_LEN, &self.serial_number);
        data.set_string(word::FIRMWARE_REVISION, FIRMWARE_REVISION_LEN, &self.firmware_revision);
        data.set_string(word::MODEL_NUMBER, MODEL_NUMBER_LEN, &self.model_number);

        let current_capacity = self.logical.sectors() as u32;
        let mut valid = identify::VALID_ULTRA_DMA | identify::VALID_TRANSFER_CYCLES;
        if current_capacity != 0 {
            valid |= identify::VALID_CHS;
        }
        data.set_word(word::VALID_TRANSLATION, valid);

        data.set_word(word::CURRENT_CYLINDERS, self.logical.cylinders as u16);
        data.set_word(word::CURRENT_HEADS, self.logical.heads as u16);
        data.set_word(word::CURRENT_SECTORS_PER_TRACK, self.logical.sectors_per_track as u16);
        data.set_dword(word::CURRENT_CAPACITY, current_capacity);
        data.set_dword(word::ADDRESSABLE_SECTORS, self.sector_capacity);

        data.set_word(
            word::MULTIWORD_DMA,
            identify::DMA_MODES_0_TO_2_SUPPORTED | self.modes.multiword_dma_selected(),
        );
        data.set_word(word::ADVANCED_PIO_MODES, identify::ADVANCED_PIO_MODES_3_4);
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

        let command_sets = identify::CMD_SET_POWER_MANAGEMENT
            | identify::CMD_SET_WRITE_CACHE
            | identify::CMD_SET_LOOK_AHEAD;
        data.set_word(word::COMMAND_SETS_SUPPORTED_1, command_sets);
        data.set_word(word::COMMAND_SETS_SUPPORTED_2, identify::CMD_SET_BIT14_ALWAYS_ONE);
        data.set_word(word::COMMAND_SETS_SUPPORTED_3, identify::CMD_SET_BIT14_ALWAYS_ONE);
        data.set_word(word::COMMAND_SETS_ENABLED_1, command_sets);
        data.set_word(word::COMMAND_SETS_ENABLED_2, identify::CMD_SET_BIT14_ALWAYS_ONE);
        data.set_word(word::COMMAND_SETS_ENABLED_3, identify::CMD_SET_BIT14_ALWAYS_ONE);

        let ultra_supported = (1u16 << (self.max_ultra_dma_mode.min(7) + 1)) - 1;
        data.set_word(
            word::ULTRA_DMA,
            ultra_supported | self.modes.ultra_dma_selected(),
        );

        let mut security = identify::SECURITY_SUPPORTED | identify::SECURITY_ENABLED;
        if self.locked {
            security |= identify::SECURITY_LOCKED;
        }
        data.set_word(word::SECURITY_STATUS, security);
    }

    fn identify_packet_device(&self, _data: &mut IdentifyData) -> bool {
        false
    }

    fn security_unlock(&mut self, _unlock_data: &[u8; SECTOR_SIZE]) -> bool {
        // Any password unlocks the drive.
        self.locked = false;
        true
    }

    fn set_device_parameters(&mut self, heads: u8, sectors_per_track: u8) -> bool {
        if u32::from(heads) > self.physical.heads
            || u32::from(sectors_per_track) > self.physical.sectors_per_track
            || sectors_per_track == 0
        {
            return false;
        }

        let chs_capacity = self.sector_capacity.min(MAX_CHS_SECTOR_CAPACITY);
        let cylinders = chs_capacity / ((u32::from(heads) + 1) * u32::from(sectors_per_track));

        self.logical = Geometry {
            cylinders: cylinders.min(65535),
            heads: u32::from(heads) + 1,
            sectors_per_track: u32::from(sectors_per_track),
        };
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
        self.max_ultra_dma_mode
    }

    fn read(&mut self, byte_address: u64, buf: &mut [u8]) -> DiskResult<()> {
        self.media.read(byte_address, buf)
    }

    fn write(&mut self, byte_address: u64, buf: &[u8]) -> DiskResult<()> {
        self.media.write(byte_address, buf)
    }

    fn supports_packet_commands(&self) -> bool {
        false
    }

    fn sector_capacity(&self) -> u32 {
        self.sector_capacity
    }

    fn is_lba_address_user_accessible(&self, lba: u32) -> bool {
        lba < self.sector_capacity
    }

    fn chs_to_lba(&self, chs: Chs) -> u32 {
        let lba = (u64::from(chs.cylinder) * u64::from(self.logical.heads) + u64::from(chs.head))
            * u64::from(self.logical.sectors_per_track)
            + u64::from(chs.sector);
        u32::try_from(lba).unwrap_or(u32::MAX)
    }

    fn lba_to_chs(&self, lba: u32) -> Chs {
        if self.logical.heads == 0 || self.logical.sectors_per_track == 0 {
            return Chs::default();
        }

        let sector = lba % self.logical.sectors_per_track;
        let lba = lba / self.logical.sectors_per_track;
        let head = lba % self.logical.heads;
        let cylinder = lba / self.logical.heads;

        Chs {
            cylinder: cylinder.min(u32::from(u16::MAX)) as u16,
            head: head as u8,
            sector: sector as u8,
        }
    }
}
