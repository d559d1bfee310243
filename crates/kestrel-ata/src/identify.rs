//! The 256-word structures returned by Identify Device and Identify Packet Device.

use crate::defs::SECTOR_SIZE;

/// Word offsets into the Identify Device / Identify Packet Device data.
pub mod word {
    pub const GENERAL_CONFIGURATION: usize = 0;
    pub const LOGICAL_CYLINDERS: usize = 1;
    pub const LOGICAL_HEADS: usize = 3;
    pub const LOGICAL_SECTORS_PER_TRACK: usize = 6;
    pub const SERIAL_NUMBER: usize = 10;
    pub const FIRMWARE_REVISION: usize = 23;
    pub const MODEL_NUMBER: usize = 27;
    pub const CAPABILITIES: usize = 49;
    pub const VALID_TRANSLATION: usize = 53;
    pub const CURRENT_CYLINDERS: usize = 54;
    pub const CURRENT_HEADS: usize = 55;
    pub const CURRENT_SECTORS_PER_TRACK: usize = 56;
    pub const CURRENT_CAPACITY: usize = 57;
    pub const ADDRESSABLE_SECTORS: usize = 60;
    pub const MULTIWORD_DMA: usize = 63;
    pub const ADVANCED_PIO_MODES: usize = 64;
    pub const MIN_MDMA_CYCLE: usize = 65;
    pub const RECOMMENDED_MDMA_CYCLE: usize = 66;
    pub const MIN_PIO_CYCLE: usize = 67;
    pub const MIN_PIO_CYCLE_IORDY: usize = 68;
    pub const QUEUE_DEPTH: usize = 75;
    pub const MAJOR_VERSION: usize = 80;
    pub const MINOR_VERSION: usize = 81;
    pub const COMMAND_SETS_SUPPORTED_1: usize = 82;
    pub const COMMAND_SETS_SUPPORTED_2: usize = 83;
    pub const COMMAND_SETS_SUPPORTED_3: usize = 84;
    pub const COMMAND_SETS_ENABLED_1: usize = 85;
    pub const COMMAND_SETS_ENABLED_2: usize = 86;
    pub const COMMAND_SETS_ENABLED_3: usize = 87;
    pub const ULTRA_DMA: usize = 88;
    pub const SECURITY_STATUS: usize = 128;
}

// Word 0. Hard drives report bit 15 set, matching the layout the Xbox kernel
// was observed to accept.
pub const GENERAL_CONFIG_HARD_DRIVE: u16 = 1 << 15;
pub const GENERAL_CONFIG_ATAPI_DEVICE: u16 = 0b10 << 14;
pub const GENERAL_CONFIG_CDROM_COMMAND_SET: u16 = 0x05 << 8;
pub const GENERAL_CONFIG_REMOVABLE_MEDIA: u16 = 1 << 7;
// Bits 6:5 = 00 (DRQ within 3 ms) and bits 1:0 = 00 (12-byte packets).
pub const GENERAL_CONFIG_DRQ_IN_3MS: u16 = 0;
pub const GENERAL_CONFIG_12_BYTE_PACKETS: u16 = 0;

// Word 49.
pub const CAPS_DMA: u16 = 1 << 8;
pub const CAPS_LBA: u16 = 1 << 9;
pub const CAPS_IORDY: u16 = 1 << 11;

// Word 53.
pub const VALID_CHS: u16 = 1 << 0;
pub const VALID_TRANSFER_CYCLES: u16 = 1 << 1;
pub const VALID_ULTRA_DMA: u16 = 1 << 2;

// Words 63 and 88: supported modes in the low byte, selected mode in the high byte.
pub const DMA_MODES_0_TO_2_SUPPORTED: u16 = 0b111;
pub const DMA_MODE_0_SELECTED: u16 = 1 << 8;

// Word 64: PIO modes 3 and 4.
pub const ADVANCED_PIO_MODES_3_4: u16 = 0b11;
pub const MIN_CYCLE_TIME_NS: u16 = 120;

// Word 80.
pub const MAJOR_VERSION_ATA1: u16 = 1 << 1;
pub const MAJOR_VERSION_ATA2: u16 = 1 << 2;
pub const MAJOR_VERSION_ATA3: u16 = 1 << 3;
pub const MAJOR_VERSION_ATAPI4: u16 = 1 << 4;
// Word 81: ATA/ATAPI-4 T13 1153D revision 17.
pub const MINOR_VERSION_ATAPI4_REV17: u16 = 0x0017;

// Words 82 and 85.
pub const CMD_SET_POWER_MANAGEMENT: u16 = 1 << 3;
pub const CMD_SET_PACKET: u16 = 1 << 4;
pub const CMD_SET_WRITE_CACHE: u16 = 1 << 5;
pub const CMD_SET_LOOK_AHEAD: u16 = 1 << 6;
pub const CMD_SET_DEVICE_RESET: u16 = 1 << 9;
// Words 83, 84, 86 and 87: bit 14 shall be one, bit 15 zero.
pub const CMD_SET_BIT14_ALWAYS_ONE: u16 = 1 << 14;

// Word 128.
pub const SECURITY_SUPPORTED: u16 = 1 << 0;
pub const SECURITY_ENABLED: u16 = 1 << 1;
pub const SECURITY_LOCKED: u16 = 1 << 2;

pub const IDENTIFY_WORDS: usize = SECTOR_SIZE / 2;

/// Identify data as 256 host-order words.
///
/// Transferred to the host little-endian, one word per two Data register bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentifyData {
    words: [u16; IDENTIFY_WORDS],
}

impl Default for IdentifyData {
    fn default() -> Self {
        Self {
            words: [0; IDENTIFY_WORDS],
        }
    }
}

impl std::fmt::Debug for IdentifyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifyData")
            .field("general_configuration", &self.word(word::GENERAL_CONFIGURATION))
            .field("model_number", &self.model_number())
            .field("serial_number", &self.serial_number())
            .field("firmware_revision", &self.firmware_revision())
            .finish_non_exhaustive()
    }
}

impl IdentifyData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8; SECTOR_SIZE]) -> Self {
        let mut data = Self::new();
        for (word, chunk) in data.words.iter_mut().zip(bytes.chunks_exact(2)) {
            *word = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
        data
    }

    pub fn to_bytes(&self) -> [u8; SECTOR_SIZE] {
        let mut out = [0u8; SECTOR_SIZE];
        for (chunk, word) in out.chunks_exact_mut(2).zip(self.words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub fn words(&self) -> &[u16; IDENTIFY_WORDS] {
        &self.words
    }

    pub fn word(&self, index: usize) -> u16 {
        self.words[index]
    }

    pub fn set_word(&mut self, index: usize, value: u16) {
        self.words[index] = value;
    }

    /// Reads a 32-bit value stored low word first.
    pub fn dword(&self, index: usize) -> u32 {
        u32::from(self.words[index]) | (u32::from(self.words[index + 1]) << 16)
    }

    pub fn set_dword(&mut self, index: usize, value: u32) {
        self.words[index] = value as u16;
        self.words[index + 1] = (value >> 16) as u16;
    }

    /// Stores `src` as a space-padded ATA string of `byte_len` bytes.
    ///
    /// ATA strings put the first character of each pair in the high byte of
    /// the word, so a little-endian dump shows every pair swapped.
    pub fn set_string(&mut self, index: usize, byte_len: usize, src: &str) {
        let mut bytes = vec![b' '; byte_len];
        let src_bytes = src.as_bytes();
        let copy_len = src_bytes.len().min(byte_len);
        bytes[..copy_len].copy_from_slice(&src_bytes[..copy_len]);

        for (i, pair) in bytes.chunks_exact(2).enumerate() {
            self.words[index + i] = u16::from_be_bytes([pair[0], pair[1]]);
        }
    }

    /// Decodes an ATA string, dropping the trailing padding.
    pub fn string(&self, index: usize, byte_len: usize) -> String {
        let bytes: Vec<u8> = self.words[index..index + byte_len / 2]
            .iter()
            .flat_map(|w| w.to_be_bytes())
            .collect();
        String::from_utf8_lossy(&bytes).trim_end().to_string()
    }

    pub fn serial_number(&self) -> String {
        self.string(word::SERIAL_NUMBER, crate::defs::SERIAL_NUMBER_LEN)
    }

    pub fn firmware_revision(&self) -> String {
        self.string(word::FIRMWARE_REVISION, crate::defs::FIRMWARE_REVISION_LEN)
    }

    pub fn model_number(&self) -> String {
        self.string(word::MODEL_NUMBER, crate::defs::MODEL_NUMBER_LEN)
    }

    pub fn logical_cylinders(&self) -> u16 {
        self.words[word::LOGICAL_CYLINDERS]
    }

    pub fn logical_heads(&self) -> u16 {
        self.words[word::LOGICAL_HEADS]
    }

    pub fn logical_sectors_per_track(&self) -> u16 {
        self.words[word::LOGICAL_SECTORS_PER_TRACK]
    }

    pub fn current_cylinders(&self) -> u16 {
        self.words[word::CURRENT_CYLINDERS]
    }

    pub fn current_heads(&self) -> u16 {
        self.words[word::CURRENT_HEADS]
    }

    pub fn current_sectors_per_track(&self) -> u16 {
        self.words[word::CURRENT_SECTORS_PER_TRACK]
    }

    pub fn current_capacity(&self) -> u32 {
        self.dword(word::CURRENT_CAPACITY)
    }

    pub fn addressable_sectors(&self) -> u32 {
        self.dword(word::ADDRESSABLE_SECTORS)
    }

    pub fn multiword_dma(&self) -> u16 {
        self.words[word::MULTIWORD_DMA]
    }

    pub fn ultra_dma(&self) -> u16 {
        self.words[word::ULTRA_DMA]
    }

    pub fn security_status(&self) -> u16 {
        self.words[word::SECURITY_STATUS]
    }

    pub fn is_locked(&self) -> bool {
        self.security_status() & SECURITY_LOCKED != 0
    }
}
