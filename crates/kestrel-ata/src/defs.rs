//! Register layout, bit definitions and limits from ATA/ATAPI-4 (T13 1153D).

use bitflags::bitflags;

pub use kestrel_storage::SECTOR_SIZE;

/// [6.2.1] Largest cylinder number addressable through CHS translation.
pub const MAX_CYLINDERS: u32 = 16383;
pub const MAX_HEADS: u32 = 16;
pub const MAX_SECTORS_PER_TRACK: u32 = 63;
pub const MAX_CHS_SECTOR_CAPACITY: u32 = MAX_CYLINDERS * MAX_HEADS * MAX_SECTORS_PER_TRACK;

/// 28-bit LBA addressing limit.
pub const MAX_LBA_SECTOR_CAPACITY: u32 = 1 << 28;

/// Highest PIO mode accepted with IORDY flow control.
pub const MAX_PIO_TRANSFER_MODE: u8 = 4;
/// Highest PIO mode accepted for the default PIO transfer type.
pub const MAX_PIO_DEFAULT_TRANSFER_MODE: u8 = 1;
pub const MAX_MULTIWORD_DMA_TRANSFER_MODE: u8 = 2;

pub const SERIAL_NUMBER_LEN: usize = 20;
pub const FIRMWARE_REVISION_LEN: usize = 8;
pub const MODEL_NUMBER_LEN: usize = 40;

/// Primary or secondary IDE channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Primary = 0,
    Secondary = 1,
}

impl ChannelId {
    pub const ALL: [ChannelId; 2] = [ChannelId::Primary, ChannelId::Secondary];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelId::Primary => f.write_str("primary"),
            ChannelId::Secondary => f.write_str("secondary"),
        }
    }
}

/// Command block registers, by offset from the command block base port.
///
/// Several offsets name a different register depending on the access direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Data = 0,
    /// Error (read) / Features (write).
    ErrorFeatures = 1,
    SectorCount = 2,
    SectorNumber = 3,
    CylinderLow = 4,
    CylinderHigh = 5,
    DeviceHead = 6,
    /// Status (read) / Command (write).
    StatusCommand = 7,
}

impl Register {
    pub fn from_offset(offset: u16) -> Option<Self> {
        Some(match offset {
            0 => Register::Data,
            1 => Register::ErrorFeatures,
            2 => Register::SectorCount,
            3 => Register::SectorNumber,
            4 => Register::CylinderLow,
            5 => Register::CylinderHigh,
            6 => Register::DeviceHead,
            7 => Register::StatusCommand,
            _ => return None,
        })
    }

    /// Whether an access of `size` bytes is legal for this register.
    ///
    /// [7.7] Only the Data register may be accessed 16 or 32 bits at a time.
    pub fn accepts_size(self, size: u8) -> bool {
        match self {
            Register::Data => matches!(size, 1 | 2 | 4),
            _ => size == 1,
        }
    }
}

bitflags! {
    /// [7.15] Status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u8 {
        const BSY = 0x80;
        const DRDY = 0x40;
        /// Device Fault. Reported as DMA Ready by packet devices.
        const DF = 0x20;
        /// Device Seek Complete. Reported as Service by packet devices.
        const DSC = 0x10;
        const DRQ = 0x08;
        const CORR = 0x04;
        const IDX = 0x02;
        /// Error. Reported as Check Condition by packet devices.
        const ERR = 0x01;
    }
}

bitflags! {
    /// [7.11] Error register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ErrorBits: u8 {
        /// Interface CRC error (Ultra DMA).
        const ICRC = 0x80;
        const UNC = 0x40;
        const MC = 0x20;
        const IDNF = 0x10;
        const MCR = 0x08;
        const ABRT = 0x04;
        const NM = 0x02;
    }
}

/// Packet devices report a sense key in the upper nibble of the Error register.
pub const SENSE_KEY_SHIFT: u8 = 4;
pub const SENSE_KEY_ILLEGAL_REQUEST: u8 = 0x05;

bitflags! {
    /// [7.9] Device Control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeviceControl: u8 {
        const SRST = 0x04;
        const NIEN = 0x02;
    }
}

/// [7.10] Device/Head register: LBA addressing when set.
pub const DEVICE_HEAD_LBA: u8 = 0x40;
/// [7.10] Device/Head register: selects device 1 when set.
pub const DEVICE_HEAD_DEV: u8 = 0x10;
pub const DEVICE_HEAD_DEV_SHIFT: u8 = 4;
/// Head number in CHS mode, LBA bits 27:24 in LBA mode.
pub const DEVICE_HEAD_HEAD_MASK: u8 = 0x0F;

/// Sector Count register bits for the Packet protocol, where it is called the
/// Interrupt Reason register.
pub const PACKET_INTR_COMMAND_OR_DATA: u8 = 0x01;
pub const PACKET_INTR_IO_DIRECTION: u8 = 0x02;
pub const PACKET_INTR_BUS_RELEASE: u8 = 0x04;

/// Features register bits for the Packet command.
pub const PACKET_FEATURE_DMA: u8 = 0x01;
pub const PACKET_FEATURE_OVERLAPPED: u8 = 0x02;

/// [8.37] Set Features subcommands.
pub const SET_FEATURES_SET_TRANSFER_MODE: u8 = 0x03;

/// Commands understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    DeviceReset = 0x08,
    InitializeDeviceParameters = 0x91,
    Packet = 0xA0,
    IdentifyPacketDevice = 0xA1,
    ReadDma = 0xC8,
    WriteDma = 0xCA,
    IdentifyDevice = 0xEC,
    SetFeatures = 0xEF,
    SecurityUnlock = 0xF2,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x08 => Opcode::DeviceReset,
            0x91 => Opcode::InitializeDeviceParameters,
            0xA0 => Opcode::Packet,
            0xA1 => Opcode::IdentifyPacketDevice,
            0xC8 => Opcode::ReadDma,
            0xCA => Opcode::WriteDma,
            0xEC => Opcode::IdentifyDevice,
            0xEF => Opcode::SetFeatures,
            0xF2 => Opcode::SecurityUnlock,
            other => return Err(other),
        })
    }
}

/// [9] Command protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    DeviceReset,
    PioDataIn,
    PioDataOut,
    NonData,
    Dma,
    Packet,
}

/// Register effects each protocol produces when a command completes its first phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolInfo {
    pub status_asserted_on_success: Status,
    pub status_negated_on_error: Status,
    pub assert_intrq_on_success: bool,
}

impl Protocol {
    pub const fn info(self) -> ProtocolInfo {
        match self {
            Protocol::DeviceReset => ProtocolInfo {
                status_asserted_on_success: Status::empty(),
                status_negated_on_error: Status::empty(),
                assert_intrq_on_success: false,
            },
            Protocol::PioDataIn => ProtocolInfo {
                status_asserted_on_success: Status::DRQ,
                status_negated_on_error: Status::empty(),
                assert_intrq_on_success: true,
            },
            Protocol::PioDataOut => ProtocolInfo {
                status_asserted_on_success: Status::DRQ,
                status_negated_on_error: Status::empty(),
                assert_intrq_on_success: false,
            },
            Protocol::NonData => ProtocolInfo {
                status_asserted_on_success: Status::empty(),
                status_negated_on_error: Status::empty(),
                assert_intrq_on_success: true,
            },
            Protocol::Dma => ProtocolInfo {
                status_asserted_on_success: Status::DRQ,
                status_negated_on_error: Status::DRQ,
                assert_intrq_on_success: false,
            },
            Protocol::Packet => ProtocolInfo {
                status_asserted_on_success: Status::DRQ,
                status_negated_on_error: Status::empty(),
                assert_intrq_on_success: false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PioTransferType {
    #[default]
    Default,
    FlowControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DmaTransferType {
    #[default]
    MultiwordDma,
    UltraDma,
}

/// A Set Transfer Mode request decoded from the Sector Count register.
///
/// [8.37.10] The upper five bits select the transfer type, the lower three the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Pio(PioTransferType, u8),
    Dma(DmaTransferType, u8),
}

impl TransferMode {
    pub fn decode(sector_count: u8) -> Option<Self> {
        let mode = sector_count & 0b111;
        Some(match (sector_count >> 3) & 0b1_1111 {
            0b00000 => TransferMode::Pio(PioTransferType::Default, mode),
            0b00001 => TransferMode::Pio(PioTransferType::FlowControl, mode),
            0b00100 => TransferMode::Dma(DmaTransferType::MultiwordDma, mode),
            0b01000 => TransferMode::Dma(DmaTransferType::UltraDma, mode),
            _ => return None,
        })
    }

    pub fn encode(self) -> u8 {
        let (bits, mode) = match self {
            TransferMode::Pio(PioTransferType::Default, mode) => (0b00000, mode),
            TransferMode::Pio(PioTransferType::FlowControl, mode) => (0b00001, mode),
            TransferMode::Dma(DmaTransferType::MultiwordDma, mode) => (0b00100, mode),
            TransferMode::Dma(DmaTransferType::UltraDma, mode) => (0b01000, mode),
        };
        (bits << 3) | (mode & 0b111)
    }
}

/// Outcome of a DMA data-phase call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaTransferResult {
    /// Data moved; the transfer continues.
    Ok,
    /// Data moved and the transfer is complete.
    End,
    /// The transfer failed, or there is no DMA command in progress.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_roundtrips_through_u8() {
        for op in [
            Opcode::DeviceReset,
            Opcode::InitializeDeviceParameters,
            Opcode::Packet,
            Opcode::IdentifyPacketDevice,
            Opcode::ReadDma,
            Opcode::WriteDma,
            Opcode::IdentifyDevice,
            Opcode::SetFeatures,
            Opcode::SecurityUnlock,
        ] {
            assert_eq!(Opcode::try_from(op as u8), Ok(op));
        }
        assert_eq!(Opcode::try_from(0x20), Err(0x20));
    }

    #[test]
    fn only_data_register_accepts_wide_access() {
        assert!(Register::Data.accepts_size(2));
        assert!(Register::Data.accepts_size(4));
        assert!(!Register::Data.accepts_size(3));
        assert!(Register::StatusCommand.accepts_size(1));
        assert!(!Register::SectorCount.accepts_size(2));
    }

    #[test]
    fn transfer_mode_decodes_type_and_mode() {
        assert_eq!(
            TransferMode::decode(0x0C),
            Some(TransferMode::Pio(PioTransferType::FlowControl, 4))
        );
        assert_eq!(
            TransferMode::decode(0x22),
            Some(TransferMode::Dma(DmaTransferType::MultiwordDma, 2))
        );
        assert_eq!(
            TransferMode::decode(0x42),
            Some(TransferMode::Dma(DmaTransferType::UltraDma, 2))
        );
        // Type 0b00010 is reserved.
        assert_eq!(TransferMode::decode(0x10), None);
        assert_eq!(
            TransferMode::Dma(DmaTransferType::UltraDma, 5).encode(),
            0x45
        );
    }

    #[test]
    fn dma_protocol_negates_drq_on_error() {
        let info = Protocol::Dma.info();
        assert_eq!(info.status_asserted_on_success, Status::DRQ);
        assert_eq!(info.status_negated_on_error, Status::DRQ);
        assert!(!info.assert_intrq_on_success);
        assert!(Protocol::NonData.info().assert_intrq_on_success);
    }
}
