use crate::defs::{
    DeviceControl, ErrorBits, Status, DEVICE_HEAD_DEV, DEVICE_HEAD_DEV_SHIFT,
    DEVICE_HEAD_HEAD_MASK, DEVICE_HEAD_LBA,
};

/// The register file shared by both devices on a channel.
///
/// Only one device is selected at a time (Device/Head bit 4), so real
/// hardware exposes a single set of registers per channel as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtaRegisters {
    pub status: Status,
    pub error: ErrorBits,
    pub features: u8,
    pub sector_count: u8,
    pub sector_number: u8,
    pub cylinder: u16,
    pub device_head: u8,
    pub control: DeviceControl,
}

impl Default for AtaRegisters {
    fn default() -> Self {
        Self {
            status: Status::DRDY,
            error: ErrorBits::empty(),
            features: 0,
            sector_count: 0,
            sector_number: 0,
            cylinder: 0,
            device_head: 0,
            control: DeviceControl::empty(),
        }
    }
}

impl AtaRegisters {
    pub fn selected_device_index(&self) -> usize {
        usize::from((self.device_head & DEVICE_HEAD_DEV) >> DEVICE_HEAD_DEV_SHIFT)
    }

    pub fn interrupts_enabled(&self) -> bool {
        !self.control.contains(DeviceControl::NIEN)
    }

    pub fn uses_lba(&self) -> bool {
        self.device_head & DEVICE_HEAD_LBA != 0
    }

    pub fn head(&self) -> u8 {
        self.device_head & DEVICE_HEAD_HEAD_MASK
    }

    /// LBA bits 27:0 as laid out across Device/Head, Cylinder and Sector Number.
    pub fn lba28(&self) -> u32 {
        (u32::from(self.head()) << 24) | (u32::from(self.cylinder) << 8) | u32::from(self.sector_number)
    }

    /// Rewrites the DEV bit to name `device_index`.
    ///
    /// Most command epilogues require DEV to indicate the selected device.
    pub fn set_device_bits(&mut self, device_index: usize) {
        self.device_head = (self.device_head & !DEVICE_HEAD_DEV)
            | (((device_index as u8) & 1) << DEVICE_HEAD_DEV_SHIFT);
    }

    /// [9.1] Writes the signature left behind by a reset or by Identify Device
    /// against a device that implements the PACKET command feature set.
    pub fn write_signature(&mut self, packet_feature_set: bool) {
        self.sector_count = 1;
        self.sector_number = 1;
        if packet_feature_set {
            self.cylinder = 0xEB14;
            self.device_head = 0x10;
        } else {
            self.cylinder = 0;
            self.device_head = 0;
        }
    }

    /// Sets ERR iff the Error register holds a non-zero value.
    pub fn sync_error_status(&mut self) {
        self.status.set(Status::ERR, !self.error.is_empty());
    }
}
