#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use kestrel_ata::{AtaController, AtaDeviceDriver, ChannelId, IdentifyData, IrqHandler, Opcode};

pub const DATA: u16 = 0x1F0;
pub const FEATURES: u16 = 0x1F1;
pub const SECTOR_COUNT: u16 = 0x1F2;
pub const SECTOR_NUMBER: u16 = 0x1F3;
pub const CYLINDER_LOW: u16 = 0x1F4;
pub const CYLINDER_HIGH: u16 = 0x1F5;
pub const DEVICE_HEAD: u16 = 0x1F6;
pub const STATUS_COMMAND: u16 = 0x1F7;
pub const CONTROL: u16 = 0x3F6;

/// IRQ edges seen by a handler, shared with the test body.
#[derive(Clone, Default)]
pub struct IrqLog(Arc<Mutex<Vec<(u8, bool)>>>);

impl IrqLog {
    pub fn handler(&self) -> Box<dyn IrqHandler> {
        let events = self.0.clone();
        Box::new(move |irq, level| events.lock().unwrap().push((irq, level)))
    }

    pub fn events(&self) -> Vec<(u8, bool)> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// A controller with `driver` as primary master, plus the primary IRQ log.
pub fn primary_master(driver: Box<dyn AtaDeviceDriver>) -> (AtaController, IrqLog) {
    let log = IrqLog::default();
    let mut ctrl = AtaController::new(log.handler(), Box::new(kestrel_ata::NoIrq));
    ctrl.attach(ChannelId::Primary, 0, driver);
    (ctrl, log)
}

pub fn status(ctrl: &mut AtaController) -> u8 {
    ctrl.io_read(STATUS_COMMAND, 1) as u8
}

pub fn alt_status(ctrl: &mut AtaController) -> u8 {
    ctrl.io_read(CONTROL, 1) as u8
}

pub fn error(ctrl: &mut AtaController) -> u8 {
    ctrl.io_read(FEATURES, 1) as u8
}

pub fn command(ctrl: &mut AtaController, opcode: Opcode) {
    ctrl.io_write(STATUS_COMMAND, 1, opcode as u32);
}

/// Loads an LBA28 address and sector count for the primary master.
pub fn set_lba(ctrl: &mut AtaController, lba: u32, count: u8) {
    ctrl.io_write(SECTOR_COUNT, 1, u32::from(count));
    ctrl.io_write(SECTOR_NUMBER, 1, lba & 0xFF);
    ctrl.io_write(CYLINDER_LOW, 1, (lba >> 8) & 0xFF);
    ctrl.io_write(CYLINDER_HIGH, 1, (lba >> 16) & 0xFF);
    ctrl.io_write(DEVICE_HEAD, 1, 0xE0 | ((lba >> 24) & 0x0F));
}

/// Issues Initialize Device Parameters for the selected primary device.
/// `heads` is the maximum head number.
pub fn set_translation(ctrl: &mut AtaController, heads: u8, sectors_per_track: u8) {
    ctrl.io_write(SECTOR_COUNT, 1, u32::from(sectors_per_track));
    let dh = ctrl.io_read(DEVICE_HEAD, 1) & 0xF0;
    ctrl.io_write(DEVICE_HEAD, 1, dh | u32::from(heads & 0x0F));
    command(ctrl, Opcode::InitializeDeviceParameters);
}

/// Reads one 512-byte block through the Data register in 16-bit accesses.
pub fn read_block(ctrl: &mut AtaController) -> [u8; 512] {
    let mut block = [0u8; 512];
    for pair in block.chunks_exact_mut(2) {
        let word = ctrl.io_read(DATA, 2) as u16;
        pair.copy_from_slice(&word.to_le_bytes());
    }
    block
}

pub fn write_block(ctrl: &mut AtaController, block: &[u8; 512]) {
    for pair in block.chunks_exact(2) {
        ctrl.io_write(DATA, 2, u32::from(u16::from_le_bytes([pair[0], pair[1]])));
    }
}

pub fn identify(ctrl: &mut AtaController) -> IdentifyData {
    command(ctrl, Opcode::IdentifyDevice);
    IdentifyData::from_bytes(&read_block(ctrl))
}
