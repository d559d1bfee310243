mod common;

use common::*;
use kestrel_ata::defs::ErrorBits;
use kestrel_ata::{ChannelId, DvdDrive, HardDrive, IdentifyData, Opcode, Status};

#[test]
fn srst_discards_a_pio_transfer_mid_block() {
    let (mut ctrl, _) = primary_master(Box::new(HardDrive::dummy()));
    command(&mut ctrl, Opcode::IdentifyDevice);
    for _ in 0..100 {
        ctrl.io_read(DATA, 2);
    }

    ctrl.io_write(CONTROL, 1, 0x04);
    ctrl.io_write(CONTROL, 1, 0x00);

    assert!(!ctrl.channel(ChannelId::Primary).is_command_in_progress());
    assert_eq!(status(&mut ctrl), Status::DRDY.bits());
    assert_eq!(ctrl.io_read(DATA, 2), 0);

    // A fresh command starts from word 0 again.
    let data = identify(&mut ctrl);
    assert_eq!(data.word(0), 0x8000);
    assert_eq!(data.model_number(), "Kestrel DHDD0010000");
}

#[test]
fn setting_nien_lowers_a_pending_interrupt() {
    let (mut ctrl, irq) = primary_master(Box::new(HardDrive::dummy()));
    command(&mut ctrl, Opcode::IdentifyDevice);
    assert_eq!(irq.events(), vec![(14, true)]);

    ctrl.io_write(CONTROL, 1, 0x02);
    assert_eq!(irq.events(), vec![(14, true), (14, false)]);
    assert!(!ctrl.channel(ChannelId::Primary).interrupt_asserted());
}

#[test]
fn device_reset_is_rejected_by_hard_drives() {
    let (mut ctrl, irq) = primary_master(Box::new(HardDrive::dummy()));
    command(&mut ctrl, Opcode::DeviceReset);

    assert_eq!(irq.events(), vec![(14, true)]);
    assert_eq!(status(&mut ctrl), (Status::DRDY | Status::ERR).bits());
    assert_eq!(error(&mut ctrl), ErrorBits::ABRT.bits());
}

#[test]
fn device_reset_restores_the_packet_signature() {
    let (mut ctrl, irq) = primary_master(Box::new(DvdDrive::dummy()));
    ctrl.io_write(SECTOR_COUNT, 1, 0x55);
    ctrl.io_write(CYLINDER_LOW, 1, 0x66);
    command(&mut ctrl, Opcode::DeviceReset);

    assert!(irq.events().is_empty());
    assert_eq!(status(&mut ctrl), Status::DRDY.bits());
    assert_eq!(error(&mut ctrl), 0x01);
    assert_eq!(ctrl.io_read(SECTOR_COUNT, 1), 0x01);
    assert_eq!(ctrl.io_read(SECTOR_NUMBER, 1), 0x01);
    assert_eq!(ctrl.io_read(CYLINDER_LOW, 1), 0x14);
    assert_eq!(ctrl.io_read(CYLINDER_HIGH, 1), 0xEB);
}

#[test]
fn packet_commands_complete_with_check_condition() {
    let (mut ctrl, irq) = primary_master(Box::new(DvdDrive::dummy()));
    command(&mut ctrl, Opcode::Packet);

    assert_eq!(alt_status(&mut ctrl), (Status::DRDY | Status::DRQ).bits());
    assert_eq!(ctrl.io_read(SECTOR_COUNT, 1), 0x01);
    assert!(irq.events().is_empty());

    // TEST UNIT READY
    for _ in 0..6 {
        ctrl.io_write(DATA, 2, 0);
    }

    assert_eq!(irq.events(), vec![(14, true)]);
    assert_eq!(status(&mut ctrl), (Status::DRDY | Status::ERR).bits());
    assert_eq!(error(&mut ctrl), (0x05 << 4) | ErrorBits::ABRT.bits());
    assert_eq!(ctrl.io_read(SECTOR_COUNT, 1), 0x03);
    assert!(!ctrl.channel(ChannelId::Primary).is_command_in_progress());
}

#[test]
fn packet_command_is_aborted_by_hard_drives() {
    let (mut ctrl, _) = primary_master(Box::new(HardDrive::dummy()));
    command(&mut ctrl, Opcode::Packet);

    assert_eq!(status(&mut ctrl), (Status::DRDY | Status::ERR).bits());
    assert_eq!(error(&mut ctrl), ErrorBits::ABRT.bits());
}

#[test]
fn security_unlock_accepts_one_password_block() {
    let (mut ctrl, irq) = primary_master(Box::new(HardDrive::dummy()));
    assert!(identify(&mut ctrl).is_locked());
    irq.clear();

    command(&mut ctrl, Opcode::SecurityUnlock);
    assert_eq!(alt_status(&mut ctrl), (Status::DRDY | Status::DRQ).bits());
    assert!(irq.events().is_empty());

    let mut password = [0u8; 512];
    password[2..10].copy_from_slice(b"password");
    write_block(&mut ctrl, &password);

    assert_eq!(irq.events(), vec![(14, true)]);
    assert_eq!(status(&mut ctrl), Status::DRDY.bits());
    assert!(!ctrl.channel(ChannelId::Primary).is_command_in_progress());

    let data = identify(&mut ctrl);
    assert!(!data.is_locked());
    assert_eq!(data.security_status(), 0b011);
}

#[test]
fn unknown_opcode_is_aborted() {
    let (mut ctrl, irq) = primary_master(Box::new(HardDrive::dummy()));
    // READ SECTORS is not implemented.
    ctrl.io_write(STATUS_COMMAND, 1, 0x20);

    assert_eq!(irq.events(), vec![(14, true)]);
    assert_eq!(status(&mut ctrl), (Status::DRDY | Status::ERR).bits());
    assert_eq!(error(&mut ctrl), ErrorBits::ABRT.bits());
    assert!(!ctrl.channel(ChannelId::Primary).is_command_in_progress());
}

#[test]
fn a_second_command_does_not_disturb_the_first() {
    let (mut ctrl, _) = primary_master(Box::new(HardDrive::dummy()));
    command(&mut ctrl, Opcode::IdentifyDevice);
    command(&mut ctrl, Opcode::SetFeatures);

    assert_eq!(
        ctrl.channel(ChannelId::Primary).current_opcode(),
        Some(Opcode::IdentifyDevice)
    );
    let data = IdentifyData::from_bytes(&read_block(&mut ctrl));
    assert_eq!(data.serial_number(), "0123456789");
}

#[test]
fn registers_of_an_absent_slave_read_zero() {
    let (mut ctrl, _) = primary_master(Box::new(HardDrive::dummy()));
    ctrl.io_write(SECTOR_COUNT, 1, 0x12);
    ctrl.io_write(DEVICE_HEAD, 1, 0xB0);

    assert_eq!(ctrl.io_read(SECTOR_COUNT, 1), 0);
    assert_eq!(ctrl.io_read(DEVICE_HEAD, 1), 0);
    assert_eq!(status(&mut ctrl), Status::DRDY.bits());
}

#[test]
fn probing_an_absent_slave_leaves_the_master_usable() {
    let (mut ctrl, irq) = primary_master(Box::new(HardDrive::dummy()));
    ctrl.io_write(DEVICE_HEAD, 1, 0xB0);
    command(&mut ctrl, Opcode::IdentifyDevice);

    assert!(!ctrl.channel(ChannelId::Primary).is_command_in_progress());
    assert_eq!(irq.events(), vec![(14, true)]);
    assert_eq!(status(&mut ctrl), (Status::DRDY | Status::ERR).bits());
    // The error register itself reads as zero through the empty slot.
    assert_eq!(ctrl.channel(ChannelId::Primary).registers().error, ErrorBits::ABRT);
    assert!(read_block(&mut ctrl).iter().all(|&b| b == 0));

    ctrl.io_write(DEVICE_HEAD, 1, 0xA0);
    let data = identify(&mut ctrl);
    assert_eq!(status(&mut ctrl), Status::DRDY.bits());
    assert_eq!(data.serial_number(), "0123456789");
    assert!(!ctrl.channel(ChannelId::Primary).is_command_in_progress());
}
