mod common;

use std::fs;
use std::io::Write;

use common::*;
use kestrel_ata::{AtaConfig, AtaController, ChannelId, DmaTransferResult, NoIrq, Opcode};

fn image_file(sectors: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let mut data = vec![0u8; sectors * 512];
    for (n, sector) in data.chunks_exact_mut(512).enumerate() {
        sector[..4].copy_from_slice(&(n as u32).to_le_bytes());
    }
    file.write_all(&data).unwrap();
    file.flush().unwrap();
    file
}

fn controller_for(image: &tempfile::NamedTempFile) -> AtaController {
    let json = serde_json::json!({
        "primary": { "master": { "type": "image_hard_drive", "path": image.path() } }
    });
    let config = AtaConfig::from_json_str(&json.to_string()).unwrap();
    AtaController::from_config(&config, Box::new(NoIrq), Box::new(NoIrq)).unwrap()
}

#[test]
fn identify_reports_image_geometry() {
    // 2 MiB: 4096 sectors on 16 heads x 63 sectors.
    let image = image_file(4096);
    let mut ctrl = controller_for(&image);

    let data = identify(&mut ctrl);
    assert_eq!(data.model_number(), "Kestrel VHDD0010000");
    assert_eq!(data.serial_number(), "9876543210");
    assert_eq!(data.addressable_sectors(), 4096);
    assert_eq!(data.logical_heads(), 16);
    assert_eq!(data.logical_sectors_per_track(), 63);
    assert_eq!(data.logical_cylinders(), 4);
}

#[test]
fn reads_come_from_the_image_file() {
    let image = image_file(256);
    let mut ctrl = controller_for(&image);

    set_lba(&mut ctrl, 200, 2);
    command(&mut ctrl, Opcode::ReadDma);
    let mut buf = [0u8; 1024];
    assert_eq!(ctrl.read_dma(ChannelId::Primary, &mut buf), DmaTransferResult::End);
    assert_eq!(buf[..4], 200u32.to_le_bytes());
    assert_eq!(buf[512..516], 201u32.to_le_bytes());
}

#[test]
fn writes_reach_the_image_file() {
    let image = image_file(256);
    let mut ctrl = controller_for(&image);

    set_lba(&mut ctrl, 7, 1);
    command(&mut ctrl, Opcode::WriteDma);
    assert_eq!(ctrl.write_dma(ChannelId::Primary, &[0x5Au8; 512]), DmaTransferResult::End);

    let contents = fs::read(image.path()).unwrap();
    assert!(contents[7 * 512..8 * 512].iter().all(|&b| b == 0x5A));
    assert_eq!(contents[8 * 512..8 * 512 + 4], 8u32.to_le_bytes());
    assert_eq!(contents.len(), 256 * 512);
}

#[test]
fn missing_image_fails_to_build_the_controller() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AtaConfig::default();
    config.primary.master = kestrel_ata::DriveConfig::ImageHardDrive {
        path: dir.path().join("absent.img"),
    };

    let err = AtaController::from_config(&config, Box::new(NoIrq), Box::new(NoIrq)).err().unwrap();
    assert!(matches!(err, kestrel_ata::ConfigError::Disk { .. }));
}

#[test]
fn config_loads_from_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ata.json");
    fs::write(
        &path,
        r#"{ "secondary": { "master": { "type": "dummy_dvd" }, "slave": { "type": "dummy_hard_drive" } } }"#,
    )
    .unwrap();

    let config = AtaConfig::load(&path).unwrap();
    let ctrl = AtaController::from_config(&config, Box::new(NoIrq), Box::new(NoIrq)).unwrap();
    let secondary = ctrl.channel(ChannelId::Secondary);
    assert!(secondary.device(0).driver().supports_packet_commands());
    assert!(secondary.device(1).is_attached());
    assert!(!ctrl.channel(ChannelId::Primary).device(0).is_attached());
}
