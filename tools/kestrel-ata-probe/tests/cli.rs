#![cfg(not(target_arch = "wasm32"))]

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn identify_dummy_hard_drive() {
    cargo_bin_cmd!("kestrel-ata-probe")
        .args(["--dummy", "identify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Kestrel DHDD0010000"))
        .stdout(predicate::str::contains("20480/16/63 (current 0/0/0)"))
        .stdout(predicate::str::contains("(locked)"));
}

#[test]
fn identify_json_output() {
    let output = cargo_bin_cmd!("kestrel-ata-probe")
        .args(["--dummy", "--json", "identify"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["command"], "identify-device");
    assert_eq!(report["status"], 0x40);
    assert_eq!(report["identify"]["serial"], "0123456789");
    assert_eq!(report["identify"]["addressable_sectors"], 20480 * 16 * 63);
}

#[test]
fn identify_on_a_dvd_reports_the_abort() {
    cargo_bin_cmd!("kestrel-ata-probe")
        .args(["--dvd", "--channel", "secondary", "identify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("identify-device failed"));

    cargo_bin_cmd!("kestrel-ata-probe")
        .args(["--dvd", "--channel", "secondary", "identify", "--packet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0x8580"));
}

#[test]
fn read_sectors_from_an_image() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("disk.img");
    let mut data = vec![0u8; 64 * 512];
    data[3 * 512..4 * 512].fill(0xC3);
    fs::write(&image, &data).unwrap();
    let out = dir.path().join("sector.bin");

    cargo_bin_cmd!("kestrel-ata-probe")
        .args([
            "--image",
            image.to_str().unwrap(),
            "read",
            "--lba",
            "3",
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("sectors:  1"));

    assert_eq!(fs::read(&out).unwrap(), vec![0xC3u8; 512]);
}

#[test]
fn read_past_the_end_of_an_image_fails() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("disk.img");
    fs::write(&image, vec![0u8; 8 * 512]).unwrap();

    cargo_bin_cmd!("kestrel-ata-probe")
        .args(["--image", image.to_str().unwrap(), "read", "--lba", "8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read-dma failed"));
}

#[test]
fn unlock_clears_the_locked_bit() {
    cargo_bin_cmd!("kestrel-ata-probe")
        .args(["--dummy", "unlock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("security: 0x0003"));
}

#[test]
fn set_mode_selects_ultra_dma() {
    cargo_bin_cmd!("kestrel-ata-probe")
        .args(["--dummy", "set-mode", "udma2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("udma:     0x0407"));

    cargo_bin_cmd!("kestrel-ata-probe")
        .args(["--dummy", "set-mode", "udma5"])
        .assert()
        .failure();
}

#[test]
fn config_file_selects_the_drive() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("ata.json");
    fs::write(
        &config,
        r#"{ "primary": { "slave": { "type": "dummy_hard_drive" } } }"#,
    )
    .unwrap();

    cargo_bin_cmd!("kestrel-ata-probe")
        .args(["--config", config.to_str().unwrap(), "--device", "1", "identify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Kestrel DHDD0010000"));

    cargo_bin_cmd!("kestrel-ata-probe")
        .args(["--config", config.to_str().unwrap(), "identify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no device attached"));
}

#[test]
fn a_drive_source_is_required() {
    cargo_bin_cmd!("kestrel-ata-probe")
        .arg("identify")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no drive configured"));
}
