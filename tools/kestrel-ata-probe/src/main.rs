use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use kestrel_ata::defs::{
    DmaTransferType, PioTransferType, TransferMode, SECTOR_SIZE, SET_FEATURES_SET_TRANSFER_MODE,
};
use kestrel_ata::{
    AtaConfig, AtaController, AtaPortMap, ChannelId, DmaTransferResult, DriveConfig, IdentifyData,
    NoIrq, Opcode, Register, Status,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "kestrel-ata-probe",
    about = "Issue ATA commands to an emulated IDE device through its I/O ports."
)]
struct Args {
    /// JSON controller configuration
    #[arg(long, value_name = "PATH", conflicts_with_all = ["image", "dummy", "dvd"])]
    config: Option<PathBuf>,

    /// Raw hard drive image to attach at --channel/--device
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dummy", "dvd"])]
    image: Option<PathBuf>,

    /// Attach a dummy hard drive at --channel/--device
    #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "dvd")]
    dummy: bool,

    /// Attach a dummy DVD drive at --channel/--device
    #[arg(long, action = clap::ArgAction::SetTrue)]
    dvd: bool,

    #[arg(long, value_enum, default_value_t = ChannelArg::Primary)]
    channel: ChannelArg,

    /// 0 = master, 1 = slave
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    device: u8,

    /// Print results as JSON
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,

    #[command(subcommand)]
    command: ProbeCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChannelArg {
    Primary,
    Secondary,
}

impl From<ChannelArg> for ChannelId {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Primary => ChannelId::Primary,
            ChannelArg::Secondary => ChannelId::Secondary,
        }
    }
}

#[derive(Subcommand, Debug)]
enum ProbeCommand {
    /// Identify Device (or Identify Packet Device with --packet)
    Identify {
        #[arg(long, action = clap::ArgAction::SetTrue)]
        packet: bool,
    },
    /// Read sectors with Read DMA
    Read {
        #[arg(long, default_value_t = 0)]
        lba: u32,

        /// Sector count (1-256)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=256))]
        count: u16,

        /// Write the sectors here instead of printing a hex dump
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Security Unlock with an all-zero password
    Unlock,
    /// Set Features / Set Transfer Mode, e.g. `pio4`, `mdma2`, `udma2`
    SetMode { mode: ModeArg },
}

#[derive(Debug, Clone, Copy)]
struct ModeArg(TransferMode);

impl FromStr for ModeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| format!("missing mode number in {s:?}"))?;
        let (kind, number) = s.split_at(split);
        let mode: u8 = number
            .parse()
            .map_err(|_| format!("invalid mode number in {s:?}"))?;
        if mode > 7 {
            return Err(format!("mode {mode} does not fit the three-bit mode field"));
        }

        let request = match kind.to_ascii_lowercase().as_str() {
            "pio-default" => TransferMode::Pio(PioTransferType::Default, mode),
            "pio" => TransferMode::Pio(PioTransferType::FlowControl, mode),
            "mdma" => TransferMode::Dma(DmaTransferType::MultiwordDma, mode),
            "udma" => TransferMode::Dma(DmaTransferType::UltraDma, mode),
            other => return Err(format!("unknown transfer type {other:?}")),
        };
        Ok(ModeArg(request))
    }
}

#[derive(Debug, Serialize)]
struct TaskFile {
    status: u8,
    error: u8,
}

impl TaskFile {
    fn failed(&self) -> bool {
        self.status & (Status::ERR | Status::DF).bits() != 0
    }
}

#[derive(Debug, Serialize)]
struct IdentifySummary {
    model: String,
    serial: String,
    firmware: String,
    general_configuration: u16,
    cylinders: u16,
    heads: u16,
    sectors_per_track: u16,
    current_cylinders: u16,
    current_heads: u16,
    current_sectors_per_track: u16,
    addressable_sectors: u32,
    multiword_dma: u16,
    ultra_dma: u16,
    security_status: u16,
    locked: bool,
}

impl From<&IdentifyData> for IdentifySummary {
    fn from(data: &IdentifyData) -> Self {
        Self {
            model: data.model_number(),
            serial: data.serial_number(),
            firmware: data.firmware_revision(),
            general_configuration: data.word(0),
            cylinders: data.logical_cylinders(),
            heads: data.logical_heads(),
            sectors_per_track: data.logical_sectors_per_track(),
            current_cylinders: data.current_cylinders(),
            current_heads: data.current_heads(),
            current_sectors_per_track: data.current_sectors_per_track(),
            addressable_sectors: data.addressable_sectors(),
            multiword_dma: data.multiword_dma(),
            ultra_dma: data.ultra_dma(),
            security_status: data.security_status(),
            locked: data.is_locked(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    command: &'static str,
    #[serde(flatten)]
    task_file: TaskFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    identify: Option<IdentifySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sectors: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

/// Drives one device through the same port sequence a guest driver uses.
struct Probe {
    ctrl: AtaController,
    ports: AtaPortMap,
    channel: ChannelId,
    device: u8,
}

impl Probe {
    fn write_reg(&mut self, reg: Register, value: u8) {
        self.ctrl
            .io_write(self.ports.cmd_base + reg as u16, 1, u32::from(value));
    }

    fn read_reg(&mut self, reg: Register) -> u8 {
        self.ctrl.io_read(self.ports.cmd_base + reg as u16, 1) as u8
    }

    fn select(&mut self, lba_high: u8) {
        let value = 0xA0 | 0x40 | (self.device << 4) | (lba_high & 0x0F);
        self.write_reg(Register::DeviceHead, value);
    }

    fn issue(&mut self, opcode: Opcode) {
        debug!(channel = %self.channel, device = self.device, ?opcode, "issuing command");
        self.write_reg(Register::StatusCommand, opcode as u8);
    }

    fn data_requested(&mut self) -> bool {
        let alt = self.ctrl.io_read(self.ports.ctrl_base, 1) as u8;
        alt & Status::DRQ.bits() != 0
    }

    fn task_file(&mut self) -> TaskFile {
        TaskFile {
            status: self.read_reg(Register::StatusCommand),
            error: self.read_reg(Register::ErrorFeatures),
        }
    }

    fn read_pio_block(&mut self) -> [u8; SECTOR_SIZE] {
        let mut block = [0u8; SECTOR_SIZE];
        for pair in block.chunks_exact_mut(2) {
            let word = self.ctrl.io_read(self.ports.cmd_base, 2) as u16;
            pair.copy_from_slice(&word.to_le_bytes());
        }
        block
    }

    fn write_pio_block(&mut self, block: &[u8; SECTOR_SIZE]) {
        for pair in block.chunks_exact(2) {
            let word = u16::from_le_bytes([pair[0], pair[1]]);
            self.ctrl.io_write(self.ports.cmd_base, 2, u32::from(word));
        }
    }

    fn identify(&mut self, packet: bool) -> (TaskFile, Option<IdentifyData>) {
        self.select(0);
        self.issue(if packet {
            Opcode::IdentifyPacketDevice
        } else {
            Opcode::IdentifyDevice
        });
        if !self.data_requested() {
            return (self.task_file(), None);
        }
        let data = IdentifyData::from_bytes(&self.read_pio_block());
        (self.task_file(), Some(data))
    }

    fn read_dma(&mut self, lba: u32, count: u16) -> (TaskFile, Vec<u8>) {
        self.write_reg(Register::SectorCount, count as u8);
        self.write_reg(Register::SectorNumber, lba as u8);
        self.write_reg(Register::CylinderLow, (lba >> 8) as u8);
        self.write_reg(Register::CylinderHigh, (lba >> 16) as u8);
        self.select((lba >> 24) as u8);
        self.issue(Opcode::ReadDma);

        let mut data = Vec::with_capacity(usize::from(count) * SECTOR_SIZE);
        if self.data_requested() {
            loop {
                let mut sector = [0u8; SECTOR_SIZE];
                let result = self.ctrl.read_dma(self.channel, &mut sector);
                if result != DmaTransferResult::Error {
                    data.extend_from_slice(&sector);
                }
                if result != DmaTransferResult::Ok {
                    break;
                }
            }
        }
        (self.task_file(), data)
    }

    fn unlock(&mut self) -> TaskFile {
        self.select(0);
        self.issue(Opcode::SecurityUnlock);
        if self.data_requested() {
            self.write_pio_block(&[0u8; SECTOR_SIZE]);
        }
        self.task_file()
    }

    fn set_mode(&mut self, mode: TransferMode) -> TaskFile {
        self.select(0);
        self.write_reg(Register::ErrorFeatures, SET_FEATURES_SET_TRANSFER_MODE);
        self.write_reg(Register::SectorCount, mode.encode());
        self.issue(Opcode::SetFeatures);
        self.task_file()
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    run(args)
}

fn build_config(args: &Args) -> anyhow::Result<AtaConfig> {
    if let Some(path) = &args.config {
        return AtaConfig::load(path).with_context(|| format!("load config {}", path.display()));
    }

    let drive = if let Some(path) = &args.image {
        DriveConfig::ImageHardDrive { path: path.clone() }
    } else if args.dummy {
        DriveConfig::DummyHardDrive
    } else if args.dvd {
        DriveConfig::DummyDvd
    } else {
        bail!("no drive configured: pass --config, --image, --dummy or --dvd");
    };

    let mut config = AtaConfig::default();
    *config
        .channel_mut(args.channel.into())
        .device_mut(usize::from(args.device)) = drive;
    Ok(config)
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    let channel = ChannelId::from(args.channel);
    let ctrl = AtaController::from_config(&config, Box::new(NoIrq), Box::new(NoIrq))
        .context("build controller")?;
    if !ctrl.channel(channel).device(usize::from(args.device)).is_attached() {
        bail!("no device attached at {channel} device {}", args.device);
    }

    let mut probe = Probe {
        ctrl,
        ports: AtaPortMap::for_channel(channel),
        channel,
        device: args.device,
    };

    let report = match args.command {
        ProbeCommand::Identify { packet } => {
            let (task_file, data) = probe.identify(packet);
            ProbeReport {
                command: if packet { "identify-packet-device" } else { "identify-device" },
                task_file,
                identify: data.as_ref().map(IdentifySummary::from),
                sectors: None,
                data: None,
            }
        }
        ProbeCommand::Read { lba, count, out } => {
            let (task_file, data) = probe.read_dma(lba, count);
            let sectors = (data.len() / SECTOR_SIZE) as u16;
            let dump = match out {
                Some(path) => {
                    fs::write(&path, &data)
                        .with_context(|| format!("write {}", path.display()))?;
                    None
                }
                None => Some(hex(&data)),
            };
            ProbeReport {
                command: "read-dma",
                task_file,
                identify: None,
                sectors: Some(sectors),
                data: dump,
            }
        }
        ProbeCommand::Unlock => {
            let task_file = probe.unlock();
            let (_, data) = probe.identify(false);
            ProbeReport {
                command: "security-unlock",
                task_file,
                identify: data.as_ref().map(IdentifySummary::from),
                sectors: None,
                data: None,
            }
        }
        ProbeCommand::SetMode { mode } => {
            let task_file = probe.set_mode(mode.0);
            let (_, data) = probe.identify(false);
            ProbeReport {
                command: "set-transfer-mode",
                task_file,
                identify: data.as_ref().map(IdentifySummary::from),
                sectors: None,
                data: None,
            }
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.task_file.failed() {
        return Err(anyhow!(
            "{} failed: status {:#04x}, error {:#04x}",
            report.command,
            report.task_file.status,
            report.task_file.error
        ));
    }
    Ok(())
}

fn print_report(report: &ProbeReport) {
    println!("command:  {}", report.command);
    println!("status:   {:#04x}", report.task_file.status);
    println!("error:    {:#04x}", report.task_file.error);

    if let Some(id) = &report.identify {
        println!("model:    {}", id.model);
        println!("serial:   {}", id.serial);
        println!("firmware: {}", id.firmware);
        println!("config:   {:#06x}", id.general_configuration);
        println!(
            "geometry: {}/{}/{} (current {}/{}/{})",
            id.cylinders,
            id.heads,
            id.sectors_per_track,
            id.current_cylinders,
            id.current_heads,
            id.current_sectors_per_track
        );
        println!("sectors:  {}", id.addressable_sectors);
        println!("mdma:     {:#06x}", id.multiword_dma);
        println!("udma:     {:#06x}", id.ultra_dma);
        println!(
            "security: {:#06x}{}",
            id.security_status,
            if id.locked { " (locked)" } else { "" }
        );
    }

    if let Some(sectors) = report.sectors {
        println!("sectors:  {sectors}");
    }
    if let Some(data) = &report.data {
        for (i, line) in data.as_bytes().chunks(32).enumerate() {
            println!("{:08x}  {}", i * 16, String::from_utf8_lossy(line));
        }
    }
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}
