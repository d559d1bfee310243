//! JSON description of what is plugged into each channel.
//!
//! ```json
//! {
//!   "primary":   { "master": { "type": "image_hard_drive", "path": "hdd.img" } },
//!   "secondary": { "master": { "type": "dummy_dvd" } }
//! }
//! ```
//!
//! Omitted channels and devices default to `none`.

use std::path::{Path, PathBuf};

use kestrel_storage::DiskError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::AtaController;
use crate::defs::ChannelId;
use crate::drivers::{AtaDeviceDriver, DvdDrive, HardDrive, NullDriver};
use crate::interrupt::IrqHandler;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid ATA configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read ATA configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open drive image {}: {source}", path.display())]
    Disk {
        path: PathBuf,
        #[source]
        source: DiskError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AtaConfig {
    pub primary: ChannelConfig,
    pub secondary: ChannelConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    pub master: DriveConfig,
    pub slave: DriveConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriveConfig {
    #[default]
    None,
    DummyHardDrive,
    ImageHardDrive { path: PathBuf },
    DummyDvd,
}

impl AtaConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn channel(&self, id: ChannelId) -> &ChannelConfig {
        match id {
            ChannelId::Primary => &self.primary,
            ChannelId::Secondary => &self.secondary,
        }
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> &mut ChannelConfig {
        match id {
            ChannelId::Primary => &mut self.primary,
            ChannelId::Secondary => &mut self.secondary,
        }
    }
}

impl ChannelConfig {
    /// The drive at `index` (0 = master, 1 = slave).
    pub fn device(&self, index: usize) -> &DriveConfig {
        if index & 1 == 0 {
            &self.master
        } else {
            &self.slave
        }
    }

    pub fn device_mut(&mut self, index: usize) -> &mut DriveConfig {
        if index & 1 == 0 {
            &mut self.master
        } else {
            &mut self.slave
        }
    }
}

impl DriveConfig {
    pub fn build_driver(&self) -> Result<Box<dyn AtaDeviceDriver>, ConfigError> {
        Ok(match self {
            DriveConfig::None => Box::new(NullDriver::new()),
            DriveConfig::DummyHardDrive => Box::new(HardDrive::dummy()),
            DriveConfig::ImageHardDrive { path } => {
                let drive = HardDrive::open_image(path).map_err(|source| ConfigError::Disk {
                    path: path.clone(),
                    source,
                })?;
                Box::new(drive)
            }
            DriveConfig::DummyDvd => Box::new(DvdDrive::dummy()),
        })
    }
}

impl AtaController {
    /// Builds a controller with every configured drive attached.
    pub fn from_config(
        config: &AtaConfig,
        primary_irq: Box<dyn IrqHandler>,
        secondary_irq: Box<dyn IrqHandler>,
    ) -> Result<Self, ConfigError> {
        let mut controller = AtaController::new(primary_irq, secondary_irq);
        for id in ChannelId::ALL {
            let channel = config.channel(id);
            for index in 0..2 {
                let drive = channel.device(index);
                if *drive != DriveConfig::None {
                    controller.attach(id, index, drive.build_driver()?);
                }
            }
        }
        Ok(controller)
    }
}
