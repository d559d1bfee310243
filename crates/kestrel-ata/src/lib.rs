//! ATA/ATAPI-4 device emulation for Kestrel's IDE channels.
//!
//! The crate models the guest-visible side of two IDE channels: the command
//! and control block registers, the per-protocol command state machines, and
//! the interrupt line. Storage lives behind [`drivers::AtaDeviceDriver`].
//!
//! Everything is synchronous. A port access or DMA call updates the register
//! file, talks to the driver and raises or lowers INTRQ before it returns.
//! Section references in brackets (e.g. `[8.12]`) point at the ATA/ATAPI-4
//! standard.

pub mod channel;
pub mod command;
pub mod config;
pub mod controller;
pub mod defs;
pub mod device;
pub mod drivers;
pub mod identify;
pub mod interrupt;
pub mod registers;

pub use channel::AtaChannel;
pub use config::{AtaConfig, ChannelConfig, ConfigError, DriveConfig};
pub use controller::{AtaController, AtaPortMap, PRIMARY_PORTS, SECONDARY_PORTS};
pub use defs::{ChannelId, DmaTransferResult, Opcode, Register, Status};
pub use device::AtaDevice;
pub use drivers::{AtaDeviceDriver, DvdDrive, HardDrive, NullDriver};
pub use identify::IdentifyData;
pub use interrupt::{InterruptLine, IrqHandler, NoIrq};
pub use registers::AtaRegisters;
