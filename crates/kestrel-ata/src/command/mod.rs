//! In-flight command objects.
//!
//! A command is created when the Command register is written, lives in the
//! channel's single command slot, and is dropped as soon as it reports itself
//! finished (or on a software reset). Each concrete command is built on one of
//! the protocol templates in this module, which own the register transitions
//! of [9]; the concrete commands only supply the command-specific parts.

mod device_reset;
mod dma;
mod identify;
mod init_dev_params;
mod non_data;
mod packet;
mod pio_data_in;
mod pio_data_out;
mod security_unlock;
mod set_features;

pub use device_reset::DeviceReset;
pub use dma::DmaCommand;
pub use identify::{IdentifyDevice, IdentifyPacketDevice};
pub use init_dev_params::InitializeDeviceParameters;
pub use non_data::{NonData, NonDataCommand};
pub use packet::PacketCommand;
pub use pio_data_in::{PioDataIn, PioDataInCommand};
pub use pio_data_out::{PioDataOut, PioDataOutCommand};
pub use security_unlock::SecurityUnlock;
pub use set_features::SetFeatures;

use tracing::warn;

use crate::defs::{ChannelId, DmaTransferResult, Opcode, Protocol, Status};
use crate::device::AtaDevice;
use crate::interrupt::InterruptLine;
use crate::registers::AtaRegisters;

/// Everything a command touches while it runs.
pub struct CommandContext<'a> {
    pub regs: &'a mut AtaRegisters,
    pub device: &'a mut AtaDevice,
    pub interrupt: &'a mut InterruptLine,
}

impl CommandContext<'_> {
    pub fn channel(&self) -> ChannelId {
        self.device.channel()
    }

    pub fn device_index(&self) -> usize {
        self.device.index()
    }

    /// Drives INTRQ. Does nothing while nIEN is set.
    pub fn set_interrupt(&mut self, asserted: bool) {
        let enabled = self.regs.interrupts_enabled();
        self.interrupt.set(asserted, enabled);
    }

    pub fn assert_interrupt(&mut self) {
        self.set_interrupt(true);
    }

    pub(crate) fn log_unexpected_access(&self, protocol: Protocol, access: &'static str, size: usize) {
        warn!(
            channel = %self.channel(),
            device = self.device_index(),
            ?protocol,
            size,
            "unexpected {access} for this command protocol"
        );
    }
}

/// Outcome of producing one block for a PIO data-in command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReadResult {
    /// A block is ready for the host.
    Ok,
    /// There is nothing left to transfer.
    End,
    /// The command failed; the Error register says why.
    Error,
}

/// Outcome of consuming one block for a PIO data-out command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockWriteResult {
    /// The block was consumed; the host should send another.
    Ok,
    /// The block was consumed and the command is complete.
    End,
    /// The command failed; the Error register says why.
    Error,
}

/// The command occupying a channel's command slot.
#[derive(Debug)]
pub enum AtaCommand {
    DeviceReset(DeviceReset),
    IdentifyDevice(PioDataIn<IdentifyDevice>),
    IdentifyPacketDevice(PioDataIn<IdentifyPacketDevice>),
    InitializeDeviceParameters(NonData<InitializeDeviceParameters>),
    SetFeatures(NonData<SetFeatures>),
    SecurityUnlock(PioDataOut<SecurityUnlock>),
    Dma(DmaCommand),
    Packet(PacketCommand),
}

impl AtaCommand {
    pub fn new(opcode: Opcode) -> Self {
        match opcode {
            Opcode::DeviceReset => AtaCommand::DeviceReset(DeviceReset::new()),
            Opcode::IdentifyDevice => AtaCommand::IdentifyDevice(PioDataIn::new(IdentifyDevice)),
            Opcode::IdentifyPacketDevice => {
                AtaCommand::IdentifyPacketDevice(PioDataIn::new(IdentifyPacketDevice))
            }
            Opcode::InitializeDeviceParameters => {
                AtaCommand::InitializeDeviceParameters(NonData::new(InitializeDeviceParameters))
            }
            Opcode::SetFeatures => AtaCommand::SetFeatures(NonData::new(SetFeatures)),
            Opcode::SecurityUnlock => AtaCommand::SecurityUnlock(PioDataOut::new(SecurityUnlock)),
            Opcode::ReadDma => AtaCommand::Dma(DmaCommand::read()),
            Opcode::WriteDma => AtaCommand::Dma(DmaCommand::write()),
            Opcode::Packet => AtaCommand::Packet(PacketCommand::new()),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            AtaCommand::DeviceReset(_) => Protocol::DeviceReset,
            AtaCommand::IdentifyDevice(_) | AtaCommand::IdentifyPacketDevice(_) => {
                Protocol::PioDataIn
            }
            AtaCommand::InitializeDeviceParameters(_) | AtaCommand::SetFeatures(_) => {
                Protocol::NonData
            }
            AtaCommand::SecurityUnlock(_) => Protocol::PioDataOut,
            AtaCommand::Dma(_) => Protocol::Dma,
            AtaCommand::Packet(_) => Protocol::Packet,
        }
    }

    pub fn execute(&mut self, ctx: &mut CommandContext<'_>) {
        match self {
            AtaCommand::DeviceReset(cmd) => cmd.execute(ctx),
            AtaCommand::IdentifyDevice(cmd) => cmd.execute(ctx),
            AtaCommand::IdentifyPacketDevice(cmd) => cmd.execute(ctx),
            AtaCommand::InitializeDeviceParameters(cmd) => cmd.execute(ctx),
            AtaCommand::SetFeatures(cmd) => cmd.execute(ctx),
            AtaCommand::SecurityUnlock(cmd) => cmd.execute(ctx),
            AtaCommand::Dma(cmd) => cmd.execute(ctx),
            AtaCommand::Packet(cmd) => cmd.execute(ctx),
        }
    }

    /// Host read from the Data register.
    pub fn read_data(&mut self, ctx: &mut CommandContext<'_>, dst: &mut [u8]) {
        match self {
            AtaCommand::IdentifyDevice(cmd) => cmd.read_data(ctx, dst),
            AtaCommand::IdentifyPacketDevice(cmd) => cmd.read_data(ctx, dst),
            AtaCommand::Packet(cmd) => cmd.read_data(ctx, dst),
            _ => ctx.log_unexpected_access(self.protocol(), "data read", dst.len()),
        }
    }

    /// Host write to the Data register.
    pub fn write_data(&mut self, ctx: &mut CommandContext<'_>, src: &[u8]) {
        match self {
            AtaCommand::SecurityUnlock(cmd) => cmd.write_data(ctx, src),
            AtaCommand::Packet(cmd) => cmd.write_data(ctx, src),
            _ => ctx.log_unexpected_access(self.protocol(), "data write", src.len()),
        }
    }

    /// Bus-master read: moves data from the device into `dst`.
    pub fn read_dma(&mut self, ctx: &mut CommandContext<'_>, dst: &mut [u8]) -> DmaTransferResult {
        match self {
            AtaCommand::Dma(cmd) => {
                if !cmd.read_data(ctx, dst) {
                    return DmaTransferResult::Error;
                }
                self.dma_progress(ctx)
            }
            _ => {
                ctx.log_unexpected_access(self.protocol(), "DMA read", dst.len());
                DmaTransferResult::Error
            }
        }
    }

    /// Bus-master write: moves data from `src` to the device.
    pub fn write_dma(&mut self, ctx: &mut CommandContext<'_>, src: &[u8]) -> DmaTransferResult {
        match self {
            AtaCommand::Dma(cmd) => {
                if !cmd.write_data(ctx, src) {
                    return DmaTransferResult::Error;
                }
                self.dma_progress(ctx)
            }
            _ => {
                ctx.log_unexpected_access(self.protocol(), "DMA write", src.len());
                DmaTransferResult::Error
            }
        }
    }

    fn dma_progress(&self, ctx: &CommandContext<'_>) -> DmaTransferResult {
        if !self.is_finished() {
            DmaTransferResult::Ok
        } else if ctx.regs.status.intersects(Status::ERR | Status::DF) {
            DmaTransferResult::Error
        } else {
            DmaTransferResult::End
        }
    }

    pub fn is_finished(&self) -> bool {
        match self {
            AtaCommand::DeviceReset(cmd) => cmd.is_finished(),
            AtaCommand::IdentifyDevice(cmd) => cmd.is_finished(),
            AtaCommand::IdentifyPacketDevice(cmd) => cmd.is_finished(),
            AtaCommand::InitializeDeviceParameters(cmd) => cmd.is_finished(),
            AtaCommand::SetFeatures(cmd) => cmd.is_finished(),
            AtaCommand::SecurityUnlock(cmd) => cmd.is_finished(),
            AtaCommand::Dma(cmd) => cmd.is_finished(),
            AtaCommand::Packet(cmd) => cmd.is_finished(),
        }
    }
}
