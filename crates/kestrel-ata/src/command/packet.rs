use tracing::debug;

use super::CommandContext;
use crate::defs::{
    ErrorBits, Status, PACKET_FEATURE_DMA, PACKET_FEATURE_OVERLAPPED, PACKET_INTR_BUS_RELEASE,
    PACKET_INTR_COMMAND_OR_DATA, PACKET_INTR_IO_DIRECTION, SENSE_KEY_ILLEGAL_REQUEST,
    SENSE_KEY_SHIFT,
};

/// [8.21] Packet (A0h).
///
/// Accepts the command packet through the Data register. Packet contents are
/// not interpreted: every packet completes with CHECK CONDITION and an
/// ILLEGAL REQUEST sense key.
///
/// While the command runs, Sector Count is the Interrupt Reason register (C/D
/// in bit 0, I/O in bit 1, REL in bit 2).
#[derive(Debug, Default)]
pub struct PacketCommand {
    dma: bool,
    overlapped: bool,
    packet: Vec<u8>,
    packet_size: usize,
    finished: bool,
}

impl PacketCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn execute(&mut self, ctx: &mut CommandContext<'_>) {
        if !ctx.device.driver().supports_packet_commands()
            || !ctx.regs.status.contains(Status::DRDY)
        {
            ctx.regs.error |= ErrorBits::ABRT;
            ctx.regs.status.insert(Status::ERR);
            ctx.regs.status.remove(Status::BSY);
            ctx.assert_interrupt();
            self.finished = true;
            return;
        }

        self.dma = ctx.regs.features & PACKET_FEATURE_DMA != 0;
        self.overlapped = ctx.regs.features & PACKET_FEATURE_OVERLAPPED != 0;
        self.packet_size = ctx.device.driver().packet_command_size();
        self.packet = Vec::with_capacity(self.packet_size);

        ctx.regs.sector_count |= PACKET_INTR_COMMAND_OR_DATA;
        ctx.regs.sector_count &= !PACKET_INTR_IO_DIRECTION;
        if !self.dma {
            ctx.regs.sector_count &= !PACKET_INTR_BUS_RELEASE;
        }
        ctx.regs.status.insert(Status::DRQ);
        ctx.regs.status.remove(Status::BSY);
    }

    pub fn read_data(&mut self, ctx: &mut CommandContext<'_>, dst: &mut [u8]) {
        debug!(
            channel = %ctx.channel(),
            device = ctx.device_index(),
            reason = ctx.regs.sector_count,
            size = dst.len(),
            "data read while awaiting a command packet"
        );
        dst.fill(0);
    }

    pub fn write_data(&mut self, ctx: &mut CommandContext<'_>, src: &[u8]) {
        let len = src.len().min(self.packet_size.saturating_sub(self.packet.len()));
        self.packet.extend_from_slice(&src[..len]);

        if self.packet.len() >= self.packet_size {
            ctx.regs.status.insert(Status::BSY);
            ctx.regs.status.remove(Status::DRQ);
            self.process_packet(ctx);
        }
    }

    fn process_packet(&mut self, ctx: &mut CommandContext<'_>) {
        debug!(
            channel = %ctx.channel(),
            device = ctx.device_index(),
            opcode = self.packet.first().copied().unwrap_or_default(),
            dma = self.dma,
            overlapped = self.overlapped,
            "rejecting command packet"
        );

        ctx.regs.error = ErrorBits::from_bits_retain(SENSE_KEY_ILLEGAL_REQUEST << SENSE_KEY_SHIFT)
            | ErrorBits::ABRT;
        ctx.regs.status.insert(Status::ERR);

        ctx.regs.sector_count |= PACKET_INTR_IO_DIRECTION | PACKET_INTR_COMMAND_OR_DATA;
        ctx.regs.sector_count &= !PACKET_INTR_BUS_RELEASE;
        ctx.regs.status.remove(Status::DRQ);
        ctx.regs.status.insert(Status::DRDY);
        ctx.regs.status.remove(Status::BSY);
        ctx.assert_interrupt();
        self.finished = true;
    }
}
