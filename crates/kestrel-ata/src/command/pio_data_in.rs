use tracing::warn;

use super::{BlockReadResult, CommandContext};
use crate::defs::{Protocol, Status, SECTOR_SIZE};

/// The command-specific half of a [9.7] PIO data-in command.
pub trait PioDataInCommand {
    /// Produces the next block for the host.
    fn read_block(
        &mut self,
        ctx: &mut CommandContext<'_>,
        block: &mut [u8; SECTOR_SIZE],
    ) -> BlockReadResult;

    /// Whether another block follows the one the host just drained.
    fn has_more_data(&self) -> bool;
}

/// [9.7] PIO data-in protocol.
///
/// Blocks are staged one sector at a time in the device buffer and drained
/// by the host through the Data register.
#[derive(Debug)]
pub struct PioDataIn<C> {
    command: C,
    finished: bool,
}

impl<C: PioDataInCommand> PioDataIn<C> {
    pub fn new(command: C) -> Self {
        Self {
            command,
            finished: false,
        }
    }

    pub fn execute(&mut self, ctx: &mut CommandContext<'_>) {
        self.fill_buffer(ctx);
    }

    pub fn read_data(&mut self, ctx: &mut CommandContext<'_>, dst: &mut [u8]) {
        // Bytes past the end of the block read as zero.
        dst.fill(0);
        let len = ctx.device.read_buffer(dst);
        if len != dst.len() {
            warn!(
                channel = %ctx.channel(),
                device = ctx.device_index(),
                size = dst.len(),
                read = len,
                "PIO data-in buffer underflow"
            );
        }

        if ctx.device.is_block_complete() {
            if self.command.has_more_data() {
                ctx.regs.status.insert(Status::BSY);
                ctx.regs.status.remove(Status::DRQ);
                self.fill_buffer(ctx);
            } else {
                ctx.regs.status.remove(Status::DRQ);
                self.finished = true;
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn fill_buffer(&mut self, ctx: &mut CommandContext<'_>) {
        let info = Protocol::PioDataIn.info();
        let mut block = [0u8; SECTOR_SIZE];

        match self.command.read_block(ctx, &mut block) {
            BlockReadResult::Error => {
                ctx.regs.status.insert(Status::ERR);
                ctx.regs.status.remove(Status::BSY);
                ctx.assert_interrupt();
                self.finished = true;
            }
            BlockReadResult::End => {
                ctx.regs.status.remove(Status::BSY | Status::DRQ);
                self.finished = true;
            }
            BlockReadResult::Ok => {
                ctx.device.load_buffer(&block);
                ctx.regs.status.insert(info.status_asserted_on_success);
                ctx.regs.status.remove(Status::BSY);
                if info.assert_intrq_on_success {
                    ctx.assert_interrupt();
                }
            }
        }
    }
}
