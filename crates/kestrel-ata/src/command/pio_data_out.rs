use tracing::warn;

use super::{BlockWriteResult, CommandContext};
use crate::defs::{Protocol, Status, SECTOR_SIZE};

/// The command-specific half of a [9.8] PIO data-out command.
pub trait PioDataOutCommand {
    /// Checks the command's preconditions before the first block is requested.
    fn initialize(&mut self, ctx: &mut CommandContext<'_>) -> bool;

    /// Consumes one block received from the host.
    fn process_block(
        &mut self,
        ctx: &mut CommandContext<'_>,
        block: &[u8; SECTOR_SIZE],
    ) -> BlockWriteResult;
}

/// [9.8] PIO data-out protocol.
#[derive(Debug)]
pub struct PioDataOut<C> {
    command: C,
    finished: bool,
}

impl<C: PioDataOutCommand> PioDataOut<C> {
    pub fn new(command: C) -> Self {
        Self {
            command,
            finished: false,
        }
    }

    pub fn execute(&mut self, ctx: &mut CommandContext<'_>) {
        ctx.device.reset_buffer();
        if self.command.initialize(ctx) {
            ctx.regs.status.insert(Protocol::PioDataOut.info().status_asserted_on_success);
            ctx.regs.status.remove(Status::BSY);
        } else {
            ctx.regs.status.remove(Status::BSY);
            ctx.assert_interrupt();
            self.finished = true;
        }
    }

    pub fn write_data(&mut self, ctx: &mut CommandContext<'_>, src: &[u8]) {
        let len = ctx.device.write_buffer(src);
        if len != src.len() {
            warn!(
                channel = %ctx.channel(),
                device = ctx.device_index(),
                size = src.len(),
                written = len,
                "PIO data-out buffer overflow"
            );
        }

        if ctx.device.is_block_complete() {
            ctx.regs.status.insert(Status::BSY);
            ctx.regs.status.remove(Status::DRQ);
            self.drain_buffer(ctx);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn drain_buffer(&mut self, ctx: &mut CommandContext<'_>) {
        let block = *ctx.device.buffer();
        match self.command.process_block(ctx, &block) {
            BlockWriteResult::Error => {
                ctx.regs.status.insert(Status::ERR);
                ctx.regs.status.remove(Status::BSY);
                ctx.assert_interrupt();
                self.finished = true;
            }
            BlockWriteResult::End => {
                ctx.regs.status.remove(Status::BSY);
                ctx.assert_interrupt();
                self.finished = true;
            }
            BlockWriteResult::Ok => {
                ctx.device.reset_buffer();
                ctx.regs.status.insert(Status::DRQ);
                ctx.regs.status.remove(Status::BSY);
                ctx.assert_interrupt();
            }
        }
    }
}
