use tracing::debug;

use super::{BlockWriteResult, CommandContext, PioDataOutCommand};
use crate::defs::{ErrorBits, Status, SECTOR_SIZE};

/// [8.34] Security Unlock (F2h). The host sends one 512-byte password block.
#[derive(Debug, Default)]
pub struct SecurityUnlock;

impl PioDataOutCommand for SecurityUnlock {
    fn initialize(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        if !ctx.regs.status.contains(Status::DRDY) {
            ctx.regs.error |= ErrorBits::ABRT;
            ctx.regs.status.insert(Status::ERR);
            return false;
        }
        true
    }

    fn process_block(
        &mut self,
        ctx: &mut CommandContext<'_>,
        block: &[u8; SECTOR_SIZE],
    ) -> BlockWriteResult {
        if !ctx.device.driver_mut().security_unlock(block) {
            debug!(
                channel = %ctx.channel(),
                device = ctx.device_index(),
                "security unlock rejected"
            );
            ctx.regs.error |= ErrorBits::ABRT;
            return BlockWriteResult::Error;
        }
        BlockWriteResult::End
    }
}
