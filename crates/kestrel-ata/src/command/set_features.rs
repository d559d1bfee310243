use tracing::{debug, warn};

use super::{CommandContext, NonDataCommand};
use crate::defs::{ErrorBits, Status, SET_FEATURES_SET_TRANSFER_MODE};

/// [8.37] Set Features (EFh).
#[derive(Debug, Default)]
pub struct SetFeatures;

impl NonDataCommand for SetFeatures {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        let feature = ctx.regs.features;
        let succeeded = match feature {
            SET_FEATURES_SET_TRANSFER_MODE => {
                debug!(
                    channel = %ctx.channel(),
                    device = ctx.device_index(),
                    value = ctx.regs.sector_count,
                    "set transfer mode"
                );
                ctx.device.set_transfer_mode(ctx.regs)
            }
            _ => {
                warn!(
                    channel = %ctx.channel(),
                    device = ctx.device_index(),
                    feature,
                    "unsupported Set Features subcommand"
                );
                ctx.regs.error |= ErrorBits::ABRT;
                false
            }
        };

        // [8.37.6]
        if !succeeded {
            let index = ctx.device_index();
            ctx.regs.set_device_bits(index);
            ctx.regs.status.remove(Status::BSY);
            ctx.regs.status.insert(Status::DRDY);
            ctx.regs.status.remove(Status::DRQ);
            ctx.regs.sync_error_status();
        }
        succeeded
    }
}
