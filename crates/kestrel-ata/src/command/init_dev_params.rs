use tracing::debug;

use super::{CommandContext, NonDataCommand};
use crate::defs::{ErrorBits, Status};

/// [8.16] Initialize Device Parameters (91h).
///
/// Sector Count holds the sectors per track and the Device/Head head nibble
/// the maximum head number.
#[derive(Debug, Default)]
pub struct InitializeDeviceParameters;

impl NonDataCommand for InitializeDeviceParameters {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        let heads = ctx.regs.head();
        let sectors_per_track = ctx.regs.sector_count;
        let index = ctx.device_index();

        if !ctx.device.driver_mut().set_device_parameters(heads, sectors_per_track) {
            debug!(
                channel = %ctx.channel(),
                device = index,
                heads = u16::from(heads) + 1,
                sectors_per_track,
                "device parameters rejected"
            );
            ctx.regs.error |= ErrorBits::ABRT;
            ctx.regs.set_device_bits(index);
            ctx.regs.status.remove(Status::DRQ);
            return false;
        }

        debug!(
            channel = %ctx.channel(),
            device = index,
            heads = u16::from(heads) + 1,
            sectors_per_track,
            "device parameters set"
        );
        ctx.regs.set_device_bits(index);
        ctx.regs.status.remove(Status::BSY | Status::DF | Status::DRQ | Status::ERR);
        true
    }
}
