use tracing::debug;

use super::CommandContext;
use crate::defs::{ErrorBits, Status};

/// Diagnostic code reported in the Error register after a reset: device passed.
const DIAGNOSTIC_PASSED: u8 = 0x01;

/// [8.7] Device Reset (08h). Only devices implementing the PACKET command
/// feature set accept it.
#[derive(Debug, Default)]
pub struct DeviceReset {
    finished: bool,
}

impl DeviceReset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execute(&mut self, ctx: &mut CommandContext<'_>) {
        if ctx.device.driver().supports_packet_commands() {
            debug!(
                channel = %ctx.channel(),
                device = ctx.device_index(),
                "device reset"
            );
            ctx.device.reset_buffer();
            ctx.regs.write_signature(true);
            let index = ctx.device_index();
            ctx.regs.set_device_bits(index);
            ctx.regs.error = ErrorBits::from_bits_retain(DIAGNOSTIC_PASSED);
            ctx.regs.status.insert(Status::DRDY);
            ctx.regs.status.remove(Status::BSY | Status::DRQ | Status::ERR);
        } else {
            ctx.regs.error |= ErrorBits::ABRT;
            ctx.regs.status.insert(Status::ERR);
            ctx.regs.status.remove(Status::BSY);
            ctx.assert_interrupt();
        }
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
