use super::{BlockReadResult, CommandContext, PioDataInCommand};
use crate::defs::{ErrorBits, Status, SECTOR_SIZE};
use crate::identify::IdentifyData;

/// [8.12] Identify Device (ECh).
#[derive(Debug, Default)]
pub struct IdentifyDevice;

impl PioDataInCommand for IdentifyDevice {
    fn read_block(
        &mut self,
        ctx: &mut CommandContext<'_>,
        block: &mut [u8; SECTOR_SIZE],
    ) -> BlockReadResult {
        if !ctx.regs.status.contains(Status::DRDY) {
            ctx.regs.error |= ErrorBits::ABRT;
            return BlockReadResult::Error;
        }

        // [8.12.5.2] Devices implementing the PACKET command feature set
        // abort with the packet signature in place.
        if ctx.device.driver().supports_packet_commands() {
            ctx.regs.write_signature(true);
            let index = ctx.device_index();
            ctx.regs.set_device_bits(index);
            ctx.regs.error |= ErrorBits::ABRT;
            return BlockReadResult::Error;
        }

        let mut data = IdentifyData::new();
        ctx.device.driver().identify_device(&mut data);
        *block = data.to_bytes();

        let index = ctx.device_index();
        ctx.regs.set_device_bits(index);
        ctx.regs.status.insert(Status::DRDY);
        ctx.regs.status.remove(Status::DF | Status::DRQ | Status::ERR);
        BlockReadResult::Ok
    }

    fn has_more_data(&self) -> bool {
        false
    }
}

/// [8.13] Identify Packet Device (A1h).
#[derive(Debug, Default)]
pub struct IdentifyPacketDevice;

impl PioDataInCommand for IdentifyPacketDevice {
    fn read_block(
        &mut self,
        ctx: &mut CommandContext<'_>,
        block: &mut [u8; SECTOR_SIZE],
    ) -> BlockReadResult {
        let mut data = IdentifyData::new();
        if !ctx.device.driver().identify_packet_device(&mut data) {
            ctx.regs.error |= ErrorBits::ABRT;
            return BlockReadResult::Error;
        }
        *block = data.to_bytes();

        let index = ctx.device_index();
        ctx.regs.set_device_bits(index);
        ctx.regs.status.insert(Status::DRDY);
        ctx.regs.status.remove(Status::DF | Status::DRQ | Status::ERR);
        BlockReadResult::Ok
    }

    fn has_more_data(&self) -> bool {
        false
    }
}
