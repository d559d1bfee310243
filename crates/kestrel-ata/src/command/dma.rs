use std::ops::Range;

use kestrel_storage::Result as DiskResult;
use tracing::{trace, warn};

use super::CommandContext;
use crate::defs::{ErrorBits, Protocol, Status, DEVICE_HEAD_HEAD_MASK, SECTOR_SIZE};
use crate::drivers::{AtaDeviceDriver, Chs};

/// [9.10] DMA protocol, shared by Read DMA and Write DMA.
///
/// The command only validates the request and opens the data phase; the
/// external bus-master engine then moves the bytes through repeated
/// [`read_data`](Self::read_data) / [`write_data`](Self::write_data) calls.
#[derive(Debug)]
pub struct DmaCommand {
    is_write: bool,
    starting_byte: u64,
    ending_byte: u64,
    current_byte: u64,
    finished: bool,
}

impl DmaCommand {
    pub fn read() -> Self {
        Self::new(false)
    }

    pub fn write() -> Self {
        Self::new(true)
    }

    fn new(is_write: bool) -> Self {
        Self {
            is_write,
            starting_byte: 0,
            ending_byte: 0,
            current_byte: 0,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn execute(&mut self, ctx: &mut CommandContext<'_>) {
        if ctx.device.driver().supports_packet_commands()
            || !ctx.regs.status.contains(Status::DRDY)
        {
            ctx.regs.error |= ErrorBits::ABRT;
            ctx.regs.status.insert(Status::ERR);
            ctx.regs.status.remove(Status::BSY);
            ctx.assert_interrupt();
            self.finished = true;
            return;
        }

        let starting_lba = if ctx.regs.uses_lba() {
            ctx.regs.lba28()
        } else {
            ctx.device.driver().chs_to_lba(Chs {
                cylinder: ctx.regs.cylinder,
                head: ctx.regs.head(),
                sector: ctx.regs.sector_number,
            })
        };
        let sector_count = match ctx.regs.sector_count {
            0 => 256,
            n => u64::from(n),
        };

        if !ctx.device.driver().is_lba_address_user_accessible(starting_lba) {
            trace!(
                channel = %ctx.channel(),
                device = ctx.device_index(),
                lba = starting_lba,
                "DMA start address is not accessible"
            );
            ctx.regs.error |= ErrorBits::IDNF;
            ctx.regs.status.insert(Status::ERR);
            ctx.regs.status.remove(Status::BSY | Protocol::Dma.info().status_negated_on_error);
            ctx.assert_interrupt();
            self.finished = true;
            return;
        }

        self.starting_byte = u64::from(starting_lba) * SECTOR_SIZE as u64;
        self.ending_byte = self.starting_byte + sector_count * SECTOR_SIZE as u64;
        self.current_byte = self.starting_byte;

        trace!(
            channel = %ctx.channel(),
            device = ctx.device_index(),
            write = self.is_write,
            lba = starting_lba,
            sectors = sector_count,
            "DMA transfer ready"
        );
        ctx.regs.status.remove(Status::BSY);
        ctx.regs.status.insert(Protocol::Dma.info().status_asserted_on_success);
    }

    /// Moves device data into `dst`. Returns `false` if the call does not
    /// match the transfer direction; nothing changes in that case.
    pub fn read_data(&mut self, ctx: &mut CommandContext<'_>, dst: &mut [u8]) -> bool {
        if self.is_write {
            warn!(
                channel = %ctx.channel(),
                device = ctx.device_index(),
                size = dst.len(),
                "DMA read during a DMA write command"
            );
            return false;
        }

        let len = self.clip(dst.len());
        dst[len..].fill(0);
        self.transfer(ctx, len, |driver, address, range| {
            driver.read(address, &mut dst[range])
        });
        true
    }

    /// Moves `src` to the device. Returns `false` if the call does not match
    /// the transfer direction; nothing changes in that case.
    pub fn write_data(&mut self, ctx: &mut CommandContext<'_>, src: &[u8]) -> bool {
        if !self.is_write {
            warn!(
                channel = %ctx.channel(),
                device = ctx.device_index(),
                size = src.len(),
                "DMA write during a DMA read command"
            );
            return false;
        }

        let len = self.clip(src.len());
        self.transfer(ctx, len, |driver, address, range| {
            driver.write(address, &src[range])
        });
        true
    }

    fn clip(&self, len: usize) -> usize {
        let remaining = self.ending_byte.saturating_sub(self.current_byte);
        usize::try_from(remaining).map_or(len, |remaining| len.min(remaining))
    }

    /// Walks `len` bytes one sector at a time, re-checking each sector.
    fn transfer<F>(&mut self, ctx: &mut CommandContext<'_>, len: usize, mut io: F)
    where
        F: FnMut(&mut dyn AtaDeviceDriver, u64, Range<usize>) -> DiskResult<()>,
    {
        let mut offset = 0;
        while offset < len {
            let lba = (self.current_byte / SECTOR_SIZE as u64) as u32;
            if !ctx.device.driver().is_lba_address_user_accessible(lba) {
                ctx.regs.error |= ErrorBits::IDNF;
                self.unrecoverable_error(ctx);
                return;
            }

            let in_sector = SECTOR_SIZE - (self.current_byte % SECTOR_SIZE as u64) as usize;
            let chunk = in_sector.min(len - offset);
            if let Err(err) = io(ctx.device.driver_mut(), self.current_byte, offset..offset + chunk) {
                warn!(
                    channel = %ctx.channel(),
                    device = ctx.device_index(),
                    address = self.current_byte,
                    %err,
                    "DMA media access failed"
                );
                ctx.regs.status.insert(Status::DF);
                self.unrecoverable_error(ctx);
                return;
            }

            self.current_byte += chunk as u64;
            offset += chunk;
        }

        if self.current_byte >= self.ending_byte {
            self.finish_transfer(ctx);
            ctx.regs.status.remove(Status::BSY | Status::DRQ);
            ctx.assert_interrupt();
        }
    }

    fn finish_transfer(&mut self, ctx: &mut CommandContext<'_>) {
        let index = ctx.device_index();
        ctx.regs.set_device_bits(index);
        ctx.regs.status.remove(Status::BSY);
        ctx.regs.status.insert(Status::DRDY);
        ctx.regs.status.remove(Status::DF | Status::DRQ | Status::ERR);
        self.finished = true;
    }

    /// Reports the address of the failing sector and ends the command.
    fn unrecoverable_error(&mut self, ctx: &mut CommandContext<'_>) {
        let lba = (self.current_byte / SECTOR_SIZE as u64) as u32;
        let chs = ctx.device.driver().lba_to_chs(lba);
        ctx.regs.cylinder = chs.cylinder;
        ctx.regs.sector_number = chs.sector;
        ctx.regs.device_head =
            (ctx.regs.device_head & !DEVICE_HEAD_HEAD_MASK) | (chs.head & DEVICE_HEAD_HEAD_MASK);

        let index = ctx.device_index();
        ctx.regs.set_device_bits(index);
        ctx.regs.status.remove(Status::BSY);
        ctx.regs.status.insert(Status::DRDY);
        ctx.regs.status.remove(Status::DRQ);
        ctx.regs.sync_error_status();
        ctx.assert_interrupt();
        self.finished = true;
    }
}
