use tracing::{debug, trace, warn};

use crate::command::{AtaCommand, CommandContext};
use crate::defs::{
    ChannelId, DeviceControl, DmaTransferResult, ErrorBits, Opcode, Register, Status,
};
use crate::device::AtaDevice;
use crate::drivers::AtaDeviceDriver;
use crate::interrupt::{InterruptLine, IrqHandler};
use crate::registers::AtaRegisters;

struct ActiveCommand {
    device: usize,
    opcode: Opcode,
    command: AtaCommand,
}

/// One IDE channel: two device slots sharing a register file and a command slot.
///
/// Every guest-visible effect happens synchronously inside the port access
/// that caused it. At most one command exists at a time.
pub struct AtaChannel {
    id: ChannelId,
    regs: AtaRegisters,
    devices: [AtaDevice; 2],
    interrupt: InterruptLine,
    current: Option<ActiveCommand>,
}

impl AtaChannel {
    pub fn new(id: ChannelId, irq: u8, handler: Box<dyn IrqHandler>) -> Self {
        Self {
            id,
            regs: AtaRegisters::default(),
            devices: [AtaDevice::new(id, 0), AtaDevice::new(id, 1)],
            interrupt: InterruptLine::new(irq, handler),
            current: None,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Attaches `driver` to device slot `index` (0 or 1) and returns the
    /// previous driver.
    pub fn attach(&mut self, index: usize, driver: Box<dyn AtaDeviceDriver>) -> Box<dyn AtaDeviceDriver> {
        let index = index & 1;
        if self.current.as_ref().is_some_and(|active| active.device == index) {
            debug!(channel = %self.id, device = index, "driver replaced during a command");
            self.current = None;
        }
        self.devices[index].attach(driver)
    }

    pub fn device(&self, index: usize) -> &AtaDevice {
        &self.devices[index & 1]
    }

    pub fn registers(&self) -> &AtaRegisters {
        &self.regs
    }

    pub fn is_command_in_progress(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_opcode(&self) -> Option<Opcode> {
        self.current.as_ref().map(|active| active.opcode)
    }

    pub fn interrupt_asserted(&self) -> bool {
        self.interrupt.is_asserted()
    }

    pub fn irq(&self) -> u8 {
        self.interrupt.irq()
    }

    pub fn read_command_port(&mut self, reg: Register, size: u8) -> u32 {
        if !reg.accepts_size(size) {
            debug!(channel = %self.id, ?reg, size, "unexpected read size");
        }

        let device = self.regs.selected_device_index();
        if !self.devices[device].is_attached() && reg != Register::StatusCommand {
            return 0;
        }

        match reg {
            Register::Data => self.read_data(size),
            Register::ErrorFeatures => u32::from(self.regs.error.bits()),
            Register::SectorCount => u32::from(self.regs.sector_count),
            Register::SectorNumber => u32::from(self.regs.sector_number),
            Register::CylinderLow => u32::from(self.regs.cylinder & 0xFF),
            Register::CylinderHigh => u32::from(self.regs.cylinder >> 8),
            Register::DeviceHead => u32::from(self.regs.device_head),
            Register::StatusCommand => u32::from(self.read_status()),
        }
    }

    pub fn write_command_port(&mut self, reg: Register, value: u32, size: u8) {
        if !reg.accepts_size(size) {
            debug!(channel = %self.id, ?reg, size, "unexpected write size");
        }

        // [7.15.6.1] Writes are ignored while BSY is set, except Device Reset.
        if self.regs.status.contains(Status::BSY)
            && !(reg == Register::StatusCommand && value as u8 == Opcode::DeviceReset as u8)
        {
            trace!(channel = %self.id, ?reg, value, "write ignored while busy");
            return;
        }

        let byte = value as u8;
        match reg {
            Register::Data => self.write_data(value, size),
            Register::ErrorFeatures => self.regs.features = byte,
            Register::SectorCount => self.regs.sector_count = byte,
            Register::SectorNumber => self.regs.sector_number = byte,
            Register::CylinderLow => {
                self.regs.cylinder = (self.regs.cylinder & 0xFF00) | u16::from(byte);
            }
            Register::CylinderHigh => {
                self.regs.cylinder = (self.regs.cylinder & 0x00FF) | (u16::from(byte) << 8);
            }
            Register::DeviceHead => self.regs.device_head = byte,
            Register::StatusCommand => self.write_command(byte),
        }
    }

    /// Alternate Status. Same bits as Status, without acknowledging the interrupt.
    pub fn read_control_port(&mut self, size: u8) -> u32 {
        if size != 1 {
            debug!(channel = %self.id, size, "unexpected alternate status read size");
        }
        u32::from(self.regs.status.bits())
    }

    /// Device Control.
    pub fn write_control_port(&mut self, value: u32, size: u8) {
        if size != 1 {
            debug!(channel = %self.id, size, "unexpected device control write size");
        }

        let control = DeviceControl::from_bits_retain(value as u8);

        // Drop INTRQ while the old value still enables interrupts, so the
        // handler sees the line go low.
        if control.contains(DeviceControl::NIEN) {
            self.set_interrupt(false);
        }

        if control.contains(DeviceControl::SRST) {
            debug!(
                channel = %self.id,
                command = ?self.current_opcode(),
                "software reset"
            );
            self.current = None;
            for device in &mut self.devices {
                device.reset_buffer();
            }
            self.regs.status.remove(Status::BSY | Status::DRQ);
            self.regs.status.insert(Status::DRDY);
        }

        self.regs.control = control;
    }

    /// Bus-master read for the command in progress.
    pub fn read_dma(&mut self, dst: &mut [u8]) -> DmaTransferResult {
        match self.with_current(|command, ctx| command.read_dma(ctx, dst)) {
            Some(result) => result,
            None => {
                warn!(
                    channel = %self.id,
                    device = self.regs.selected_device_index(),
                    size = dst.len(),
                    "DMA read with no command in progress"
                );
                DmaTransferResult::Error
            }
        }
    }

    /// Bus-master write for the command in progress.
    pub fn write_dma(&mut self, src: &[u8]) -> DmaTransferResult {
        match self.with_current(|command, ctx| command.write_dma(ctx, src)) {
            Some(result) => result,
            None => {
                warn!(
                    channel = %self.id,
                    device = self.regs.selected_device_index(),
                    size = src.len(),
                    "DMA write with no command in progress"
                );
                DmaTransferResult::Error
            }
        }
    }

    fn read_status(&mut self) -> u8 {
        // [7.15.4] Reading Status acknowledges a pending interrupt.
        self.set_interrupt(false);
        self.regs.status.bits()
    }

    fn read_data(&mut self, size: u8) -> u32 {
        let len = usize::from(size).min(4);
        let mut bytes = [0u8; 4];
        if self
            .with_current(|command, ctx| command.read_data(ctx, &mut bytes[..len]))
            .is_none()
        {
            warn!(
                channel = %self.id,
                device = self.regs.selected_device_index(),
                size,
                "data read with no command in progress"
            );
        }
        u32::from_le_bytes(bytes)
    }

    fn write_data(&mut self, value: u32, size: u8) {
        let len = usize::from(size).min(4);
        let bytes = value.to_le_bytes();
        if self
            .with_current(|command, ctx| command.write_data(ctx, &bytes[..len]))
            .is_none()
        {
            warn!(
                channel = %self.id,
                device = self.regs.selected_device_index(),
                size,
                "data write with no command in progress"
            );
        }
    }

    fn write_command(&mut self, value: u8) {
        let device = self.regs.selected_device_index();
        let opcode = Opcode::try_from(value);

        if let Some(active) = &self.current {
            if opcode == Ok(Opcode::DeviceReset) {
                debug!(
                    channel = %self.id,
                    device,
                    preempted = ?active.opcode,
                    "device reset discards the command in progress"
                );
                self.current = None;
            } else {
                warn!(
                    channel = %self.id,
                    device,
                    opcode = value,
                    in_progress = ?active.opcode,
                    "command written while another command is in progress"
                );
                self.regs.status.insert(Status::ERR);
                self.set_interrupt(true);
                return;
            }
        }

        // An empty slot never owns a command; its Data reads are gated to zero
        // and would never drain one.
        if !self.devices[device].is_attached() {
            debug!(channel = %self.id, device, opcode = value, "command to an absent device");
            self.regs.error = ErrorBits::ABRT;
            self.regs.status.remove(Status::BSY | Status::DRQ | Status::DF);
            self.regs.status.insert(Status::ERR);
            self.set_interrupt(true);
            return;
        }

        let Ok(opcode) = opcode else {
            warn!(channel = %self.id, device, opcode = value, "unhandled command");
            self.regs.error |= ErrorBits::ABRT;
            self.regs.status.insert(Status::ERR);
            self.set_interrupt(true);
            return;
        };

        trace!(channel = %self.id, device, ?opcode, "executing command");
        self.regs.error = ErrorBits::empty();
        self.regs.status.remove(Status::ERR | Status::DF);
        self.regs.status.insert(Status::BSY);

        let mut command = AtaCommand::new(opcode);
        let mut ctx = CommandContext {
            regs: &mut self.regs,
            device: &mut self.devices[device],
            interrupt: &mut self.interrupt,
        };
        command.execute(&mut ctx);

        if !command.is_finished() {
            self.current = Some(ActiveCommand {
                device,
                opcode,
                command,
            });
        }
    }

    /// Runs `f` against the command in progress and releases the command once
    /// it reports itself finished.
    fn with_current<R>(
        &mut self,
        f: impl FnOnce(&mut AtaCommand, &mut CommandContext<'_>) -> R,
    ) -> Option<R> {
        let active = self.current.as_mut()?;
        let mut ctx = CommandContext {
            regs: &mut self.regs,
            device: &mut self.devices[active.device],
            interrupt: &mut self.interrupt,
        };
        let result = f(&mut active.command, &mut ctx);
        if active.command.is_finished() {
            self.current = None;
        }
        Some(result)
    }

    fn set_interrupt(&mut self, asserted: bool) {
        let enabled = self.regs.interrupts_enabled();
        self.interrupt.set(asserted, enabled);
    }
}

impl std::fmt::Debug for AtaChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtaChannel")
            .field("id", &self.id)
            .field("regs", &self.regs)
            .field("devices", &self.devices)
            .field("interrupt", &self.interrupt)
            .field("current", &self.current_opcode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::drivers::{DvdDrive, HardDrive};

    type Events = Arc<Mutex<Vec<(u8, bool)>>>;

    fn channel_with_hdd() -> (AtaChannel, Events) {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let mut chan = AtaChannel::new(
            ChannelId::Primary,
            14,
            Box::new(move |irq, level| sink.lock().unwrap().push((irq, level))),
        );
        chan.attach(0, Box::new(HardDrive::dummy()));
        (chan, events)
    }

    #[test]
    fn unattached_device_reads_zero_except_status() {
        let (mut chan, _) = channel_with_hdd();
        chan.write_command_port(Register::SectorCount, 0x42, 1);
        chan.write_command_port(Register::DeviceHead, 0x10, 1);

        assert_eq!(chan.read_command_port(Register::SectorCount, 1), 0);
        assert_eq!(
            chan.read_command_port(Register::StatusCommand, 1),
            u32::from(Status::DRDY.bits())
        );

        chan.write_command_port(Register::DeviceHead, 0x00, 1);
        assert_eq!(chan.read_command_port(Register::SectorCount, 1), 0x42);
    }

    #[test]
    fn cylinder_bytes_are_independent() {
        let (mut chan, _) = channel_with_hdd();
        chan.write_command_port(Register::CylinderLow, 0x34, 1);
        chan.write_command_port(Register::CylinderHigh, 0x12, 1);
        assert_eq!(chan.registers().cylinder, 0x1234);
        assert_eq!(chan.read_command_port(Register::CylinderLow, 1), 0x34);
        assert_eq!(chan.read_command_port(Register::CylinderHigh, 1), 0x12);
    }

    #[test]
    fn unknown_opcode_raises_error_without_a_command() {
        let (mut chan, events) = channel_with_hdd();
        chan.write_command_port(Register::StatusCommand, 0x20, 1);

        assert!(!chan.is_command_in_progress());
        assert!(chan.registers().status.contains(Status::ERR));
        assert!(chan.registers().error.contains(ErrorBits::ABRT));
        assert_eq!(*events.lock().unwrap(), vec![(14, true)]);
    }

    #[test]
    fn status_read_acknowledges_interrupt_but_alternate_status_does_not() {
        let (mut chan, events) = channel_with_hdd();
        chan.write_command_port(Register::StatusCommand, 0x20, 1);
        assert!(chan.interrupt_asserted());

        chan.read_control_port(1);
        assert!(chan.interrupt_asserted());

        chan.read_command_port(Register::StatusCommand, 1);
        assert!(!chan.interrupt_asserted());
        assert_eq!(*events.lock().unwrap(), vec![(14, true), (14, false)]);
    }

    #[test]
    fn writes_are_ignored_while_busy() {
        let (mut chan, _) = channel_with_hdd();
        chan.regs.status.insert(Status::BSY);
        chan.write_command_port(Register::SectorCount, 0x10, 1);
        assert_eq!(chan.registers().sector_count, 0);
    }

    #[test]
    fn command_while_another_is_in_progress_is_rejected() {
        let (mut chan, events) = channel_with_hdd();
        chan.write_command_port(Register::StatusCommand, Opcode::IdentifyDevice as u32, 1);
        assert_eq!(chan.current_opcode(), Some(Opcode::IdentifyDevice));
        chan.read_command_port(Register::StatusCommand, 1);

        chan.write_command_port(Register::StatusCommand, Opcode::SetFeatures as u32, 1);
        assert_eq!(chan.current_opcode(), Some(Opcode::IdentifyDevice));
        assert!(chan.registers().status.contains(Status::ERR));
        assert_eq!(events.lock().unwrap().last(), Some(&(14, true)));
    }

    #[test]
    fn device_reset_preempts_a_command_on_a_packet_device() {
        let mut chan = AtaChannel::new(ChannelId::Secondary, 15, Box::new(crate::interrupt::NoIrq));
        chan.attach(0, Box::new(DvdDrive::dummy()));

        chan.write_command_port(Register::StatusCommand, Opcode::IdentifyPacketDevice as u32, 1);
        assert!(chan.is_command_in_progress());

        chan.write_command_port(Register::StatusCommand, Opcode::DeviceReset as u32, 1);
        assert!(!chan.is_command_in_progress());
        let regs = chan.registers();
        assert_eq!(regs.cylinder, 0xEB14);
        assert_eq!(regs.error.bits(), 0x01);
        assert!(regs.status.contains(Status::DRDY));
        assert!(!regs.status.intersects(Status::BSY | Status::DRQ | Status::ERR));
    }

    #[test]
    fn device_reset_passes_the_busy_gate() {
        let mut chan = AtaChannel::new(ChannelId::Secondary, 15, Box::new(crate::interrupt::NoIrq));
        chan.attach(0, Box::new(DvdDrive::dummy()));
        chan.regs.status.insert(Status::BSY);

        chan.write_command_port(Register::StatusCommand, Opcode::IdentifyPacketDevice as u32, 1);
        assert!(!chan.is_command_in_progress());
        assert_eq!(chan.registers().cylinder, 0);

        chan.write_command_port(Register::StatusCommand, Opcode::DeviceReset as u32, 1);
        let regs = chan.registers();
        assert_eq!(regs.cylinder, 0xEB14);
        assert_eq!(regs.error.bits(), 0x01);
        assert!(regs.status.contains(Status::DRDY));
        assert!(!regs.status.intersects(Status::BSY | Status::DRQ | Status::ERR));
        assert!(!chan.is_command_in_progress());
    }

    #[test]
    fn command_to_an_absent_device_aborts_without_a_command() {
        let (mut chan, events) = channel_with_hdd();
        chan.write_command_port(Register::DeviceHead, 0xB0, 1);
        chan.write_command_port(Register::StatusCommand, Opcode::IdentifyDevice as u32, 1);

        assert!(!chan.is_command_in_progress());
        assert_eq!(chan.registers().error, ErrorBits::ABRT);
        assert!(chan.registers().status.contains(Status::ERR));
        assert_eq!(*events.lock().unwrap(), vec![(14, true)]);

        chan.write_command_port(Register::DeviceHead, 0xA0, 1);
        chan.write_command_port(Register::StatusCommand, Opcode::IdentifyDevice as u32, 1);
        assert_eq!(chan.current_opcode(), Some(Opcode::IdentifyDevice));
        assert!(!chan.registers().status.contains(Status::ERR));
    }

    #[test]
    fn nien_masks_interrupts() {
        let (mut chan, events) = channel_with_hdd();
        chan.write_control_port(u32::from(DeviceControl::NIEN.bits()), 1);
        chan.write_command_port(Register::StatusCommand, 0x20, 1);
        assert!(chan.registers().status.contains(Status::ERR));
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn data_access_without_command_is_harmless() {
        let (mut chan, _) = channel_with_hdd();
        assert_eq!(chan.read_command_port(Register::Data, 2), 0);
        chan.write_command_port(Register::Data, 0xBEEF, 2);
        assert!(!chan.is_command_in_progress());
        assert_eq!(chan.read_dma(&mut [0u8; 512]), DmaTransferResult::Error);
    }
}
