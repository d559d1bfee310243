use tracing::{debug, trace};

use crate::channel::AtaChannel;
use crate::defs::{ChannelId, DmaTransferResult, Register};
use crate::drivers::AtaDeviceDriver;
use crate::interrupt::IrqHandler;

/// Legacy port assignment for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtaPortMap {
    /// First of eight command block ports.
    pub cmd_base: u16,
    /// Alternate Status / Device Control.
    pub ctrl_base: u16,
    pub irq: u8,
}

pub const PRIMARY_PORTS: AtaPortMap = AtaPortMap {
    cmd_base: 0x1F0,
    ctrl_base: 0x3F6,
    irq: 14,
};

pub const SECONDARY_PORTS: AtaPortMap = AtaPortMap {
    cmd_base: 0x170,
    ctrl_base: 0x376,
    irq: 15,
};

impl AtaPortMap {
    pub fn for_channel(id: ChannelId) -> Self {
        match id {
            ChannelId::Primary => PRIMARY_PORTS,
            ChannelId::Secondary => SECONDARY_PORTS,
        }
    }
}

enum PortTarget {
    Command(ChannelId, Register),
    Control(ChannelId),
}

/// Both IDE channels behind their legacy I/O ports.
pub struct AtaController {
    channels: [AtaChannel; 2],
}

impl AtaController {
    pub fn new(primary_irq: Box<dyn IrqHandler>, secondary_irq: Box<dyn IrqHandler>) -> Self {
        Self {
            channels: [
                AtaChannel::new(ChannelId::Primary, PRIMARY_PORTS.irq, primary_irq),
                AtaChannel::new(ChannelId::Secondary, SECONDARY_PORTS.irq, secondary_irq),
            ],
        }
    }

    pub fn channel(&self, id: ChannelId) -> &AtaChannel {
        &self.channels[id.index()]
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> &mut AtaChannel {
        &mut self.channels[id.index()]
    }

    /// Attaches `driver` at `device` (0 = master, 1 = slave) on `channel`,
    /// returning the driver it replaces.
    pub fn attach(
        &mut self,
        channel: ChannelId,
        device: usize,
        driver: Box<dyn AtaDeviceDriver>,
    ) -> Box<dyn AtaDeviceDriver> {
        debug!(%channel, device, "attaching device driver");
        self.channel_mut(channel).attach(device, driver)
    }

    pub fn claims_port(&self, port: u16) -> bool {
        Self::decode(port).is_some()
    }

    pub fn io_read(&mut self, port: u16, size: u8) -> u32 {
        if size == 0 {
            return 0;
        }

        match Self::decode(port) {
            Some(PortTarget::Command(id, reg)) => self.channel_mut(id).read_command_port(reg, size),
            Some(PortTarget::Control(id)) => self.channel_mut(id).read_control_port(size),
            None => {
                trace!(port, size, "read from unclaimed port");
                match size {
                    1 => 0xFF,
                    2 => 0xFFFF,
                    _ => 0xFFFF_FFFF,
                }
            }
        }
    }

    pub fn io_write(&mut self, port: u16, size: u8, value: u32) {
        if size == 0 {
            return;
        }

        match Self::decode(port) {
            Some(PortTarget::Command(id, reg)) => {
                self.channel_mut(id).write_command_port(reg, value, size)
            }
            Some(PortTarget::Control(id)) => self.channel_mut(id).write_control_port(value, size),
            None => trace!(port, size, value, "write to unclaimed port"),
        }
    }

    pub fn read_dma(&mut self, channel: ChannelId, dst: &mut [u8]) -> DmaTransferResult {
        self.channel_mut(channel).read_dma(dst)
    }

    pub fn write_dma(&mut self, channel: ChannelId, src: &[u8]) -> DmaTransferResult {
        self.channel_mut(channel).write_dma(src)
    }

    fn decode(port: u16) -> Option<PortTarget> {
        for id in ChannelId::ALL {
            let ports = AtaPortMap::for_channel(id);
            if let Some(reg) = Register::from_offset(port.wrapping_sub(ports.cmd_base)) {
                return Some(PortTarget::Command(id, reg));
            }
            if port == ports.ctrl_base {
                return Some(PortTarget::Control(id));
            }
        }
        None
    }
}

impl std::fmt::Debug for AtaController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtaController")
            .field("primary", &self.channels[0])
            .field("secondary", &self.channels[1])
            .finish()
    }
}
