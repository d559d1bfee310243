/// Receives INTRQ level changes for one channel's IRQ line.
pub trait IrqHandler: Send {
    fn handle_irq(&mut self, irq: u8, level: bool);
}

impl<F> IrqHandler for F
where
    F: FnMut(u8, bool) + Send,
{
    fn handle_irq(&mut self, irq: u8, level: bool) {
        self(irq, level)
    }
}

/// Discards every level change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIrq;

impl IrqHandler for NoIrq {
    fn handle_irq(&mut self, _irq: u8, _level: bool) {}
}

/// The channel's INTRQ output.
///
/// Level changes are forwarded only on an edge and only while interrupts are
/// enabled (nIEN clear). A change requested while nIEN is set is dropped, not
/// latched.
pub struct InterruptLine {
    irq: u8,
    level: bool,
    handler: Box<dyn IrqHandler>,
}

impl InterruptLine {
    pub fn new(irq: u8, handler: Box<dyn IrqHandler>) -> Self {
        Self {
            irq,
            level: false,
            handler,
        }
    }

    pub fn irq(&self) -> u8 {
        self.irq
    }

    pub fn is_asserted(&self) -> bool {
        self.level
    }

    pub fn set(&mut self, asserted: bool, enabled: bool) {
        if asserted != self.level && enabled {
            self.level = asserted;
            self.handler.handle_irq(self.irq, asserted);
        }
    }
}

impl std::fmt::Debug for InterruptLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptLine")
            .field("irq", &self.irq)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}
