use super::CommandContext;
use crate::defs::{Protocol, Status};

/// The command-specific half of a [9.9] non-data command.
pub trait NonDataCommand {
    /// Runs the command. Returns `false` if it failed; the Error register
    /// should already say why.
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> bool;
}

/// [9.9] Non-data protocol.
#[derive(Debug)]
pub struct NonData<C> {
    command: C,
    finished: bool,
}

impl<C: NonDataCommand> NonData<C> {
    pub fn new(command: C) -> Self {
        Self {
            command,
            finished: false,
        }
    }

    pub fn execute(&mut self, ctx: &mut CommandContext<'_>) {
        let succeeded = self.command.execute(ctx);
        if !succeeded {
            ctx.regs.status |= Status::ERR;
        }
        ctx.regs.status.remove(Status::BSY);
        if !succeeded || Protocol::NonData.info().assert_intrq_on_success {
            ctx.assert_interrupt();
        }
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
