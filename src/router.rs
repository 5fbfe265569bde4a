use anyhow::{bail, Result};

use crate::command::{CmdType, Command};

/// Handlers are plain function pointers taking the engine and the command.
/// Keeping them as `fn` items instead of boxed closures lets `dispatch` copy
/// the handler out of the table before re-borrowing the engine mutably.
pub type Handler<E> = fn(&mut E, &Command);

/// Fixed-size dispatch table, one slot per command-type ordinal.
///
/// Each memory standard assembles its own handler set over the same table
/// shape.  Registration is init-time only: registering a slot twice is a
/// programming error and panics, and dispatching a command type that was
/// never routed surfaces as an `Err` instead of being silently dropped.
pub struct CommandRouter<E> {
    table: Vec<Option<Handler<E>>>,
}

impl<E> CommandRouter<E> {
    pub fn new() -> Self {
        Self {
            table: vec![None; CmdType::COUNT],
        }
    }

    pub fn route(&mut self, kind: CmdType, handler: Handler<E>) {
        let slot = &mut self.table[kind as usize];
        assert!(slot.is_none(), "handler for {} registered twice", kind);
        *slot = Some(handler);
    }

    pub fn lookup(&self, kind: CmdType) -> Result<Handler<E>> {
        match self.table[kind as usize] {
            Some(handler) => Ok(handler),
            None => bail!("no handler routed for command type {}", kind),
        }
    }

    pub fn is_routed(&self, kind: CmdType) -> bool {
        self.table[kind as usize].is_some()
    }
}

impl<E> Default for CommandRouter<E> {
    fn default() -> Self {
        Self::new()
    }
}
