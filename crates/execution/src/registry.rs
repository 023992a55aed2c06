//! Lookup of command types by name.

use crate::{Command, CommandError, ExecutionEnvironment, ExecutionFrame};
use conductor_core::codec;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Decodes a stored command and context, runs the command and returns the
/// encoded context it left behind.
type Runner =
    dyn Fn(&[u8], &[u8], ExecutionFrame) -> Result<Vec<u8>, CommandError> + Send + Sync;

/// Command types this member knows how to run.
#[derive(Default)]
pub struct CommandRegistry {
    runners: RwLock<HashMap<&'static str, Arc<Runner>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `Cmd` under [`Command::NAME`], replacing any earlier
    /// registration of that name.
    pub fn register<Cmd: Command>(&self) {
        let runner: Arc<Runner> = Arc::new(
            |command: &[u8], context: &[u8], frame: ExecutionFrame| -> Result<Vec<u8>, CommandError> {
                let command: Cmd = codec::decode(command)?;
                let context: Cmd::Context = codec::decode(context)?;

                let mut environment = ExecutionEnvironment::new(frame, context);
                command.execute(&mut environment)?;

                Ok(codec::encode(environment.context())?)
            },
        );
        self.runners.write().insert(Cmd::NAME, runner);
    }

    pub fn contains(&self, command_type: &str) -> bool {
        self.runners.read().contains_key(command_type)
    }

    /// Run the stored command of type `command_type` against `context`.
    pub(crate) fn run(
        &self,
        command_type: &str,
        command: &[u8],
        context: &[u8],
        frame: ExecutionFrame,
    ) -> Result<Vec<u8>, CommandError> {
        let runner = self
            .runners
            .read()
            .get(command_type)
            .cloned()
            .ok_or_else(|| CommandError::UnknownCommand(command_type.to_string()))?;
        runner(command, context, frame)
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.runners.read().keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("CommandRegistry")
            .field("commands", &names)
            .finish()
    }
}
