//! Commands and the contexts they act on.

use crate::{CommandError, ExecutionEnvironment};
use sbor::{BasicDecode, BasicEncode};

/// Shared state a command acts on.
///
/// Any value that can be stored qualifies.
pub trait Context: BasicEncode + BasicDecode + Send + 'static {}

impl<T: BasicEncode + BasicDecode + Send + 'static> Context for T {}

/// A unit of work submitted against a context.
///
/// Commands are stored encoded and decoded again when they run, so the
/// executing member needs the type registered in its
/// [`CommandRegistry`](crate::CommandRegistry) under [`Command::NAME`].
///
/// # Recovery
///
/// A command may run more than once for the same ticket when its first
/// attempt was interrupted. Replays see
/// [`is_recovering`](ExecutionEnvironment::is_recovering) set and can use
/// checkpoints to skip work that already happened.
pub trait Command: BasicEncode + BasicDecode + Send + 'static {
    /// The context type this command acts on.
    type Context: Context;

    /// Name the command type is stored and registered under.
    const NAME: &'static str;

    /// Run the command.
    ///
    /// Changes made to the context through `environment` are written back
    /// when this returns `Ok`. On `Err` the context is left as it was.
    fn execute(&self, environment: &mut ExecutionEnvironment<Self::Context>)
        -> Result<(), CommandError>;
}
