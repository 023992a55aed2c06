//! Ordered execution of submitted commands.

use crate::entries::{Caches, CommandExecutionRequest, ContextEntry, RequestStatus};
use crate::{CommandError, CommandRegistry, ExecutionError, ExecutionFrame};
use conductor_core::GridStore;
use conductor_types::{ContextConfiguration, ContextIdentifier, EntryKey, RequestIdentifier};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How an execution attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command returned `Ok` and its context was written back.
    Completed,
    /// The command or its decoding failed. The context was left unchanged.
    Failed(String),
}

/// Result of running one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub identifier: RequestIdentifier,
    pub outcome: CommandOutcome,
    /// Whether the attempt replayed an interrupted one.
    pub recovered: bool,
}

/// Which stored requests an executor pass claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Requests waiting to run.
    Pending,
    /// Requests left claimed by an interrupted attempt.
    Recovery,
}

impl Pass {
    fn claims(self, status: RequestStatus) -> bool {
        match self {
            Pass::Pending => status == RequestStatus::Submitted,
            Pass::Recovery => status == RequestStatus::Executing,
        }
    }
}

/// Result of trying to claim a request.
#[derive(Debug)]
enum Claim {
    Claimed(CommandExecutionRequest),
    /// The request finished or was cancelled.
    Gone,
    /// The request is in a status the pass does not handle.
    Blocked(RequestStatus),
}

/// Runs the submitted commands of a context in ticket order.
///
/// A context is driven by at most one pass of this executor at a time.
/// A pass stops at the first request it cannot claim, so a request claimed
/// by another executor holds back every later ticket of the context until
/// it finishes. Running a request:
///
/// 1. Claim it by moving it to [`RequestStatus::Executing`]. Claimed
///    requests can no longer be cancelled.
/// 2. Run the command against the current context value.
/// 3. Under the context's entry: write back the new value if the command
///    succeeded, stop tracking the ticket and remove the request. If the
///    value changed since it was read, the command runs again instead.
///
/// An attempt interrupted between 1 and 3 leaves the request claimed. It is
/// replayed by [`CommandExecutor::recover`].
pub struct CommandExecutor {
    caches: Caches,
    registry: Arc<CommandRegistry>,
    running: Mutex<HashMap<ContextIdentifier, Arc<Mutex<()>>>>,
}

impl CommandExecutor {
    pub fn new(store: Arc<dyn GridStore>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            caches: Caches::new(store),
            registry,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Run every submitted request of `context`, lowest ticket first.
    pub fn execute_pending(
        &self,
        context: &ContextIdentifier,
    ) -> Result<Vec<ExecutionReport>, ExecutionError> {
        self.drive(context, Pass::Pending)
    }

    /// Replay every request of `context` whose attempt was interrupted.
    ///
    /// Replays see [`is_recovering`](crate::ExecutionEnvironment::is_recovering)
    /// set and any checkpoint the interrupted attempt saved.
    pub fn recover(
        &self,
        context: &ContextIdentifier,
    ) -> Result<Vec<ExecutionReport>, ExecutionError> {
        self.drive(context, Pass::Recovery)
    }

    fn drive(
        &self,
        context: &ContextIdentifier,
        pass: Pass,
    ) -> Result<Vec<ExecutionReport>, ExecutionError> {
        let guard = self.context_guard(context);
        let _running = guard.lock();

        let key = ContextEntry::key(context);
        let entry = self
            .caches
            .contexts
            .get(&key)?
            .ok_or_else(|| ExecutionError::UnknownContext(context.clone()))?;
        let configuration = entry.configuration();

        let mut reports = Vec::new();
        for ticket in entry.outstanding_tickets()? {
            let identifier = RequestIdentifier::new(context.clone(), ticket);
            let request_key = entry.request_key(&identifier);

            let request = match self.claim(&request_key, pass)? {
                Claim::Claimed(request) => request,
                Claim::Gone => continue,
                Claim::Blocked(status) => {
                    debug!(request = %identifier, %status, "Stopping at unclaimable command");
                    break;
                }
            };
            if pass == Pass::Recovery {
                info!(request = %identifier, attempt = request.attempts(), "Replaying interrupted command");
            }

            reports.push(self.run(identifier, &request_key, configuration, request, pass)?);
        }
        Ok(reports)
    }

    /// Claim the request under `request_key` if `pass` handles its status.
    fn claim(&self, request_key: &EntryKey, pass: Pass) -> Result<Claim, ExecutionError> {
        let claim = self.caches.requests.invoke(request_key, |slot| match slot.as_mut() {
            None => Claim::Gone,
            Some(request) if pass.claims(request.status()) => {
                request.start_attempt();
                Claim::Claimed(request.clone())
            }
            Some(request) => Claim::Blocked(request.status()),
        })?;
        Ok(claim)
    }

    fn run(
        &self,
        identifier: RequestIdentifier,
        request_key: &EntryKey,
        configuration: ContextConfiguration,
        request: CommandExecutionRequest,
        pass: Pass,
    ) -> Result<ExecutionReport, ExecutionError> {
        let context_key = ContextEntry::key(identifier.context());
        let recovering = pass == Pass::Recovery;

        let outcome = loop {
            debug!(request = %identifier, command = request.command_type(), recovering, "Executing command");

            let result = match self.caches.contexts.get(&context_key)? {
                Some(entry) => {
                    let frame = ExecutionFrame::new(
                        identifier.clone(),
                        configuration,
                        recovering,
                        self.caches.requests.clone(),
                        request_key.clone(),
                    );
                    self.registry
                        .run(request.command_type(), request.command(), entry.value(), frame)
                        .map(|value| (entry.version(), value))
                }
                None => Err(CommandError::Failed(format!(
                    "context {} was removed",
                    identifier.context()
                ))),
            };

            match result {
                Ok(update) => {
                    if self.finish(&context_key, request_key, &identifier, Some(update))? {
                        debug!(request = %identifier, "Command completed");
                        break CommandOutcome::Completed;
                    }
                    debug!(request = %identifier, "Context changed while running, rerunning");
                }
                Err(error) => {
                    self.finish(&context_key, request_key, &identifier, None)?;
                    warn!(request = %identifier, error = %error, "Command failed");
                    break CommandOutcome::Failed(error.to_string());
                }
            }
        };

        Ok(ExecutionReport {
            identifier,
            outcome,
            recovered: recovering,
        })
    }

    /// Commit a finished attempt under the context's entry.
    ///
    /// `update` carries the new value and the version it was computed from.
    /// Returns `false` without committing if the version moved on since.
    fn finish(
        &self,
        context_key: &EntryKey,
        request_key: &EntryKey,
        identifier: &RequestIdentifier,
        update: Option<(u64, Vec<u8>)>,
    ) -> Result<bool, ExecutionError> {
        self.caches
            .contexts
            .invoke(context_key, |slot| -> Result<bool, ExecutionError> {
                if let Some(entry) = slot.as_mut() {
                    if let Some((seen, value)) = update {
                        if entry.version() != seen {
                            return Ok(false);
                        }
                        entry.update_value(value);
                    }
                    entry.release(identifier.ticket())?;
                }
                self.caches.requests.remove(request_key)?;
                Ok(true)
            })?
    }

    fn context_guard(&self, context: &ContextIdentifier) -> Arc<Mutex<()>> {
        Arc::clone(self.running.lock().entry(context.clone()).or_default())
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
