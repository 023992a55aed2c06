//! Submission and cancellation of commands.

use crate::entries::{
    Caches, CommandExecutionRequest, ContextEntry, PendingSubmissions, RequestStatus,
};
use crate::tickets::TicketSource;
use crate::{Command, SubmissionError, SubmitterConfig};
use conductor_aggregation::try_aggregate_partitions;
use conductor_core::{codec, GridStore, StoreError};
use conductor_types::{ContextIdentifier, RequestIdentifier, SubmissionOutcome, Ticket, TicketBook};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Submits commands against contexts and cancels them.
///
/// Each submission runs atomically against the addressed context's entry.
/// The outcome is decided there:
///
/// - **Context registered**: the command is stored as a submitted request
///   and its ticket is tracked by the context
/// - **Context missing, queuing allowed**: the command is queued until the
///   context is registered
/// - **Context missing**: [`SubmissionOutcome::UnknownContext`]
///
/// Tickets are reserved from the store in blocks, so a submitter never
/// reuses a ticket issued by another submitter of the same issuer.
#[derive(Debug)]
pub struct CommandSubmitter {
    caches: Caches,
    config: SubmitterConfig,
    tickets: TicketSource,
}

impl CommandSubmitter {
    pub fn new(store: Arc<dyn GridStore>, config: SubmitterConfig) -> Self {
        let caches = Caches::new(store);
        Self {
            tickets: TicketSource::new(
                &caches,
                config.issuer_id,
                "tickets",
                config.ticket_block_size,
            ),
            caches,
            config,
        }
    }

    /// Submit `command` against `context`, reporting a missing context as an
    /// outcome.
    pub fn try_submit_command<Cmd: Command>(
        &self,
        context: &ContextIdentifier,
        command: &Cmd,
        allow_submission_when_context_does_not_exist: bool,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let command = codec::encode(command)?;
        let key = ContextEntry::key(context);

        self.caches
            .contexts
            .invoke(&key, |slot| -> Result<SubmissionOutcome, SubmissionError> {
                match slot.as_mut() {
                    Some(entry) => {
                        let identifier = RequestIdentifier::new(context.clone(), self.tickets.next()?);
                        let management_strategy = entry.configuration().management_strategy();
                        let request = CommandExecutionRequest::new(
                            identifier.clone(),
                            Cmd::NAME,
                            command,
                            management_strategy,
                            RequestStatus::Submitted,
                        );
                        let request_key = request.key();

                        if !self.caches.insert_request(request)? {
                            warn!(request = %identifier, "Ticket already in use");
                            return Err(SubmissionError::TicketInUse(identifier));
                        }
                        entry.track(identifier.ticket());

                        debug!(
                            request = %identifier,
                            command = Cmd::NAME,
                            strategy = %management_strategy,
                            "Command accepted"
                        );
                        Ok(SubmissionOutcome::Accepted {
                            identifier,
                            management_strategy,
                            request_key,
                        })
                    }
                    None if allow_submission_when_context_does_not_exist => {
                        let identifier = RequestIdentifier::new(context.clone(), self.tickets.next()?);
                        let management_strategy = self.config.default_management_strategy;
                        let request = CommandExecutionRequest::new(
                            identifier.clone(),
                            Cmd::NAME,
                            command,
                            management_strategy,
                            RequestStatus::PendingContext,
                        );
                        let request_key = request.key();

                        let queued = self
                            .caches
                            .pending
                            .invoke(&PendingSubmissions::key(context), |pending| {
                                let pending = pending.get_or_insert_with(Default::default);
                                if pending.find(request.ticket()).is_some() {
                                    return false;
                                }
                                pending.push(request);
                                true
                            })?;
                        if !queued {
                            warn!(request = %identifier, "Ticket already in use");
                            return Err(SubmissionError::TicketInUse(identifier));
                        }

                        info!(
                            request = %identifier,
                            command = Cmd::NAME,
                            "Command queued until its context is registered"
                        );
                        Ok(SubmissionOutcome::Accepted {
                            identifier,
                            management_strategy,
                            request_key,
                        })
                    }
                    None => {
                        warn!(context = %context, command = Cmd::NAME, "Unknown context");
                        Ok(SubmissionOutcome::UnknownContext {
                            context: context.clone(),
                        })
                    }
                }
            })?
    }

    /// Submit `command` against `context`.
    ///
    /// Fails with [`SubmissionError::UnknownContext`] if the context is not
    /// registered and queuing was not allowed.
    pub fn submit_command<Cmd: Command>(
        &self,
        context: &ContextIdentifier,
        command: &Cmd,
        allow_submission_when_context_does_not_exist: bool,
    ) -> Result<RequestIdentifier, SubmissionError> {
        match self.try_submit_command(
            context,
            command,
            allow_submission_when_context_does_not_exist,
        )? {
            SubmissionOutcome::Accepted { identifier, .. } => Ok(identifier),
            SubmissionOutcome::UnknownContext { context } => {
                Err(SubmissionError::UnknownContext(context))
            }
        }
    }

    /// Cancel a command that has not started executing.
    ///
    /// Returns `false` if the command already started, finished or was
    /// cancelled before.
    pub fn cancel_command(&self, identifier: &RequestIdentifier) -> Result<bool, SubmissionError> {
        let ticket = identifier.ticket();
        let key = ContextEntry::key(identifier.context());

        let cancelled = self
            .caches
            .contexts
            .invoke(&key, |slot| -> Result<bool, SubmissionError> {
                let Some(entry) = slot.as_mut() else {
                    return self.cancel_pending(identifier.context(), ticket);
                };

                let request_key = entry.request_key(identifier);
                let removed = self.caches.requests.invoke(&request_key, |request| {
                    let submitted = request
                        .as_ref()
                        .is_some_and(|request| request.status() == RequestStatus::Submitted);
                    if submitted {
                        *request = None;
                    }
                    submitted
                })?;

                if removed {
                    entry.release(ticket)?;
                }
                Ok(removed)
            })??;

        debug!(request = %identifier, cancelled, "Cancellation processed");
        Ok(cancelled)
    }

    /// Status of a request that is still stored.
    ///
    /// Returns `None` once the request completed, failed or was cancelled.
    pub fn request_status(
        &self,
        identifier: &RequestIdentifier,
    ) -> Result<Option<RequestStatus>, SubmissionError> {
        let ticket = identifier.ticket();
        match self.caches.contexts.get(&ContextEntry::key(identifier.context()))? {
            Some(entry) => {
                let request = self.caches.requests.get(&entry.request_key(identifier))?;
                Ok(request.map(|request| request.status()))
            }
            None => {
                let pending = self
                    .caches
                    .pending
                    .get(&PendingSubmissions::key(identifier.context()))?;
                Ok(pending
                    .as_ref()
                    .and_then(|pending| pending.find(ticket))
                    .map(|request| request.status()))
            }
        }
    }

    /// Tickets of every request not yet finished, compacted into books.
    ///
    /// Runs the two-pass ticket aggregation over all partitions of the
    /// request and pending caches.
    pub fn outstanding_tickets(&self) -> Result<Vec<TicketBook>, SubmissionError> {
        let partition_count = self.caches.requests.partition_count();
        let books = try_aggregate_partitions(partition_count, |partition| -> Result<Vec<Ticket>, StoreError> {
            let mut tickets: Vec<Ticket> = self
                .caches
                .requests
                .partition_values(partition)?
                .into_iter()
                .map(|(_, request)| request.ticket())
                .collect();

            for (_, pending) in self.caches.pending.partition_values(partition)? {
                tickets.extend(pending.requests().iter().map(CommandExecutionRequest::ticket));
            }
            Ok(tickets)
        })?;
        Ok(books)
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Drop a queued command of a context that is not registered.
    fn cancel_pending(
        &self,
        context: &ContextIdentifier,
        ticket: Ticket,
    ) -> Result<bool, SubmissionError> {
        let cancelled = self
            .caches
            .pending
            .invoke(&PendingSubmissions::key(context), |slot| {
                let Some(pending) = slot.as_mut() else {
                    return false;
                };
                let cancelled = pending.cancel(ticket);
                if pending.is_empty() {
                    *slot = None;
                }
                cancelled
            })?;
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommandError, ContextsManager, ExecutionEnvironment};
    use conductor_simulation::SimGrid;
    use conductor_types::{ContextConfiguration, ManagementStrategy};
    use sbor::prelude::*;
    use tracing_test::traced_test;

    #[derive(Debug, BasicSbor)]
    struct Increment {
        by: u64,
    }

    impl Command for Increment {
        type Context = u64;
        const NAME: &'static str = "counter.increment";

        fn execute(&self, environment: &mut ExecutionEnvironment<u64>) -> Result<(), CommandError> {
            *environment.context_mut() += self.by;
            Ok(())
        }
    }

    fn setup() -> (ContextsManager, CommandSubmitter) {
        let grid: Arc<dyn GridStore> = Arc::new(SimGrid::default());
        let config = SubmitterConfig::with_issuer(2);
        (
            ContextsManager::new(Arc::clone(&grid), config.clone()),
            CommandSubmitter::new(grid, config),
        )
    }

    #[test]
    #[traced_test]
    fn test_unknown_context_is_logged() {
        let (_, submitter) = setup();
        let outcome = submitter
            .try_submit_command(&"nowhere".into(), &Increment { by: 1 }, false)
            .unwrap();

        assert!(!outcome.is_accepted());
        assert!(logs_contain("Unknown context"));
    }

    #[test]
    #[traced_test]
    fn test_accepted_outcome_locates_the_request() {
        let (contexts, submitter) = setup();
        contexts.register_context_as("counter", &0u64).unwrap();

        let outcome = submitter
            .try_submit_command(&"counter".into(), &Increment { by: 1 }, false)
            .unwrap();
        let SubmissionOutcome::Accepted {
            identifier,
            management_strategy,
            request_key,
        } = outcome
        else {
            panic!("expected the command to be accepted");
        };

        assert_eq!(identifier.ticket(), Ticket::new(2, 1));
        assert_eq!(request_key, identifier.request_key(management_strategy));

        let stored = submitter.caches.requests.get(&request_key).unwrap().unwrap();
        assert_eq!(stored.command_type(), Increment::NAME);
        assert_eq!(stored.status(), RequestStatus::Submitted);
        assert!(logs_contain("Command accepted"));
    }

    #[test]
    fn test_submitters_sharing_an_issuer_never_collide() {
        let grid: Arc<dyn GridStore> = Arc::new(SimGrid::default());
        let config = SubmitterConfig::with_issuer(1);
        let contexts = ContextsManager::new(Arc::clone(&grid), config.clone());
        contexts.register_context_as("counter", &0u64).unwrap();

        let first = CommandSubmitter::new(Arc::clone(&grid), config.clone());
        let a = first
            .submit_command(&"counter".into(), &Increment { by: 10 }, false)
            .unwrap();
        // A member restarting under the same issuer
        let second = CommandSubmitter::new(grid, config);
        let b = second
            .submit_command(&"counter".into(), &Increment { by: 20 }, false)
            .unwrap();

        assert_ne!(a.ticket(), b.ticket());
        assert_eq!(first.request_status(&a), Ok(Some(RequestStatus::Submitted)));
        assert_eq!(second.request_status(&b), Ok(Some(RequestStatus::Submitted)));
        assert_eq!(second.outstanding_tickets().unwrap().len(), 2);
    }

    #[test]
    #[traced_test]
    fn test_occupied_request_slot_is_refused() {
        let (contexts, submitter) = setup();
        contexts.register_context_as("counter", &0u64).unwrap();

        // A stray request under the ticket the submitter issues next
        let stray = CommandExecutionRequest::new(
            RequestIdentifier::new("counter".into(), Ticket::new(2, 1)),
            Increment::NAME,
            Vec::new(),
            ManagementStrategy::Colocated,
            RequestStatus::Submitted,
        );
        assert_eq!(submitter.caches.insert_request(stray.clone()), Ok(true));

        let refused = submitter.submit_command(&"counter".into(), &Increment { by: 1 }, false);
        assert_eq!(
            refused,
            Err(SubmissionError::TicketInUse(stray.identifier().clone()))
        );
        assert!(logs_contain("Ticket already in use"));

        let stored = submitter.caches.requests.get(&stray.key()).unwrap();
        assert_eq!(stored, Some(stray));

        // The next ticket is free
        let accepted = submitter
            .submit_command(&"counter".into(), &Increment { by: 1 }, false)
            .unwrap();
        assert_eq!(accepted.ticket(), Ticket::new(2, 2));
    }

    #[test]
    fn test_queued_command_keeps_its_announced_key() {
        let (contexts, submitter) = setup();
        let outcome = submitter
            .try_submit_command(&"later".into(), &Increment { by: 1 }, true)
            .unwrap();
        let SubmissionOutcome::Accepted {
            identifier,
            management_strategy,
            request_key,
        } = outcome
        else {
            panic!("expected the command to be queued");
        };
        assert_eq!(management_strategy, ManagementStrategy::Colocated);

        contexts
            .register_context_with(
                "later",
                &0u64,
                ContextConfiguration::new(ManagementStrategy::Distributed),
            )
            .unwrap();

        let stored = submitter.caches.requests.get(&request_key).unwrap().unwrap();
        assert_eq!(stored.identifier(), &identifier);
        assert_eq!(stored.status(), RequestStatus::Submitted);
        assert_eq!(submitter.request_status(&identifier), Ok(Some(RequestStatus::Submitted)));

        assert_eq!(submitter.cancel_command(&identifier), Ok(true));
        assert_eq!(submitter.caches.requests.get(&request_key), Ok(None));
        assert_eq!(submitter.outstanding_tickets(), Ok(Vec::new()));
    }

    #[test]
    fn test_queued_commands_are_outstanding() {
        let (_, submitter) = setup();
        for _ in 0..3 {
            submitter
                .submit_command(&"later".into(), &Increment { by: 1 }, true)
                .unwrap();
        }
        assert_eq!(
            submitter.outstanding_tickets(),
            Ok(vec![TicketBook::with_bounds(2, 1, 3)])
        );
    }
}
