//! The environment a command executes in.

use crate::entries::CommandExecutionRequest;
use crate::EnvironmentError;
use conductor_core::{codec, GridCache};
use conductor_types::{ContextConfiguration, ContextIdentifier, EntryKey, RequestIdentifier, Ticket};
use sbor::{BasicDecode, BasicEncode};
use tracing::debug;

/// Everything about an execution attempt except the context value.
#[derive(Debug, Clone)]
pub struct ExecutionFrame {
    identifier: RequestIdentifier,
    configuration: ContextConfiguration,
    recovering: bool,
    requests: GridCache<CommandExecutionRequest>,
    request_key: EntryKey,
}

impl ExecutionFrame {
    pub(crate) fn new(
        identifier: RequestIdentifier,
        configuration: ContextConfiguration,
        recovering: bool,
        requests: GridCache<CommandExecutionRequest>,
        request_key: EntryKey,
    ) -> Self {
        Self {
            identifier,
            configuration,
            recovering,
            requests,
            request_key,
        }
    }

    /// Run `update` against the stored request backing this attempt.
    fn with_request<R>(
        &self,
        update: impl FnOnce(&mut CommandExecutionRequest) -> R,
    ) -> Result<R, EnvironmentError> {
        self.requests
            .invoke(&self.request_key, |slot| slot.as_mut().map(update))?
            .ok_or_else(|| EnvironmentError::MissingRequest(self.identifier.clone()))
    }
}

/// Handed to a [`Command`](crate::Command) while it runs.
///
/// Checkpoints are written straight into the stored request, so they are
/// durable as soon as the call returns. An attempt that is interrupted after
/// saving a checkpoint resumes from it on replay.
#[derive(Debug)]
pub struct ExecutionEnvironment<C> {
    frame: ExecutionFrame,
    context: C,
}

impl<C> ExecutionEnvironment<C> {
    pub fn new(frame: ExecutionFrame, context: C) -> Self {
        Self { frame, context }
    }

    pub fn context_identifier(&self) -> &ContextIdentifier {
        self.frame.identifier.context()
    }

    pub fn configuration(&self) -> ContextConfiguration {
        self.frame.configuration
    }

    /// The ticket of the command being executed.
    pub fn ticket(&self) -> Ticket {
        self.frame.identifier.ticket()
    }

    pub fn request_identifier(&self) -> &RequestIdentifier {
        &self.frame.identifier
    }

    /// Whether this attempt replays one that was interrupted.
    pub fn is_recovering(&self) -> bool {
        self.frame.recovering
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Replace the context value.
    ///
    /// A command always runs against a live context, so `None` is rejected
    /// and leaves the current value in place.
    pub fn set_context(&mut self, context: impl Into<Option<C>>) -> Result<(), EnvironmentError> {
        let context = context.into().ok_or(EnvironmentError::NullContext)?;
        self.context = context;
        Ok(())
    }

    pub fn into_context(self) -> C {
        self.context
    }

    pub fn has_checkpoint(&self) -> Result<bool, EnvironmentError> {
        self.frame
            .with_request(|request| request.checkpoint().is_some())
    }

    /// Store `state` as the checkpoint of this command.
    pub fn save_checkpoint<T: BasicEncode>(&mut self, state: &T) -> Result<(), EnvironmentError> {
        let bytes = codec::encode(state)?;
        self.frame.with_request(|request| {
            request.set_checkpoint(Some(bytes));
        })?;
        debug!(request = %self.frame.identifier, "Checkpoint saved");
        Ok(())
    }

    /// Load the checkpoint of this command, if one was saved.
    pub fn load_checkpoint<T: BasicDecode>(&self) -> Result<Option<T>, EnvironmentError> {
        let bytes = self
            .frame
            .with_request(|request| request.checkpoint().map(<[u8]>::to_vec))?;
        Ok(bytes.map(|bytes| codec::decode(&bytes)).transpose()?)
    }

    /// Drop the checkpoint of this command. Returns whether one existed.
    pub fn remove_checkpoint(&mut self) -> Result<bool, EnvironmentError> {
        let removed = self
            .frame
            .with_request(|request| request.set_checkpoint(None).is_some())?;
        if removed {
            debug!(request = %self.frame.identifier, "Checkpoint removed");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::{RequestStatus, REQUESTS_CACHE};
    use conductor_simulation::SimGrid;
    use conductor_types::ManagementStrategy;
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn environment(stored: bool) -> ExecutionEnvironment<u64> {
        let grid = Arc::new(SimGrid::default());
        let requests = GridCache::new(grid, REQUESTS_CACHE);
        let identifier = RequestIdentifier::new("acc".into(), Ticket::new(1, 1));
        let configuration = ContextConfiguration::new(ManagementStrategy::Distributed);

        if stored {
            let request = CommandExecutionRequest::new(
                identifier.clone(),
                "noop",
                Vec::new(),
                ManagementStrategy::Distributed,
                RequestStatus::Executing,
            );
            requests.put(&request.key(), &request).unwrap();
        }

        let request_key = identifier.request_key(ManagementStrategy::Distributed);
        let frame = ExecutionFrame::new(identifier, configuration, false, requests, request_key);
        ExecutionEnvironment::new(frame, 10)
    }

    #[test]
    fn test_null_context_is_rejected() {
        let mut environment = environment(true);

        assert_eq!(
            environment.set_context(None::<u64>),
            Err(EnvironmentError::NullContext)
        );
        assert_eq!(*environment.context(), 10);

        environment.set_context(11u64).unwrap();
        assert_eq!(environment.into_context(), 11);
    }

    #[test]
    #[traced_test]
    fn test_checkpoint_lifecycle() {
        let mut environment = environment(true);

        assert_eq!(environment.has_checkpoint(), Ok(false));
        assert_eq!(environment.load_checkpoint::<String>(), Ok(None));

        environment.save_checkpoint(&"step-1".to_string()).unwrap();
        assert!(logs_contain("Checkpoint saved"));
        assert_eq!(environment.has_checkpoint(), Ok(true));
        assert_eq!(
            environment.load_checkpoint::<String>(),
            Ok(Some("step-1".to_string()))
        );

        assert_eq!(environment.remove_checkpoint(), Ok(true));
        assert_eq!(environment.remove_checkpoint(), Ok(false));
        assert_eq!(environment.has_checkpoint(), Ok(false));
    }

    #[test]
    fn test_checkpoint_is_stored_with_the_request() {
        let mut environment = environment(true);
        environment.save_checkpoint(&42u32).unwrap();

        let stored = environment
            .frame
            .requests
            .get(&environment.frame.request_key)
            .unwrap()
            .unwrap();
        assert!(stored.checkpoint().is_some());
    }

    #[test]
    fn test_checkpoint_without_request_fails() {
        let mut environment = environment(false);
        assert!(matches!(
            environment.save_checkpoint(&1u32),
            Err(EnvironmentError::MissingRequest(_))
        ));
        assert!(matches!(
            environment.has_checkpoint(),
            Err(EnvironmentError::MissingRequest(_))
        ));
    }
}
