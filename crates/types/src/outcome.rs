//! Results of submitting a command.

use crate::{ContextIdentifier, EntryKey, ManagementStrategy, RequestIdentifier};
use sbor::prelude::*;

/// Outcome of a submission attempt.
///
/// A missing context is an expected race with context registration, so it is
/// a value here rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub enum SubmissionOutcome {
    /// The command is tracked and will run, or is queued until its context
    /// is registered.
    Accepted {
        identifier: RequestIdentifier,
        management_strategy: ManagementStrategy,
        /// Key of the stored request, used for cancellation.
        request_key: EntryKey,
    },
    /// No context is registered under the identifier and queuing was not
    /// allowed.
    UnknownContext { context: ContextIdentifier },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted { .. })
    }

    /// Identifier of the accepted command, if any.
    pub fn identifier(&self) -> Option<&RequestIdentifier> {
        match self {
            SubmissionOutcome::Accepted { identifier, .. } => Some(identifier),
            SubmissionOutcome::UnknownContext { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Ticket;

    #[test]
    fn test_codec_preserves_variant() {
        let identifier = RequestIdentifier::new("orders".into(), Ticket::new(1, 1));
        let accepted = SubmissionOutcome::Accepted {
            request_key: identifier.request_key(ManagementStrategy::Distributed),
            identifier,
            management_strategy: ManagementStrategy::Distributed,
        };
        let unknown = SubmissionOutcome::UnknownContext {
            context: "missing".into(),
        };

        for outcome in [accepted, unknown] {
            let bytes = sbor::basic_encode(&outcome).unwrap();
            let decoded: SubmissionOutcome = sbor::basic_decode(&bytes).unwrap();
            assert_eq!(decoded, outcome);
        }
    }

    #[test]
    fn test_identifier_accessor() {
        let unknown = SubmissionOutcome::UnknownContext {
            context: "missing".into(),
        };
        assert!(!unknown.is_accepted());
        assert!(unknown.identifier().is_none());
    }
}
