//! Domain-specific identifier types.

use crate::{ManagementStrategy, Ticket};
use sbor::prelude::*;
use std::fmt;

/// Identifier a context is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct ContextIdentifier(pub String);

impl ContextIdentifier {
    pub fn new(id: impl Into<String>) -> Self {
        ContextIdentifier(id.into())
    }

    /// Identifier generated for a context registered without one.
    pub fn generated(issuer_id: i64, sequence_number: i64) -> Self {
        ContextIdentifier(format!("ctx-{issuer_id}-{sequence_number}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContextIdentifier {
    fn from(id: &str) -> Self {
        ContextIdentifier(id.to_owned())
    }
}

impl From<String> for ContextIdentifier {
    fn from(id: String) -> Self {
        ContextIdentifier(id)
    }
}

/// Key of an entry in the store.
///
/// Entries with the same affinity land in the same partition. An entry
/// associated with another key takes that key as its affinity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
pub struct EntryKey {
    id: String,
    associated_with: Option<String>,
}

impl EntryKey {
    /// Key placed by its own id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            associated_with: None,
        }
    }

    /// Key placed in the same partition as `associated_with`.
    pub fn associated(id: impl Into<String>, associated_with: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            associated_with: Some(associated_with.into()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn associated_with(&self) -> Option<&str> {
        self.associated_with.as_deref()
    }

    /// The string that decides which partition owns this key.
    pub fn affinity(&self) -> &str {
        self.associated_with.as_deref().unwrap_or(&self.id)
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.associated_with {
            Some(associated_with) => write!(f, "{}@{}", self.id, associated_with),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Handle of an accepted command.
///
/// Names the context the command was submitted against and the ticket it was
/// issued. A ticket is unique per issuer, so the pair is unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
pub struct RequestIdentifier {
    context: ContextIdentifier,
    ticket: Ticket,
}

impl RequestIdentifier {
    pub fn new(context: ContextIdentifier, ticket: Ticket) -> Self {
        Self { context, ticket }
    }

    pub fn context(&self) -> &ContextIdentifier {
        &self.context
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Key of the stored request under the given management strategy.
    pub fn request_key(&self, strategy: ManagementStrategy) -> EntryKey {
        let id = format!("{}#{}", self.context, self.ticket);
        match strategy {
            ManagementStrategy::Colocated => EntryKey::associated(id, self.context.as_str()),
            ManagementStrategy::Distributed => EntryKey::new(id),
        }
    }
}

impl fmt::Display for RequestIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.context, self.ticket)
    }
}
