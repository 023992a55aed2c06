//! Records kept in the store.
//!
//! Four caches hold all state:
//!
//! | cache | key | value |
//! |---|---|---|
//! | [`CONTEXTS_CACHE`] | context identifier | [`ContextEntry`] |
//! | [`REQUESTS_CACHE`] | [`RequestIdentifier::request_key`] | [`CommandExecutionRequest`] |
//! | [`PENDING_CACHE`] | context identifier | [`PendingSubmissions`] |
//! | [`ISSUERS_CACHE`] | issuer and purpose | last reserved sequence number |
//!
//! Operations that touch several caches always lock in the order contexts,
//! requests, pending, issuers.

use conductor_core::{GridCache, GridStore, StoreError};
use conductor_types::{
    ContextConfiguration, ContextIdentifier, EntryKey, ManagementStrategy, Range, RangeError,
    RequestIdentifier, Ticket,
};
use sbor::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub const CONTEXTS_CACHE: &str = "conductor.contexts";
pub const REQUESTS_CACHE: &str = "conductor.requests";
pub const PENDING_CACHE: &str = "conductor.pending";
pub const ISSUERS_CACHE: &str = "conductor.issuers";

/// Stored state of a registered context.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct ContextEntry {
    /// Encoded context value.
    value: Vec<u8>,
    configuration: ContextConfiguration,
    /// Incremented whenever a command replaces the value.
    version: u64,
    /// Sequence numbers of submitted, unfinished requests per issuer.
    outstanding: BTreeMap<i64, Range>,
    /// Outstanding requests stored under a strategy other than the
    /// configured one.
    placements: BTreeMap<Ticket, ManagementStrategy>,
}

impl ContextEntry {
    pub fn new(value: Vec<u8>, configuration: ContextConfiguration) -> Self {
        Self {
            value,
            configuration,
            version: 0,
            outstanding: BTreeMap::new(),
            placements: BTreeMap::new(),
        }
    }

    pub fn key(context: &ContextIdentifier) -> EntryKey {
        EntryKey::new(context.as_str())
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn configuration(&self) -> ContextConfiguration {
        self.configuration
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace the value and bump the version.
    pub fn update_value(&mut self, value: Vec<u8>) {
        self.value = value;
        self.version += 1;
    }

    /// Record `ticket` as outstanding.
    pub fn track(&mut self, ticket: Ticket) {
        let range = self
            .outstanding
            .entry(ticket.issuer_id())
            .or_insert(Range::EMPTY);
        *range = range.add(ticket.sequence_number());
    }

    /// Record `ticket` as outstanding, its request stored under `strategy`.
    pub fn track_placed(&mut self, ticket: Ticket, strategy: ManagementStrategy) {
        self.track(ticket);
        if strategy != self.configuration.management_strategy() {
            self.placements.insert(ticket, strategy);
        }
    }

    /// Key the request of `identifier` is stored under.
    pub fn request_key(&self, identifier: &RequestIdentifier) -> EntryKey {
        let strategy = self
            .placements
            .get(&identifier.ticket())
            .copied()
            .unwrap_or(self.configuration.management_strategy());
        identifier.request_key(strategy)
    }

    /// Stop tracking `ticket`. Returns whether it was outstanding.
    pub fn release(&mut self, ticket: Ticket) -> Result<bool, RangeError> {
        let Some(range) = self.outstanding.get_mut(&ticket.issuer_id()) else {
            return Ok(false);
        };
        if !range.contains(ticket.sequence_number()) {
            return Ok(false);
        }

        self.placements.remove(&ticket);
        *range = range.remove(ticket.sequence_number())?;
        if range.is_empty() {
            self.outstanding.remove(&ticket.issuer_id());
        }
        Ok(true)
    }

    pub fn is_outstanding(&self, ticket: Ticket) -> bool {
        self.outstanding
            .get(&ticket.issuer_id())
            .is_some_and(|range| range.contains(ticket.sequence_number()))
    }

    /// Outstanding tickets in execution order.
    pub fn outstanding_tickets(&self) -> Result<Vec<Ticket>, RangeError> {
        let mut tickets = Vec::new();
        for (&issuer_id, range) in &self.outstanding {
            tickets.extend(range.iter()?.map(|seq| Ticket::new(issuer_id, seq)));
        }
        Ok(tickets)
    }
}

/// Where a request is in its lifecycle.
///
/// Requests that completed, failed or were cancelled are removed from the
/// store, so they have no status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BasicSbor)]
pub enum RequestStatus {
    /// Waiting for its context to be registered.
    PendingContext,
    /// Accepted and waiting to run. Can still be cancelled.
    Submitted,
    /// Claimed by an executor.
    Executing,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::PendingContext => write!(f, "pending-context"),
            RequestStatus::Submitted => write!(f, "submitted"),
            RequestStatus::Executing => write!(f, "executing"),
        }
    }
}

/// A submitted command and its progress record.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct CommandExecutionRequest {
    identifier: RequestIdentifier,
    /// Name the command type is registered under.
    command_type: String,
    /// Encoded command.
    command: Vec<u8>,
    /// Strategy the request was accepted under. Decides its key.
    management_strategy: ManagementStrategy,
    status: RequestStatus,
    /// Encoded checkpoint of the last attempt.
    checkpoint: Option<Vec<u8>>,
    attempts: u32,
}

impl CommandExecutionRequest {
    pub fn new(
        identifier: RequestIdentifier,
        command_type: impl Into<String>,
        command: Vec<u8>,
        management_strategy: ManagementStrategy,
        status: RequestStatus,
    ) -> Self {
        Self {
            identifier,
            command_type: command_type.into(),
            command,
            management_strategy,
            status,
            checkpoint: None,
            attempts: 0,
        }
    }

    pub fn identifier(&self) -> &RequestIdentifier {
        &self.identifier
    }

    pub fn ticket(&self) -> Ticket {
        self.identifier.ticket()
    }

    pub fn command_type(&self) -> &str {
        &self.command_type
    }

    pub fn command(&self) -> &[u8] {
        &self.command
    }

    pub fn management_strategy(&self) -> ManagementStrategy {
        self.management_strategy
    }

    /// Key the request is stored under once its context is registered.
    pub fn key(&self) -> EntryKey {
        self.identifier.request_key(self.management_strategy)
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn checkpoint(&self) -> Option<&[u8]> {
        self.checkpoint.as_deref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
    }

    /// Mark the request as claimed by an executor.
    pub(crate) fn start_attempt(&mut self) {
        self.status = RequestStatus::Executing;
        self.attempts += 1;
    }

    pub(crate) fn set_checkpoint(&mut self, checkpoint: Option<Vec<u8>>) -> Option<Vec<u8>> {
        std::mem::replace(&mut self.checkpoint, checkpoint)
    }
}

/// Requests submitted against a context that is not registered yet, in
/// submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, BasicSbor)]
pub struct PendingSubmissions {
    requests: Vec<CommandExecutionRequest>,
}

impl PendingSubmissions {
    pub fn key(context: &ContextIdentifier) -> EntryKey {
        EntryKey::new(context.as_str())
    }

    pub fn requests(&self) -> &[CommandExecutionRequest] {
        &self.requests
    }

    pub fn push(&mut self, request: CommandExecutionRequest) {
        self.requests.push(request);
    }

    /// Remove the request issued `ticket`. Returns whether it was present.
    pub fn cancel(&mut self, ticket: Ticket) -> bool {
        let before = self.requests.len();
        self.requests.retain(|request| request.ticket() != ticket);
        self.requests.len() != before
    }

    pub fn find(&self, ticket: Ticket) -> Option<&CommandExecutionRequest> {
        self.requests.iter().find(|request| request.ticket() == ticket)
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn into_requests(self) -> Vec<CommandExecutionRequest> {
        self.requests
    }
}

/// Typed handles on the caches.
#[derive(Debug, Clone)]
pub(crate) struct Caches {
    pub contexts: GridCache<ContextEntry>,
    pub requests: GridCache<CommandExecutionRequest>,
    pub pending: GridCache<PendingSubmissions>,
    pub issuers: GridCache<i64>,
}

impl Caches {
    pub fn new(store: Arc<dyn GridStore>) -> Self {
        Self {
            contexts: GridCache::new(Arc::clone(&store), CONTEXTS_CACHE),
            requests: GridCache::new(Arc::clone(&store), REQUESTS_CACHE),
            pending: GridCache::new(Arc::clone(&store), PENDING_CACHE),
            issuers: GridCache::new(store, ISSUERS_CACHE),
        }
    }

    /// Store `request` under its key unless the key is taken.
    ///
    /// Returns whether the request was stored.
    pub fn insert_request(&self, request: CommandExecutionRequest) -> Result<bool, StoreError> {
        self.requests.invoke(&request.key(), |slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(request);
            true
        })
    }
}
