//! Registration and lookup of contexts.

use crate::entries::{Caches, ContextEntry, PendingSubmissions, RequestStatus};
use crate::tickets::TicketSource;
use crate::{Context, SubmissionError, SubmitterConfig};
use conductor_core::{codec, GridStore};
use conductor_types::{ContextConfiguration, ContextIdentifier};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registers contexts and reads them back.
///
/// Registering a context releases every command that was submitted against
/// its identifier while it did not exist yet.
#[derive(Debug)]
pub struct ContextsManager {
    caches: Caches,
    config: SubmitterConfig,
    /// Source of generated context identifiers.
    identifiers: TicketSource,
}

impl ContextsManager {
    pub fn new(store: Arc<dyn GridStore>, config: SubmitterConfig) -> Self {
        let caches = Caches::new(store);
        Self {
            identifiers: TicketSource::new(
                &caches,
                config.issuer_id,
                "contexts",
                config.ticket_block_size,
            ),
            caches,
            config,
        }
    }

    /// Register `context` under a generated identifier.
    pub fn register_context<C: Context>(
        &self,
        context: &C,
    ) -> Result<ContextIdentifier, SubmissionError> {
        let ticket = self.identifiers.next()?;
        let identifier =
            ContextIdentifier::generated(ticket.issuer_id(), ticket.sequence_number());
        self.register_context_as(identifier, context)
    }

    /// Register `context` under `identifier` with the default configuration.
    pub fn register_context_as<C: Context>(
        &self,
        identifier: impl Into<ContextIdentifier>,
        context: &C,
    ) -> Result<ContextIdentifier, SubmissionError> {
        let configuration = ContextConfiguration::new(self.config.default_management_strategy);
        self.register_context_with(identifier, context, configuration)
    }

    /// Register `context` under `identifier`.
    ///
    /// If the identifier is already registered this fails with
    /// [`SubmissionError::ContextAlreadyRegistered`], unless the config
    /// allows overwriting. Overwriting replaces the value only; the
    /// configuration and outstanding work of the existing context stay.
    ///
    /// Commands queued for the identifier become submitted, keeping the
    /// tickets, order and request keys they were submitted with.
    pub fn register_context_with<C: Context>(
        &self,
        identifier: impl Into<ContextIdentifier>,
        context: &C,
        configuration: ContextConfiguration,
    ) -> Result<ContextIdentifier, SubmissionError> {
        let identifier = identifier.into();
        let value = codec::encode(context)?;
        let key = ContextEntry::key(&identifier);
        let pending_key = PendingSubmissions::key(&identifier);

        let promoted = self.caches.contexts.invoke(&key, |slot| -> Result<usize, SubmissionError> {
            if let Some(existing) = slot.as_mut() {
                if self.config.reject_duplicate_registration {
                    warn!(context = %identifier, "Context already registered");
                    return Err(SubmissionError::ContextAlreadyRegistered(
                        identifier.clone(),
                    ));
                }
                existing.update_value(value);
                return Ok(0);
            }

            let mut entry = ContextEntry::new(value, configuration);
            let Some(pending) = self.caches.pending.get(&pending_key)? else {
                *slot = Some(entry);
                return Ok(0);
            };

            let mut promoted = 0;
            for mut request in pending.into_requests() {
                request.set_status(RequestStatus::Submitted);
                let (ticket, strategy) = (request.ticket(), request.management_strategy());
                let identifier = request.identifier().clone();
                if !self.caches.insert_request(request)? {
                    warn!(request = %identifier, "Ticket already in use");
                    return Err(SubmissionError::TicketInUse(identifier));
                }
                entry.track_placed(ticket, strategy);
                promoted += 1;
            }

            *slot = Some(entry);
            self.caches.pending.remove(&pending_key)?;
            Ok(promoted)
        })??;

        info!(
            context = %identifier,
            promoted,
            "Context registered"
        );
        Ok(identifier)
    }

    /// Read the context registered under `identifier`.
    ///
    /// Returns `None` if no context is registered.
    pub fn get_context<C: Context>(
        &self,
        identifier: &ContextIdentifier,
    ) -> Result<Option<C>, SubmissionError> {
        let Some(entry) = self.caches.contexts.get(&ContextEntry::key(identifier))? else {
            debug!(context = %identifier, "Context not found");
            return Ok(None);
        };
        Ok(Some(codec::decode(entry.value())?))
    }

    /// Apply `extractor` to the context registered under `identifier`.
    ///
    /// Returns `None` without calling `extractor` if no context is
    /// registered.
    pub fn extract_value_from_context<C: Context, T>(
        &self,
        identifier: &ContextIdentifier,
        extractor: impl FnOnce(&C) -> T,
    ) -> Result<Option<T>, SubmissionError> {
        Ok(self.get_context(identifier)?.map(|context| extractor(&context)))
    }

    pub fn context_configuration(
        &self,
        identifier: &ContextIdentifier,
    ) -> Result<Option<ContextConfiguration>, SubmissionError> {
        let entry = self.caches.contexts.get(&ContextEntry::key(identifier))?;
        Ok(entry.map(|entry| entry.configuration()))
    }

    /// Number of times the context value was replaced since registration.
    pub fn context_version(
        &self,
        identifier: &ContextIdentifier,
    ) -> Result<Option<u64>, SubmissionError> {
        let entry = self.caches.contexts.get(&ContextEntry::key(identifier))?;
        Ok(entry.map(|entry| entry.version()))
    }

    pub fn is_registered(&self, identifier: &ContextIdentifier) -> Result<bool, SubmissionError> {
        Ok(self.caches.contexts.contains(&ContextEntry::key(identifier))?)
    }
}
