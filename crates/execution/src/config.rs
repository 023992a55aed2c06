//! Configuration for submission and context registration.

use conductor_types::ManagementStrategy;

/// Configuration shared by the [`ContextsManager`](crate::ContextsManager)
/// and [`CommandSubmitter`](crate::CommandSubmitter) of one member.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Issuer of the tickets and generated context identifiers of this
    /// member.
    ///
    /// Tickets are reserved in the store, so members may share an issuer.
    /// Tickets of one issuer only increase in submission order within a
    /// single member, so members that need their own order should use
    /// their own issuer.
    pub issuer_id: i64,

    /// Number of tickets reserved from the store at a time.
    pub ticket_block_size: i64,

    /// Whether registering a context under an identifier that is already
    /// registered fails.
    ///
    /// When disabled, re-registration replaces the context value and keeps
    /// the existing configuration and outstanding work.
    pub reject_duplicate_registration: bool,

    /// Strategy for contexts registered without an explicit configuration.
    pub default_management_strategy: ManagementStrategy,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            issuer_id: 0,
            ticket_block_size: 64,
            reject_duplicate_registration: true,
            default_management_strategy: ManagementStrategy::Colocated,
        }
    }
}

impl SubmitterConfig {
    /// Create a config for the given issuer.
    pub fn with_issuer(issuer_id: i64) -> Self {
        Self {
            issuer_id,
            ..Default::default()
        }
    }

    /// Reserve `size` tickets from the store at a time.
    pub fn with_ticket_block_size(self, size: i64) -> Self {
        Self {
            ticket_block_size: size,
            ..self
        }
    }

    /// Allow re-registration to replace an existing context value.
    pub fn overwriting_registrations(self) -> Self {
        Self {
            reject_duplicate_registration: false,
            ..self
        }
    }

    /// Use `strategy` for contexts registered without a configuration.
    pub fn with_management_strategy(self, strategy: ManagementStrategy) -> Self {
        Self {
            default_management_strategy: strategy,
            ..self
        }
    }
}
