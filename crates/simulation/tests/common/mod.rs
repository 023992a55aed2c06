//! Contexts and commands shared by the scenario tests.

#![allow(dead_code)]

use conductor_execution::{
    Command, CommandError, CommandExecutor, CommandRegistry, CommandSubmitter, ContextsManager,
    ExecutionEnvironment, SubmitterConfig,
};
use conductor_simulation::{SimGrid, SimGridConfig};
use sbor::prelude::*;
use std::sync::Arc;

/// An append-only list of amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, BasicSbor)]
pub struct Ledger {
    pub entries: Vec<i64>,
}

impl Ledger {
    pub fn total(&self) -> i64 {
        self.entries.iter().sum()
    }
}

/// Append an amount to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Append {
    pub amount: i64,
}

impl Command for Append {
    type Context = Ledger;
    const NAME: &'static str = "ledger.append";

    fn execute(&self, environment: &mut ExecutionEnvironment<Ledger>) -> Result<(), CommandError> {
        environment.context_mut().entries.push(self.amount);
        Ok(())
    }
}

/// Always fails after touching the ledger.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Reject;

impl Command for Reject {
    type Context = Ledger;
    const NAME: &'static str = "ledger.reject";

    fn execute(&self, environment: &mut ExecutionEnvironment<Ledger>) -> Result<(), CommandError> {
        environment.context_mut().entries.push(-1);
        Err(CommandError::Failed("amount rejected".to_string()))
    }
}

/// Tries to clear the context.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Clear;

impl Command for Clear {
    type Context = Ledger;
    const NAME: &'static str = "ledger.clear";

    fn execute(&self, environment: &mut ExecutionEnvironment<Ledger>) -> Result<(), CommandError> {
        environment.set_context(None::<Ledger>)?;
        Ok(())
    }
}

/// One member's view of a shared grid.
pub struct Cluster {
    pub grid: Arc<SimGrid>,
    pub contexts: ContextsManager,
    pub submitter: CommandSubmitter,
    pub executor: CommandExecutor,
}

impl Cluster {
    pub fn new() -> Self {
        Self::with_config(SubmitterConfig::with_issuer(1))
    }

    pub fn with_config(config: SubmitterConfig) -> Self {
        let grid = Arc::new(SimGrid::new(SimGridConfig::default().with_partitions(7)));
        Self::on_grid(grid, config)
    }

    /// Another member on the grid of this one.
    pub fn join(&self, config: SubmitterConfig) -> Self {
        Self::on_grid(self.grid.clone(), config)
    }

    fn on_grid(grid: Arc<SimGrid>, config: SubmitterConfig) -> Self {
        let registry = Arc::new(CommandRegistry::new());
        registry.register::<Append>();
        registry.register::<Reject>();
        registry.register::<Clear>();

        Self {
            contexts: ContextsManager::new(grid.clone(), config.clone()),
            submitter: CommandSubmitter::new(grid.clone(), config),
            executor: CommandExecutor::new(grid.clone(), registry),
            grid,
        }
    }

    pub fn ledger(&self, context: &str) -> Option<Ledger> {
        self.contexts.get_context(&context.into()).unwrap()
    }
}
