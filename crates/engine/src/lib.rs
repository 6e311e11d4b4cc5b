// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drudge-engine: the control plane over the store.
//!
//! Workers claim jobs from the queue, drive the bounded agent loop, and
//! report terminal outcomes; the reaper rescues jobs whose workers died;
//! the ledger fans persisted events out to live subscribers.

pub mod agent_loop;
pub mod config;
pub mod error;
pub mod hub;
pub mod ledger;
pub mod planner;
pub mod queue;
pub mod reaper;
pub mod service;
pub mod tools;
pub mod worker;

pub use agent_loop::AgentLoop;
pub use config::EngineConfig;
pub use error::EngineError;
pub use hub::{EventStream, LedgerItem};
pub use ledger::Ledger;
pub use planner::{Planner, PlannerError, Proposal};
pub use queue::Queue;
pub use reaper::Reaper;
pub use service::JobService;
pub use tools::{Tool, ToolCtx, ToolRegistry};
pub use worker::{Worker, WorkerHandle};

#[cfg(test)]
pub(crate) mod test_fixtures;

#[cfg(any(test, feature = "test-support"))]
pub use planner::ScriptedPlanner;
#[cfg(any(test, feature = "test-support"))]
pub use tools::test_support as tool_support;

use drudge_core::Clock;
use drudge_storage::Store;
use std::sync::Arc;

/// Shared dependencies handed to workers and services.
///
/// Everything is constructor-injected; there is no global configuration.
pub struct EngineDeps<C: Clock> {
    pub store: Arc<Store>,
    pub ledger: Arc<Ledger<C>>,
    pub registry: Arc<ToolRegistry>,
    pub planner: Arc<dyn Planner>,
    pub config: Arc<EngineConfig>,
    pub clock: C,
}

impl<C: Clock> Clone for EngineDeps<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ledger: Arc::clone(&self.ledger),
            registry: Arc::clone(&self.registry),
            planner: Arc::clone(&self.planner),
            config: Arc::clone(&self.config),
            clock: self.clock.clone(),
        }
    }
}
