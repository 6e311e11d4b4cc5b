// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The planner seam: the external LLM adapter the agent loop asks for its
//! next action. The backbone never interprets how a proposal was produced.

use async_trait::async_trait;
use drudge_core::{EventRecord, PlanStep, ToolSpec};
use thiserror::Error;

/// Planner failure, split by whether a retry could help.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlannerError {
    /// Worth retrying with backoff (network blip, rate limit).
    #[error("transient: {0}")]
    Transient(String),
    /// The job fails.
    #[error("fatal: {0}")]
    Fatal(String),
}

/// One proposal: the next step plus the tokens spent producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub step: PlanStep,
    pub tokens_used: u64,
}

impl Proposal {
    pub fn new(step: PlanStep) -> Self {
        Self {
            step,
            tokens_used: 0,
        }
    }

    drudge_core::setters! {
        set {
            tokens_used: u64,
        }
    }
}

/// External step function: `propose(history, tools, goal) → next action`.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn propose(
        &self,
        goal: &str,
        history: &[EventRecord],
        catalog: &[ToolSpec],
    ) -> Result<Proposal, PlannerError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use scripted::ScriptedPlanner;

#[cfg(any(test, feature = "test-support"))]
mod scripted {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    enum Script {
        /// Yield each response once, in order.
        Sequence(VecDeque<Result<Proposal, PlannerError>>),
        /// Yield the same response forever.
        Repeat(Box<Result<Proposal, PlannerError>>),
    }

    /// Deterministic planner for tests: plays back a script.
    pub struct ScriptedPlanner {
        script: Mutex<Script>,
        calls: Mutex<u32>,
    }

    impl ScriptedPlanner {
        /// Play the given steps in order; escalates if asked past the end.
        pub fn sequence(steps: impl IntoIterator<Item = PlanStep>) -> Self {
            Self {
                script: Mutex::new(Script::Sequence(
                    steps.into_iter().map(|step| Ok(Proposal::new(step))).collect(),
                )),
                calls: Mutex::new(0),
            }
        }

        /// Play raw results (including planner errors) in order.
        pub fn results(results: impl IntoIterator<Item = Result<Proposal, PlannerError>>) -> Self {
            Self {
                script: Mutex::new(Script::Sequence(results.into_iter().collect())),
                calls: Mutex::new(0),
            }
        }

        /// Return the same step on every call.
        pub fn repeating(step: PlanStep) -> Self {
            Self {
                script: Mutex::new(Script::Repeat(Box::new(Ok(Proposal::new(step))))),
                calls: Mutex::new(0),
            }
        }

        /// How many times `propose` was called.
        pub fn calls(&self) -> u32 {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl Planner for ScriptedPlanner {
        async fn propose(
            &self,
            _goal: &str,
            _history: &[EventRecord],
            _catalog: &[ToolSpec],
        ) -> Result<Proposal, PlannerError> {
            *self.calls.lock() += 1;
            let mut script = self.script.lock();
            match &mut *script {
                Script::Sequence(queue) => queue.pop_front().unwrap_or_else(|| {
                    Ok(Proposal::new(PlanStep::escalate("script exhausted")))
                }),
                Script::Repeat(result) => (**result).clone(),
            }
        }
    }
}
