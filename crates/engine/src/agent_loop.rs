// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bounded agent loop.
//!
//! One loop per claimed job. Each iteration checks cancellation, checks
//! budget, asks the planner for the next step, and executes it. Every way
//! the loop can end is an [`Outcome`]; nothing escapes.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::planner::{Planner, PlannerError, Proposal};
use crate::tools::{ToolCtx, ToolRegistry};
use crate::EngineDeps;
use drudge_core::{
    Budget, Clock, EventRecord, FailReason, Job, Outcome, PlanStep, ToolCategory, ToolError,
    TraceId,
};
use drudge_storage::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// How the loop observes cancel requests between suspension points.
pub type CancelCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Consecutive recoverable failures of one tool before the loop stops
/// retrying and escalates.
const ESCALATE_AFTER_FAILURES: u32 = 4;

/// Consecutive over-limit proposals for one tool before the loop stops
/// the planner and escalates. A footprint violation is a policy conflict,
/// not tool flakiness, so it gets a much shorter leash.
const ESCALATE_AFTER_FOOTPRINT_VIOLATIONS: u32 = 2;

/// Transient planner errors retry this many times before the job fails.
const PLANNER_RETRIES: u32 = 2;

/// Per-tool strike counters. Tool failures and footprint violations are
/// tracked separately so the two failure modes never share a threshold;
/// a successful execution of the tool clears both.
#[derive(Default)]
struct Strikes {
    tool_failures: HashMap<String, u32>,
    footprint_violations: HashMap<String, u32>,
}

impl Strikes {
    fn bump(map: &mut HashMap<String, u32>, tool_name: &str) -> u32 {
        let strikes = map.entry(tool_name.to_string()).or_insert(0);
        *strikes += 1;
        *strikes
    }

    fn clear(&mut self, tool_name: &str) {
        self.tool_failures.remove(tool_name);
        self.footprint_violations.remove(tool_name);
    }
}

/// Bounded cooperative loop for one job.
pub struct AgentLoop<C: Clock> {
    job: Job,
    store: Arc<Store>,
    ledger: Arc<Ledger<C>>,
    registry: Arc<ToolRegistry>,
    planner: Arc<dyn Planner>,
    config: Arc<EngineConfig>,
    clock: C,
    cancelled: CancelCheck,
    trace_id: TraceId,
}

impl<C: Clock> AgentLoop<C> {
    pub fn new(job: Job, deps: &EngineDeps<C>, cancelled: CancelCheck) -> Self {
        Self {
            job,
            store: Arc::clone(&deps.store),
            ledger: Arc::clone(&deps.ledger),
            registry: Arc::clone(&deps.registry),
            planner: Arc::clone(&deps.planner),
            config: Arc::clone(&deps.config),
            clock: deps.clock.clone(),
            cancelled,
            trace_id: TraceId::new(),
        }
    }

    /// Drive the job to an outcome. Engine trouble (store writes failing
    /// underneath the loop) surfaces as `failed(internal_error)`;
    /// everything else is a normal outcome.
    pub async fn run(self) -> Outcome {
        let job_id = self.job.id.clone();
        match self.run_inner().await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(job = %job_id, error = %err, "agent loop infrastructure failure");
                Outcome::Failed(FailReason::Internal(err.to_string()))
            }
        }
    }

    async fn run_inner(self) -> Result<Outcome, EngineError> {
        let wall_clock = self.config.defaults_for(self.job.mode).wall_clock;
        let mut budget = Budget::from_job(&self.job, wall_clock);
        let mut strikes = Strikes::default();
        let catalog = self.registry.catalog();

        loop {
            if (self.cancelled)() {
                tracing::info!(job = %self.job.id, "cancel observed; unwinding");
                return Ok(Outcome::Cancelled);
            }

            if let Some(reason) = budget.exhausted(self.clock.epoch_ms()) {
                self.ledger.append(
                    EventRecord::error(
                        self.job.id.clone(),
                        self.trace_id.clone(),
                        format!("budget exhausted: {reason}"),
                    ),
                )?;
                return Ok(Outcome::Failed(FailReason::Budget(reason)));
            }

            let proposal = match self.propose(&catalog).await {
                Ok(proposal) => proposal,
                Err(err) => {
                    self.ledger.append(EventRecord::error(
                        self.job.id.clone(),
                        self.trace_id.clone(),
                        format!("planner failed: {err}"),
                    ))?;
                    return Ok(Outcome::Failed(FailReason::Planner(err.to_string())));
                }
            };
            let planner_tokens = proposal.tokens_used;

            // Every planner consultation is one step, the answering and
            // escalating ones included.
            match proposal.step {
                PlanStep::Answer { text } => {
                    self.ledger.append(EventRecord::completion(
                        self.job.id.clone(),
                        self.trace_id.clone(),
                        text,
                    ))?;
                    self.charge(&mut budget, planner_tokens, 0, "answering")?;
                    return Ok(Outcome::Success);
                }

                PlanStep::Escalate { reason } => {
                    self.ledger.append(EventRecord::escalation(
                        self.job.id.clone(),
                        self.trace_id.clone(),
                        reason.clone(),
                    ))?;
                    self.charge(&mut budget, planner_tokens, 0, "escalating")?;
                    return Ok(Outcome::Escalated(reason));
                }

                PlanStep::Call { tool, params } => {
                    let step = self
                        .execute_call(&tool, params, planner_tokens, &mut budget, &mut strikes)
                        .await?;
                    if let Some(outcome) = step {
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    /// Ask the planner, with timeout and bounded retry on transient errors.
    async fn propose(
        &self,
        catalog: &[drudge_core::ToolSpec],
    ) -> Result<Proposal, PlannerError> {
        let history = self.recent_history();
        let mut attempt = 0;
        loop {
            let result = timeout(
                self.config.planner_timeout,
                self.planner.propose(&self.job.goal, &history, catalog),
            )
            .await
            .unwrap_or_else(|_| Err(PlannerError::Transient("planner timed out".to_string())));

            match result {
                Ok(proposal) => return Ok(proposal),
                Err(PlannerError::Transient(msg)) if attempt < PLANNER_RETRIES => {
                    attempt += 1;
                    tracing::warn!(job = %self.job.id, attempt, error = %msg, "planner transient error; retrying");
                    tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn recent_history(&self) -> Vec<EventRecord> {
        let last = self.store.last_event_seq(&self.job.id);
        let after = last.saturating_sub(self.config.history_limit as u64);
        self.store.list_events(&self.job.id, after)
    }

    /// One `call` iteration. `Ok(Some(outcome))` terminates the loop.
    async fn execute_call(
        &self,
        tool_name: &str,
        params: serde_json::Value,
        planner_tokens: u64,
        budget: &mut Budget,
        strikes: &mut Strikes,
    ) -> Result<Option<Outcome>, EngineError> {
        let Some(tool) = self.registry.get(tool_name) else {
            self.append_tool_error(tool_name, format!("unknown tool: {tool_name}"))?;
            self.charge(budget, planner_tokens, 0, &format!("ran {tool_name}"))?;
            return Ok(None);
        };

        // Mode footprint enforcement before any mutating execution
        if tool.spec().category == ToolCategory::Mutating {
            let limits = self.config.defaults_for(self.job.mode).footprint;
            if let Some(footprint) = tool.footprint(&params) {
                if !limits.permits(&footprint) {
                    self.append_tool_error(
                        tool_name,
                        format!(
                            "footprint {} files / {} lines exceeds {} mode limits ({} files / {} lines)",
                            footprint.files,
                            footprint.lines,
                            self.job.mode,
                            limits.max_files,
                            limits.max_lines
                        ),
                    )?;
                    self.charge(budget, planner_tokens, 0, &format!("ran {tool_name}"))?;
                    let violations =
                        Strikes::bump(&mut strikes.footprint_violations, tool_name);
                    if violations >= ESCALATE_AFTER_FOOTPRINT_VIOLATIONS {
                        return Ok(Some(self.escalate(format!(
                            "{tool_name} exceeded the {} mode footprint limits {violations} proposals in a row",
                            self.job.mode
                        ))?));
                    }
                    return Ok(None);
                }
            }
        }

        self.ledger.append(EventRecord::tool_call(
            self.job.id.clone(),
            self.trace_id.clone(),
            tool_name,
            params.clone(),
        ))?;

        // Last cancellation check before committing a mutating call
        if tool.spec().category == ToolCategory::Mutating && (self.cancelled)() {
            tracing::info!(job = %self.job.id, tool = tool_name, "cancel observed before mutating call");
            return Ok(Some(Outcome::Cancelled));
        }

        let ctx = ToolCtx {
            job_id: self.job.id.clone(),
            repo_path: self.job.repo_path.clone(),
            mode: self.job.mode,
        };
        let invocation = timeout(self.config.tool_timeout, tool.invoke(&ctx, &params)).await;

        match invocation {
            Ok(Ok(output)) => {
                self.ledger.append(
                    EventRecord::tool_result(
                        self.job.id.clone(),
                        self.trace_id.clone(),
                        tool_name,
                        output.value.clone(),
                        format!("{tool_name} succeeded"),
                    )
                    .tokens_used(output.tokens_used)
                    .cost_cents(output.cost_cents),
                )?;
                strikes.clear(tool_name);
                self.charge(
                    budget,
                    planner_tokens + output.tokens_used,
                    output.cost_cents,
                    &format!("ran {tool_name}"),
                )?;
                Ok(None)
            }

            Ok(Err(ToolError::Fatal(msg))) => {
                self.append_tool_error(tool_name, format!("{tool_name} failed fatally: {msg}"))?;
                self.charge(budget, planner_tokens, 0, &format!("ran {tool_name}"))?;
                Ok(Some(Outcome::Failed(FailReason::Tool(msg))))
            }

            Ok(Err(ToolError::Recoverable(msg))) => {
                self.recoverable_failure(
                    tool_name,
                    format!("{tool_name} failed: {msg}"),
                    planner_tokens,
                    budget,
                    strikes,
                )
            }

            Err(_elapsed) => self.recoverable_failure(
                tool_name,
                format!(
                    "{tool_name} timed out after {}s",
                    self.config.tool_timeout.as_secs()
                ),
                planner_tokens,
                budget,
                strikes,
            ),
        }
    }

    /// Record a recoverable failure; escalate once the same tool has failed
    /// four times in a row, otherwise let the planner see the error.
    fn recoverable_failure(
        &self,
        tool_name: &str,
        summary: String,
        planner_tokens: u64,
        budget: &mut Budget,
        strikes: &mut Strikes,
    ) -> Result<Option<Outcome>, EngineError> {
        self.append_tool_error(tool_name, summary)?;
        self.charge(budget, planner_tokens, 0, &format!("ran {tool_name}"))?;
        let failures = Strikes::bump(&mut strikes.tool_failures, tool_name);
        if failures >= ESCALATE_AFTER_FAILURES {
            return Ok(Some(
                self.escalate(format!("{tool_name} failed {failures} times in a row"))?,
            ));
        }
        Ok(None)
    }

    /// Append the escalation event and hand the job to a human.
    fn escalate(&self, reason: String) -> Result<Outcome, EngineError> {
        self.ledger.append(EventRecord::escalation(
            self.job.id.clone(),
            self.trace_id.clone(),
            reason.clone(),
        ))?;
        Ok(Outcome::Escalated(reason))
    }

    fn append_tool_error(&self, tool_name: &str, summary: String) -> Result<(), EngineError> {
        let payload = serde_json::json!({ "error": &summary });
        self.ledger.append(EventRecord::tool_result(
            self.job.id.clone(),
            self.trace_id.clone(),
            tool_name,
            payload,
            summary,
        ))?;
        Ok(())
    }

    /// In-memory reservation first, durable increment second; the loop acts
    /// on the in-memory view at the top of the next iteration.
    fn charge(
        &self,
        budget: &mut Budget,
        tokens: u64,
        cost_cents: u64,
        action: &str,
    ) -> Result<(), EngineError> {
        budget.charge(1, tokens, cost_cents);
        self.store
            .update_budget(&self.job.id, 1, tokens, cost_cents, Some(action.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "agent_loop_tests.rs"]
mod tests;
