// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tool seam and registry.
//!
//! Tools are opaque effect-producing functions keyed by name. The agent
//! loop consults their declared attributes (category, hints, footprint)
//! and never their semantics.

use async_trait::async_trait;
use drudge_core::{Footprint, JobId, Mode, ToolError, ToolOutput, ToolSpec};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// What a tool gets to know about the job invoking it.
#[derive(Debug, Clone)]
pub struct ToolCtx {
    pub job_id: JobId,
    /// Working copy the tool may touch. Exclusively owned by the running
    /// worker for the duration of the job.
    pub repo_path: PathBuf,
    pub mode: Mode,
}

/// An executable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &ToolSpec;

    /// Declared change surface for these params, reported before execution.
    /// `None` means the tool enforces its own limits.
    fn footprint(&self, _params: &serde_json::Value) -> Option<Footprint> {
        None
    }

    /// Key tools use to make re-execution after a crash idempotent.
    fn idempotency_key(&self, _params: &serde_json::Value) -> Option<String> {
        None
    }

    async fn invoke(
        &self,
        ctx: &ToolCtx,
        params: &serde_json::Value,
    ) -> Result<ToolOutput, ToolError>;
}

/// Name-keyed tool lookup plus the catalog handed to planners.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.spec().name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Specs of every registered tool, sorted by name for determinism.
    pub fn catalog(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|tool| tool.spec().clone()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    //! Stub tools for exercising the agent loop without real effects.

    use super::*;
    use drudge_core::ToolCategory;
    use parking_lot::Mutex;
    use serde_json::json;

    /// What a [`StubTool`] does on each invocation.
    #[derive(Clone)]
    pub enum StubBehavior {
        /// Return this output.
        Ok(serde_json::Value),
        /// Return a recoverable error.
        Recoverable(String),
        /// Return a fatal error.
        Fatal(String),
        /// Never resolve (exercises the tool timeout).
        Hang,
    }

    /// Configurable stub tool that records its invocations.
    ///
    /// Mutating stubs read their declared footprint from
    /// `params["footprint"]` (`{"files": n, "lines": n}`), the way the
    /// pre-flight report is modeled in the loop tests.
    pub struct StubTool {
        spec: ToolSpec,
        behavior: StubBehavior,
        tokens_per_call: u64,
        cost_per_call: u64,
        invocations: Mutex<Vec<serde_json::Value>>,
    }

    impl StubTool {
        pub fn read_only(name: &str) -> Self {
            Self::new(name, ToolCategory::ReadOnly, StubBehavior::Ok(json!({"ok": true})))
        }

        pub fn mutating(name: &str) -> Self {
            Self::new(name, ToolCategory::Mutating, StubBehavior::Ok(json!({"ok": true})))
        }

        pub fn new(name: &str, category: ToolCategory, behavior: StubBehavior) -> Self {
            Self {
                spec: ToolSpec::new(name, category),
                behavior,
                tokens_per_call: 0,
                cost_per_call: 0,
                invocations: Mutex::new(Vec::new()),
            }
        }

        pub fn behavior(mut self, behavior: StubBehavior) -> Self {
            self.behavior = behavior;
            self
        }

        pub fn usage(mut self, tokens: u64, cost_cents: u64) -> Self {
            self.tokens_per_call = tokens;
            self.cost_per_call = cost_cents;
            self
        }

        /// Params of every invocation so far.
        pub fn invocations(&self) -> Vec<serde_json::Value> {
            self.invocations.lock().clone()
        }
    }

    #[async_trait]
    impl Tool for StubTool {
        fn spec(&self) -> &ToolSpec {
            &self.spec
        }

        fn footprint(&self, params: &serde_json::Value) -> Option<Footprint> {
            let footprint = params.get("footprint")?;
            Some(Footprint {
                files: footprint.get("files")?.as_u64()? as u32,
                lines: footprint.get("lines")?.as_u64()? as u32,
            })
        }

        async fn invoke(
            &self,
            _ctx: &ToolCtx,
            params: &serde_json::Value,
        ) -> Result<ToolOutput, ToolError> {
            self.invocations.lock().push(params.clone());
            match &self.behavior {
                StubBehavior::Ok(value) => Ok(ToolOutput::new(value.clone())
                    .tokens_used(self.tokens_per_call)
                    .cost_cents(self.cost_per_call)),
                StubBehavior::Recoverable(msg) => Err(ToolError::Recoverable(msg.clone())),
                StubBehavior::Fatal(msg) => Err(ToolError::Fatal(msg.clone())),
                StubBehavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!("pending future resolved")
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
