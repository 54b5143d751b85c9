//! Workflow engine: dependency-ordered DAG execution over provider adapters.
//!
//! The `WorkflowEngine` takes a validated submission and drives each node to
//! completion: agent nodes dispatch to a model provider through the
//! resilience shell, tool nodes evaluate a JEXL expression locally, and data
//! nodes resolve literal content. Failure of any node fails the run and
//! skips everything not yet started; outputs produced before the failure
//! stay readable on the run record.
//!
//! # Execution flow
//!
//! 1. Validate the graph and register a PENDING run record.
//! 2. Build an execution plan (total order plus dependency waves).
//! 3. Walk nodes in order, or wave by wave when parallel branches are on.
//! 4. Each node: typed config -> reference resolution -> dispatch ->
//!    structured-output validation and compensation.
//! 5. Accumulate outputs in the execution context and on the run record.
//! 6. Finalize the record and emit lifecycle events throughout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use futures_util::StreamExt;
use inkloom_types::config::EngineConfig;
use inkloom_types::error::WorkflowError;
use inkloom_types::event::{NodeEvent, NodeEventStatus};
use inkloom_types::llm::{GroundingOptions, InvocationRequest, StreamEvent};
use inkloom_types::workflow::{
    AgentNodeConfig, DataNodeConfig, RunStatus, ToolNodeConfig, TypedNodeConfig,
    WorkflowDefinition, WorkflowNode, WorkflowRun, WorkflowSubmission,
};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::EventBus;
use crate::llm::{BoxLlmProvider, ModelRegistry, ProviderFactory};
use crate::resilience::{ResilienceShell, RetryPolicy};
use crate::schema::{SchemaRegistry, validate};

use super::compensation::{build_compensation_prompt, extract_json, merge_outputs};
use super::context::ExecutionContext;
use super::dag::{self, ExecutionPlan};
use super::expression::ToolEvaluator;
use super::node_config::map_node_config;

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Executes workflow submissions against a set of injected collaborators.
///
/// Cloning is cheap: run records, the model registry, and the resilience
/// shell are shared behind `Arc`, so a clone observes the same state. The
/// HTTP layer holds one engine and clones it per request.
#[derive(Clone)]
pub struct WorkflowEngine {
    models: Arc<ModelRegistry>,
    schemas: Arc<SchemaRegistry>,
    factory: Arc<dyn ProviderFactory>,
    shell: Arc<ResilienceShell>,
    events: EventBus,
    evaluator: Arc<ToolEvaluator>,
    /// Run records for status polling, kept for the process lifetime.
    runs: Arc<DashMap<Uuid, WorkflowRun>>,
    config: EngineConfig,
}

impl WorkflowEngine {
    pub fn new(
        models: Arc<ModelRegistry>,
        schemas: Arc<SchemaRegistry>,
        factory: Arc<dyn ProviderFactory>,
        shell: Arc<ResilienceShell>,
        events: EventBus,
        config: EngineConfig,
    ) -> Self {
        Self {
            models,
            schemas,
            factory,
            shell,
            events,
            evaluator: Arc::new(ToolEvaluator::new()),
            runs: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Validate a submission, register a PENDING run, and execute it in the
    /// background. Returns the run id immediately for status polling.
    ///
    /// Structural problems (cycle, dangling edge, duplicate id) reject the
    /// submission here, before any node is dispatched.
    pub fn submit(&self, submission: WorkflowSubmission) -> Result<Uuid, WorkflowError> {
        let (definition, seed) = submission.into_parts();
        dag::validate(&definition)?;

        let run_id = Uuid::now_v7();
        self.runs.insert(
            run_id,
            WorkflowRun::pending(run_id, definition.id.clone(), definition.name.clone()),
        );

        let engine = self.clone();
        tokio::spawn(async move {
            engine.drive(run_id, definition, seed).await;
        });

        Ok(run_id)
    }

    /// Validate a submission and run it to completion, returning the final
    /// run record. Used by the CLI; the HTTP layer prefers [`Self::submit`].
    pub async fn execute(
        &self,
        submission: WorkflowSubmission,
    ) -> Result<WorkflowRun, WorkflowError> {
        let (definition, seed) = submission.into_parts();
        dag::validate(&definition)?;

        let run_id = Uuid::now_v7();
        self.runs.insert(
            run_id,
            WorkflowRun::pending(run_id, definition.id.clone(), definition.name.clone()),
        );

        Ok(self.drive(run_id, definition, seed).await)
    }

    /// Current record for a run, if known.
    pub fn run(&self, run_id: &Uuid) -> Option<WorkflowRun> {
        self.runs.get(run_id).map(|entry| entry.clone())
    }

    /// All known run records, newest first.
    pub fn runs(&self) -> Vec<WorkflowRun> {
        let mut all: Vec<WorkflowRun> = self.runs.iter().map(|entry| entry.clone()).collect();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all
    }

    /// Drop all cached provider responses, returning how many were evicted.
    pub fn clear_cache(&self) -> usize {
        self.shell.cache().clear()
    }

    /// Event bus carrying per-node lifecycle events.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // -----------------------------------------------------------------------
    // Run loop
    // -----------------------------------------------------------------------

    async fn drive(
        &self,
        run_id: Uuid,
        definition: WorkflowDefinition,
        seed: HashMap<String, Value>,
    ) -> WorkflowRun {
        info!(
            run_id = %run_id,
            workflow = definition.name.as_str(),
            nodes = definition.nodes.len(),
            "starting workflow run"
        );
        if let Some(mut entry) = self.runs.get_mut(&run_id) {
            entry.status = RunStatus::Running;
        }

        let plan = match dag::plan(&definition) {
            Ok(plan) => plan,
            Err(error) => return self.finish(run_id, Err(error.to_string())),
        };

        let mut context = ExecutionContext::new(seed);
        let outcome = if self.config.parallel_branches {
            self.drive_waves(run_id, &definition, &plan, &mut context)
                .await
        } else {
            self.drive_sequential(run_id, &definition, &plan, &mut context)
                .await
        };

        self.finish(run_id, outcome)
    }

    async fn drive_sequential(
        &self,
        run_id: Uuid,
        definition: &WorkflowDefinition,
        plan: &ExecutionPlan,
        context: &mut ExecutionContext,
    ) -> Result<(), String> {
        for &position in &plan.order {
            let node = &definition.nodes[position];
            let output = self.run_node(run_id, node, context).await?;
            self.record_output(run_id, &node.id, output, context);
        }
        Ok(())
    }

    /// Run independent branches concurrently, one dependency wave at a time.
    ///
    /// Nodes in the same wave share no edges, so they read a frozen context
    /// and their outputs land only after the whole wave settles. A failure
    /// lets the rest of its wave finish (their outputs are kept) and then
    /// stops the run before the next wave.
    async fn drive_waves(
        &self,
        run_id: Uuid,
        definition: &WorkflowDefinition,
        plan: &ExecutionPlan,
        context: &mut ExecutionContext,
    ) -> Result<(), String> {
        for (wave_index, wave) in plan.waves.iter().enumerate() {
            debug!(run_id = %run_id, wave = wave_index, nodes = wave.len(), "dispatching wave");

            let results = {
                let frozen: &ExecutionContext = context;
                let futures: Vec<_> = wave
                    .iter()
                    .map(|&position| self.run_node(run_id, &definition.nodes[position], frozen))
                    .collect();
                futures_util::future::join_all(futures).await
            };

            let mut first_error = None;
            for (&position, result) in wave.iter().zip(results) {
                match result {
                    Ok(output) => {
                        self.record_output(run_id, &definition.nodes[position].id, output, context);
                    }
                    Err(error) => {
                        if first_error.is_none() {
                            first_error = Some(error);
                        }
                    }
                }
            }
            if let Some(error) = first_error {
                return Err(error);
            }
        }
        Ok(())
    }

    fn record_output(
        &self,
        run_id: Uuid,
        node_id: &str,
        output: Value,
        context: &mut ExecutionContext,
    ) {
        if let Some(mut entry) = self.runs.get_mut(&run_id) {
            entry.outputs.insert(node_id.to_string(), output.clone());
        }
        context.insert(node_id, output);
    }

    fn finish(&self, run_id: Uuid, outcome: Result<(), String>) -> WorkflowRun {
        let (status, error) = match outcome {
            Ok(()) => (RunStatus::Complete, None),
            Err(message) => (RunStatus::Failed, Some(message)),
        };

        match status {
            RunStatus::Complete => info!(run_id = %run_id, "workflow run complete"),
            _ => warn!(
                run_id = %run_id,
                error = error.as_deref().unwrap_or_default(),
                "workflow run failed"
            ),
        }

        let finished_at = Some(Utc::now());
        match self.runs.get_mut(&run_id) {
            Some(mut entry) => {
                entry.status = status;
                entry.error = error;
                entry.finished_at = finished_at;
                entry.clone()
            }
            None => {
                // Records are never evicted mid-run; synthesize a terminal
                // record so callers still get an answer.
                let mut run = WorkflowRun::pending(run_id, String::new(), String::new());
                run.status = status;
                run.error = error;
                run.finished_at = finished_at;
                run
            }
        }
    }

    // -----------------------------------------------------------------------
    // Node execution
    // -----------------------------------------------------------------------

    /// Run one node start to finish, emitting lifecycle events.
    async fn run_node(
        &self,
        run_id: Uuid,
        node: &WorkflowNode,
        context: &ExecutionContext,
    ) -> Result<Value, String> {
        let typed = map_node_config(node, &self.models).await;
        let label = node_label(node, &typed);

        self.events.publish_node(
            run_id,
            NodeEvent::now(
                &node.id,
                &label,
                NodeEventStatus::Started,
                format!("{} started", node_display(node)),
            ),
        );

        let started = std::time::Instant::now();
        let work = self.dispatch(run_id, node, &typed, &label, context);
        let result = match node.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), work).await {
                Ok(result) => result,
                Err(_) => Err(format!("node timed out after {secs}s")),
            },
            None => work.await,
        };

        match result {
            Ok(output) => {
                debug!(
                    run_id = %run_id,
                    node_id = node.id.as_str(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "node completed"
                );
                self.events.publish_node(
                    run_id,
                    NodeEvent::now(
                        &node.id,
                        &label,
                        NodeEventStatus::Completed,
                        format!("{} completed", node_display(node)),
                    )
                    .with_output(output.clone()),
                );
                Ok(output)
            }
            Err(error) => {
                warn!(
                    run_id = %run_id,
                    node_id = node.id.as_str(),
                    error = error.as_str(),
                    "node failed"
                );
                self.events.publish_node(
                    run_id,
                    NodeEvent::now(
                        &node.id,
                        &label,
                        NodeEventStatus::Failed,
                        format!("{} failed", node_display(node)),
                    )
                    .with_error(error.clone()),
                );
                Err(format!("node '{}' failed: {error}", node_display(node)))
            }
        }
    }

    async fn dispatch(
        &self,
        run_id: Uuid,
        node: &WorkflowNode,
        typed: &TypedNodeConfig,
        label: &str,
        context: &ExecutionContext,
    ) -> Result<Value, String> {
        match typed {
            TypedNodeConfig::Agent(config) => {
                self.run_agent(run_id, node, config, label, context).await
            }
            TypedNodeConfig::Tool(config) => self.run_tool(node, config, context),
            TypedNodeConfig::Data(config) => Ok(self.run_data(config, context)),
        }
    }

    /// Dispatch an agent node through the resilience shell, then validate
    /// and (if needed) compensate its structured output.
    async fn run_agent(
        &self,
        run_id: Uuid,
        node: &WorkflowNode,
        config: &AgentNodeConfig,
        label: &str,
        context: &ExecutionContext,
    ) -> Result<Value, String> {
        let prompt = context.resolve(&config.prompt);
        let reference = (!config.model_id.is_empty()).then_some(config.model_id.as_str());
        let model = self
            .models
            .resolve(reference)
            .await
            .map_err(|e| e.to_string())?;
        let provider = self.factory.create(&model).map_err(|e| e.to_string())?;

        let schema = if self.config.validate_outputs {
            self.schemas.get(&config.agent_type).cloned()
        } else {
            None
        };
        let request = InvocationRequest {
            model_id: model.model_id.clone(),
            prompt,
            schema: schema.clone(),
            grounding: GroundingOptions::default(),
        };
        let policy = node.retry.map(RetryPolicy::new).unwrap_or_default();

        let text = if self.config.stream_responses {
            // The stream consumes its provider; mint a fresh one for it.
            let streaming = self.factory.create(&model).map_err(|e| e.to_string())?;
            self.collect_stream(run_id, &node.id, label, streaming, request.clone())
                .await?
        } else {
            self.shell
                .invoke_with_policy(&provider, &request, policy)
                .await
                .map_err(|e| e.to_string())?
                .text
        };

        let Some(schema) = schema else {
            return Ok(Value::String(text));
        };
        let Some(mut output) = extract_json(&text) else {
            debug!(
                node_id = node.id.as_str(),
                "agent returned prose under a schema contract, passing it through"
            );
            return Ok(Value::String(text));
        };

        let mut report = validate(&output, &schema);
        let mut round = 0;
        while !report.is_valid && round < self.config.max_compensation_rounds {
            round += 1;
            info!(
                run_id = %run_id,
                node_id = node.id.as_str(),
                missing = report.missing_fields.len(),
                round,
                "output missing required fields, requesting compensation"
            );
            self.events.publish_node(
                run_id,
                NodeEvent::now(
                    &node.id,
                    label,
                    NodeEventStatus::Processing,
                    format!(
                        "requesting {} missing field(s), round {round}",
                        report.missing_fields.len()
                    ),
                ),
            );

            let follow_up = InvocationRequest {
                model_id: model.model_id.clone(),
                prompt: build_compensation_prompt(
                    &request.prompt,
                    &output.to_string(),
                    &report.missing_fields,
                ),
                // The follow-up prompt carries its own field list; appending
                // the full schema instruction again would contradict it.
                schema: None,
                grounding: GroundingOptions::default(),
            };
            let response = self
                .shell
                .invoke_with_policy(&provider, &follow_up, policy)
                .await
                .map_err(|e| e.to_string())?;

            match extract_json(&response.text) {
                Some(patch) => merge_outputs(&mut output, patch),
                None => {
                    debug!(node_id = node.id.as_str(), "compensation response carried no JSON");
                }
            }
            report = validate(&output, &schema);
        }

        if !report.is_valid {
            return Err(format!(
                "missing required fields after compensation: {}",
                report.missing_fields.join(", ")
            ));
        }
        Ok(output)
    }

    /// Stream an agent invocation, republishing each text delta as a
    /// processing event and returning the accumulated text.
    async fn collect_stream(
        &self,
        run_id: Uuid,
        node_id: &str,
        label: &str,
        provider: BoxLlmProvider,
        request: InvocationRequest,
    ) -> Result<String, String> {
        let mut stream = self.shell.invoke_streaming(provider, request);
        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event.map_err(|e| e.to_string())? {
                StreamEvent::TextDelta { text: chunk } => {
                    self.events.publish_node(
                        run_id,
                        NodeEvent::now(node_id, label, NodeEventStatus::Processing, chunk.clone()),
                    );
                    text.push_str(&chunk);
                }
                StreamEvent::Done => break,
            }
        }
        Ok(text)
    }

    fn run_tool(
        &self,
        node: &WorkflowNode,
        config: &ToolNodeConfig,
        context: &ExecutionContext,
    ) -> Result<Value, String> {
        if config.function_body.trim().is_empty() {
            debug!(node_id = node.id.as_str(), "tool node has no expression, producing empty output");
            return Ok(Value::String(String::new()));
        }
        self.evaluator
            .evaluate(&config.function_body, &context.as_jexl_context())
            .map_err(|e| e.to_string())
    }

    fn run_data(&self, config: &DataNodeConfig, context: &ExecutionContext) -> Value {
        let content = context.resolve(&config.content);
        if config.data_type == "json" {
            match serde_json::from_str(&content) {
                Ok(value) => return value,
                Err(error) => {
                    debug!(%error, "data node content is not valid JSON, keeping it as text");
                }
            }
        }
        Value::String(content)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Role/type string for a node's events: agent role, tool type, or data
/// type, falling back to the node kind when unset.
fn node_label(node: &WorkflowNode, typed: &TypedNodeConfig) -> String {
    let label = match typed {
        TypedNodeConfig::Agent(config) => config.agent_type.as_str(),
        TypedNodeConfig::Tool(config) => config.tool_type.as_str(),
        TypedNodeConfig::Data(config) => config.data_type.as_str(),
    };
    if label.is_empty() {
        node.kind.as_str().to_string()
    } else {
        label.to_string()
    }
}

fn node_display(node: &WorkflowNode) -> &str {
    if node.name.is_empty() { &node.id } else { &node.name }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
