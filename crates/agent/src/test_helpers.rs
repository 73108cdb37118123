//! Shared test helpers for agent tests.

use async_trait::async_trait;
use autoclaw_config::{AiSettings, AppConfig};
use autoclaw_core::command::{Command, CommandArgs, CommandContext, CommandRegistry};
use autoclaw_core::console::OperatorConsole;
use autoclaw_core::error::{CommandError, ConsoleError, PluginError, ProviderError};
use autoclaw_core::plugin::{HookPoint, Plugin};
use autoclaw_core::proposal::{AssistantProposal, Invocation};
use autoclaw_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::state::AgentState;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn from_texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| make_text_response(t)).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if requests.len() >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                requests.len(),
                responses.len()
            );
        }

        let response = responses[requests.len()].clone();
        requests.push(request);
        Ok(response)
    }
}

/// A provider that always fails.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::ApiError {
            status_code: 500,
            message: "backend down".into(),
        })
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.to_string(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A well-formed reply proposing `name` with `args`.
pub fn valid_reply(name: &str, args: Value) -> String {
    serde_json::json!({
        "thoughts": {
            "text": format!("I should run {name}"),
            "reasoning": "it moves the goal forward",
            "plan": "- run it\n- check the result",
            "criticism": "none yet",
            "speak": format!("Running {name}")
        },
        "command": { "name": name, "args": args }
    })
    .to_string()
}

pub fn proposal(name: &str, args: Value) -> AssistantProposal {
    AssistantProposal::from_value(&serde_json::from_str(&valid_reply(name, args)).unwrap()).unwrap()
}

pub fn test_state() -> AgentState {
    AgentState::new(
        &AiSettings::default(),
        Arc::new(CommandRegistry::new()),
        Arc::new(AppConfig::default()),
    )
}

/// A console that replays scripted operator lines and captures output.
///
/// Reports `ConsoleError::Closed` once the script is exhausted.
#[derive(Default)]
pub struct ScriptedConsole {
    lines: Mutex<VecDeque<String>>,
    prompts: AtomicUsize,
    output: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: Mutex::new(lines.iter().map(|l| l.to_string()).collect()),
            ..Self::default()
        }
    }

    /// How many times input was requested.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn output(&self) -> Vec<String> {
        self.output.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

#[async_trait]
impl OperatorConsole for ScriptedConsole {
    async fn read_line(&self, _prompt: &str) -> Result<String, ConsoleError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.lines.lock().unwrap().pop_front().ok_or(ConsoleError::Closed)
    }

    fn say(&self, title: &str, content: &str) {
        self.output.lock().unwrap().push(format!("{title}{content}"));
    }

    fn warn(&self, content: &str) {
        self.warnings.lock().unwrap().push(content.to_string());
    }
}

/// Records the hook points it was invoked at; otherwise the identity.
pub struct RecordingPlugin {
    points: Vec<HookPoint>,
    seen: Mutex<Vec<HookPoint>>,
}

impl RecordingPlugin {
    pub fn new(points: &[HookPoint]) -> Self {
        Self {
            points: points.to_vec(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<HookPoint> {
        self.seen.lock().unwrap().clone()
    }

    fn record(&self, point: HookPoint) {
        self.seen.lock().unwrap().push(point);
    }
}

#[async_trait]
impl Plugin for RecordingPlugin {
    fn name(&self) -> &str {
        "recorder"
    }

    fn can_handle_post_planning(&self) -> bool {
        self.points.contains(&HookPoint::PostPlanning)
    }

    fn can_handle_pre_command(&self) -> bool {
        self.points.contains(&HookPoint::PreCommand)
    }

    fn can_handle_post_command(&self) -> bool {
        self.points.contains(&HookPoint::PostCommand)
    }

    async fn post_planning(
        &self,
        proposal: Option<AssistantProposal>,
    ) -> Result<Option<AssistantProposal>, PluginError> {
        self.record(HookPoint::PostPlanning);
        Ok(proposal)
    }

    async fn pre_command(&self, invocation: Invocation) -> Result<Invocation, PluginError> {
        self.record(HookPoint::PreCommand);
        Ok(invocation)
    }

    async fn post_command(&self, _command: &str, result: String) -> Result<String, PluginError> {
        self.record(HookPoint::PostCommand);
        Ok(result)
    }
}

/// Fails at one hook point.
pub struct FaultingPlugin {
    point: HookPoint,
}

impl FaultingPlugin {
    pub fn at(point: HookPoint) -> Self {
        Self { point }
    }

    fn fault(&self) -> PluginError {
        PluginError {
            plugin: "faulty".into(),
            point: self.point.to_string(),
            reason: "boom".into(),
        }
    }
}

#[async_trait]
impl Plugin for FaultingPlugin {
    fn name(&self) -> &str {
        "faulty"
    }

    fn can_handle_post_planning(&self) -> bool {
        self.point == HookPoint::PostPlanning
    }

    fn can_handle_pre_command(&self) -> bool {
        self.point == HookPoint::PreCommand
    }

    fn can_handle_post_command(&self) -> bool {
        self.point == HookPoint::PostCommand
    }

    async fn post_planning(
        &self,
        _proposal: Option<AssistantProposal>,
    ) -> Result<Option<AssistantProposal>, PluginError> {
        Err(self.fault())
    }

    async fn pre_command(&self, _invocation: Invocation) -> Result<Invocation, PluginError> {
        Err(self.fault())
    }

    async fn post_command(&self, _command: &str, _result: String) -> Result<String, PluginError> {
        Err(self.fault())
    }
}

/// Returns its `text` argument and counts dispatches.
pub struct EchoCommand {
    name: &'static str,
    calls: Arc<AtomicUsize>,
}

impl Default for EchoCommand {
    fn default() -> Self {
        Self::named("echo")
    }
}

impl EchoCommand {
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Command for EchoCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn label(&self) -> &str {
        "Echo text"
    }

    fn signature(&self) -> &[(&'static str, &'static str)] {
        &[("text", "text")]
    }

    async fn execute(&self, args: &CommandArgs, _ctx: &CommandContext) -> Result<Value, CommandError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        args.get("text")
            .cloned()
            .ok_or_else(|| CommandError::InvalidArguments("Missing 'text' argument".into()))
    }
}

/// Replaces whatever was planned (including nothing) with a fixed proposal.
pub struct ReplacingPlugin {
    replacement: AssistantProposal,
}

impl ReplacingPlugin {
    pub fn new(replacement: AssistantProposal) -> Self {
        Self { replacement }
    }
}

#[async_trait]
impl Plugin for ReplacingPlugin {
    fn name(&self) -> &str {
        "replacer"
    }

    fn can_handle_post_planning(&self) -> bool {
        true
    }

    async fn post_planning(
        &self,
        _proposal: Option<AssistantProposal>,
    ) -> Result<Option<AssistantProposal>, PluginError> {
        Ok(Some(self.replacement.clone()))
    }
}
