//! Sequential tool-calling response generation.
//!
//! [`ResponseGenerator`] drives the model through a bounded number of tool
//! rounds. One round is: the model asks for one or more tools, every
//! requested tool is dispatched in order through the [`ToolRegistry`], and
//! the batch of results is sent back on the next call.
//!
//! The message list sent to the model only ever grows, by exactly two
//! messages per round (the assistant's tool request, then the user message
//! carrying the results). The final call of a run is made without tools
//! whenever the round budget is spent or a tool failed during the round,
//! which forces the model to answer in text.
//!
//! Generation never fails. Transport faults become a descriptive answer and
//! tool faults become error payloads the model gets to see.

use crate::llm::{
    ContentBlock, LanguageModel, LlmError, Message, ModelRequest, ModelResponse, ToolChoice,
    ToolDefinition,
};
use crate::tools::{Source, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default number of tool rounds per query.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 2;

/// Default output token limit per model call.
pub const DEFAULT_MAX_TOKENS: u32 = 800;

const EMPTY_RESPONSE: &str = "I received your request but the response was empty.";
const NO_TEXT_RESPONSE: &str = "I received your request but couldn't generate a text response.";
const NO_REGISTRY: &str =
    "The assistant requested a tool, but no tool registry is available to run it.";

/// Outcome of one generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Final answer text, or a description of what went wrong.
    pub answer: String,
    /// Citations from every dispatch, in dispatch order, without duplicates.
    pub sources: Vec<Source>,
    /// Completed tool rounds.
    pub rounds: usize,
    /// Model calls issued, successful or not.
    pub model_calls: usize,
}

/// Mutable state of a single run.
struct Run {
    messages: Vec<Message>,
    sources: Vec<Source>,
    rounds: usize,
    model_calls: usize,
}

impl Run {
    fn new(query: &str) -> Self {
        Self {
            messages: vec![Message::user(query)],
            sources: Vec::new(),
            rounds: 0,
            model_calls: 0,
        }
    }

    fn add_source(&mut self, source: Source) {
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    fn finish(self, answer: String) -> Generation {
        Generation {
            answer,
            sources: self.sources,
            rounds: self.rounds,
            model_calls: self.model_calls,
        }
    }
}

/// Answers queries by calling the model, optionally through tool rounds.
///
/// Holds no per-query state, so one generator can serve concurrent queries.
pub struct ResponseGenerator {
    model: Arc<dyn LanguageModel>,
    model_name: String,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
    max_tool_rounds: usize,
}

impl ResponseGenerator {
    /// Create a generator for the given model and base system prompt.
    pub fn new(
        model: Arc<dyn LanguageModel>,
        model_name: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            system_prompt: system_prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the tool round budget. Zero disables tools entirely.
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }

    /// Answer a query and return only the answer text.
    pub async fn generate(
        &self,
        query: &str,
        conversation: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        registry: Option<&ToolRegistry>,
    ) -> String {
        self.generate_detailed(query, conversation, tools, registry)
            .await
            .answer
    }

    /// Answer a query, reporting sources and call accounting alongside.
    #[instrument(
        skip(self, conversation, tools, registry),
        fields(model = %self.model_name, max_rounds = self.max_tool_rounds)
    )]
    pub async fn generate_detailed(
        &self,
        query: &str,
        conversation: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        registry: Option<&ToolRegistry>,
    ) -> Generation {
        let system = self.system_instructions(conversation);
        let tools: &[ToolDefinition] = match tools {
            Some(defs) if self.max_tool_rounds > 0 => defs,
            _ => &[],
        };
        let mut run = Run::new(query);

        let mut response = match self.call(&system, tools, &mut run).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Model call failed: {}", e);
                return run.finish(initial_failure_message(&e));
            }
        };

        if !self.wants_tools(&response) {
            return run.finish(extract_text(&response));
        }

        let Some(registry) = registry else {
            warn!("Model requested a tool but no registry was supplied");
            let answer = response
                .first_text()
                .map(str::to_string)
                .unwrap_or_else(|| NO_REGISTRY.to_string());
            return run.finish(answer);
        };

        loop {
            let round = run.rounds + 1;
            let failed = self.execute_round(round, response, registry, &mut run).await;
            run.rounds = round;

            let allow_more = round < self.max_tool_rounds && !failed;
            let offered: &[ToolDefinition] = if allow_more { tools } else { &[] };
            debug!(round, allow_more, "Tool round complete");

            response = match self.call(&system, offered, &mut run).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Model call failed in tool round {}: {}", round, e);
                    return run.finish(round_failure_message(round, &e));
                }
            };

            if !allow_more || !self.wants_tools(&response) {
                break;
            }
        }

        info!(
            rounds = run.rounds,
            calls = run.model_calls,
            sources = run.sources.len(),
            "Generation finished"
        );
        run.finish(extract_text(&response))
    }

    /// Base prompt, plus the previous conversation when there is one.
    fn system_instructions(&self, conversation: Option<&str>) -> String {
        match conversation {
            Some(history) if !history.is_empty() => {
                format!("{}\n\nPrevious conversation:\n{}", self.system_prompt, history)
            }
            _ => self.system_prompt.clone(),
        }
    }

    /// A response starts a round only if it asks for tools, names at least
    /// one, and the budget allows rounds at all.
    fn wants_tools(&self, response: &ModelResponse) -> bool {
        self.max_tool_rounds > 0
            && response.requested_tool()
            && response.tool_uses().next().is_some()
    }

    async fn call(
        &self,
        system: &str,
        tools: &[ToolDefinition],
        run: &mut Run,
    ) -> Result<ModelResponse, LlmError> {
        let tool_choice = (!tools.is_empty()).then_some(ToolChoice::Auto);
        let request = ModelRequest {
            model: self.model_name.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: system.to_string(),
            messages: run.messages.clone(),
            tools: tools.to_vec(),
            tool_choice,
        };

        run.model_calls += 1;
        debug!(
            call = run.model_calls,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Calling {}",
            self.model.name()
        );
        self.model.call(request).await
    }

    /// Run every tool the response asks for and append the request and the
    /// result batch to the conversation. Returns whether any tool failed.
    async fn execute_round(
        &self,
        round: usize,
        response: ModelResponse,
        registry: &ToolRegistry,
        run: &mut Run,
    ) -> bool {
        let requests: Vec<(String, String, serde_json::Value)> = response
            .tool_uses()
            .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
            .collect();
        run.messages.push(Message::assistant_blocks(response.content));

        let mut failed = false;
        let mut results = Vec::with_capacity(requests.len());
        for (id, name, input) in requests {
            debug!(round, tool = %name, "Dispatching tool");
            let dispatch = registry.dispatch(&name, &input).await;
            let is_error = dispatch.is_failure();
            failed |= is_error;
            for source in dispatch.sources {
                run.add_source(source);
            }
            results.push(ContentBlock::tool_result(id, dispatch.content, is_error));
        }
        run.messages.push(Message::tool_results(results));

        failed
    }
}

/// First text block of a response, or a fixed fallback.
fn extract_text(response: &ModelResponse) -> String {
    if response.content.is_empty() {
        return EMPTY_RESPONSE.to_string();
    }
    response
        .first_text()
        .map(str::to_string)
        .unwrap_or_else(|| NO_TEXT_RESPONSE.to_string())
}

fn initial_failure_message(err: &LlmError) -> String {
    match err {
        LlmError::Auth(_) => {
            "Authentication error: Please check your API key configuration.".to_string()
        }
        LlmError::RateLimit(_) => "Rate limit exceeded. Please try again in a moment.".to_string(),
        LlmError::Api { .. } | LlmError::Transport(_) => format!("API error occurred: {}", err),
        _ => format!("An unexpected error occurred: {}", err),
    }
}

fn round_failure_message(round: usize, err: &LlmError) -> String {
    if err.is_api_fault() {
        format!("API error during tool round {}: {}", round, err)
    } else {
        format!("Error in tool round {}: {}", round, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SyllabusError};
    use crate::llm::testing::ScriptedModel;
    use crate::llm::{Content, Role, StopReason};
    use crate::tools::{Tool, ToolOutput};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    const PROMPT: &str = "You answer questions about courses.";

    /// Looks up a query and cites one source named after it.
    struct LookupTool {
        calls: Mutex<Vec<Value>>,
    }

    impl LookupTool {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Value> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Tool for LookupTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(
                "lookup",
                "Look something up",
                json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
            )
        }

        async fn execute(&self, arguments: &Value) -> Result<ToolOutput> {
            self.calls.lock().unwrap().push(arguments.clone());
            let query = arguments["query"].as_str().unwrap_or_default();
            Ok(ToolOutput::with_sources(
                format!("result for {}", query),
                vec![Source {
                    text: format!("Doc {}", query),
                    link: None,
                }],
            ))
        }
    }

    struct OfflineTool;

    #[async_trait]
    impl Tool for OfflineTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("offline", "Always unavailable", json!({"type": "object"}))
        }

        async fn execute(&self, _arguments: &Value) -> Result<ToolOutput> {
            Err(SyllabusError::Store("index unavailable".to_string()))
        }
    }

    fn registry(lookup: &Arc<LookupTool>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_arc(lookup.clone()).unwrap();
        registry.register(OfflineTool).unwrap();
        registry
    }

    fn generator(model: &Arc<ScriptedModel>) -> ResponseGenerator {
        ResponseGenerator::new(model.clone(), "test-model", PROMPT)
    }

    fn lookup_use(id: &str, query: &str) -> ModelResponse {
        ModelResponse::new(
            vec![ContentBlock::tool_use(id, "lookup", json!({"query": query}))],
            StopReason::ToolUse,
        )
    }

    fn result_blocks(message: &Message) -> Vec<(String, String, bool)> {
        assert_eq!(message.role, Role::User);
        match &message.content {
            Content::Blocks(blocks) => blocks
                .iter()
                .map(|b| match b {
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => (tool_use_id.clone(), content.clone(), *is_error),
                    other => panic!("Expected tool result, got {:?}", other),
                })
                .collect(),
            other => panic!("Expected blocks, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_direct_answer_uses_one_call() {
        let model = Arc::new(ScriptedModel::replying(vec![ModelResponse::text("4")]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        let generation = generator(&model)
            .generate_detailed("What is 2+2?", None, Some(&defs), Some(&registry))
            .await;

        assert_eq!(generation.answer, "4");
        assert_eq!(generation.model_calls, 1);
        assert_eq!(generation.rounds, 0);
        assert!(lookup.calls().is_empty());

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages, vec![Message::user("What is 2+2?")]);
        assert_eq!(requests[0].tools.len(), 2);
        assert_eq!(requests[0].tool_choice, Some(ToolChoice::Auto));
        assert_eq!(requests[0].system, PROMPT);
        assert_eq!(requests[0].max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_single_round_then_answer() {
        let model = Arc::new(ScriptedModel::replying(vec![
            lookup_use("t1", "MCP"),
            ModelResponse::text("MCP is a protocol."),
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        let generation = generator(&model)
            .generate_detailed("What is MCP?", None, Some(&defs), Some(&registry))
            .await;

        assert_eq!(generation.answer, "MCP is a protocol.");
        assert_eq!(generation.model_calls, 2);
        assert_eq!(generation.rounds, 1);
        assert_eq!(lookup.calls(), vec![json!({"query": "MCP"})]);
        assert_eq!(generation.sources.len(), 1);
        assert_eq!(generation.sources[0].text, "Doc MCP");

        let requests = model.requests();
        let second = &requests[1];
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[1].role, Role::Assistant);
        assert_eq!(
            result_blocks(&second.messages[2]),
            vec![("t1".to_string(), "result for MCP".to_string(), false)]
        );
        // Budget left and no failure: tools are still offered.
        assert!(second.offers_tools());
        assert_eq!(second.tool_choice, Some(ToolChoice::Auto));
    }

    #[tokio::test]
    async fn test_round_budget_caps_model_calls() {
        let mut last = lookup_use("t3", "third");
        last.content.insert(0, ContentBlock::text("Best effort answer."));
        let model = Arc::new(ScriptedModel::replying(vec![
            lookup_use("t1", "first"),
            lookup_use("t2", "second"),
            last,
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        let generation = generator(&model)
            .generate_detailed("Dig deep", None, Some(&defs), Some(&registry))
            .await;

        assert_eq!(generation.model_calls, DEFAULT_MAX_TOOL_ROUNDS + 1);
        assert_eq!(generation.rounds, DEFAULT_MAX_TOOL_ROUNDS);
        assert_eq!(generation.answer, "Best effort answer.");
        assert_eq!(lookup.calls().len(), 2);

        let requests = model.requests();
        let lengths: Vec<usize> = requests.iter().map(|r| r.messages.len()).collect();
        assert_eq!(lengths, vec![1, 3, 5]);
        assert!(requests[0].offers_tools());
        assert!(requests[1].offers_tools());
        assert!(!requests[2].offers_tools());
        assert_eq!(requests[2].tool_choice, None);
    }

    #[tokio::test]
    async fn test_message_prefix_is_preserved_between_calls() {
        let model = Arc::new(ScriptedModel::replying(vec![
            lookup_use("t1", "a"),
            lookup_use("t2", "b"),
            ModelResponse::text("done"),
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        generator(&model)
            .generate("q", None, Some(&defs), Some(&registry))
            .await;

        let requests = model.requests();
        assert_eq!(requests[2].messages[..3], requests[1].messages[..]);
        assert_eq!(requests[1].messages[..1], requests[0].messages[..]);
    }

    #[tokio::test]
    async fn test_tool_failure_withholds_tools_on_next_call() {
        let model = Arc::new(ScriptedModel::replying(vec![
            ModelResponse::new(
                vec![ContentBlock::tool_use("t1", "offline", json!({}))],
                StopReason::ToolUse,
            ),
            ModelResponse::text("The index is unavailable right now."),
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        let generation = generator(&model)
            .generate_detailed("Search please", None, Some(&defs), Some(&registry))
            .await;

        assert_eq!(generation.answer, "The index is unavailable right now.");
        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[1].offers_tools());

        let results = result_blocks(&requests[1].messages[2]);
        assert_eq!(results[0].0, "t1");
        assert_eq!(
            results[0].1,
            "Tool execution error: Course store error: index unavailable"
        );
        assert!(results[0].2);
    }

    #[tokio::test]
    async fn test_tool_failure_ends_run_even_if_model_asks_again() {
        let model = Arc::new(ScriptedModel::replying(vec![
            ModelResponse::new(
                vec![ContentBlock::tool_use("t1", "offline", json!({}))],
                StopReason::ToolUse,
            ),
            lookup_use("t2", "retry"),
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        let generation = generator(&model)
            .generate_detailed("q", None, Some(&defs), Some(&registry))
            .await;

        assert_eq!(generation.model_calls, 2);
        assert_eq!(generation.answer, NO_TEXT_RESPONSE);
        assert!(lookup.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_arguments_count_as_failure() {
        let model = Arc::new(ScriptedModel::replying(vec![
            ModelResponse::new(
                vec![ContentBlock::tool_use("t1", "lookup", json!({"query": 7}))],
                StopReason::ToolUse,
            ),
            ModelResponse::text("Could not search."),
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        generator(&model)
            .generate("q", None, Some(&defs), Some(&registry))
            .await;

        assert!(lookup.calls().is_empty());
        let requests = model.requests();
        assert!(!requests[1].offers_tools());
        assert!(result_blocks(&requests[1].messages[2])[0].2);
    }

    #[tokio::test]
    async fn test_unknown_tool_keeps_tools_available() {
        let model = Arc::new(ScriptedModel::replying(vec![
            ModelResponse::new(
                vec![ContentBlock::tool_use("t1", "teleport", json!({}))],
                StopReason::ToolUse,
            ),
            ModelResponse::text("ok"),
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        generator(&model)
            .generate("q", None, Some(&defs), Some(&registry))
            .await;

        let requests = model.requests();
        assert!(requests[1].offers_tools());
        assert_eq!(
            result_blocks(&requests[1].messages[2]),
            vec![("t1".to_string(), "Tool 'teleport' not found".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_multiple_tool_uses_batched_in_order() {
        let model = Arc::new(ScriptedModel::replying(vec![
            ModelResponse::new(
                vec![
                    ContentBlock::text("Comparing both."),
                    ContentBlock::tool_use("t1", "lookup", json!({"query": "X"})),
                    ContentBlock::tool_use("t2", "lookup", json!({"query": "Y"})),
                ],
                StopReason::ToolUse,
            ),
            ModelResponse::text("X and Y differ."),
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        let generation = generator(&model)
            .generate_detailed("Compare X and Y", None, Some(&defs), Some(&registry))
            .await;

        assert_eq!(generation.answer, "X and Y differ.");
        assert_eq!(generation.model_calls, 2);
        assert_eq!(lookup.calls(), vec![json!({"query": "X"}), json!({"query": "Y"})]);

        let requests = model.requests();
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(
            result_blocks(&requests[1].messages[2]),
            vec![
                ("t1".to_string(), "result for X".to_string(), false),
                ("t2".to_string(), "result for Y".to_string(), false),
            ]
        );
        let sources: Vec<&str> = generation.sources.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(sources, vec!["Doc X", "Doc Y"]);
    }

    #[tokio::test]
    async fn test_failure_and_success_in_same_round() {
        let model = Arc::new(ScriptedModel::replying(vec![
            ModelResponse::new(
                vec![
                    ContentBlock::tool_use("t1", "offline", json!({})),
                    ContentBlock::tool_use("t2", "lookup", json!({"query": "X"})),
                ],
                StopReason::ToolUse,
            ),
            ModelResponse::text("Found X, the index was partly down."),
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        let generation = generator(&model)
            .generate_detailed("q", None, Some(&defs), Some(&registry))
            .await;

        assert_eq!(generation.answer, "Found X, the index was partly down.");
        assert_eq!(generation.rounds, 1);
        assert_eq!(generation.model_calls, 2);
        // The failure does not stop later requests in the same batch.
        assert_eq!(lookup.calls(), vec![json!({"query": "X"})]);

        let requests = model.requests();
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(
            result_blocks(&requests[1].messages[2]),
            vec![
                (
                    "t1".to_string(),
                    "Tool execution error: Course store error: index unavailable".to_string(),
                    true,
                ),
                ("t2".to_string(), "result for X".to_string(), false),
            ]
        );
        assert!(!requests[1].offers_tools());
        let sources: Vec<&str> = generation.sources.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(sources, vec!["Doc X"]);
    }

    #[tokio::test]
    async fn test_sources_deduplicated_across_rounds() {
        let model = Arc::new(ScriptedModel::replying(vec![
            lookup_use("t1", "MCP"),
            lookup_use("t2", "MCP"),
            ModelResponse::text("done"),
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        let generation = generator(&model)
            .generate_detailed("q", None, Some(&defs), Some(&registry))
            .await;

        assert_eq!(lookup.calls().len(), 2);
        assert_eq!(generation.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_text_extraction_fallbacks() {
        let model = Arc::new(ScriptedModel::replying(vec![
            ModelResponse::new(Vec::new(), StopReason::EndTurn),
            ModelResponse::new(
                vec![ContentBlock::tool_use("t1", "lookup", json!({}))],
                StopReason::MaxTokens,
            ),
        ]));
        let generator = generator(&model);

        assert_eq!(generator.generate("q", None, None, None).await, EMPTY_RESPONSE);
        assert_eq!(generator.generate("q", None, None, None).await, NO_TEXT_RESPONSE);
    }

    #[tokio::test]
    async fn test_first_text_block_wins() {
        let model = Arc::new(ScriptedModel::replying(vec![ModelResponse::new(
            vec![ContentBlock::text("first"), ContentBlock::text("second")],
            StopReason::EndTurn,
        )]));
        assert_eq!(generator(&model).generate("q", None, None, None).await, "first");
    }

    #[tokio::test]
    async fn test_initial_call_failures_become_messages() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(LlmError::Auth("invalid x-api-key".into())),
            Err(LlmError::RateLimit("slow down".into())),
            Err(LlmError::Api {
                status: 500,
                message: "boom".into(),
            }),
            Err(LlmError::Serialization("eof".into())),
        ]));
        let generator = generator(&model);

        assert_eq!(
            generator.generate("q", None, None, None).await,
            "Authentication error: Please check your API key configuration."
        );
        assert_eq!(
            generator.generate("q", None, None, None).await,
            "Rate limit exceeded. Please try again in a moment."
        );
        assert_eq!(
            generator.generate("q", None, None, None).await,
            "API error occurred: HTTP 500: boom"
        );
        assert_eq!(
            generator.generate("q", None, None, None).await,
            "An unexpected error occurred: malformed response: eof"
        );
        assert_eq!(model.call_count(), 4);
    }

    #[tokio::test]
    async fn test_round_call_failure_names_round() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(lookup_use("t1", "a")),
            Err(LlmError::Api {
                status: 529,
                message: "overloaded".into(),
            }),
            Ok(lookup_use("t2", "b")),
            Ok(lookup_use("t3", "c")),
            Err(LlmError::Serialization("truncated".into())),
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();
        let generator = generator(&model);

        let first = generator
            .generate_detailed("q", None, Some(&defs), Some(&registry))
            .await;
        assert_eq!(first.answer, "API error during tool round 1: HTTP 529: overloaded");
        assert_eq!(first.rounds, 1);
        assert_eq!(first.sources.len(), 1);

        let second = generator
            .generate("q", None, Some(&defs), Some(&registry))
            .await;
        assert_eq!(second, "Error in tool round 2: malformed response: truncated");
        assert_eq!(model.call_count(), 5);
    }

    #[tokio::test]
    async fn test_tool_request_without_registry() {
        let mut with_text = lookup_use("t1", "a");
        with_text.content.insert(0, ContentBlock::text("Let me check."));
        let model = Arc::new(ScriptedModel::replying(vec![with_text, lookup_use("t2", "b")]));
        let generator = generator(&model);
        let defs = registry(&LookupTool::new()).definitions();

        assert_eq!(
            generator.generate("q", None, Some(&defs), None).await,
            "Let me check."
        );
        assert_eq!(generator.generate("q", None, Some(&defs), None).await, NO_REGISTRY);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_rounds_never_offers_tools() {
        let model = Arc::new(ScriptedModel::replying(vec![lookup_use("t1", "a")]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        let generation = generator(&model)
            .with_max_tool_rounds(0)
            .generate_detailed("q", None, Some(&defs), Some(&registry))
            .await;

        assert_eq!(generation.model_calls, 1);
        assert_eq!(generation.answer, NO_TEXT_RESPONSE);
        assert!(!model.requests()[0].offers_tools());
        assert!(lookup.calls().is_empty());
    }

    #[tokio::test]
    async fn test_single_round_budget() {
        let model = Arc::new(ScriptedModel::replying(vec![
            lookup_use("t1", "a"),
            ModelResponse::text("answer"),
        ]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);
        let defs = registry.definitions();

        let generation = generator(&model)
            .with_max_tool_rounds(1)
            .generate_detailed("q", None, Some(&defs), Some(&registry))
            .await;

        assert_eq!(generation.answer, "answer");
        let requests = model.requests();
        assert!(requests[0].offers_tools());
        assert!(!requests[1].offers_tools());
    }

    #[tokio::test]
    async fn test_tool_stop_without_tool_blocks_is_terminal() {
        let model = Arc::new(ScriptedModel::replying(vec![ModelResponse::new(
            vec![ContentBlock::text("Nothing to run.")],
            StopReason::ToolUse,
        )]));
        let lookup = LookupTool::new();
        let registry = registry(&lookup);

        let generation = generator(&model)
            .generate_detailed("q", None, None, Some(&registry))
            .await;
        assert_eq!(generation.answer, "Nothing to run.");
        assert_eq!(generation.model_calls, 1);
    }

    #[tokio::test]
    async fn test_conversation_appended_to_system_prompt() {
        let model = Arc::new(ScriptedModel::replying(vec![
            ModelResponse::text("a"),
            ModelResponse::text("b"),
        ]));
        let generator = generator(&model).with_temperature(0.5).with_max_tokens(100);

        generator
            .generate("q", Some("User: hi\nAssistant: hello"), None, None)
            .await;
        generator.generate("q", Some(""), None, None).await;

        let requests = model.requests();
        assert_eq!(
            requests[0].system,
            format!("{}\n\nPrevious conversation:\nUser: hi\nAssistant: hello", PROMPT)
        );
        assert_eq!(requests[1].system, PROMPT);
        assert_eq!(requests[0].max_tokens, 100);
        assert_eq!(requests[0].temperature, 0.5);
        assert!(!requests[0].offers_tools());
    }
}
