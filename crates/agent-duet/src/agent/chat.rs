//! The concrete agent: a provider adapter plus model, system prompt and history.

use super::history::{History, Message};
use super::impls::{Backend, ChatRequest};
use super::{AgentError, ConversationalAgent, ProviderKind};
use crate::sink::{LogEvent, SharedSink, noop_sink};
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info, warn};

/// A conversational agent backed by one of the built-in providers.
///
/// Created by [`create_agent`](super::create_agent). Provider failures never
/// escape: they are reported to the attached sink and come back from
/// [`send_and_receive`](ConversationalAgent::send_and_receive) as text
/// starting with `"Error:"`.
pub struct ChatAgent {
    backend: Backend,
    model: Option<String>,
    system_prompt: Option<String>,
    history: History,
    sink: SharedSink,
}

impl ChatAgent {
    /// Wraps a backend. The agent reports to a no-op sink until
    /// [`attach_sink`](Self::attach_sink) is called.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            model: None,
            system_prompt: None,
            history: History::new(),
            sink: noop_sink(),
        }
    }

    /// Replaces the sink without announcing anything.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Attaches the real sink and announces the configured credential.
    pub fn attach_sink(&mut self, sink: SharedSink) {
        self.sink = sink;
        match self.backend.check_credentials() {
            Ok(()) => self.report_info(self.backend.credential_summary()),
            Err(err) => self.report_error(err.to_string()),
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.backend.kind()
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    fn source(&self) -> &'static str {
        self.provider().label()
    }

    fn report_info(&self, message: impl Into<String>) {
        self.sink.emit(LogEvent::info(self.source(), message));
    }

    fn report_error(&self, message: impl Into<String>) {
        self.sink.emit(LogEvent::error(self.source(), message));
    }

    fn ready_model(&self) -> Result<&str, AgentError> {
        self.backend.check_credentials()?;
        self.model.as_deref().ok_or(AgentError::NoModelSelected)
    }
}

impl fmt::Debug for ChatAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatAgent")
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ConversationalAgent for ChatAgent {
    fn selected_model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn set_model(&mut self, model: &str) {
        self.model = Some(model.to_string());
        self.report_info(format!("Selected model: {model}"));
    }

    fn set_system_prompt(&mut self, prompt: &str) {
        self.system_prompt = Some(prompt.to_string());
        let model = self.model.as_deref().unwrap_or("agent");
        self.report_info(format!("Set system prompt for {model}"));
    }

    async fn list_available_models(&self) -> Vec<String> {
        match self.backend.list_models().await {
            Ok(models) => {
                if !models.is_empty() {
                    self.report_info(format!("Loaded {} {} models", models.len(), self.source()));
                }
                models
            }
            Err(err) => {
                warn!(
                    target: "agent_duet::agent",
                    provider = %self.provider(),
                    error = %err,
                    "Model listing failed"
                );
                self.report_error(self.backend.list_failure_message(&err));
                match self.backend.fallback_models(&err) {
                    Some(fallback) => {
                        self.report_info(format!(
                            "Using fallback list of {} {} models",
                            fallback.len(),
                            self.source()
                        ));
                        fallback
                    }
                    None => Vec::new(),
                }
            }
        }
    }

    async fn send_and_receive(&mut self, prompt: &str) -> String {
        let model = match self.ready_model() {
            Ok(model) => model.to_string(),
            Err(err) => {
                self.report_error(err.to_string());
                return err.to_reply();
            }
        };

        self.history.push(Message::user(prompt));
        self.report_info(format!("Sending prompt to {model}"));
        debug!(
            target: "agent_duet::agent",
            provider = %self.provider(),
            model = %model,
            history_len = self.history.len(),
            "Sending request"
        );

        let request = ChatRequest {
            model: &model,
            system_prompt: self.system_prompt.as_deref(),
            messages: self.history.messages(),
        };

        let result = self.backend.complete(&request).await;
        match result {
            Ok(reply) => {
                self.history.push(Message::assistant(reply.clone()));
                self.report_info(format!("Received response from {model}"));
                info!(
                    target: "agent_duet::agent",
                    provider = %self.provider(),
                    model = %model,
                    reply_len = reply.len(),
                    "Received response"
                );
                reply
            }
            Err(err) => {
                warn!(
                    target: "agent_duet::agent",
                    provider = %self.provider(),
                    model = %model,
                    category = ?err.category(),
                    error = %err,
                    "Request failed"
                );
                self.report_error(err.to_string());
                err.to_reply()
            }
        }
    }

    fn clear_history(&mut self) {
        self.history.clear();
        self.report_info("Conversation history cleared");
    }

    fn seed_history(&mut self, message: Message) {
        self.history.push(message);
    }

    fn history(&self) -> Vec<Message> {
        self.history.with_system_prompt(self.system_prompt.as_deref())
    }

    fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::impls::{AnthropicApi, GeminiApi, GrokApi, OllamaApi, OpenAIApi};
    use crate::sink::{ChannelSink, EventKind};
    use std::sync::Arc;

    fn all_backends_without_keys() -> Vec<Backend> {
        vec![
            // Nothing listens on port 9; a send would fail at transport level.
            Backend::Ollama(OllamaApi::new("http://127.0.0.1:9")),
            Backend::OpenAi(OpenAIApi::new(None)),
            Backend::Anthropic(AnthropicApi::new(None)),
            Backend::Grok(GrokApi::new(None)),
            Backend::Gemini(GeminiApi::new(None)),
        ]
    }

    #[tokio::test]
    async fn test_send_without_model_leaves_history_untouched() {
        for backend in all_backends_without_keys() {
            let mut agent = ChatAgent::new(backend);
            let reply = agent.send_and_receive("hello").await;
            assert!(reply.starts_with("Error:"), "unexpected reply: {reply}");
            assert_eq!(agent.history_len(), 0);
        }
    }

    #[tokio::test]
    async fn test_missing_key_reported_before_model() {
        let mut agent = ChatAgent::new(Backend::Grok(GrokApi::new(None)));
        agent.set_model("grok-2");
        let reply = agent.send_and_receive("hello").await;
        assert_eq!(reply, "Error: Grok API key not set");
        assert_eq!(agent.history_len(), 0);
    }

    #[tokio::test]
    async fn test_list_models_without_key_is_empty() {
        let (sink, mut rx) = ChannelSink::new();
        let agent =
            ChatAgent::new(Backend::OpenAi(OpenAIApi::new(None))).with_sink(Arc::new(sink));

        assert!(agent.list_available_models().await.is_empty());
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::Error);
        assert_eq!(
            event.message,
            "API key not set. Please set your OpenAI API key."
        );
    }

    #[tokio::test]
    async fn test_gemini_without_key_lists_nothing() {
        let agent = ChatAgent::new(Backend::Gemini(GeminiApi::new(None)));
        assert!(agent.list_available_models().await.is_empty());
    }

    #[test]
    fn test_history_projection_and_clear() {
        let mut agent = ChatAgent::new(Backend::Ollama(OllamaApi::default()));
        agent.set_system_prompt("You are a helpful AI assistant.");
        agent.seed_history(Message::assistant("Hello"));

        let projected = agent.history();
        assert_eq!(projected.len(), 2);
        assert_eq!(projected[0], Message::system("You are a helpful AI assistant."));
        assert_eq!(agent.history_len(), 1);

        agent.clear_history();
        agent.clear_history();
        assert_eq!(agent.history_len(), 0);
    }

    #[tokio::test]
    async fn test_attach_sink_announces_credential() {
        let (sink, mut rx) = ChannelSink::new();
        let mut agent = ChatAgent::new(Backend::Ollama(OllamaApi::default()));
        agent.attach_sink(Arc::new(sink));
        assert_eq!(
            rx.recv().await.unwrap().message,
            "Ollama API address: http://localhost:11434"
        );

        let (sink, mut rx) = ChannelSink::new();
        let mut agent = ChatAgent::new(Backend::Anthropic(AnthropicApi::new(None)));
        agent.attach_sink(Arc::new(sink));
        assert!(rx.recv().await.unwrap().is_error());
    }

    #[test]
    fn test_set_model_emits_event() {
        let (sink, mut rx) = ChannelSink::new();
        let mut agent =
            ChatAgent::new(Backend::Ollama(OllamaApi::default())).with_sink(Arc::new(sink));
        agent.set_model("llama3");
        assert_eq!(agent.selected_model(), Some("llama3"));
        assert_eq!(rx.try_recv().unwrap().message, "Selected model: llama3");
    }
}
