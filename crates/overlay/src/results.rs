//! The popup body: one query, the engine answering it and its conversation.

use providers::{ChatClient, ChatTurn, EngineId, EngineRegistry, QueryKind};
use shared::collaborators::Notifier;
use shared::settings::EngineItem;
use std::sync::Arc;

use crate::text::classify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub context: String,
    pub kind: QueryKind,
}

/// Owns at most one live [`ChatClient`]. Any re-query, engine switch or close
/// cancels the previous client first, so a slow old reply never lands in a newer
/// popup.
pub struct ResultPane {
    registry: EngineRegistry,
    notifier: Option<Arc<dyn Notifier>>,
    query: Option<Query>,
    engine: Option<EngineId>,
    client: Option<ChatClient>,
}

impl ResultPane {
    pub fn new(registry: EngineRegistry) -> Self {
        Self {
            registry,
            notifier: None,
            query: None,
            engine: None,
            client: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    pub fn current_engine(&self) -> Option<EngineId> {
        self.engine
    }

    pub fn client(&self) -> Option<&ChatClient> {
        self.client.as_ref()
    }

    /// Engines the user may switch between for the current query.
    pub fn engines(&self) -> Vec<EngineItem> {
        self.query
            .as_ref()
            .map(|q| self.registry.engines_for(q.kind))
            .unwrap_or_default()
    }

    /// Look up `text` with the preferred engine for its kind.
    pub fn show(&mut self, text: &str, context: &str) -> Option<ChatTurn> {
        let kind = self.set_query(text, context)?;
        let preferred = self.registry.preferred_engine(kind)?;
        self.start(&preferred.value)
    }

    /// Look up `text` with the engine registered under `id`.
    pub fn show_with(&mut self, text: &str, context: &str, id: &str) -> Option<ChatTurn> {
        self.set_query(text, context)?;
        self.start(id)
    }

    /// Re-run the current query on another engine.
    pub fn switch_engine(&mut self, id: &str) -> Option<ChatTurn> {
        self.cancel();
        self.query.as_ref()?;
        self.start(id)
    }

    /// Retry the last answer with the same context.
    pub fn refresh(&mut self) -> Option<ChatTurn> {
        self.client.as_ref().map(ChatClient::refresh)
    }

    /// Ask a follow-up question in the same conversation.
    pub fn ask(&mut self, question: &str) -> Option<ChatTurn> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }
        self.client
            .as_ref()
            .map(|client| client.send_message(Some(question.to_string())))
    }

    /// Forget the query and its conversation.
    pub fn close(&mut self) {
        self.cancel();
        self.query = None;
    }

    fn set_query(&mut self, text: &str, context: &str) -> Option<QueryKind> {
        self.cancel();
        let text = text.trim();
        if text.is_empty() {
            self.query = None;
            return None;
        }
        let kind = classify(text, &self.registry.setting().source_language());
        self.query = Some(Query {
            text: text.to_string(),
            context: context.to_string(),
            kind,
        });
        Some(kind)
    }

    fn cancel(&mut self) {
        if let Some(client) = self.client.take() {
            tracing::debug!(engine = %client.engine_id(), "cancelling previous lookup");
            client.clear_message();
        }
        self.engine = None;
    }

    fn start(&mut self, id: &str) -> Option<ChatTurn> {
        let query = self.query.as_ref()?;
        let Some(mut client) = self
            .registry
            .resolve_query(id, query.kind, &query.text, &query.context)
        else {
            tracing::warn!(engine = id, "no engine registered under this id");
            return None;
        };
        if let Some(notifier) = &self.notifier {
            client = client.with_notifier(notifier.clone());
        }
        self.engine = Some(client.engine_id());
        let turn = client.send_message(None);
        self.client = Some(client);
        Some(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::agent_api::ChatEvent;
    use shared::settings::{defaults, Setting};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(text: &str) -> ResponseTemplate {
        let record = serde_json::json!({"choices": [{"delta": {"content": text}}]});
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/event-stream")
            .set_body_string(format!("data: {}\n\ndata: [DONE]\n\n", record))
    }

    fn pane(server: &MockServer) -> ResultPane {
        let word_engines = defaults::word_engine_list()
            .into_iter()
            .map(|mut item| {
                item.checked = item.value == "openai";
                item
            })
            .collect();
        let setting = Setting {
            open_ai_address: Some(format!("{}/openai", server.uri())),
            deep_seek_address: Some(format!("{}/deepseek", server.uri())),
            word_engine_list: Some(word_engines),
            ..Default::default()
        };
        ResultPane::new(EngineRegistry::from_setting(&setting))
    }

    #[tokio::test]
    async fn test_show_uses_preferred_engine() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(reply("n. Ufer")).mount(&server).await;

        let mut pane = pane(&server);
        let turn = pane.show(" bank ", "The river bank.").unwrap();
        assert_eq!(pane.current_engine(), Some(EngineId::OpenAi));
        assert_eq!(pane.query().unwrap().kind, QueryKind::Word);
        let events = turn.collect().await;
        assert_eq!(events.last(), Some(&ChatEvent::Complete("n. Ufer".into())));
        assert!(pane.engines().iter().all(|e| e.value != "deeplx"));
    }

    #[tokio::test]
    async fn test_switching_engine_cancels_previous_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("slow").set_delay(std::time::Duration::from_millis(300)))
            .mount(&server)
            .await;

        let mut pane = pane(&server);
        let mut old = pane.show("bank", "bank").unwrap();
        assert_eq!(old.next_event().await, Some(ChatEvent::Requesting));

        let new = pane.switch_engine("deepseek").unwrap();
        assert_eq!(pane.current_engine(), Some(EngineId::DeepSeek));
        assert!(old.is_aborted());
        assert_eq!(old.next_event().await, None);
        assert_eq!(
            new.collect().await.last(),
            Some(&ChatEvent::Complete("slow".into()))
        );
    }

    #[tokio::test]
    async fn test_show_with_named_engine() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(reply("Ufer")).mount(&server).await;

        let mut pane = pane(&server);
        let turn = pane.show_with("bank", "bank", "deepseek").unwrap();
        assert_eq!(pane.current_engine(), Some(EngineId::DeepSeek));
        assert_eq!(turn.collect().await.last(), Some(&ChatEvent::Complete("Ufer".into())));
        assert!(server.received_requests().await.unwrap()[0].url.path().ends_with("/deepseek"));
    }

    #[tokio::test]
    async fn test_unknown_engine_renders_nothing() {
        let server = MockServer::start().await;
        let mut pane = pane(&server);
        pane.query = Some(Query {
            text: "bank".into(),
            context: "bank".into(),
            kind: QueryKind::Word,
        });
        assert!(pane.switch_engine("babelfish").is_none());
        assert!(pane.current_engine().is_none());
        assert!(pane.client().is_none());
    }

    #[tokio::test]
    async fn test_close_clears_conversation() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(reply("x")).mount(&server).await;

        let mut pane = pane(&server);
        let turn = pane.show("bank", "bank").unwrap();
        turn.collect().await;
        pane.close();
        assert!(pane.query().is_none());
        assert!(pane.client().is_none());
        assert!(pane.refresh().is_none());
        assert!(pane.ask("and the plural?").is_none());
    }

    #[tokio::test]
    async fn test_follow_up_extends_transcript() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(reply("ok")).mount(&server).await;

        let mut pane = pane(&server);
        pane.show("bank", "bank").unwrap().collect().await;
        let before = pane.client().unwrap().messages().len();
        pane.ask("plural?").unwrap().collect().await;
        assert_eq!(pane.client().unwrap().messages().len(), before + 2);
    }
}
