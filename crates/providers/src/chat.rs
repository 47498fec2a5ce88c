//! The conversation a popup holds with one engine.
//!
//! Each [`ChatClient::send_message`] starts a turn: a user message (optional) and
//! an empty assistant placeholder are appended to the transcript, the engine is
//! asked for a reply, and the placeholder is filled in as text arrives. The turn
//! reports to its consumer through a [`ChatTurn`] event channel.

use futures::future::{AbortHandle, Abortable};
use parking_lot::Mutex;
use shared::agent_api::{ChatEvent, ChatMessage, Role, StreamChunk};
use shared::collaborators::{Notifier, Toast};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::registry::{Engine, EngineId};

type Transcript = Arc<Mutex<Vec<ChatMessage>>>;

pub struct ChatClient {
    engine_id: EngineId,
    engine: Arc<Engine>,
    transcript: Transcript,
    in_flight: Mutex<AbortHandle>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ChatClient {
    pub fn new(engine_id: EngineId, engine: Engine, messages: Vec<ChatMessage>) -> Self {
        let (idle, _) = AbortHandle::new_pair();
        Self {
            engine_id,
            engine: Arc::new(engine),
            transcript: Arc::new(Mutex::new(messages)),
            in_flight: Mutex::new(idle),
            notifier: None,
        }
    }

    /// Failed turns are also reported to `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn engine_id(&self) -> EngineId {
        self.engine_id
    }

    /// Snapshot of the transcript.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.transcript.lock().clone()
    }

    /// Start a turn, cancelling the one in flight.
    ///
    /// Must be called within a tokio runtime.
    pub fn send_message(&self, content: Option<String>) -> ChatTurn {
        let (handle, registration) = AbortHandle::new_pair();
        let (request, placeholder) = {
            let mut transcript = self.transcript.lock();
            std::mem::replace(&mut *self.in_flight.lock(), handle.clone()).abort();
            if let Some(content) = content {
                transcript.push(ChatMessage::user(content));
            }
            let request = transcript.clone();
            transcript.push(ChatMessage::assistant(""));
            (request, transcript.len() - 1)
        };

        let id = Uuid::new_v4();
        let (events_tx, events_rx) = unbounded_channel();
        let _ = events_tx.send(ChatEvent::Requesting);
        tracing::info!(turn = %id, engine = %self.engine_id, messages = request.len(), "chat turn started");

        let turn = Turn {
            id,
            engine: self.engine.clone(),
            transcript: self.transcript.clone(),
            placeholder,
            handle: handle.clone(),
            events: events_tx,
            notifier: self.notifier.clone(),
        };
        tokio::spawn(async move {
            if Abortable::new(turn.run(request), registration).await.is_err() {
                tracing::debug!(turn = %id, "chat turn aborted");
            }
        });

        ChatTurn {
            id,
            events: events_rx,
            handle,
            finished: false,
        }
    }

    /// Cancel the turn in flight. Idempotent; nothing is delivered for it afterwards.
    pub fn abort(&self) {
        let _transcript = self.transcript.lock();
        self.in_flight.lock().abort();
    }

    /// Drop the last assistant turn and ask again with the same context.
    pub fn refresh(&self) -> ChatTurn {
        self.abort();
        {
            let mut transcript = self.transcript.lock();
            if transcript.last().is_some_and(|m| m.role == Role::Assistant) {
                transcript.pop();
            }
        }
        self.send_message(None)
    }

    /// Abort and forget the whole conversation.
    pub fn clear_message(&self) {
        let mut transcript = self.transcript.lock();
        self.in_flight.lock().abort();
        transcript.clear();
    }

    /// [`clear_message`](Self::clear_message), then run `on_cleared`.
    pub fn clear_message_then(&self, on_cleared: impl FnOnce()) {
        self.clear_message();
        on_cleared();
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.in_flight.lock().abort();
    }
}

/// The producing half of a turn, owned by its task.
struct Turn {
    id: Uuid,
    engine: Arc<Engine>,
    transcript: Transcript,
    placeholder: usize,
    handle: AbortHandle,
    events: UnboundedSender<ChatEvent>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Turn {
    async fn run(self, request: Vec<ChatMessage>) {
        let (chunk_tx, mut chunk_rx) = unbounded_channel();

        let engine = self.engine.clone();
        let produce = async move {
            if let Err(e) = engine.run(&request, &chunk_tx).await {
                let _ = chunk_tx.send(StreamChunk::Error(format!("{:#}", e)));
            }
        };

        let consume = async {
            let mut text = String::new();
            while let Some(chunk) = chunk_rx.recv().await {
                match chunk {
                    StreamChunk::Text(delta) => {
                        text.push_str(&delta);
                        self.deliver(ChatEvent::Progress(text.clone()));
                        if self.handle.is_aborted() {
                            return;
                        }
                    }
                    StreamChunk::Done => {
                        self.finish(ChatEvent::Complete(text));
                        return;
                    }
                    StreamChunk::Complete(full) => {
                        self.finish(ChatEvent::Complete(full));
                        return;
                    }
                    StreamChunk::Error(message) => {
                        self.finish(ChatEvent::Failed(message));
                        return;
                    }
                }
            }
            self.finish(ChatEvent::Failed("response ended unexpectedly".into()));
        };

        futures::join!(produce, consume);
    }

    /// Record `event` in the placeholder and hand it to the consumer, unless the turn
    /// was aborted. The transcript is kept current even when the [`ChatTurn`] was
    /// dropped. Returns whether the consumer received the event.
    fn deliver(&self, event: ChatEvent) -> bool {
        let mut transcript = self.transcript.lock();
        if self.handle.is_aborted() {
            return false;
        }
        if let ChatEvent::Progress(text) | ChatEvent::Complete(text) = &event {
            if let Some(reply) = transcript.get_mut(self.placeholder) {
                reply.content.clone_from(text);
            }
        }
        self.events.send(event).is_ok()
    }

    fn finish(&self, event: ChatEvent) {
        match &event {
            ChatEvent::Failed(message) => {
                tracing::warn!(turn = %self.id, "chat turn failed: {}", message);
                if self.deliver(event.clone()) {
                    if let Some(notifier) = &self.notifier {
                        notifier.notify(Toast::error(message.clone()));
                    }
                }
            }
            _ => {
                tracing::debug!(turn = %self.id, "chat turn complete");
                self.deliver(event);
            }
        }
    }
}

/// The consuming half of a turn.
pub struct ChatTurn {
    id: Uuid,
    events: UnboundedReceiver<ChatEvent>,
    handle: AbortHandle,
    finished: bool,
}

impl ChatTurn {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next event in wire order; `None` once the turn completed, failed or was aborted.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        if self.finished || self.handle.is_aborted() {
            return None;
        }
        let event = self.events.recv().await;
        if self.handle.is_aborted() {
            return None;
        }
        match event {
            Some(event) => {
                self.finished = event.is_terminal();
                Some(event)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.handle.is_aborted()
    }

    /// Drain the turn to its end.
    pub async fn collect(mut self) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support::scripted;
    use shared::collaborators::ToastLog;
    use std::time::Duration;

    fn client(messages: Vec<ChatMessage>) -> (ChatClient, crate::registry::test_support::Script) {
        let (engine, script) = scripted();
        (ChatClient::new(EngineId::OpenAi, engine, messages), script)
    }

    #[tokio::test]
    async fn test_streamed_reply_accumulates() {
        let (client, script) = client(vec![ChatMessage::system("translate")]);
        let turn = client.send_message(Some("hello".into()));
        script.text("Hel");
        script.text("lo");
        script.text(" world");
        script.chunk(StreamChunk::Done);

        let events = turn.collect().await;
        assert_eq!(
            events,
            vec![
                ChatEvent::Requesting,
                ChatEvent::Progress("Hel".into()),
                ChatEvent::Progress("Hello".into()),
                ChatEvent::Progress("Hello world".into()),
                ChatEvent::Complete("Hello world".into()),
            ]
        );
        let transcript = client.messages();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[2], ChatMessage::assistant("Hello world"));
        // The request carries the prior transcript without the placeholder.
        assert_eq!(
            script.requests.lock()[0],
            vec![ChatMessage::system("translate"), ChatMessage::user("hello")]
        );
    }

    #[tokio::test]
    async fn test_one_shot_reply_completes_once() {
        let (client, script) = client(Vec::new());
        let turn = client.send_message(Some("Hallo".into()));
        script.chunk(StreamChunk::Complete("Hello".into()));
        assert_eq!(
            turn.collect().await,
            vec![ChatEvent::Requesting, ChatEvent::Complete("Hello".into())]
        );
    }

    #[tokio::test]
    async fn test_abort_mid_stream_silences_turn() {
        let (client, script) = client(Vec::new());
        let mut turn = client.send_message(Some("hi".into()));
        script.text("Hel");
        assert_eq!(turn.next_event().await, Some(ChatEvent::Requesting));
        assert_eq!(turn.next_event().await, Some(ChatEvent::Progress("Hel".into())));

        client.abort();
        client.abort();
        script.text("lo");
        script.chunk(StreamChunk::Done);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(turn.next_event().await, None);
        assert!(turn.events.try_recv().is_err());
        // Partial text stays readable.
        assert_eq!(client.messages()[1].content, "Hel");
    }

    #[tokio::test]
    async fn test_dropped_turn_still_fills_transcript() {
        let (client, script) = client(Vec::new());
        drop(client.send_message(Some("hi".into())));
        script.text("Hel");
        script.text("lo");
        script.chunk(StreamChunk::Done);

        for _ in 0..50 {
            if client.messages()[1].content == "Hello" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            client.messages(),
            vec![ChatMessage::user("hi"), ChatMessage::assistant("Hello")]
        );
    }

    #[tokio::test]
    async fn test_failure_is_terminal_and_toasted() {
        let toasts = ToastLog::new();
        let (engine, script) = scripted();
        let client = ChatClient::new(EngineId::OpenAi, engine, Vec::new()).with_notifier(Arc::new(toasts.clone()));
        let turn = client.send_message(Some("hi".into()));
        script.text("par");
        script.chunk(StreamChunk::Error("rate limited".into()));
        script.chunk(StreamChunk::Done);

        let events = turn.collect().await;
        assert_eq!(events.last(), Some(&ChatEvent::Failed("rate limited".into())));
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::Complete(_))));
        assert_eq!(toasts.toasts(), vec![Toast::error("rate limited")]);
        assert_eq!(client.messages()[1].content, "par");
    }

    #[tokio::test]
    async fn test_failure_before_output() {
        let (client, script) = client(Vec::new());
        let turn = client.send_message(Some("hi".into()));
        script.fail("missing body");
        assert_eq!(
            turn.collect().await,
            vec![ChatEvent::Requesting, ChatEvent::Failed("missing body".into())]
        );
    }

    #[tokio::test]
    async fn test_refresh_resends_same_context() {
        let (client, script) = client(vec![ChatMessage::system("sys")]);
        let turn = client.send_message(Some("bank".into()));
        script.text("first");
        script.chunk(StreamChunk::Done);
        turn.collect().await;
        assert_eq!(client.messages().len(), 3);

        let turn = client.refresh();
        script.text("second");
        script.chunk(StreamChunk::Done);
        let events = turn.collect().await;
        assert_eq!(events.last(), Some(&ChatEvent::Complete("second".into())));

        let requests = script.requests.lock().clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
        assert_eq!(client.messages().len(), 3);
        assert_eq!(client.messages()[2].content, "second");
    }

    #[tokio::test]
    async fn test_new_send_cancels_previous_turn() {
        let (client, script) = client(Vec::new());
        let mut first = client.send_message(Some("one".into()));
        assert_eq!(first.next_event().await, Some(ChatEvent::Requesting));

        let second = client.send_message(Some("two".into()));
        assert!(first.is_aborted());
        script.text("2");
        script.chunk(StreamChunk::Done);

        assert_eq!(
            second.collect().await,
            vec![ChatEvent::Requesting, ChatEvent::Progress("2".into()), ChatEvent::Complete("2".into())]
        );
        assert_eq!(first.next_event().await, None);
    }

    #[tokio::test]
    async fn test_clear_message_aborts_and_empties() {
        let (client, _script) = client(vec![ChatMessage::system("sys")]);
        let mut turn = client.send_message(Some("hi".into()));
        let mut cleared = false;
        client.clear_message_then(|| cleared = true);
        assert!(cleared);
        assert!(client.messages().is_empty());
        assert_eq!(turn.next_event().await, None);

        // A later send is not pre-cancelled.
        let turn = client.send_message(Some("again".into()));
        assert!(!turn.is_aborted());
    }
}
