pub mod collaborators;
pub mod geometry;
pub mod messaging;
pub mod selection;
pub mod settings;

pub mod agent_api {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        System,
        User,
        Assistant,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub role: Role,
        pub content: String,
    }

    impl ChatMessage {
        pub fn system(content: impl Into<String>) -> Self {
            Self {
                role: Role::System,
                content: content.into(),
            }
        }

        pub fn user(content: impl Into<String>) -> Self {
            Self {
                role: Role::User,
                content: content.into(),
            }
        }

        pub fn assistant(content: impl Into<String>) -> Self {
            Self {
                role: Role::Assistant,
                content: content.into(),
            }
        }
    }

    /// Raw output of an engine, in wire order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum StreamChunk {
        /// Incremental text delta.
        Text(String),
        /// Stream terminator.
        Done,
        /// Whole reply of a non-streaming engine; terminates like `Done`.
        Complete(String),
        /// Error payload embedded in the stream.
        Error(String),
    }

    /// What a consumer of one chat turn observes. Exactly one of `Complete` or
    /// `Failed` ends a turn that was not aborted.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ChatEvent {
        /// The request is about to go out.
        Requesting,
        /// Cumulative assistant text so far.
        Progress(String),
        /// Final assistant text.
        Complete(String),
        Failed(String),
    }

    impl ChatEvent {
        pub fn is_terminal(&self) -> bool {
            matches!(self, ChatEvent::Complete(_) | ChatEvent::Failed(_))
        }
    }
}
