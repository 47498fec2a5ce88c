pub mod chat;
pub mod deeplx;
pub mod gemini;
mod http;
pub mod openai;
pub mod prompts;
pub mod registry;
pub mod sse;

pub use chat::{ChatClient, ChatTurn};
pub use http::ChatError;
pub use prompts::QueryKind;
pub use registry::{EngineDescriptor, EngineId, EngineRegistry};
