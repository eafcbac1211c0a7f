// chatshell: console chat sessions over a hosted chat-completion API.
#![allow(clippy::result_large_err)]

pub mod azure;
pub mod backend;
pub mod config;
pub mod error;
pub mod message;
pub mod render;
pub mod request;
pub mod schema;
pub mod session;
pub mod sse;
pub mod stream;
pub mod testing;
pub mod transcript;

// --- Curated re-exports ---
// No glob re-exports: the public API surface stays intentional.
pub use azure::AzureChatBackend;
pub use backend::{BoxFuture, BoxStream, CompletionBackend};
pub use config::Settings;
pub use error::{Error, ErrorKind};
pub use message::{FunctionCall, Message, Role};
pub use render::{render_message, render_stream};
pub use request::CompletionRequest;
pub use schema::{FunctionSpec, Parameter};
pub use session::{Session, TurnMode};
pub use stream::{Fragment, FragmentStream, MessageAssembler};
pub use transcript::Transcript;
