// CompletionBackend trait — the contract the session loop consumes.

use std::future::Future;
use std::pin::Pin;

use futures_core::Stream;

use crate::error::Error;
use crate::message::Message;
use crate::request::CompletionRequest;
use crate::stream::FragmentStream;

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed stream that is Send.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// The contract every completion backend must implement.
///
/// Uses explicit BoxFuture/BoxStream return types instead of the
/// `async-trait` macro: no hidden heap allocations from macro expansion,
/// and explicit control over lifetime bounds.
pub trait CompletionBackend: Send + Sync {
    /// Backend name, for diagnostics.
    fn name(&self) -> &str;

    /// Send a request, return one finished assistant message.
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<Message, Error>>;

    /// Send a request, return a lazily-produced fragment sequence.
    /// The sequence is finite and single-use.
    fn stream(&self, request: CompletionRequest) -> FragmentStream;
}
