// MockBackend — testing utility for unit and integration tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::{BoxFuture, CompletionBackend};
use crate::error::Error;
use crate::message::Message;
use crate::request::CompletionRequest;
use crate::stream::{Fragment, FragmentStream};

/// A mock backend for testing. Returns pre-configured messages or errors in
/// the order they were queued, and records every request it sees.
pub struct MockBackend {
    /// Unified queue: Ok(Message) or Err(Error), consumed in insertion order.
    actions: Mutex<Vec<Result<Message, Error>>>,
    /// Stream queue: each entry is one `stream()` call's fragment script.
    stream_scripts: Mutex<Vec<Vec<Result<Fragment, Error>>>>,
    recorded: Mutex<Vec<CompletionRequest>>,
    call_count: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            stream_scripts: Mutex::new(Vec::new()),
            recorded: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Queue a plain-text assistant message for the next `complete()` call.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_message(Message::assistant(text))
    }

    /// Queue a full message (e.g. a function call) for the next `complete()` call.
    pub fn with_message(self, message: Message) -> Self {
        self.actions.lock().unwrap().push(Ok(message));
        self
    }

    /// Queue an error for the next `complete()` call.
    pub fn with_error(self, error: Error) -> Self {
        self.actions.lock().unwrap().push(Err(error));
        self
    }

    /// Queue a fragment script for the next `stream()` call.
    pub fn with_fragments(self, fragments: Vec<Fragment>) -> Self {
        let items = fragments.into_iter().map(Ok).collect();
        self.stream_scripts.lock().unwrap().push(items);
        self
    }

    /// Queue a stream whose first and only item is an error.
    pub fn with_stream_error(self, error: Error) -> Self {
        self.stream_scripts.lock().unwrap().push(vec![Err(error)]);
        self
    }

    /// Queue a stream that yields some fragments and then fails.
    pub fn with_fragments_then_error(self, fragments: Vec<Fragment>, error: Error) -> Self {
        let mut items: Vec<Result<Fragment, Error>> = fragments.into_iter().map(Ok).collect();
        items.push(Err(error));
        self.stream_scripts.lock().unwrap().push(items);
        self
    }

    /// How many `complete()` and `stream()` calls this backend has seen.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// A clone of every recorded request, in call order.
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.recorded.lock().unwrap().clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<Message, Error>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().unwrap().push(request);
        Box::pin(async {
            let mut actions = self.actions.lock().unwrap();
            if actions.is_empty() {
                return Err(Error::invalid_request("MockBackend: no actions queued"));
            }
            actions.remove(0)
        })
    }

    fn stream(&self, request: CompletionRequest) -> FragmentStream {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().unwrap().push(request);
        let mut scripts = self.stream_scripts.lock().unwrap();
        if scripts.is_empty() {
            return FragmentStream::from_script(vec![Err(Error::invalid_request(
                "MockBackend: no stream scripts queued",
            ))]);
        }
        FragmentStream::from_script(scripts.remove(0))
    }
}
