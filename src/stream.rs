// Fragments of a streamed response and their reassembly into a message.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;

use crate::backend::BoxStream;
use crate::error::Error;
use crate::message::Message;

/// A unit of incrementally produced assistant output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A piece of assistant text, printable as it arrives.
    Text(String),
    /// A piece of a function-call signal. The name and the argument payload
    /// may arrive split across fragments at arbitrary boundaries.
    FunctionCall {
        name: Option<String>,
        arguments: Option<String>,
    },
}

/// A finite, single-use sequence of fragments.
///
/// `take()` hands out the underlying stream exactly once; a second attempt
/// fails with `ErrorKind::ExhaustedStream`.
pub struct FragmentStream {
    inner: Option<BoxStream<'static, Result<Fragment, Error>>>,
}

impl FragmentStream {
    pub fn new(inner: BoxStream<'static, Result<Fragment, Error>>) -> Self {
        Self { inner: Some(inner) }
    }

    /// Build a stream from an already-known script of items. Used by stubs
    /// and by adapters that fail before the first byte arrives.
    pub fn from_script(items: Vec<Result<Fragment, Error>>) -> Self {
        Self::new(Box::pin(futures::stream::iter(items)))
    }

    /// Take the fragments for consumption. Errors on the second call.
    pub fn take(&mut self) -> Result<TakenFragments, Error> {
        self.inner
            .take()
            .map(TakenFragments)
            .ok_or_else(Error::exhausted_stream)
    }
}

/// The single-use inner stream handed out by [`FragmentStream::take`].
pub struct TakenFragments(BoxStream<'static, Result<Fragment, Error>>);

impl fmt::Debug for TakenFragments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TakenFragments")
    }
}

impl Stream for TakenFragments {
    type Item = Result<Fragment, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().0.as_mut().poll_next(cx)
    }
}

/// Reassembles fragments, in arrival order, into one finished assistant
/// message. Text deltas concatenate; function-call deltas accumulate into a
/// name and a JSON argument payload.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    text: String,
    function_name: String,
    function_arguments: String,
    saw_function_call: bool,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &Fragment) {
        match fragment {
            Fragment::Text(delta) => self.text.push_str(delta),
            Fragment::FunctionCall { name, arguments } => {
                self.saw_function_call = true;
                if let Some(name) = name {
                    self.function_name.push_str(name);
                }
                if let Some(arguments) = arguments {
                    self.function_arguments.push_str(arguments);
                }
            }
        }
    }

    pub fn saw_function_call(&self) -> bool {
        self.saw_function_call
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Produce the finished assistant message.
    pub fn finish(self) -> Message {
        if self.saw_function_call {
            Message::function_call(self.function_name, self.function_arguments)
        } else {
            Message::assistant(self.text)
        }
    }
}
