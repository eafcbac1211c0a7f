// The interactive read-request-render loop.

use std::io::{BufRead, Write};

use crate::backend::CompletionBackend;
use crate::error::Error;
use crate::message::Message;
use crate::render::{render_message, render_stream};
use crate::request::CompletionRequest;
use crate::schema::FunctionSpec;
use crate::transcript::Transcript;

/// How a turn's response is obtained and shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMode {
    /// One request, one finished message, rendered whole.
    Buffered,
    /// Fragments rendered as they arrive.
    Streaming,
}

/// An interactive chat session over one backend.
///
/// Each turn reads a line, appends it to the transcript, sends the whole
/// transcript, renders the response, and appends the assistant message. A
/// blank line or end of input ends the session. A failed turn is reported
/// and the loop continues; the user message that triggered it stays in the
/// transcript, so a later retry carries the full history.
pub struct Session<B: CompletionBackend> {
    backend: B,
    transcript: Transcript,
    deployment: String,
    mode: TurnMode,
    functions: Option<Vec<FunctionSpec>>,
    max_tokens: Option<u32>,
}

impl<B: CompletionBackend> Session<B> {
    pub fn new(
        backend: B,
        deployment: impl Into<String>,
        system_prompt: impl Into<String>,
        mode: TurnMode,
    ) -> Self {
        Self {
            backend,
            transcript: Transcript::with_system(system_prompt),
            deployment: deployment.into(),
            mode,
            functions: None,
            max_tokens: None,
        }
    }

    /// Declare the functions offered on every turn of this session.
    pub fn functions(mut self, functions: Vec<FunctionSpec>) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Cap the response length for every turn.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Run the loop until a blank line or end of input.
    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
    ) -> Result<(), Error> {
        loop {
            write!(output, "User: ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            let text = line.trim_end_matches(['\r', '\n']);
            if text.is_empty() {
                break;
            }

            self.transcript.push(Message::user(text));
            match self.turn(output).await {
                Ok(message) => self.transcript.push(message),
                Err(err) => {
                    writeln!(output, "error: {err}")?;
                    writeln!(output)?;
                }
            }
        }
        Ok(())
    }

    /// One request against the current transcript; returns the assistant
    /// message after rendering it.
    async fn turn<W: Write>(&self, output: &mut W) -> Result<Message, Error> {
        let mut request = CompletionRequest::default()
            .deployment(&self.deployment)
            .messages(self.transcript.snapshot());
        if let Some(functions) = &self.functions {
            request = request.functions(functions.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.max_tokens(max_tokens);
        }
        request.validate()?;

        match self.mode {
            TurnMode::Buffered => {
                let message = self.backend.complete(request).await?;
                render_message(&message, output)?;
                Ok(message)
            }
            TurnMode::Streaming => render_stream(self.backend.stream(request), output).await,
        }
    }
}
