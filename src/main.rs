// Console entry point: pick a mode, wire the backend, run the session.

use std::io::Write;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use chatshell::{
    AzureChatBackend, CompletionBackend, CompletionRequest, Error, FunctionSpec, Message, Session,
    Settings, TurnMode, render_message,
};

const MAX_TOKENS: u32 = 100;

fn hotel_search_spec() -> FunctionSpec {
    FunctionSpec::new(
        "getHotels",
        "Retrieves hotels from the search index based on the parameters provided",
    )
    .parameter(
        "location",
        "string",
        "The location of the hotel (i.e. Seattle, WA)",
    )
    .parameter("max_price", "number", "The maximum price for the hotel")
    .parameter(
        "features",
        "string",
        "A comma separated list of features (i.e. beachfront, free wifi, etc.)",
    )
}

/// One-shot: send a canned question, print the reply, exit.
async fn run_ask(backend: &AzureChatBackend, deployment: &str) -> Result<(), Error> {
    let input = "When was Microsoft founded?";
    let request = CompletionRequest::default()
        .deployment(deployment)
        .messages(vec![
            Message::system("You are a helpful assistant."),
            Message::user(input),
        ])
        .max_tokens(MAX_TOKENS);

    let mut stdout = std::io::stdout();
    writeln!(stdout, "Input: {input}")?;
    let message = backend.complete(request).await?;
    write!(stdout, "Chatbot: ")?;
    render_message(&message, &mut stdout)?;
    Ok(())
}

async fn run_loop(session: &mut Session<AzureChatBackend>) -> Result<(), Error> {
    let mut stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout();
    session.run(&mut stdin, &mut stdout).await
}

async fn run(mode: &str) -> Result<(), Error> {
    let settings = Settings::from_env()?;
    let deployment = settings.deployment.clone();
    let backend = AzureChatBackend::new(settings)?;

    match mode {
        "ask" => run_ask(&backend, &deployment).await,
        "chat" => {
            let mut session = Session::new(
                backend,
                deployment,
                "Users will ask you questions. Answer in Danish.",
                TurnMode::Buffered,
            )
            .max_tokens(MAX_TOKENS);
            run_loop(&mut session).await
        }
        "stream" => {
            let mut session = Session::new(
                backend,
                deployment,
                "You are a helpful assistant.",
                TurnMode::Streaming,
            )
            .max_tokens(MAX_TOKENS);
            run_loop(&mut session).await
        }
        "functions" => {
            let mut session = Session::new(
                backend,
                deployment,
                "Please use functions whenever possible.",
                TurnMode::Streaming,
            )
            .functions(vec![hotel_search_spec()])
            .max_tokens(MAX_TOKENS);
            run_loop(&mut session).await
        }
        other => Err(Error::invalid_request(format!(
            "unknown mode '{other}' (expected ask, chat, stream, or functions)"
        ))),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "functions".into());
    match run(&mode).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
