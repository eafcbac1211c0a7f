// Writes assistant output to the console.

use std::io::Write;

use futures::StreamExt;

use crate::error::Error;
use crate::message::Message;
use crate::stream::{Fragment, FragmentStream, MessageAssembler};

/// Write a finished assistant message, followed by a blank separator line.
///
/// Text responses print their content; function-call responses print the
/// name and the raw JSON argument payload on separate lines:
///
/// ```text
/// Function: getHotels
/// Parameters: {"location":"Seattle, WA"}
/// ```
pub fn render_message(message: &Message, out: &mut impl Write) -> Result<(), Error> {
    match &message.function_call {
        Some(call) => {
            writeln!(out, "Function: {}", call.name)?;
            writeln!(out, "Parameters: {}", call.arguments)?;
        }
        None => writeln!(out, "{}", message.content)?,
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Drain a fragment stream, printing text deltas as they arrive, and return
/// the reassembled message. A function call is printed exactly once, after
/// the whole stream has been consumed, never per fragment.
///
/// On a mid-stream error, whatever text was already printed stays on screen;
/// the error propagates to the caller.
pub async fn render_stream(
    mut stream: FragmentStream,
    out: &mut impl Write,
) -> Result<Message, Error> {
    let mut fragments = stream.take()?;
    let mut assembler = MessageAssembler::new();
    let mut printed_text = false;

    while let Some(item) = fragments.next().await {
        let fragment = item?;
        if let Fragment::Text(delta) = &fragment {
            write!(out, "{delta}")?;
            out.flush()?;
            printed_text = true;
        }
        assembler.push(&fragment);
    }

    if printed_text {
        writeln!(out)?;
    }
    let message = assembler.finish();
    if let Some(call) = &message.function_call {
        writeln!(out, "Function: {}", call.name)?;
        writeln!(out, "Parameters: {}", call.arguments)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(message: &Message) -> String {
        let mut buf = Vec::new();
        render_message(message, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_render_text_message() {
        assert_eq!(rendered(&Message::assistant("Hi there")), "Hi there\n\n");
    }

    #[test]
    fn test_render_function_call_message() {
        let msg = Message::function_call("getHotels", "{\"location\":\"Seattle, WA\"}");
        assert_eq!(
            rendered(&msg),
            "Function: getHotels\nParameters: {\"location\":\"Seattle, WA\"}\n\n"
        );
    }

    #[tokio::test]
    async fn test_render_stream_prints_deltas_then_blank_line() {
        let stream = FragmentStream::from_script(vec![
            Ok(Fragment::Text("Hel".into())),
            Ok(Fragment::Text("lo".into())),
        ]);
        let mut buf = Vec::new();
        let msg = render_stream(stream, &mut buf).await.unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Hello\n\n");
        assert_eq!(msg.content, "Hello");
    }

    #[tokio::test]
    async fn test_render_stream_function_call_printed_once_at_end() {
        let stream = FragmentStream::from_script(vec![
            Ok(Fragment::FunctionCall {
                name: Some("getHotels".into()),
                arguments: None,
            }),
            Ok(Fragment::FunctionCall {
                name: None,
                arguments: Some("{\"location\":".into()),
            }),
            Ok(Fragment::FunctionCall {
                name: None,
                arguments: Some("\"Seattle, WA\"}".into()),
            }),
        ]);
        let mut buf = Vec::new();
        let msg = render_stream(stream, &mut buf).await.unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Function: getHotels\nParameters: {\"location\":\"Seattle, WA\"}\n\n"
        );
        assert_eq!(text.matches("Function:").count(), 1);
        assert!(msg.is_function_call());
    }

    #[tokio::test]
    async fn test_render_stream_error_keeps_printed_prefix() {
        let stream = FragmentStream::from_script(vec![
            Ok(Fragment::Text("partial".into())),
            Err(Error::transport("connection reset")),
        ]);
        let mut buf = Vec::new();
        let result = render_stream(stream, &mut buf).await;
        assert!(result.is_err());
        assert_eq!(String::from_utf8(buf).unwrap(), "partial");
    }

    #[tokio::test]
    async fn test_render_stream_empty_stream() {
        let stream = FragmentStream::from_script(vec![]);
        let mut buf = Vec::new();
        let msg = render_stream(stream, &mut buf).await.unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "\n");
        assert_eq!(msg.content, "");
    }
}
