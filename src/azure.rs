// Azure OpenAI Chat Completions backend.

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::backend::{BoxFuture, CompletionBackend};
use crate::config::Settings;
use crate::error::Error;
use crate::message::{Message, Role};
use crate::request::CompletionRequest;
use crate::sse::DataLineParser;
use crate::stream::{Fragment, FragmentStream};

const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// Backend for an Azure OpenAI resource.
///
/// Azure routes by deployment rather than model name: requests go to
/// `{endpoint}/openai/deployments/{deployment}/chat/completions` with the
/// credential in an `api-key` header (not `Authorization: Bearer`).
pub struct AzureChatBackend {
    api_key: SecretString,
    endpoint: String,
    api_version: String,
    http_client: reqwest::Client,
}

impl AzureChatBackend {
    pub fn new(settings: Settings) -> Result<Self, Error> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::transport_from("failed to build HTTP client", e))?;
        Ok(Self {
            api_key: settings.api_key,
            endpoint: settings.endpoint,
            api_version: settings.api_version,
            http_client,
        })
    }

    /// Read connection settings from the environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(Settings::from_env()?)
    }

    fn url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, deployment, self.api_version
        )
    }

    fn headers(&self) -> Result<reqwest::header::HeaderMap, Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "api-key",
            self.api_key.expose_secret().parse().map_err(|_| {
                Error::invalid_request("API key contains non-ASCII or control characters")
            })?,
        );
        headers.insert(
            "content-type",
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    async fn do_complete(&self, request: CompletionRequest) -> Result<Message, Error> {
        request.validate()?;
        let url = self.url(&request.deployment);
        let body = translate_request(&request);

        let http_response = self
            .http_client
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::transport_from(format!("HTTP request failed: {e}"), e))?;

        let status = http_response.status().as_u16();
        let headers = http_response.headers().clone();

        if status >= 400 {
            let error_body: serde_json::Value = http_response
                .json()
                .await
                .unwrap_or(json!({"error": {"message": "failed to parse error response"}}));
            return Err(parse_error(status, &headers, error_body));
        }

        let response_body: serde_json::Value = http_response
            .json()
            .await
            .map_err(|e| Error::transport_from(format!("failed to parse response: {e}"), e))?;

        parse_response(&response_body)
    }
}

impl CompletionBackend for AzureChatBackend {
    fn name(&self) -> &str {
        "azure-openai"
    }

    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<Message, Error>> {
        Box::pin(self.do_complete(request))
    }

    fn stream(&self, request: CompletionRequest) -> FragmentStream {
        if let Err(e) = request.validate() {
            return FragmentStream::from_script(vec![Err(e)]);
        }
        let url = self.url(&request.deployment);
        let headers = match self.headers() {
            Ok(h) => h,
            Err(e) => return FragmentStream::from_script(vec![Err(e)]),
        };
        let mut body = translate_request(&request);
        if let Some(obj) = body.as_object_mut() {
            obj.insert("stream".into(), json!(true));
        }
        // The generator owns a clone of the client so the stream is 'static.
        let http_client = self.http_client.clone();

        let stream = async_stream::stream! {
            let http_response = match http_client
                .post(&url)
                .headers(headers)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(Error::transport_from(format!("HTTP request failed: {e}"), e));
                    return;
                }
            };

            let status = http_response.status().as_u16();
            let response_headers = http_response.headers().clone();

            if status >= 400 {
                let error_body: serde_json::Value = http_response
                    .json()
                    .await
                    .unwrap_or(json!({"error": {"message": "failed to parse error response"}}));
                yield Err(parse_error(status, &response_headers, error_body));
                return;
            }

            let mut parser = DataLineParser::new();
            let mut byte_stream = http_response.bytes_stream();

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(Error::transport_from(format!("stream read error: {e}"), e));
                        return;
                    }
                };
                let Ok(chunk_str) = std::str::from_utf8(&chunk) else {
                    continue;
                };

                for payload in parser.feed(chunk_str) {
                    if payload.trim() == "[DONE]" {
                        return;
                    }
                    match serde_json::from_str::<serde_json::Value>(&payload) {
                        Ok(data) => {
                            for fragment in translate_chunk(&data) {
                                yield Ok(fragment);
                            }
                        }
                        Err(e) => {
                            tracing::warn!("failed to parse SSE data: {e}");
                        }
                    }
                }
            }
        };
        FragmentStream::new(Box::pin(stream))
    }
}

// === Request translation ===

fn translate_request(request: &CompletionRequest) -> serde_json::Value {
    let mut body = serde_json::Map::new();

    let messages: Vec<serde_json::Value> = request
        .messages
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            match &msg.function_call {
                Some(call) => json!({
                    "role": role,
                    "content": serde_json::Value::Null,
                    "function_call": {
                        "name": call.name,
                        "arguments": call.arguments,
                    },
                }),
                None => json!({
                    "role": role,
                    "content": msg.content,
                }),
            }
        })
        .collect();
    body.insert("messages".into(), json!(messages));

    if let Some(max_tokens) = request.max_tokens {
        body.insert("max_tokens".into(), json!(max_tokens));
    }

    if let Some(functions) = &request.functions {
        let schemas: Vec<serde_json::Value> = functions.iter().map(|f| f.to_schema()).collect();
        body.insert("functions".into(), json!(schemas));
        body.insert("function_call".into(), json!("auto"));
    }

    serde_json::Value::Object(body)
}

// === Response translation ===

fn parse_response(raw: &serde_json::Value) -> Result<Message, Error> {
    let message = raw
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("message"))
        .ok_or_else(|| Error::transport("response carried no choices"))?;

    if let Some(call) = message.get("function_call") {
        let name = call
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let arguments = call
            .get("arguments")
            .and_then(|v| v.as_str())
            .unwrap_or("{}");
        return Ok(Message::function_call(name, arguments));
    }

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    Ok(Message::assistant(content))
}

// === Error translation ===

fn parse_error(
    status: u16,
    headers: &reqwest::header::HeaderMap,
    body: serde_json::Value,
) -> Error {
    let message = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown provider error")
        .to_string();
    Error::from_http_status(status, message, parse_retry_after(headers))
}

/// Parse a `Retry-After` header, either delta-seconds or an HTTP-date.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<std::time::Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?;
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(std::time::Duration::from_secs(seconds));
    }
    let when = httpdate::parse_http_date(value).ok()?;
    when.duration_since(std::time::SystemTime::now()).ok()
}

// === Stream translation ===

/// Turn one streaming chunk into printable fragments. Text arrives in
/// `delta.content`; function-call pieces in `delta.function_call`, with the
/// name on the first chunk and the arguments split across the rest.
fn translate_chunk(data: &serde_json::Value) -> Vec<Fragment> {
    let mut fragments = Vec::new();

    let delta = data
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("delta"));
    let Some(delta) = delta else {
        return fragments;
    };

    if let Some(content) = delta.get("content").and_then(|v| v.as_str())
        && !content.is_empty()
    {
        fragments.push(Fragment::Text(content.to_string()));
    }

    if let Some(call) = delta.get("function_call") {
        let name = call
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let arguments = call
            .get("arguments")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        if name.is_some() || arguments.is_some() {
            fragments.push(Fragment::FunctionCall { name, arguments });
        }
    }

    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::FunctionSpec;
    use crate::stream::MessageAssembler;

    fn test_backend(endpoint: &str) -> AzureChatBackend {
        AzureChatBackend::new(Settings::new(endpoint, "test-key", "gpt-35-turbo"))
            .expect("backend should build")
    }

    fn chat_request() -> CompletionRequest {
        CompletionRequest::default()
            .deployment("gpt-35-turbo")
            .messages(vec![
                Message::system("You are a helpful assistant."),
                Message::user("Hello"),
            ])
    }

    #[test]
    fn test_url_embeds_deployment_and_version() {
        let backend = test_backend("https://example.openai.azure.com");
        assert_eq!(
            backend.url("gpt-4o"),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-15-preview"
        );
    }

    #[test]
    fn test_headers_use_api_key_not_bearer() {
        let backend = test_backend("https://example.openai.azure.com");
        let headers = backend.headers().unwrap();
        assert_eq!(headers.get("api-key").unwrap().to_str().unwrap(), "test-key");
        assert!(headers.get("authorization").is_none());
    }

    #[test]
    fn test_headers_reject_control_characters_in_key() {
        let backend = AzureChatBackend::new(Settings::new(
            "https://example.openai.azure.com",
            "bad\x00key",
            "d",
        ))
        .unwrap();
        assert!(backend.headers().is_err());
    }

    #[test]
    fn test_translate_request_roles_and_max_tokens() {
        let request = chat_request().max_tokens(100);
        let body = translate_request(&request);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "You are a helpful assistant.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(body["max_tokens"], 100);
        assert!(body.get("functions").is_none());
        // Azure routes by deployment in the URL, never in the body.
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_translate_request_function_schemas() {
        let spec = FunctionSpec::new("getHotels", "Find hotels").parameter(
            "location",
            "string",
            "Where to look",
        );
        let request = chat_request().functions(vec![spec]);
        let body = translate_request(&request);
        assert_eq!(body["functions"][0]["name"], "getHotels");
        assert_eq!(body["functions"][0]["parameters"]["type"], "object");
        assert_eq!(body["function_call"], "auto");
    }

    #[test]
    fn test_translate_request_assistant_function_call_passthrough() {
        let mut request = chat_request();
        request
            .messages
            .push(Message::function_call("getHotels", "{\"location\":\"x\"}"));
        let body = translate_request(&request);
        let last = body["messages"].as_array().unwrap().last().unwrap().clone();
        assert_eq!(last["role"], "assistant");
        assert!(last["content"].is_null());
        assert_eq!(last["function_call"]["name"], "getHotels");
    }

    #[test]
    fn test_parse_response_text() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": "Hi there"},
                "finish_reason": "stop"
            }]
        });
        let msg = parse_response(&raw).unwrap();
        assert_eq!(msg.content, "Hi there");
        assert!(!msg.is_function_call());
    }

    #[test]
    fn test_parse_response_function_call() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "function_call": {
                        "name": "getHotels",
                        "arguments": "{\"location\":\"Seattle, WA\"}"
                    }
                },
                "finish_reason": "function_call"
            }]
        });
        let msg = parse_response(&raw).unwrap();
        let call = msg.function_call.unwrap();
        assert_eq!(call.name, "getHotels");
        assert!(call.arguments.contains("Seattle"));
    }

    #[test]
    fn test_parse_response_no_choices_is_transport_error() {
        let err = parse_response(&serde_json::json!({"choices": []})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
    }

    #[test]
    fn test_parse_error_extracts_provider_message() {
        let body = serde_json::json!({"error": {"message": "Access denied", "code": "401"}});
        let err = parse_error(401, &reqwest::header::HeaderMap::new(), body);
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "Access denied");
        assert_eq!(err.status_code, Some(401));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after", "7".parse().unwrap());
        assert_eq!(
            parse_retry_after(&headers),
            Some(std::time::Duration::from_secs(7))
        );
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let when = std::time::SystemTime::now() + std::time::Duration::from_secs(30);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after", httpdate::fmt_http_date(when).parse().unwrap());
        let parsed = parse_retry_after(&headers).expect("date should parse");
        assert!(parsed <= std::time::Duration::from_secs(30));
    }

    #[test]
    fn test_translate_chunk_text_delta() {
        let data = serde_json::json!({
            "choices": [{"delta": {"content": "Hel"}, "finish_reason": null}]
        });
        assert_eq!(translate_chunk(&data), vec![Fragment::Text("Hel".into())]);
    }

    #[test]
    fn test_translate_chunk_function_call_deltas_reassemble() {
        let chunks = [
            serde_json::json!({"choices": [{"delta": {"function_call": {"name": "getHotels", "arguments": ""}}}]}),
            serde_json::json!({"choices": [{"delta": {"function_call": {"arguments": "{\"location\":"}}}]}),
            serde_json::json!({"choices": [{"delta": {"function_call": {"arguments": "\"Seattle, WA\"}"}}}]}),
            serde_json::json!({"choices": [{"delta": {}, "finish_reason": "function_call"}]}),
        ];
        let mut asm = MessageAssembler::new();
        for chunk in &chunks {
            for fragment in translate_chunk(chunk) {
                asm.push(&fragment);
            }
        }
        let msg = asm.finish();
        let call = msg.function_call.unwrap();
        assert_eq!(call.name, "getHotels");
        assert_eq!(call.arguments, "{\"location\":\"Seattle, WA\"}");
    }

    #[test]
    fn test_translate_chunk_role_only_delta_is_empty() {
        let data = serde_json::json!({
            "choices": [{"delta": {"role": "assistant"}, "finish_reason": null}]
        });
        assert!(translate_chunk(&data).is_empty());
    }

    // === HTTP round trips ===

    #[tokio::test]
    async fn test_complete_roundtrip() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path(
                "/openai/deployments/gpt-35-turbo/chat/completions",
            ))
            .and(wiremock::matchers::query_param(
                "api-version",
                "2024-02-15-preview",
            ))
            .and(wiremock::matchers::header("api-key", "test-key"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({
                    "choices": [{
                        "message": {"role": "assistant", "content": "Hi there"},
                        "finish_reason": "stop"
                    }]
                }),
            ))
            .mount(&server)
            .await;

        let backend = test_backend(&server.uri());
        let msg = backend.complete(chat_request()).await.unwrap();
        assert_eq!(msg.content, "Hi there");
    }

    #[tokio::test]
    async fn test_complete_rate_limited_with_retry_after() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(429)
                    .insert_header("retry-after", "3")
                    .set_body_json(serde_json::json!({"error": {"message": "Too many requests"}})),
            )
            .mount(&server)
            .await;

        let backend = test_backend(&server.uri());
        let err = backend.complete(chat_request()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimited);
        assert_eq!(err.retry_after, Some(std::time::Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_complete_rejects_invalid_request_before_sending() {
        let backend = test_backend("https://example.openai.azure.com");
        let err = backend
            .complete(CompletionRequest::default().deployment("d"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_stream_roundtrip() {

        let sse_body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_raw(sse_body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let backend = test_backend(&server.uri());
        let mut stream = backend.stream(chat_request());
        let fragments: Vec<_> = stream.take().unwrap().collect().await;
        let texts: Vec<_> = fragments
            .into_iter()
            .map(|f| f.unwrap())
            .collect();
        assert_eq!(
            texts,
            vec![Fragment::Text("Hel".into()), Fragment::Text("lo".into())]
        );
    }

    #[tokio::test]
    async fn test_stream_http_error_yields_single_error() {

        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": {"message": "bad key"}})),
            )
            .mount(&server)
            .await;

        let backend = test_backend(&server.uri());
        let mut stream = backend.stream(chat_request());
        let items: Vec<_> = stream.take().unwrap().collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].as_ref().unwrap_err().kind,
            ErrorKind::Authentication
        );
    }
}
