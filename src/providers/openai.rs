use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::RemoteCallError;
use crate::model::Message;
use crate::providers::http_errors::model_api_request_error;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

fn chat_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn parse_reply(body: &str, token_limit: Option<u64>) -> Result<String, RemoteCallError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|err| RemoteCallError::Decode(err.to_string()))?;

    if let (Some(limit), Some(usage)) = (token_limit, parsed.usage.as_ref())
        && usage.total_tokens > limit
    {
        return Err(RemoteCallError::TokenLimitExceeded {
            used: usage.total_tokens,
            limit,
        });
    }

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(RemoteCallError::EmptyReply)
}

pub async fn chat(
    client: &Client,
    cfg: &Config,
    messages: &[Message],
) -> Result<String, RemoteCallError> {
    let api_url = chat_url(&cfg.model_base_url);
    let body = ChatCompletionRequest {
        model: &cfg.model,
        messages,
        temperature: cfg.temperature,
        max_tokens: cfg.max_tokens,
    };
    debug!(
        api_url = %api_url,
        model = %cfg.model,
        message_count = messages.len(),
        context = ?messages,
        "sending chat completion request"
    );

    let response = client
        .post(&api_url)
        .bearer_auth(cfg.api_key.expose())
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            warn!(
                api_url = %api_url,
                model = %cfg.model,
                error = %err,
                "chat completion request failed"
            );
            model_api_request_error(err, &api_url, cfg.model_timeout_secs)
        })?;

    let status = response.status();
    let response_body = response
        .text()
        .await
        .map_err(|err| model_api_request_error(err, &api_url, cfg.model_timeout_secs))?;

    if !status.is_success() {
        warn!(
            api_url = %api_url,
            model = %cfg.model,
            status = %status,
            response_body_len = response_body.len(),
            "model API returned non-success status"
        );
        return Err(RemoteCallError::Status {
            status,
            body: response_body,
        });
    }

    let reply = parse_reply(&response_body, cfg.token_limit)?;
    debug!(
        model = %cfg.model,
        response_len = reply.len(),
        "received chat completion"
    );
    Ok(reply)
}
