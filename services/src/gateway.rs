//! JSON client for the process gateway.
//!
//! Every capability the engine needs from the network is served from the
//! same base URL:
//!
//! - `GET  /processes?owner=&name=` and `POST /processes` for registration
//! - `POST /processes/<id>/messages` then `GET /processes/<id>/results/<msg>`
//!   for evaluation
//! - `POST` / `DELETE /processes/<id>/monitor` for `.monitor` / `.unmonitor`
//! - `GET  /processes/<id>/results?from=<cursor>` for the live feed
//! - `GET  /processes?owner=` for `--list`

use std::time::Duration;

use aos_core::Config;
use aos_core::Credential;
use aos_core::EvaluationError;
use aos_core::ProcessId;
use aos_core::RegistrationError;
use aos_core::capability::Listing;
use aos_core::capability::ProcessControl;
use aos_core::capability::ProcessRegistry;
use aos_core::capability::RemoteEvaluator;
use aos_core::capability::RemoteReply;
use aos_core::capability::StatusBatch;
use aos_core::capability::StatusSource;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::info;

const EVAL_ACTION: &str = "Eval";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_RESULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    process_name: String,
    poll_interval: Duration,
    result_timeout: Duration,
}

impl GatewayClient {
    pub fn new(
        base_url: impl Into<String>,
        process_name: impl Into<String>,
    ) -> Result<Self, EvaluationError> {
        let client = Client::builder()
            .user_agent(concat!("aos/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| EvaluationError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            process_name: process_name.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            result_timeout: DEFAULT_RESULT_TIMEOUT,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, EvaluationError> {
        Ok(Self::new(&config.gateway_url, &config.process_name)?
            .with_result_polling(config.result_poll_interval, config.result_timeout))
    }

    /// How often to ask for a pending result, and for how long in total.
    pub fn with_result_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.result_timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, EvaluationError> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(rejected(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|err| EvaluationError::Decode(err.to_string()))
    }

    async fn find_process(
        &self,
        credential: &Credential,
    ) -> Result<Option<ProcessEntry>, EvaluationError> {
        let request = self.client.get(self.url("/processes")).query(&[
            ("owner", credential.owner()),
            ("name", self.process_name.as_str()),
        ]);
        let found: Vec<ProcessEntry> = self.send_json(request).await?;
        Ok(found.into_iter().next())
    }

    async fn create_process(&self, credential: &Credential) -> Result<CreatedBody, EvaluationError> {
        let request = self
            .client
            .post(self.url("/processes"))
            .json(&CreateProcess {
                owner: credential.owner(),
                name: &self.process_name,
            });
        self.send_json(request).await
    }

    async fn send_message(
        &self,
        code: &str,
        process_id: &ProcessId,
        credential: &Credential,
    ) -> Result<String, EvaluationError> {
        let request = self
            .client
            .post(self.url(&format!("/processes/{process_id}/messages")))
            .json(&EvalMessage {
                owner: credential.owner(),
                action: EVAL_ACTION,
                data: code,
            });
        let sent: CreatedBody = self.send_json(request).await?;
        sent.id
            .ok_or_else(|| EvaluationError::Decode("message response carried no id".to_string()))
    }

    /// Polls until the result for `message` is ready. Not-yet-ready is
    /// signalled by 404 or 202.
    async fn await_result(
        &self,
        process_id: &ProcessId,
        message: &str,
    ) -> Result<serde_json::Value, EvaluationError> {
        let url = self.url(&format!("/processes/{process_id}/results/{message}"));
        loop {
            let response = self.client.get(&url).send().await.map_err(transport)?;
            match response.status() {
                StatusCode::OK => {
                    return response
                        .json::<serde_json::Value>()
                        .await
                        .map_err(|err| EvaluationError::Decode(err.to_string()));
                }
                StatusCode::NOT_FOUND | StatusCode::ACCEPTED => {
                    debug!(message_id = message, "result pending");
                    tokio::time::sleep(self.poll_interval).await;
                }
                _ => return Err(rejected(response).await),
            }
        }
    }

    async fn control(
        &self,
        request: RequestBuilder,
        credential: &Credential,
    ) -> Result<String, EvaluationError> {
        let request = request.json(&OwnerBody {
            owner: credential.owner(),
        });
        let body: MessageBody = self.send_json(request).await?;
        Ok(body.message)
    }
}

#[async_trait]
impl ProcessRegistry for GatewayClient {
    async fn register(&self, credential: &Credential) -> Result<ProcessId, RegistrationError> {
        let gateway = |source| RegistrationError::Gateway {
            name: self.process_name.clone(),
            source,
        };
        if let Some(existing) = self.find_process(credential).await.map_err(gateway)? {
            debug!(process = %existing.id, "found existing process");
            return Ok(ProcessId::new(existing.id));
        }

        info!(name = %self.process_name, "creating process");
        let created = self.create_process(credential).await.map_err(gateway)?;
        created
            .id
            .map(ProcessId::new)
            .ok_or_else(|| RegistrationError::MissingId {
                name: self.process_name.clone(),
            })
    }
}

#[async_trait]
impl RemoteEvaluator for GatewayClient {
    async fn evaluate(
        &self,
        code: &str,
        process_id: &ProcessId,
        credential: &Credential,
    ) -> Result<RemoteReply, EvaluationError> {
        // The deadline covers sending as well as waiting for the result.
        let round_trip = async {
            let message_id = self.send_message(code, process_id, credential).await?;
            debug!(process = %process_id, message_id = %message_id, "message sent");
            self.await_result(process_id, &message_id).await
        };
        let raw = tokio::time::timeout(self.result_timeout, round_trip)
            .await
            .map_err(|_| EvaluationError::Timeout {
                after: self.result_timeout,
            })??;
        decode_reply(raw)
    }
}

#[async_trait]
impl ProcessControl for GatewayClient {
    async fn monitor(
        &self,
        credential: &Credential,
        process_id: &ProcessId,
    ) -> Result<String, EvaluationError> {
        let url = self.url(&format!("/processes/{process_id}/monitor"));
        self.control(self.client.post(url), credential).await
    }

    async fn unmonitor(
        &self,
        credential: &Credential,
        process_id: &ProcessId,
    ) -> Result<String, EvaluationError> {
        let url = self.url(&format!("/processes/{process_id}/monitor"));
        self.control(self.client.delete(url), credential).await
    }
}

#[async_trait]
impl StatusSource for GatewayClient {
    async fn poll(
        &self,
        process_id: &ProcessId,
        cursor: Option<&str>,
    ) -> Result<StatusBatch, EvaluationError> {
        let mut request = self
            .client
            .get(self.url(&format!("/processes/{process_id}/results")));
        if let Some(cursor) = cursor {
            request = request.query(&[("from", cursor)]);
        }
        let body: FeedBody = self.send_json(request).await?;
        Ok(StatusBatch {
            cursor: body.cursor,
            entries: body
                .entries
                .iter()
                .filter_map(|entry| render(&entry.output))
                .collect(),
        })
    }
}

#[async_trait]
impl Listing for GatewayClient {
    async fn query(&self, credential: &Credential) -> Result<String, EvaluationError> {
        let request = self
            .client
            .get(self.url("/processes"))
            .query(&[("owner", credential.owner())]);
        let processes: Vec<ProcessEntry> = self.send_json(request).await?;
        if processes.is_empty() {
            return Ok(format!("No processes found for {}", credential.owner()));
        }
        Ok(processes
            .iter()
            .map(|process| format!("{}  {}", process.name, process.id))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn transport(err: reqwest::Error) -> EvaluationError {
    EvaluationError::Transport(err.to_string())
}

async fn rejected(response: reqwest::Response) -> EvaluationError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    EvaluationError::Rejected { status, body }
}

/// Strings pass through; `null` means nothing; anything else is shown as
/// JSON.
fn render(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn decode_reply(raw: serde_json::Value) -> Result<RemoteReply, EvaluationError> {
    let body: ResultBody = serde_json::from_value(raw.clone())
        .map_err(|err| EvaluationError::Decode(err.to_string()))?;
    Ok(RemoteReply {
        output: render(&body.output),
        error: render(&body.error),
        prompt: body.prompt,
        raw,
    })
}

#[derive(Debug, Deserialize)]
struct ProcessEntry {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreatedBody {
    id: Option<String>,
}

#[derive(Serialize)]
struct CreateProcess<'a> {
    owner: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct EvalMessage<'a> {
    owner: &'a str,
    action: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
struct OwnerBody<'a> {
    owner: &'a str,
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Deserialize)]
struct ResultBody {
    #[serde(default)]
    output: serde_json::Value,
    #[serde(default)]
    error: serde_json::Value,
    prompt: Option<String>,
}

#[derive(Deserialize)]
struct FeedBody {
    cursor: Option<String>,
    #[serde(default)]
    entries: Vec<FeedEntry>,
}

#[derive(Deserialize)]
struct FeedEntry {
    #[serde(default)]
    output: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn non_string_output_is_rendered_as_json() {
        let reply = decode_reply(json!({ "output": { "n": 2 }, "prompt": "p> " })).expect("reply");
        assert_eq!(reply.output.as_deref(), Some(r#"{"n":2}"#));
        assert_eq!(reply.error, None);
        assert_eq!(reply.prompt.as_deref(), Some("p> "));
    }

    #[test]
    fn empty_body_has_no_output() {
        let reply = decode_reply(json!({})).expect("reply");
        assert_eq!(reply.output, None);
        assert_eq!(reply.raw, json!({}));
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = GatewayClient::new("http://gw.local/", "default").expect("client");
        assert_eq!(client.url("/processes"), "http://gw.local/processes");
    }
}
