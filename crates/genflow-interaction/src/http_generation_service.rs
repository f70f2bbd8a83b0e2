//! HttpGenerationService - REST client for the remote generation service.
//!
//! Endpoints, relative to the configured base URL:
//! - `POST generate` → `{ "resultRef": .. }` or `{ "jobId": .. }`
//! - `GET jobs/{id}` → `{ "status": "pending"|"completed"|"failed", "resultRef"?, "error"? }`
//! - `POST edit` → `{ "resultRef": .. }`
//! - `GET credits` → `{ "remaining": n }`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use genflow_core::config::ServiceConfig;
use genflow_core::credits::CreditsSource;
use genflow_core::error::{GenflowError, Result};
use genflow_core::generation::{
    EditRequest, GenerateResponse, GenerationRequest, GenerationService, JobHandle, JobStatus,
    RemoteErrorBody, RemoteFailure, RemoteResult,
};
use genflow_core::session::ResultRef;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// `GenerationService` and `CreditsSource` over HTTP + JSON.
#[derive(Clone)]
pub struct HttpGenerationService {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpGenerationService {
    pub fn new(base_url: &str, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenflowError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            api_token: api_token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            config.api_token.clone(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> RemoteResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteFailure::transport(format!("invalid endpoint '{path}': {e}")))
    }

    /// `jobs/{id}` with the id escaped as a single path segment.
    fn job_url(&self, job: &JobHandle) -> RemoteResult<Url> {
        let id = job.id();
        if matches!(id.trim(), "" | "." | "..") {
            return Err(RemoteFailure::Decode(format!("unusable job id '{id}'")));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteFailure::transport(format!("base URL {} has no path", self.base_url)))?
            .pop_if_empty()
            .push("jobs")
            .push(id);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> RemoteResult<T> {
        let request = match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|err| transport_failure(what, err))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers().get(RETRY_AFTER));
            let body_text = response.text().await.unwrap_or_default();
            let failure = map_http_error(status, &body_text, retry_after);
            tracing::warn!("{what} failed: {failure}");
            return Err(failure);
        }

        let body_text = response
            .text()
            .await
            .map_err(|err| transport_failure(what, err))?;
        let body_text = if body_text.trim().is_empty() {
            "null"
        } else {
            body_text.as_str()
        };
        serde_json::from_str(body_text)
            .map_err(|err| RemoteFailure::Decode(format!("{what} response: {err}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    #[serde(default, alias = "resultUrl", alias = "immediate")]
    result_ref: Option<ResultRef>,
    #[serde(default)]
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditBody {
    #[serde(default, alias = "resultUrl")]
    result_ref: Option<ResultRef>,
}

#[derive(Debug, Deserialize)]
struct CreditsBody {
    remaining: u32,
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn generate(&self, request: &GenerationRequest) -> RemoteResult<GenerateResponse> {
        tracing::debug!(
            variant = %request.variant,
            images = request.subject_images.len(),
            "POST generate"
        );
        let url = self.endpoint("generate")?;
        let body: Option<GenerateBody> = self
            .send(self.client.post(url).json(request), "generate")
            .await?;
        decide_generate_response(body)
    }

    async fn job_status(&self, job: &JobHandle) -> RemoteResult<JobStatus> {
        let url = self.job_url(job)?;
        let status: Option<JobStatus> = self.send(self.client.get(url), "job status").await?;
        status.ok_or_else(|| RemoteFailure::Decode(format!("empty status for job {job}")))
    }

    async fn edit(&self, request: &EditRequest) -> RemoteResult<Option<ResultRef>> {
        tracing::debug!(base = %request.base_image, "POST edit");
        let url = self.endpoint("edit")?;
        let body: Option<EditBody> = self
            .send(self.client.post(url).json(request), "edit")
            .await?;
        Ok(body.and_then(|b| b.result_ref).filter(|r| !r.as_str().trim().is_empty()))
    }
}

#[async_trait]
impl CreditsSource for HttpGenerationService {
    async fn remaining_credits(&self) -> Result<u32> {
        let url = self
            .endpoint("credits")
            .map_err(|e| GenflowError::config(e.to_string()))?;
        let body: Option<CreditsBody> = self
            .send(self.client.get(url), "credits")
            .await
            .map_err(|e| GenflowError::internal(format!("credits lookup failed: {e}")))?;
        body.map(|b| b.remaining)
            .ok_or_else(|| GenflowError::internal("credits lookup returned no body"))
    }
}

/// Ensures the base URL is a directory so relative joins append.
fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&normalized)
        .map_err(|e| GenflowError::config(format!("invalid service base URL '{raw}': {e}")))
}

/// Result present wins over job id; neither is a decode failure.
fn decide_generate_response(body: Option<GenerateBody>) -> RemoteResult<GenerateResponse> {
    let body = body.ok_or_else(|| RemoteFailure::Decode("empty generate response".into()))?;
    if let Some(result) = body.result_ref.filter(|r| !r.as_str().trim().is_empty()) {
        return Ok(GenerateResponse::Immediate(result));
    }
    match body.job_id.filter(|id| !id.trim().is_empty()) {
        Some(job_id) => Ok(GenerateResponse::Deferred(JobHandle::new(job_id))),
        None => Err(RemoteFailure::Decode(
            "generate response had neither a result nor a job id".into(),
        )),
    }
}

fn transport_failure(what: &str, err: reqwest::Error) -> RemoteFailure {
    RemoteFailure::Transport {
        message: format!("{what} request failed: {err}"),
        is_timeout: err.is_timeout(),
    }
}

fn map_http_error(status: StatusCode, body: &str, retry_after: Option<Duration>) -> RemoteFailure {
    let body = serde_json::from_str::<RemoteErrorBody>(body).unwrap_or_else(|_| {
        let text = body.trim();
        RemoteErrorBody {
            message: (!text.is_empty()).then(|| text.to_string()),
            ..RemoteErrorBody::default()
        }
    });

    RemoteFailure::Http {
        status: status.as_u16(),
        body,
        retry_after,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    retry_after_at(header?.to_str().ok()?, Utc::now())
}

/// Delay-seconds or an HTTP-date; dates in the past mean "now".
fn retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = DateTime::parse_from_rfc2822(value).ok()?;
    Some(
        (date.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use genflow_core::generation::{ErrorKind, classify};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn body(json: &str) -> Option<GenerateBody> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_generate_response_branches_once() {
        assert_eq!(
            decide_generate_response(body(r#"{"resultRef":"r1"}"#)).unwrap(),
            GenerateResponse::Immediate("r1".into())
        );
        assert_eq!(
            decide_generate_response(body(r#"{"immediate":"r1"}"#)).unwrap(),
            GenerateResponse::Immediate("r1".into())
        );
        assert_eq!(
            decide_generate_response(body(r#"{"jobId":"j1"}"#)).unwrap(),
            GenerateResponse::Deferred(JobHandle::new("j1"))
        );
        assert!(matches!(
            decide_generate_response(body(r#"{"resultRef":"  ","jobId":""}"#)),
            Err(RemoteFailure::Decode(_))
        ));
        assert!(decide_generate_response(None).is_err());
    }

    #[test]
    fn test_map_http_error_structured_body() {
        let failure = map_http_error(
            StatusCode::FORBIDDEN,
            r#"{"code":"SHOP_NO_CREDITS","message":"Not enough credits","available":2,"required":5}"#,
            None,
        );
        let classified = classify(&failure);
        assert_eq!(classified.kind, ErrorKind::InsufficientCredits);
        match failure {
            RemoteFailure::Http { status, body, .. } => {
                assert_eq!(status, 403);
                assert_eq!(body.available, Some(2));
                assert_eq!(body.required, Some(5));
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_map_http_error_plain_text_body() {
        let failure = map_http_error(
            StatusCode::BAD_GATEWAY,
            "upstream unavailable\n",
            Some(Duration::from_secs(3)),
        );
        assert_eq!(
            failure,
            RemoteFailure::Http {
                status: 502,
                body: RemoteErrorBody {
                    message: Some("upstream unavailable".into()),
                    ..RemoteErrorBody::default()
                },
                retry_after: Some(Duration::from_secs(3)),
            }
        );
    }

    #[test]
    fn test_parse_retry_after() {
        let seconds = HeaderValue::from_static("30");
        assert_eq!(
            parse_retry_after(Some(&seconds)),
            Some(Duration::from_secs(30))
        );
        let past = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&past)), Some(Duration::ZERO));
        let garbage = HeaderValue::from_static("soon");
        assert_eq!(parse_retry_after(Some(&garbage)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn test_retry_after_http_date() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            retry_after_at("Wed, 21 Oct 2015 07:30:00 GMT", now),
            Some(Duration::from_secs(120))
        );
        assert_eq!(
            retry_after_at("Wed, 21 Oct 2015 07:27:00 GMT", now),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_job_id_is_a_single_path_segment() {
        let service =
            HttpGenerationService::new("https://api.example.com/v2", None, Duration::from_secs(5))
                .unwrap();
        let job_url = |id: &str| service.job_url(&JobHandle::new(id));

        assert_eq!(
            job_url("j-42").unwrap().as_str(),
            "https://api.example.com/v2/jobs/j-42"
        );
        for hostile in ["../credits", "abc?x=1", "a/b#frag"] {
            let url = job_url(hostile).unwrap();
            let segments: Vec<_> = url.path_segments().unwrap().collect();
            assert_eq!(segments.len(), 3, "{hostile} -> {url}");
            assert_eq!(&segments[..2], &["v2", "jobs"]);
            assert!(url.query().is_none(), "{hostile} -> {url}");
            assert!(url.fragment().is_none(), "{hostile} -> {url}");
        }
        assert!(matches!(job_url(".."), Err(RemoteFailure::Decode(_))));
        assert!(matches!(job_url(""), Err(RemoteFailure::Decode(_))));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let service =
            HttpGenerationService::new("https://api.example.com/v2", None, Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            service.endpoint("jobs/j1").unwrap().as_str(),
            "https://api.example.com/v2/jobs/j1"
        );
        assert!(HttpGenerationService::new("not a url", None, Duration::from_secs(5)).is_err());
    }

    /// Serves exactly one canned HTTP response and returns the raw request.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut chunk = [0u8; 4096];
            // Read headers, then as much body as content-length announces.
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&received).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if received.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&received).to_string()
        });
        (format!("http://{addr}/api/"), handle)
    }

    #[tokio::test]
    async fn test_job_status_over_http_with_bearer_token() {
        let payload = r#"{"status":"completed","resultRef":"r2"}"#;
        let response: &'static str = Box::leak(
            format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                payload.len(),
                payload
            )
            .into_boxed_str(),
        );
        let (base_url, server) = serve_once(response).await;
        let service = HttpGenerationService::new(
            &base_url,
            Some("secret-token".into()),
            Duration::from_secs(5),
        )
        .unwrap();

        let status = service.job_status(&JobHandle::new("j1")).await.unwrap();
        assert_eq!(status, JobStatus::completed("r2"));

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("GET /api/jobs/j1 "));
        assert!(
            raw_request
                .to_ascii_lowercase()
                .contains("authorization: bearer secret-token")
        );
    }

    #[tokio::test]
    async fn test_rate_limit_over_http_keeps_retry_after_header() {
        let payload = r#"{"code":"RATE_LIMITED","message":"slow down"}"#;
        let response: &'static str = Box::leak(
            format!(
                "HTTP/1.1 429 Too Many Requests\r\ncontent-type: application/json\r\nretry-after: 12\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                payload.len(),
                payload
            )
            .into_boxed_str(),
        );
        let (base_url, server) = serve_once(response).await;
        let service = HttpGenerationService::new(&base_url, None, Duration::from_secs(5)).unwrap();

        let failure = service
            .edit(&EditRequest {
                base_image: "r2".into(),
                instruction: "brighter".into(),
            })
            .await
            .unwrap_err();
        let classified = classify(&failure);
        assert_eq!(classified.kind, ErrorKind::RateLimited);
        assert_eq!(classified.retry_after, Some(Duration::from_secs(12)));

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("POST /api/edit "));
    }
}
