use super::SnapLookup;
use super::types::{OddsBestOffer, SportEventsResponse};
use crate::capture::CaptureArtifact;
use crate::config::Config;
use crate::error::{SnapError, SnapResult};
use crate::messages::SnapMode;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE};

/// Client for the recognition backend
pub struct HttpLookup {
    client: reqwest::Client,
    api_url: String,
    api_token: Option<String>,
    language: String,
}

impl HttpLookup {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            language: config.language.clone(),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(ACCEPT_LANGUAGE, &self.language);
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch the best odds on offer for a matched sport event
    pub async fn best_offers(&self, sport_event_id: i64) -> Result<Vec<OddsBestOffer>> {
        let url = format!("{}/sport/events/{}/odds/best", self.api_url, sport_event_id);

        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .context("Odds request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Odds API error {}: {}", status, text));
        }

        resp.json()
            .await
            .context("Failed to decode odds response")
    }
}

#[async_trait]
impl SnapLookup for HttpLookup {
    async fn lookup(
        &self,
        artifact: CaptureArtifact,
        mode: SnapMode,
    ) -> SnapResult<SportEventsResponse> {
        let url = format!("{}/snap", self.api_url);
        tracing::info!(
            "Submitting {} byte snapshot taken at {} ({:?})",
            artifact.data.len(),
            artifact.captured_at.to_rfc3339(),
            mode
        );

        let resp = self
            .authorize(self.client.post(&url))
            .query(&[("autoSnap", mode.is_auto())])
            .header(CONTENT_TYPE, artifact.mime_type)
            .body(artifact.data)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        classify_response(status, &body)
    }
}

/// Map an HTTP status and body onto the snap outcome
fn classify_response(status: StatusCode, body: &str) -> SnapResult<SportEventsResponse> {
    if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
        return Err(SnapError::NoResult);
    }

    if !status.is_success() {
        return Err(SnapError::technical(format!(
            "Snap API error {}: {}",
            status,
            body.trim()
        )));
    }

    let response: SportEventsResponse = serde_json::from_str(body)
        .map_err(|e| SnapError::technical(format!("Failed to decode snap response: {}", e)))?;

    if response.result_entries.is_empty() {
        return Err(SnapError::NoResult);
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATCH: &str = r#"{"resultEntries":[{
        "sportEvent":{"id":1,"sportDataProviderCode":"sr","sportDataProviderMatchId":"m1",
            "tvChannelId":2,"startTime":"2021-03-14T03:40:00Z","endTime":"2021-03-14T06:00:00Z",
            "sport":"Soccer","category":"England","tournament":"Premier League",
            "competitors":[{"name":"Arsenal"},{"name":"Chelsea"}]},
        "tvChannel":{"id":2,"name":"Sky Sports"}}]}"#;

    #[test]
    fn test_match_is_returned() {
        let response = classify_response(StatusCode::OK, MATCH).unwrap();
        assert_eq!(response.result_entries.len(), 1);
    }

    #[test]
    fn test_empty_entries_is_no_result() {
        let err = classify_response(StatusCode::OK, r#"{"resultEntries":[]}"#).unwrap_err();
        assert!(err.is_no_result());
    }

    #[test]
    fn test_not_found_is_no_result() {
        assert!(classify_response(StatusCode::NOT_FOUND, "").unwrap_err().is_no_result());
        assert!(classify_response(StatusCode::NO_CONTENT, "").unwrap_err().is_no_result());
    }

    #[test]
    fn test_server_error_is_technical() {
        let err = classify_response(StatusCode::BAD_GATEWAY, "upstream down").unwrap_err();
        assert!(!err.is_no_result());
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_garbage_body_is_technical() {
        let err = classify_response(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, SnapError::Technical(_)));
    }

    #[test]
    fn test_api_url_trailing_slash_is_trimmed() {
        let config = Config {
            api_url: "https://snap.example.com/api/".into(),
            ..Config::default()
        };
        let lookup = HttpLookup::new(&config).unwrap();
        assert_eq!(lookup.api_url, "https://snap.example.com/api");
    }

    mod server {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;
        use tokio::task::JoinHandle;

        /// What the fake backend saw
        pub struct Received {
            pub request_line: String,
            pub headers: Vec<String>,
            pub body: Vec<u8>,
        }

        impl Received {
            pub fn has_header(&self, line: &str) -> bool {
                self.headers.iter().any(|h| h == line)
            }
        }

        /// Answer one request with `status` and `body`; returns the base URL
        pub async fn serve_once(
            status: &'static str,
            body: &'static str,
        ) -> (String, JoinHandle<Received>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            let handle = tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];

                let header_end = loop {
                    let n = socket.read(&mut chunk).await.unwrap();
                    assert!(n > 0, "client closed before sending headers");
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos + 4;
                    }
                };

                let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
                let mut lines = head.lines();
                let request_line = lines.next().unwrap_or_default().to_string();
                let headers: Vec<String> = lines
                    .filter(|l| !l.is_empty())
                    .map(|l| l.to_ascii_lowercase())
                    .collect();
                let content_length = headers
                    .iter()
                    .find_map(|h| h.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);

                while buf.len() < header_end + content_length {
                    let n = socket.read(&mut chunk).await.unwrap();
                    assert!(n > 0, "client closed before sending body");
                    buf.extend_from_slice(&chunk[..n]);
                }

                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;

                Received {
                    request_line,
                    headers,
                    body: buf[header_end..header_end + content_length].to_vec(),
                }
            });

            (format!("http://{}/api", addr), handle)
        }
    }

    fn lookup_for(api_url: String, api_token: Option<&str>) -> HttpLookup {
        let config = Config {
            api_url,
            api_token: api_token.map(str::to_string),
            language: "en".into(),
            ..Config::default()
        };
        HttpLookup::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_auto_lookup_posts_frame() {
        let (url, server) = server::serve_once("200 OK", MATCH).await;
        let lookup = lookup_for(url, Some("tok"));

        let response = lookup
            .lookup(CaptureArtifact::jpeg(vec![0xff, 0xd8, 0xff]), SnapMode::Auto)
            .await
            .unwrap();
        let received = server.await.unwrap();

        assert_eq!(received.request_line, "POST /api/snap?autoSnap=true HTTP/1.1");
        assert!(received.has_header("content-type: image/jpeg"));
        assert!(received.has_header("authorization: bearer tok"));
        assert!(received.has_header("accept-language: en"));
        assert_eq!(received.body, vec![0xff, 0xd8, 0xff]);
        assert_eq!(response.result_entries[0].tv_channel.name, "Sky Sports");
    }

    #[tokio::test]
    async fn test_manual_lookup_not_found_is_no_result() {
        let (url, server) = server::serve_once("404 Not Found", "").await;
        let lookup = lookup_for(url, None);

        let err = lookup
            .lookup(CaptureArtifact::jpeg(vec![1, 2, 3]), SnapMode::Manual)
            .await
            .unwrap_err();
        let received = server.await.unwrap();

        assert!(err.is_no_result());
        assert_eq!(received.request_line, "POST /api/snap?autoSnap=false HTTP/1.1");
        assert!(!received.headers.iter().any(|h| h.starts_with("authorization:")));
    }

    #[tokio::test]
    async fn test_lookup_bad_gateway_is_technical() {
        let (url, server) = server::serve_once("502 Bad Gateway", "upstream down").await;
        let lookup = lookup_for(url, Some("tok"));

        let err = lookup
            .lookup(CaptureArtifact::jpeg(vec![1]), SnapMode::Manual)
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, SnapError::Technical(_)));
        assert!(err.to_string().contains("upstream down"));
    }

    #[tokio::test]
    async fn test_best_offers_fetches_event_odds() {
        let (url, server) = server::serve_once(
            "200 OK",
            r#"[{"sportsBook":"Bet365","outcomes":[{"name":"Arsenal","odds":1.5},{"name":"Chelsea","odds":2.75}]}]"#,
        )
        .await;
        let lookup = lookup_for(url, Some("tok"));

        let offers = lookup.best_offers(42).await.unwrap();
        let received = server.await.unwrap();

        assert_eq!(received.request_line, "GET /api/sport/events/42/odds/best HTTP/1.1");
        assert!(received.has_header("authorization: bearer tok"));
        assert!(received.has_header("accept-language: en"));
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].summary(), "Bet365: Arsenal 1.50 | Chelsea 2.75");
    }

    #[tokio::test]
    async fn test_best_offers_server_error() {
        let (url, server) = server::serve_once("500 Internal Server Error", "boom").await;
        let lookup = lookup_for(url, None);

        let err = lookup.best_offers(7).await.unwrap_err();
        server.await.unwrap();

        assert!(err.to_string().contains("500"));
    }
}
