use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::reaction::{RawMessage, RawReaction};

pub const DEFAULT_BASE_URL: &str = "https://api.reactlyve.com/api/";

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("api: base url cannot carry path segments")]
    BaseUrl,
    #[error("api: request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api: {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("api: decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("api client user agent required");
        }
        let base = config
            .base_url
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(base.trim())?;
        if base_url.cannot_be_a_base() {
            bail!("api base url {base} cannot be used as a base");
        }
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn reaction(&self, id: &str) -> Result<Option<RawReaction>, ApiError> {
        let url = self.endpoint(&["reactions", id])?;
        Ok(self.fetch_payload(url, "reaction")?.map(RawReaction))
    }

    pub fn message(&self, id: &str) -> Result<Option<RawMessage>, ApiError> {
        let url = self.endpoint(&["messages", id])?;
        Ok(self.fetch_payload(url, "message")?.map(RawMessage))
    }

    pub fn submit_for_manual_review(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["reactions", id, "manual-review"])?;
        let resp = self
            .http
            .post(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            Err(ApiError::Status { status, body })
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::BaseUrl)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn fetch_payload(&self, url: Url, what: &'static str) -> Result<Option<Value>, ApiError> {
        let resp = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let bytes = resp.bytes()?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { what, source })?;
        Ok(unwrap_envelope(value))
    }
}

fn unwrap_envelope(value: Value) -> Option<Value> {
    let value = match value {
        Value::Object(mut obj) if obj.contains_key("data") && !obj.contains_key("id") => {
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    if value.is_null() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use std::thread;

    use tiny_http::{Header, Response, Server};

    pub struct Route {
        pub method: &'static str,
        pub path: &'static str,
        pub status: u16,
        pub body: &'static [u8],
    }

    // Unmatched requests get a 404.
    pub fn serve(routes: Vec<Route>, requests: usize) -> (String, thread::JoinHandle<Vec<String>>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..requests {
                let Ok(req) = server.recv() else { break };
                let line = format!("{} {}", req.method(), req.url());
                let route = routes
                    .iter()
                    .find(|route| route.method == req.method().as_str() && route.path == req.url());
                let response = match route {
                    Some(route) => Response::from_data(route.body.to_vec())
                        .with_status_code(route.status)
                        .with_header(
                            Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                                .unwrap(),
                        ),
                    None => Response::from_data(b"not found".to_vec()).with_status_code(404u16),
                };
                let _ = req.respond(response);
                seen.push(line);
            }
            seen
        });
        (format!("http://127.0.0.1:{port}/api/"), handle)
    }
}

#[cfg(test)]
mod tests {
    use super::test_server::{serve, Route};
    use super::*;

    fn client(base: &str) -> Client {
        Client::new(ClientConfig {
            base_url: Some(base.to_string()),
            user_agent: "reaction-viewer-tests".into(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn requires_user_agent() {
        assert!(Client::new(ClientConfig::default()).is_err());
    }

    #[test]
    fn reaction_not_found_is_none() {
        let (base, server) = serve(
            vec![Route {
                method: "GET",
                path: "/api/reactions/empty",
                status: 200,
                body: b"null",
            }],
            3,
        );
        let client = client(&base);
        assert!(client.reaction("missing").unwrap().is_none());
        assert!(client.reaction("empty").unwrap().is_none());
        assert!(client.message("gone").unwrap().is_none());
        server.join().unwrap();
    }

    #[test]
    fn reaction_payload_and_envelope() {
        let (base, server) = serve(
            vec![
                Route {
                    method: "GET",
                    path: "/api/reactions/r1",
                    status: 200,
                    body: br#"{"id":"r1","messageid":"m1"}"#,
                },
                Route {
                    method: "GET",
                    path: "/api/messages/m1",
                    status: 200,
                    body: br#"{"data":{"id":"m1","content":"Hello"}}"#,
                },
            ],
            2,
        );
        let client = client(&base);
        let reaction = client.reaction("r1").unwrap().unwrap();
        assert_eq!(reaction.0["messageid"], "m1");
        let message = client.message("m1").unwrap().unwrap();
        assert_eq!(message.0["content"], "Hello");
        server.join().unwrap();
    }

    #[test]
    fn server_errors_surface_as_status() {
        let (base, server) = serve(
            vec![
                Route {
                    method: "GET",
                    path: "/api/reactions/r1",
                    status: 500,
                    body: b"boom",
                },
                Route {
                    method: "POST",
                    path: "/api/reactions/r1/manual-review",
                    status: 204,
                    body: b"",
                },
            ],
            2,
        );
        let client = client(&base);
        match client.reaction("r1") {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        client.submit_for_manual_review("r1").unwrap();
        let seen = server.join().unwrap();
        assert_eq!(seen[1], "POST /api/reactions/r1/manual-review");
    }

    #[test]
    fn ids_are_escaped_into_one_segment() {
        let client = client("http://localhost/api");
        let url = client.endpoint(&["reactions", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost/api/reactions/a%2Fb%20c");
    }
}
