//! JSON-lines protocol spoken with the Node Playwright driver
//!
//! One request per line on the driver's stdin, one response per line on its
//! stdout. Responses carry the id of the request they answer.

use serde::{Deserialize, Serialize};

use crate::driver::LoadState;
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Goto {
        url: String,
        wait_until: LoadState,
        timeout_ms: u64,
    },
    WaitForLoadState {
        state: LoadState,
        timeout_ms: u64,
    },
    Clear {
        name: String,
    },
    Fill {
        name: String,
        text: String,
    },
    PressSequentially {
        name: String,
        text: String,
        delay_ms: u64,
    },
    Query {
        selector: String,
    },
    Close,
}

impl Command {
    pub fn op(&self) -> &'static str {
        match self {
            Command::Goto { .. } => "goto",
            Command::WaitForLoadState { .. } => "wait_for_load_state",
            Command::Clear { .. } => "clear",
            Command::Fill { .. } => "fill",
            Command::PressSequentially { .. } => "press_sequentially",
            Command::Query { .. } => "query",
            Command::Close => "close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub ok: bool,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl Response {
    /// Parse one stdout line
    pub fn parse(line: &str) -> E2eResult<Self> {
        serde_json::from_str(line.trim())
            .map_err(|e| E2eError::Protocol(format!("bad response line {:?}: {}", line, e)))
    }

    /// Turn a failed response into an error, passing the value through otherwise
    pub fn into_result(self) -> E2eResult<serde_json::Value> {
        if self.ok {
            Ok(self.value)
        } else {
            Err(E2eError::Playwright(
                self.error.unwrap_or_else(|| "unknown driver error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_is_flat_and_tagged() {
        let req = Request {
            id: 7,
            command: Command::Goto {
                url: "https://www.swifttranslator.com/".into(),
                wait_until: LoadState::DomContentLoaded,
                timeout_ms: 15_000,
            },
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 7,
                "op": "goto",
                "url": "https://www.swifttranslator.com/",
                "wait_until": "domcontentloaded",
                "timeout_ms": 15000
            })
        );
    }

    #[test]
    fn close_has_no_payload() {
        let line = serde_json::to_string(&Request { id: 1, command: Command::Close }).unwrap();
        assert_eq!(line, r#"{"id":1,"op":"close"}"#);
    }

    #[test]
    fn error_response_becomes_playwright_error() {
        let resp = Response::parse(r#"{"id":3,"ok":false,"error":"net::ERR_NAME_NOT_RESOLVED"}"#).unwrap();
        match resp.into_result() {
            Err(E2eError::Playwright(msg)) => assert!(msg.contains("ERR_NAME_NOT_RESOLVED")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn garbage_line_is_protocol_error() {
        assert!(matches!(Response::parse("Debugger attached."), Err(E2eError::Protocol(_))));
    }
}
