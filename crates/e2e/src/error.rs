//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Site unreachable after {attempts} attempt(s): {last}")]
    SiteUnreachable { attempts: u32, last: String },

    #[error("{url} answered HTTP {status}")]
    ServerError { url: String, status: u16 },

    #[error("Timeout waiting for translation output after {waited_ms} ms ({polls} polls)")]
    OutputTimeout { waited_ms: u64, polls: u32 },

    #[error("No output element matching '{0}'")]
    OutputMissing(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Playwright not found. Install with: npm i -D playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("Driver process has exited")]
    DriverClosed,

    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Whether this error means the target site could not be reached
    pub fn is_site_unreachable(&self) -> bool {
        matches!(self, E2eError::SiteUnreachable { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
