//! Suite configuration
//!
//! Every field has a default matching the live SwiftTranslator site, so an
//! empty mapping (or no file at all) yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{E2eError, E2eResult};
use crate::playwright::Browser;
use crate::wait::{Backoff, RetryPolicy, WaitOptions};

pub const DEFAULT_URL: &str = "https://www.swifttranslator.com/";

/// Top-level suite configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Page under test
    pub url: String,

    /// Fixed delays and timeouts
    pub timeouts: Timeouts,

    /// Retry budgets
    pub retries: Retries,

    /// Locators for the input and output controls
    pub selectors: Selectors,

    /// Output polling schedule
    pub poll: PollConfig,

    /// Browser launch settings
    pub browser: BrowserConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeouts: Timeouts::default(),
            retries: Retries::default(),
            selectors: Selectors::default(),
            poll: PollConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

/// Timeouts and fixed delays, all in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Budget for `goto` and for reaching network idle
    pub navigation_ms: u64,
    /// Settle time after the page reports network idle
    pub page_load_ms: u64,
    /// Pause after clearing the input
    pub after_clear_ms: u64,
    /// Settle delay after output is first detected
    pub settle_ms: u64,
    /// Overall window for output detection
    pub output_detection_ms: u64,
    /// Window for intermediate output while typing a prefix
    pub partial_output_ms: u64,
    /// Pause after each executed case
    pub between_tests_ms: u64,
    /// Pause between page load attempts
    pub retry_delay_ms: u64,
    /// Per-key delay for sequential typing
    pub key_delay_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 15_000,
            page_load_ms: 2_000,
            after_clear_ms: 1_000,
            settle_ms: 12_000,
            output_detection_ms: 90_000,
            partial_output_ms: 5_000,
            between_tests_ms: 2_000,
            retry_delay_ms: 1_500,
            key_delay_ms: 120,
        }
    }
}

impl Timeouts {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn page_load(&self) -> Duration {
        Duration::from_millis(self.page_load_ms)
    }

    pub fn after_clear(&self) -> Duration {
        Duration::from_millis(self.after_clear_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn output_detection(&self) -> Duration {
        Duration::from_millis(self.output_detection_ms)
    }

    pub fn partial_output(&self) -> Duration {
        Duration::from_millis(self.partial_output_ms)
    }

    pub fn between_tests(&self) -> Duration {
        Duration::from_millis(self.between_tests_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn key_delay(&self) -> Duration {
        Duration::from_millis(self.key_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Retries {
    /// Total page load attempts
    pub page_load: u32,
    /// Extra translation attempts after the first one
    pub translation: u32,
}

impl Default for Retries {
    fn default() -> Self {
        Self {
            page_load: 2,
            translation: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Accessible name of the input textbox
    pub input_name: String,
    /// CSS selector for output candidates
    pub output: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            input_name: "Input Your Singlish Text Here.".to_string(),
            output: "div.w-full.h-80.p-3.rounded-lg.ring-1.ring-slate-300.whitespace-pre-wrap"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub initial_ms: u64,
    pub factor: u32,
    pub max_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_ms: 100,
            factor: 2,
            max_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

impl SuiteConfig {
    /// Parse a configuration from YAML
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject settings that would make the suite unable to run at all
    pub fn validate(&self) -> E2eResult<()> {
        if self.url.trim().is_empty() {
            return Err(E2eError::Config("url must not be empty".into()));
        }
        if self.retries.page_load == 0 {
            return Err(E2eError::Config("retries.page_load must be at least 1".into()));
        }
        if self.poll.initial_ms == 0 || self.poll.factor == 0 {
            return Err(E2eError::Config(
                "poll.initial_ms and poll.factor must be positive".into(),
            ));
        }
        if self.selectors.output.trim().is_empty() || self.selectors.input_name.trim().is_empty() {
            return Err(E2eError::Config("selectors must not be empty".into()));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.poll.initial_ms),
            self.poll.factor,
            Duration::from_millis(self.poll.max_ms),
        )
    }

    /// Wait options for output detection
    pub fn output_wait(&self) -> WaitOptions {
        WaitOptions::new(self.timeouts.output_detection(), self.backoff())
    }

    /// Wait options for intermediate output during incremental typing
    pub fn partial_wait(&self) -> WaitOptions {
        WaitOptions::new(self.timeouts.partial_output(), self.backoff())
    }

    /// Retry policy for page loads
    pub fn navigation_retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries.page_load, self.timeouts.retry_delay())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_live_site() {
        let config = SuiteConfig::default();
        assert_eq!(config.url, "https://www.swifttranslator.com/");
        assert_eq!(config.retries.page_load, 2);
        assert_eq!(config.retries.translation, 2);
        assert_eq!(config.timeouts.settle_ms, 12_000);
        assert_eq!(config.timeouts.output_detection_ms, 90_000);
        assert_eq!(config.selectors.input_name, "Input Your Singlish Text Here.");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = r#"
url: http://127.0.0.1:3000/
timeouts:
  settle_ms: 50
retries:
  translation: 0
browser:
  browser: firefox
  headless: false
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.url, "http://127.0.0.1:3000/");
        assert_eq!(config.timeouts.settle_ms, 50);
        assert_eq!(config.timeouts.navigation_ms, 15_000);
        assert_eq!(config.retries.translation, 0);
        assert_eq!(config.retries.page_load, 2);
        assert_eq!(config.browser.browser, Browser::Firefox);
        assert!(!config.browser.headless);
    }

    #[test]
    fn empty_document_is_default() {
        let config = SuiteConfig::from_yaml("{}").unwrap();
        assert_eq!(config, SuiteConfig::default());
    }

    #[test]
    fn zero_page_load_attempts_rejected() {
        let err = SuiteConfig::from_yaml("retries:\n  page_load: 0\n").unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));
    }

    #[test]
    fn output_wait_uses_detection_window() {
        let config = SuiteConfig::default();
        let wait = config.output_wait();
        assert_eq!(wait.timeout, Duration::from_secs(90));
        assert_eq!(config.navigation_retry().attempts, 2);
    }
}
