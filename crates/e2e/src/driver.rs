//! Browser seam used by the page object
//!
//! `TranslatorPage` only needs a handful of page primitives. Keeping them
//! behind a trait lets the suite run against Playwright while the
//! synchronization logic is tested against a scripted page.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::E2eResult;

/// Page load milestones understood by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

/// What the page reports about one element matching a selector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Lower-cased tag name
    pub tag: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// The element wraps a `<textarea>`
    #[serde(default)]
    pub contains_textarea: bool,
}

impl ElementSnapshot {
    /// Whether this element is (or wraps) the text input control
    pub fn is_input_control(&self) -> bool {
        self.tag.eq_ignore_ascii_case("textarea")
            || self
                .role
                .as_deref()
                .map(|r| r.eq_ignore_ascii_case("textbox"))
                .unwrap_or(false)
            || self.contains_textarea
    }

    /// Trimmed text content, if any
    pub fn trimmed_text(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or("")
    }
}

/// One open browser page
///
/// Methods take `&self` so polling closures can borrow the page; drivers
/// serialize access internally.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for `wait_until`
    async fn goto(&self, url: &str, wait_until: LoadState, timeout: Duration) -> E2eResult<()>;

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> E2eResult<()>;

    /// Clear the textbox with the given accessible name
    async fn clear(&self, input_name: &str) -> E2eResult<()>;

    /// Replace the textbox value in one step
    async fn fill(&self, input_name: &str, text: &str) -> E2eResult<()>;

    /// Type key by key with `delay` between keystrokes
    async fn press_sequentially(&self, input_name: &str, text: &str, delay: Duration) -> E2eResult<()>;

    /// Snapshot every element matching a CSS selector, in document order
    async fn query_elements(&self, selector: &str) -> E2eResult<Vec<ElementSnapshot>>;

    async fn close(&self) -> E2eResult<()>;
}

/// Opens fresh pages, one per test case
#[async_trait]
pub trait PageLauncher: Send + Sync {
    type Page: PageDriver;

    async fn launch(&self) -> E2eResult<Self::Page>;
}
