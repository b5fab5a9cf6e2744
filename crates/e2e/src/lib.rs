//! SwiftTranslator E2E Test Suite
//!
//! This crate drives the SwiftTranslator Singlish-to-Sinhala web page
//! through Playwright and checks that typed input produces the expected
//! transliteration:
//! - Controls Playwright through a long-lived Node driver speaking JSON lines
//! - Wraps the page in a `TranslatorPage` page object with bounded retries
//! - Detects output by polling the DOM, then waits a fixed settle delay
//! - Runs a YAML fixture table of positive, negative and typing cases
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 E2E Suite Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteRunner<L: PageLauncher>                               │
//! │    ├── preflight probe (optional) -> skip all if down       │
//! │    ├── launch() -> PageDriver (one page per case)           │
//! │    ├── TranslatorPage::navigate_to_site() -> skip if down   │
//! │    ├── positive / negative / ui verdicts                    │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TranslatorPage                                             │
//! │    ├── clear_and_wait, type_input, type_sequentially        │
//! │    ├── wait_for_output: wait_until(non-empty) + settle      │
//! │    └── perform_translation(input, TranslateOptions)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PlaywrightPage  <── JSON lines ──>  node driver.js          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod fixtures;
pub mod page;
pub mod playwright;
pub mod probe;
pub mod protocol;
pub mod runner;
pub mod wait;

pub use config::SuiteConfig;
pub use driver::{ElementSnapshot, LoadState, PageDriver, PageLauncher};
pub use error::{E2eError, E2eResult};
pub use fixtures::{Case, Category, Expectation, FixtureSet, TestCase, UiCase};
pub use page::{TranslateOptions, TranslatorPage};
pub use runner::{CaseFilter, Outcome, SuiteRunner, TestSuiteResult};
