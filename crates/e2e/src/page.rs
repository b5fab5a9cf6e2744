//! `TranslatorPage`: page object for the SwiftTranslator UI
//!
//! The site gives no completion signal for a translation. Output is treated
//! as ready once a non-input output element shows non-empty text, followed
//! by a fixed settle delay for the rest of the rendering to land. This is a
//! heuristic and the main source of flakiness against the live site.

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::SuiteConfig;
use crate::driver::{ElementSnapshot, LoadState, PageDriver};
use crate::error::{E2eError, E2eResult};
use crate::wait::{wait_until, WaitOptions};

/// Knobs for one translation round trip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Extra attempts after the first (None = `retries.translation`)
    pub retries: Option<u32>,
    /// On detection timeout, return whatever output is present instead of failing
    pub allow_timeout: bool,
}

impl TranslateOptions {
    pub fn tolerate_timeout() -> Self {
        Self {
            retries: None,
            allow_timeout: true,
        }
    }
}

/// Page object wrapping one browser page
pub struct TranslatorPage<'c, P: PageDriver> {
    page: P,
    config: &'c SuiteConfig,
}

impl<'c, P: PageDriver> TranslatorPage<'c, P> {
    pub fn new(page: P, config: &'c SuiteConfig) -> Self {
        Self { page, config }
    }

    /// Load the site, retrying with a fixed delay.
    ///
    /// Exhausting the attempts yields `E2eError::SiteUnreachable`.
    pub async fn navigate_to_site(&self) -> E2eResult<()> {
        let url = self.config.url.as_str();
        let timeouts = &self.config.timeouts;

        self.config
            .navigation_retry()
            .run(|attempt| async move {
                debug!("Loading {} (attempt {})", url, attempt);
                self.page
                    .goto(url, LoadState::DomContentLoaded, timeouts.navigation())
                    .await?;
                self.page
                    .wait_for_load_state(LoadState::NetworkIdle, timeouts.navigation())
                    .await?;
                sleep(timeouts.page_load()).await;
                Ok::<_, E2eError>(())
            })
            .await
            .map_err(|e| E2eError::SiteUnreachable {
                attempts: e.attempts,
                last: e.last.to_string(),
            })?;

        info!("Loaded {}", url);
        Ok(())
    }

    /// Clear the input, then pause for the page to react
    pub async fn clear_and_wait(&self) -> E2eResult<()> {
        self.page.clear(&self.config.selectors.input_name).await?;
        sleep(self.config.timeouts.after_clear()).await;
        Ok(())
    }

    /// Fill the whole text at once
    pub async fn type_input(&self, text: &str) -> E2eResult<()> {
        self.page.fill(&self.config.selectors.input_name, text).await
    }

    /// Type key by key with the configured per-key delay
    pub async fn type_sequentially(&self, text: &str) -> E2eResult<()> {
        self.page
            .press_sequentially(
                &self.config.selectors.input_name,
                text,
                self.config.timeouts.key_delay(),
            )
            .await
    }

    /// Wait for output to appear, then for the settle delay
    pub async fn wait_for_output(&self) -> E2eResult<()> {
        let text = self.detect_output(&self.config.output_wait()).await?;
        debug!("Output detected ({} chars), settling", text.chars().count());
        sleep(self.config.timeouts.settle()).await;
        Ok(())
    }

    /// Wait for any non-empty intermediate output while typing is in progress
    pub async fn partial_output(&self) -> E2eResult<String> {
        self.detect_output(&self.config.partial_wait()).await
    }

    /// Trimmed text of the output element
    pub async fn output_text(&self) -> E2eResult<String> {
        let selector = &self.config.selectors.output;
        let elements = self.page.query_elements(selector).await?;
        first_output(&elements)
            .map(|el| el.trimmed_text().to_string())
            .ok_or_else(|| E2eError::OutputMissing(selector.clone()))
    }

    /// Clear, type, wait for output and read it, retrying on detection failure.
    ///
    /// With `allow_timeout`, a detection failure returns the current output
    /// instead of retrying.
    pub async fn perform_translation(&self, input: &str, options: TranslateOptions) -> E2eResult<String> {
        let retries = options.retries.unwrap_or(self.config.retries.translation);
        let mut last_error = None;

        for attempt in 0..=retries {
            self.clear_and_wait().await?;
            self.type_input(input).await?;

            match self.wait_for_output().await {
                Ok(()) => return self.output_text().await,
                Err(e) if options.allow_timeout => {
                    warn!("Output not detected ({}), reading what is there", e);
                    return self.output_text().await;
                }
                Err(e) => {
                    warn!("Translation attempt {}/{} failed: {}", attempt + 1, retries + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(E2eError::OutputTimeout { waited_ms: 0, polls: 0 }))
    }

    pub async fn close(&self) -> E2eResult<()> {
        self.page.close().await
    }

    async fn detect_output(&self, options: &WaitOptions) -> E2eResult<String> {
        let selector = self.config.selectors.output.as_str();

        wait_until(options, || async move {
            let elements = self.page.query_elements(selector).await?;
            Ok::<_, E2eError>(
                elements
                    .iter()
                    .find(|el| !el.is_input_control() && !el.trimmed_text().is_empty())
                    .map(|el| el.trimmed_text().to_string()),
            )
        })
        .await
        .map_err(|e| {
            if let Some(last) = &e.last_error {
                warn!("Last output poll failed: {}", last);
            }
            E2eError::OutputTimeout {
                waited_ms: e.waited.as_millis() as u64,
                polls: e.polls,
            }
        })
    }
}

/// First matching element that is not the input control
fn first_output(elements: &[ElementSnapshot]) -> Option<&ElementSnapshot> {
    elements.iter().find(|el| !el.is_input_control())
}
