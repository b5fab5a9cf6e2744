//! Scripted stand-in for the SwiftTranslator page
//!
//! Output appears only after the input has been still for `render_delay`,
//! the way the live page renders asynchronously after typing stops.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use swifttranslator_e2e::{E2eError, E2eResult, ElementSnapshot, LoadState, PageDriver, PageLauncher};

pub const OUTPUT_SELECTOR: &str = "div.w-full.h-80.p-3.rounded-lg.ring-1.ring-slate-300.whitespace-pre-wrap";

#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub launches: u32,
    pub gotos: u32,
    pub fills: u32,
    pub clears: u32,
    pub closes: u32,
    pub typed_keys: u32,
}

#[derive(Debug)]
struct SiteState {
    nav_failures: u32,
    silent_fills: u32,
    counters: Counters,
}

/// Shared behavior for every page the launcher opens
#[derive(Clone)]
pub struct FakeSite {
    translations: Arc<HashMap<String, String>>,
    render_delay: Duration,
    query_delay: Duration,
    never_renders: bool,
    output_element: bool,
    state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self {
            translations: Arc::new(HashMap::new()),
            render_delay: Duration::from_millis(400),
            query_delay: Duration::ZERO,
            never_renders: false,
            output_element: true,
            state: Arc::new(Mutex::new(SiteState {
                nav_failures: 0,
                silent_fills: 0,
                counters: Counters::default(),
            })),
        }
    }

    pub fn with_translation(mut self, input: &str, output: &str) -> Self {
        Arc::make_mut(&mut self.translations).insert(input.to_string(), output.to_string());
        self
    }

    pub fn with_translations<'a>(mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map = Arc::make_mut(&mut self.translations);
        for (input, output) in pairs {
            map.insert(input.to_string(), output.to_string());
        }
        self
    }

    /// The first `n` page loads fail
    pub fn failing_navigation(self, n: u32) -> Self {
        self.lock().nav_failures = n;
        self
    }

    /// The first `n` fills never produce output
    pub fn silent_fills(self, n: u32) -> Self {
        self.lock().silent_fills = n;
        self
    }

    pub fn never_renders(mut self) -> Self {
        self.never_renders = true;
        self
    }

    pub fn without_output_element(mut self) -> Self {
        self.output_element = false;
        self
    }

    pub fn render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    /// Every DOM query takes this long to answer
    pub fn slow_queries(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    pub fn counters(&self) -> Counters {
        self.lock().counters
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SiteState> {
        self.state.lock().unwrap()
    }

    /// Unknown input is echoed back, like Latin words the site leaves alone
    fn translate(&self, input: &str) -> String {
        self.translations
            .get(input)
            .cloned()
            .unwrap_or_else(|| input.to_string())
    }

    pub fn page(&self) -> FakePage {
        FakePage {
            site: self.clone(),
            input: Mutex::new(InputState {
                text: String::new(),
                changed_at: Instant::now(),
                silent: false,
            }),
        }
    }
}

struct InputState {
    text: String,
    changed_at: Instant,
    silent: bool,
}

pub struct FakePage {
    site: FakeSite,
    input: Mutex<InputState>,
}

impl FakePage {
    fn set_input(&self, text: String, silent: bool) {
        let mut input = self.input.lock().unwrap();
        input.text = text;
        input.changed_at = Instant::now();
        input.silent = silent;
    }

    fn rendered_output(&self) -> String {
        let input = self.input.lock().unwrap();
        if input.text.is_empty() || input.silent || self.site.never_renders {
            return String::new();
        }
        if input.changed_at.elapsed() < self.site.render_delay {
            return String::new();
        }
        self.site.translate(&input.text)
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str, _wait_until: LoadState, _timeout: Duration) -> E2eResult<()> {
        let mut state = self.site.lock();
        state.counters.gotos += 1;
        if state.nav_failures > 0 {
            state.nav_failures -= 1;
            return Err(E2eError::Playwright(format!("net::ERR_CONNECTION_REFUSED at {}", url)));
        }
        Ok(())
    }

    async fn wait_for_load_state(&self, _state: LoadState, _timeout: Duration) -> E2eResult<()> {
        Ok(())
    }

    async fn clear(&self, _input_name: &str) -> E2eResult<()> {
        self.site.lock().counters.clears += 1;
        self.set_input(String::new(), false);
        Ok(())
    }

    async fn fill(&self, _input_name: &str, text: &str) -> E2eResult<()> {
        let silent = {
            let mut state = self.site.lock();
            state.counters.fills += 1;
            if !text.is_empty() && state.silent_fills > 0 {
                state.silent_fills -= 1;
                true
            } else {
                false
            }
        };
        self.set_input(text.to_string(), silent);
        Ok(())
    }

    async fn press_sequentially(&self, _input_name: &str, text: &str, delay: Duration) -> E2eResult<()> {
        for ch in text.chars() {
            sleep(delay).await;
            let current = {
                let input = self.input.lock().unwrap();
                let mut next = input.text.clone();
                next.push(ch);
                next
            };
            self.set_input(current, false);
            self.site.lock().counters.typed_keys += 1;
        }
        Ok(())
    }

    async fn query_elements(&self, selector: &str) -> E2eResult<Vec<ElementSnapshot>> {
        if !self.site.query_delay.is_zero() {
            sleep(self.site.query_delay).await;
        }
        if selector != OUTPUT_SELECTOR {
            return Ok(Vec::new());
        }

        let input_text = self.input.lock().unwrap().text.clone();
        // the input's wrapper carries the same classes as the output box
        let mut elements = vec![ElementSnapshot {
            tag: "div".into(),
            role: None,
            text: Some(input_text),
            contains_textarea: true,
        }];
        if self.site.output_element {
            elements.push(ElementSnapshot {
                tag: "div".into(),
                role: None,
                text: Some(format!("\n  {}  \n", self.rendered_output())),
                contains_textarea: false,
            });
        }
        Ok(elements)
    }

    async fn close(&self) -> E2eResult<()> {
        self.site.lock().counters.closes += 1;
        Ok(())
    }
}

pub struct FakeLauncher {
    pub site: FakeSite,
}

#[async_trait]
impl PageLauncher for FakeLauncher {
    type Page = FakePage;

    async fn launch(&self) -> E2eResult<FakePage> {
        self.site.lock().counters.launches += 1;
        Ok(self.site.page())
    }
}
