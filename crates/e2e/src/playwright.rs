//! Playwright browser automation
//!
//! Each page is a long-lived `node` process running a small generated driver
//! script. Rust sends JSON-lines commands on its stdin and reads the answers
//! from its stdout, so all waiting and retry decisions stay on the Rust side.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::driver::{ElementSnapshot, LoadState, PageDriver, PageLauncher};
use crate::error::{E2eError, E2eResult};
use crate::protocol::{Command, Request, Response};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Node executable
    pub node_binary: PathBuf,

    /// `node_modules` directory containing `playwright` (None = ./node_modules)
    pub node_modules: Option<PathBuf>,

    /// Time allowed for the browser to launch
    pub startup_timeout: Duration,

    /// Upper bound on any single driver round trip
    pub response_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self::from_browser(&BrowserConfig::default())
    }
}

impl PlaywrightConfig {
    pub fn from_browser(browser: &BrowserConfig) -> Self {
        Self {
            browser: browser.browser,
            headless: browser.headless,
            viewport_width: browser.viewport_width,
            viewport_height: browser.viewport_height,
            node_binary: PathBuf::from("node"),
            node_modules: None,
            startup_timeout: Duration::from_secs(60),
            response_timeout: Duration::from_secs(180),
        }
    }
}

/// Directory to run `npx` in for a given `node_modules`, if it has a parent
fn npx_dir(node_modules: &Path) -> Option<&Path> {
    node_modules.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Resolve the project directory that holds Playwright.
///
/// An explicit `node_modules` must exist; without one the current directory
/// is used.
pub fn project_dir(node_modules: Option<&Path>) -> E2eResult<PathBuf> {
    let Some(node_modules) = node_modules else {
        return Ok(std::env::current_dir()?);
    };
    if !node_modules.is_dir() {
        return Err(E2eError::Config(format!(
            "node_modules directory {} does not exist",
            node_modules.display()
        )));
    }
    match npx_dir(node_modules) {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}

/// Check if Playwright is installed and return its version
///
/// Only a missing `npx` or a failing `playwright --version` means "not
/// installed"; a bad project directory or other spawn failure is an error.
pub async fn check_playwright_installed(project_dir: &Path) -> E2eResult<String> {
    if !project_dir.is_dir() {
        return Err(E2eError::Config(format!(
            "project directory {} does not exist",
            project_dir.display()
        )));
    }

    let output = timeout(
        Duration::from_secs(60),
        TokioCommand::new("npx")
            .args(["--no-install", "playwright", "--version"])
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .output(),
    )
    .await;

    match output {
        Ok(Ok(out)) if out.status.success() => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            Ok(parse_version(&stdout).unwrap_or_else(|| stdout.trim().to_string()))
        }
        Ok(Ok(out)) => {
            debug!("playwright --version exited with {}", out.status);
            Err(E2eError::PlaywrightNotFound)
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("npx not found on PATH: {}", e);
            Err(E2eError::PlaywrightNotFound)
        }
        Ok(Err(e)) => Err(E2eError::Io(e)),
        Err(_) => Err(E2eError::Playwright(
            "playwright --version did not finish within 60 s".into(),
        )),
    }
}

/// Extract `1.47.0` from `Version 1.47.0`
fn parse_version(output: &str) -> Option<String> {
    let re = Regex::new(r"(\d+\.\d+\.\d+(?:[-.][0-9A-Za-z.]+)?)").ok()?;
    re.captures(output).map(|c| c[1].to_string())
}

/// Build the Node driver script for a configuration
pub fn build_script(config: &PlaywrightConfig) -> String {
    let mut script = String::new();

    script.push_str(&format!(
        r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const readline = require('readline');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
"#,
        browser = config.browser.as_str(),
        headless = config.headless,
        width = config.viewport_width,
        height = config.viewport_height,
    ));

    script.push_str(DRIVER_LOOP);
    script
}

const DRIVER_LOOP: &str = r#"
  const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
  const textbox = (name) => page.getByRole('textbox', { name });

  const handlers = {
    goto: async (r) => {
      await page.goto(r.url, { waitUntil: r.wait_until, timeout: r.timeout_ms });
    },
    wait_for_load_state: async (r) => {
      await page.waitForLoadState(r.state, { timeout: r.timeout_ms });
    },
    clear: async (r) => {
      await textbox(r.name).clear();
    },
    fill: async (r) => {
      await textbox(r.name).fill(r.text);
    },
    press_sequentially: async (r) => {
      await textbox(r.name).pressSequentially(r.text, { delay: r.delay_ms });
    },
    query: async (r) => page.$$eval(r.selector, (els) => els.map((el) => ({
      tag: el.tagName.toLowerCase(),
      role: el.getAttribute('role'),
      text: el.textContent,
      contains_textarea: el.querySelector('textarea') !== null,
    }))),
  };

  send({ id: 0, ok: true, value: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    let req;
    try {
      req = JSON.parse(line);
    } catch (error) {
      send({ id: 0, ok: false, error: 'unparseable request: ' + error.message });
      continue;
    }
    if (req.op === 'close') {
      send({ id: req.id, ok: true, value: null });
      break;
    }
    const handler = handlers[req.op];
    if (!handler) {
      send({ id: req.id, ok: false, error: 'unknown op: ' + req.op });
      continue;
    }
    try {
      const value = await handler(req);
      send({ id: req.id, ok: true, value: value === undefined ? null : value });
    } catch (error) {
      send({ id: req.id, ok: false, error: error.message });
    }
  }

  await browser.close();
})().catch((error) => {
  process.stderr.write(JSON.stringify({ success: false, error: error.message, stack: error.stack }) + '\n');
  process.exit(1);
});
"#;

/// stderr lines kept for launch error reports
const STDERR_TAIL_LINES: usize = 20;

/// Launches one driver process per page
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
    script_path: PathBuf,
    node_modules: PathBuf,
    // keeps the script alive for the launcher's lifetime
    _script_dir: tempfile::TempDir,
}

impl PlaywrightLauncher {
    /// Write the driver script; Playwright itself is verified separately
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, build_script(&config))?;

        let node_modules = match &config.node_modules {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?.join("node_modules"),
        };

        debug!("Wrote Playwright driver: {}", script_path.display());

        Ok(Self {
            config,
            script_path,
            node_modules,
            _script_dir: script_dir,
        })
    }
}

#[async_trait]
impl PageLauncher for PlaywrightLauncher {
    type Page = PlaywrightPage;

    async fn launch(&self) -> E2eResult<PlaywrightPage> {
        let mut child = TokioCommand::new(&self.config.node_binary)
            .arg(&self.script_path)
            .env("NODE_PATH", &self.node_modules)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!(
                    "Failed to spawn {}: {}",
                    self.config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdout unavailable".into()))?;

        let stderr_tail = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[driver] {}", line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Vec::from(tail)
            })
        });

        let mut process = DriverProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            closed: false,
        };

        // the driver announces itself with id 0 once the browser is up
        let err = match timeout(self.config.startup_timeout, process.read_response(0)).await {
            Ok(Ok(_)) => {
                info!("Launched {} (headless: {})", self.config.browser.as_str(), self.config.headless);
                return Ok(PlaywrightPage {
                    process: Mutex::new(process),
                    response_timeout: self.config.response_timeout,
                });
            }
            Ok(Err(e)) => e,
            Err(_) => E2eError::Playwright(format!(
                "browser did not start within {} ms",
                self.config.startup_timeout.as_millis()
            )),
        };

        process.terminate();
        let tail = match stderr_tail {
            Some(handle) => timeout(Duration::from_secs(5), handle)
                .await
                .ok()
                .and_then(Result::ok)
                .unwrap_or_default(),
            None => Vec::new(),
        };
        Err(with_stderr(err, &tail))
    }
}

/// Attach the driver's last stderr lines to a launch failure
fn with_stderr(err: E2eError, tail: &[String]) -> E2eError {
    if tail.is_empty() {
        return err;
    }
    E2eError::Playwright(format!("{}; driver stderr:\n{}", err, tail.join("\n")))
}

/// A browser page owned by one driver process
pub struct PlaywrightPage {
    process: Mutex<DriverProcess>,
    response_timeout: Duration,
}

impl PlaywrightPage {
    async fn request(&self, command: Command) -> E2eResult<serde_json::Value> {
        let mut process = self.process.lock().await;
        process.request(command, self.response_timeout).await
    }
}

struct DriverProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    closed: bool,
}

impl DriverProcess {
    async fn request(&mut self, command: Command, limit: Duration) -> E2eResult<serde_json::Value> {
        if self.closed {
            return Err(E2eError::DriverClosed);
        }

        let id = self.next_id;
        self.next_id += 1;
        let op = command.op();
        let mut line = serde_json::to_string(&Request { id, command })?;
        line.push('\n');

        debug!("-> #{} {}", id, op);
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let response = match timeout(limit, self.read_response(id)).await {
            Ok(response) => response?,
            Err(_) => {
                return Err(E2eError::Playwright(format!(
                    "no response to '{}' within {} ms",
                    op,
                    limit.as_millis()
                )))
            }
        };
        debug!("<- #{} ok={}", id, response.ok);
        response.into_result()
    }

    /// Read stdout until the response for `id` arrives
    async fn read_response(&mut self, id: u64) -> E2eResult<Response> {
        loop {
            let line = match self.stdout.next_line().await? {
                Some(line) => line,
                None => {
                    self.closed = true;
                    return Err(E2eError::DriverClosed);
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match Response::parse(&line) {
                Ok(resp) if resp.id == id => return Ok(resp),
                Ok(resp) => warn!("Ignoring driver response #{} while waiting for #{}", resp.id, id),
                Err(e) => warn!("{}", e),
            }
        }
    }

    /// Stop the driver process without the close handshake
    fn terminate(&mut self) {
        self.closed = true;

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }

        let _ = self.child.start_kill();
    }

    async fn shutdown(&mut self, limit: Duration) {
        if self.closed {
            return;
        }

        if let Err(e) = self.request(Command::Close, limit).await {
            debug!("Close handshake failed: {}", e);
        }
        self.closed = true;

        // Give the browser a moment to shut down gracefully
        if timeout(Duration::from_secs(5), self.child.wait()).await.is_err() {
            warn!("Driver did not exit after close, terminating");
            self.terminate();
            let _ = self.child.wait().await;
        }
    }
}

#[async_trait]
impl PageDriver for PlaywrightPage {
    async fn goto(&self, url: &str, wait_until: LoadState, timeout: Duration) -> E2eResult<()> {
        self.request(Command::Goto {
            url: url.to_string(),
            wait_until,
            timeout_ms: timeout.as_millis() as u64,
        })
        .await?;
        Ok(())
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> E2eResult<()> {
        self.request(Command::WaitForLoadState {
            state,
            timeout_ms: timeout.as_millis() as u64,
        })
        .await?;
        Ok(())
    }

    async fn clear(&self, input_name: &str) -> E2eResult<()> {
        self.request(Command::Clear { name: input_name.to_string() }).await?;
        Ok(())
    }

    async fn fill(&self, input_name: &str, text: &str) -> E2eResult<()> {
        self.request(Command::Fill {
            name: input_name.to_string(),
            text: text.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn press_sequentially(&self, input_name: &str, text: &str, delay: Duration) -> E2eResult<()> {
        self.request(Command::PressSequentially {
            name: input_name.to_string(),
            text: text.to_string(),
            delay_ms: delay.as_millis() as u64,
        })
        .await?;
        Ok(())
    }

    async fn query_elements(&self, selector: &str) -> E2eResult<Vec<ElementSnapshot>> {
        let value = self
            .request(Command::Query { selector: selector.to_string() })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn close(&self) -> E2eResult<()> {
        let mut process = self.process.lock().await;
        process.shutdown(self.response_timeout).await;
        Ok(())
    }
}
