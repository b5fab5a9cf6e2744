//! `TranslatorPage` synchronization against a scripted page
//!
//! Runs with tokio's clock paused, so the real-site delays (12 s settle,
//! 90 s detection) cost nothing.

mod common;

use std::time::Duration;
use test_case::test_case;
use tokio::time::Instant;

use common::{FakePage, FakeSite};
use swifttranslator_e2e::{E2eError, SuiteConfig, TranslateOptions, TranslatorPage};

fn open<'c>(site: &FakeSite, config: &'c SuiteConfig) -> TranslatorPage<'c, FakePage> {
    TranslatorPage::new(site.page(), config)
}

#[tokio::test(start_paused = true)]
async fn loads_site_on_first_attempt() {
    let site = FakeSite::new();
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    let start = Instant::now();
    page.navigate_to_site().await.unwrap();

    assert_eq!(site.counters().gotos, 1);
    assert!(start.elapsed() >= config.timeouts.page_load());
    assert!(start.elapsed() < config.timeouts.page_load() + config.timeouts.retry_delay());
}

#[tokio::test(start_paused = true)]
async fn navigation_retries_after_fixed_delay() {
    let site = FakeSite::new().failing_navigation(1);
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    let start = Instant::now();
    page.navigate_to_site().await.unwrap();

    assert_eq!(site.counters().gotos, 2);
    assert!(start.elapsed() >= config.timeouts.retry_delay() + config.timeouts.page_load());
}

#[tokio::test(start_paused = true)]
async fn exhausted_navigation_is_site_unreachable() {
    let site = FakeSite::new().failing_navigation(10);
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    let start = Instant::now();
    let err = page.navigate_to_site().await.unwrap_err();

    match err {
        E2eError::SiteUnreachable { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(last.contains("ERR_CONNECTION_REFUSED"), "last error: {}", last);
        }
        other => panic!("expected SiteUnreachable, got {:?}", other),
    }
    assert_eq!(site.counters().gotos, 2);
    // one pause between the two attempts, none after the last
    assert!(start.elapsed() >= config.timeouts.retry_delay());
    assert!(start.elapsed() < config.timeouts.retry_delay() * 2);
}

#[tokio::test(start_paused = true)]
async fn translation_reads_output_not_input() {
    let site = FakeSite::new().with_translation("api heta enavaa", "අපි හෙට එනවා");
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    let actual = page
        .perform_translation("api heta enavaa", TranslateOptions::default())
        .await
        .unwrap();

    assert_eq!(actual, "අපි හෙට එනවා");
    assert_eq!(site.counters().clears, 1);
    assert_eq!(site.counters().fills, 1);
}

#[tokio::test(start_paused = true)]
async fn settle_delay_follows_detection() {
    let delay = Duration::from_millis(700);
    let site = FakeSite::new().render_delay(delay);
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    page.type_input("oyaata kohomadha?").await.unwrap();
    let start = Instant::now();
    page.wait_for_output().await.unwrap();

    assert!(start.elapsed() >= delay + config.timeouts.settle());
}

#[tokio::test(start_paused = true)]
async fn slow_dom_query_cannot_stretch_detection_window() {
    let site = FakeSite::new().slow_queries(Duration::from_secs(200));
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    page.type_input("api yamu").await.unwrap();
    let start = Instant::now();
    let err = page.wait_for_output().await.unwrap_err();

    assert!(matches!(err, E2eError::OutputTimeout { .. }), "got {:?}", err);
    assert_eq!(start.elapsed(), config.timeouts.output_detection());
}

#[tokio::test(start_paused = true)]
async fn missed_render_is_retried() {
    let site = FakeSite::new()
        .with_translation("mama gedhara yanavaa", "මම ගෙදර යනවා")
        .silent_fills(1);
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    let actual = page
        .perform_translation("mama gedhara yanavaa", TranslateOptions::default())
        .await
        .unwrap();

    assert_eq!(actual, "මම ගෙදර යනවා");
    assert_eq!(site.counters().fills, 2);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_report_output_timeout() {
    let site = FakeSite::new().never_renders();
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    let start = Instant::now();
    let err = page
        .perform_translation("api yamu", TranslateOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::OutputTimeout { .. }), "got {:?}", err);
    assert_eq!(site.counters().fills, config.retries.translation + 1);
    assert!(start.elapsed() >= config.timeouts.output_detection() * 3);
}

#[test_case(0, 1 ; "no retries")]
#[test_case(1, 2 ; "one retry")]
#[test_case(4, 5 ; "override above default")]
#[tokio::test(start_paused = true)]
async fn retry_override_bounds_attempts(retries: u32, expected_fills: u32) {
    let site = FakeSite::new().never_renders();
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    let options = TranslateOptions {
        retries: Some(retries),
        allow_timeout: false,
    };
    assert!(page.perform_translation("api yamu", options).await.is_err());
    assert_eq!(site.counters().fills, expected_fills);
}

#[tokio::test(start_paused = true)]
async fn allow_timeout_returns_current_output() {
    let site = FakeSite::new().never_renders();
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    let actual = page
        .perform_translation("#### $$$$", TranslateOptions::tolerate_timeout())
        .await
        .unwrap();

    assert_eq!(actual, "");
    assert_eq!(site.counters().fills, 1);
}

#[tokio::test(start_paused = true)]
async fn missing_output_element_is_an_error() {
    let site = FakeSite::new().without_output_element();
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    let err = page
        .perform_translation("api yamu", TranslateOptions::tolerate_timeout())
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::OutputMissing(_)), "got {:?}", err);
}

#[tokio::test(start_paused = true)]
async fn partial_output_appears_while_typing() {
    let site = FakeSite::new();
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    let start = Instant::now();
    page.type_input("").await.unwrap();
    page.type_sequentially("mama 7.30").await.unwrap();
    let partial = page.partial_output().await.unwrap();

    assert_eq!(partial, "mama 7.30");
    assert_eq!(site.counters().typed_keys, 9);
    assert!(start.elapsed() >= config.timeouts.key_delay() * 9);
}

#[tokio::test(start_paused = true)]
async fn partial_output_gives_up_quickly() {
    let site = FakeSite::new().never_renders();
    let config = SuiteConfig::default();
    let page = open(&site, &config);

    page.type_sequentially("mama").await.unwrap();
    let start = Instant::now();
    let err = page.partial_output().await.unwrap_err();

    assert!(matches!(err, E2eError::OutputTimeout { .. }));
    assert!(start.elapsed() >= config.timeouts.partial_output());
    assert!(start.elapsed() < config.timeouts.output_detection());
}
