use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn epb_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("epb");
    path
}

const EPISODE_PAGE: &str = r#"<html><body>
<article class="episode-item-wrapper">
  <a class="ipc-title-link-wrapper" href="/title/tt0348034/">
    <div class="ipc-title__text">S1.E1 ∙ Simpsons Roasting on an Open Fire</div>
  </a>
  <span class="air-date">Sun, Dec 17, 1989</span>
  <span class="ipc-rating-star--rating">8.1</span>
  <span class="ipc-rating-star--voteCount">(9.3K)</span>
  <div class="ipc-html-content-inner-div">Homer takes a second job as a mall Santa to pay for Christmas.</div>
</article>
<article class="episode-item-wrapper">
  <a class="ipc-title-link-wrapper" href="/title/tt0701292/">
    <div class="ipc-title__text">S1.E2 ∙ Bart the Genius</div>
  </a>
  <span class="air-date">Sun, Jan 14, 1990</span>
  <span class="ipc-rating-star--rating">7.7</span>
  <div class="ipc-html-content-inner-div">Bart swaps intelligence tests with Martin and is sent to a school for gifted children.</div>
</article>
<article class="episode-item-wrapper">
  <a class="ipc-title-link-wrapper" href="/title/tt0701267/">
    <div class="ipc-title__text">S1.E3 ∙ Homer's Odyssey</div>
  </a>
  <span class="air-date">Sun, Jan 21, 1990</span>
  <span class="ipc-rating-star--rating">7.3</span>
  <div class="ipc-html-content-inner-div">Homer loses his job at the plant and becomes a safety crusader.</div>
</article>
<article class="episode-item-wrapper">
  <a class="ipc-title-link-wrapper" href="/title/tt0701141/">
    <div class="ipc-title__text">S2.E1 ∙ Bart Gets an F</div>
  </a>
  <span class="air-date">Thu, Oct 11, 1990</span>
  <span class="ipc-rating-star--rating">8.3</span>
  <div class="ipc-html-content-inner-div">Bart must pass a history test or repeat the fourth grade.</div>
</article>
</body></html>
"#;

const SERIES_PAGE: &str = r#"<ul>
<li class="ipc-metadata-list-summary-item">
  <a class="ipc-title-link-wrapper" href="/title/tt0096697/"><h3>1. The Simpsons</h3></a>
  <div class="dli-title-metadata"><span>1989–2025</span><span>790 eps</span><span>TV-PG</span></div>
</li>
<li class="ipc-metadata-list-summary-item">
  <a class="ipc-title-link-wrapper" href="/title/tt0000404/"><h3>2. Missing Show</h3></a>
  <div class="dli-title-metadata"><span>2001</span><span>12 eps</span></div>
</li>
</ul>
"#;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let pages_dir = root.join("pages");
    fs::create_dir_all(&pages_dir).unwrap();
    fs::write(pages_dir.join("episodes.html"), EPISODE_PAGE).unwrap();
    fs::write(pages_dir.join("series.html"), SERIES_PAGE).unwrap();

    let meta_dir = root.join("meta");
    fs::create_dir_all(&meta_dir).unwrap();
    fs::write(
        meta_dir.join("tt0096697.json"),
        r#"{
  "title": "The Simpsons",
  "year": 1989,
  "genres": ["Animation", "Comedy"],
  "directors": ["David Silverman"],
  "cast": ["Dan Castellaneta", "Julie Kavner", "Nancy Cartwright"],
  "rating": 8.7,
  "plot": "The satiric adventures of a working-class family.",
  "runtimes": ["22"]
}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/epb.sqlite"

[crawler]
settle_interval_ms = 1
max_duration_secs = 10

[provider]
base_url = "file://{}/meta"
delay_ms = 1

[retrieval]
page_size = 2
similar_limit = 2

[server]
bind = "127.0.0.1:8050"
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("epb.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn episode_page(config_path: &Path) -> String {
    let root = config_path.parent().unwrap().parent().unwrap();
    root.join("pages/episodes.html").display().to_string()
}

fn series_page(config_path: &Path) -> String {
    let root = config_path.parent().unwrap().parent().unwrap();
    format!("file://{}", root.join("pages/series.html").display())
}

fn run_epb(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = epb_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run epb binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn init_and_sync(config_path: &Path) {
    let (stdout, stderr, success) = run_epb(config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    let page = episode_page(config_path);
    let (stdout, stderr, success) = run_epb(
        config_path,
        &["sync", "episodes", "--show", "Simpsons", &page, "--progress", "off"],
    );
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_epb(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/epb.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_epb(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_epb(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_epb(&tmp.path().join("nope.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_sync_episodes() {
    let (_tmp, config_path) = setup_test_env();

    run_epb(&config_path, &["init"]);
    let page = episode_page(&config_path);
    let (stdout, stderr, success) = run_epb(
        &config_path,
        &["sync", "episodes", "--show", "Simpsons", &page, "--progress", "off"],
    );
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("sync episodes:Simpsons"));
    assert!(stdout.contains("upserted: 4"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_sync_idempotent_no_duplicates() {
    let (_tmp, config_path) = setup_test_env();

    init_and_sync(&config_path);
    let page = episode_page(&config_path);
    let (stdout, _, success) = run_epb(
        &config_path,
        &["sync", "episodes", "--show", "Simpsons", &page, "--progress", "off"],
    );
    assert!(success);
    assert!(stdout.contains("upserted: 4"));

    let (stdout, _, success) = run_epb(&config_path, &["stats"]);
    assert!(success);
    assert!(
        stdout.contains("Episodes:    4"),
        "Expected 4 episodes after resync, got: {}",
        stdout
    );
}

#[test]
fn test_sync_dry_run() {
    let (_tmp, config_path) = setup_test_env();

    run_epb(&config_path, &["init"]);
    let page = episode_page(&config_path);
    let (stdout, _, success) = run_epb(
        &config_path,
        &[
            "sync", "episodes", "--show", "Simpsons", &page, "--dry-run", "--progress", "off",
        ],
    );
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("would upsert: 4"));

    let (stdout, _, _) = run_epb(&config_path, &["stats"]);
    assert!(stdout.contains("Episodes:    0"));
}

#[test]
fn test_sync_missing_page_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_epb(&config_path, &["init"]);
    let (_, stderr, success) = run_epb(
        &config_path,
        &[
            "sync",
            "episodes",
            "--show",
            "Simpsons",
            "/nonexistent/episodes.html",
            "--progress",
            "off",
        ],
    );
    assert!(!success);
    assert!(stderr.contains("Failed to read page file"));
}

#[test]
fn test_sync_series_from_provider_fixtures() {
    let (tmp, config_path) = setup_test_env();

    run_epb(&config_path, &["init"]);
    let json_out = tmp.path().join("series.json");
    let page = series_page(&config_path);
    let (stdout, stderr, success) = run_epb(
        &config_path,
        &[
            "sync",
            "series",
            &page,
            "--json",
            json_out.to_str().unwrap(),
            "--progress",
            "off",
        ],
    );
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("upserted: 1"));
    assert!(stdout.contains("lookup failures: 1"));
    assert!(json_out.exists());

    let (stdout, _, success) = run_epb(&config_path, &["series", "The Simpsons"]);
    assert!(success);
    assert!(stdout.contains("The Simpsons (1989)"));
    assert!(stdout.contains("episodes: 790"));
    assert!(stdout.contains("runtime: 22 min"));
}

#[test]
fn test_search_lists_natural_order_with_paging() {
    let (_tmp, config_path) = setup_test_env();
    init_and_sync(&config_path);

    let (stdout, _, success) = run_epb(&config_path, &["search"]);
    assert!(success, "search failed");
    assert!(stdout.contains("1. Simpsons S1.E1 Simpsons Roasting on an Open Fire"));
    assert!(stdout.contains("2. Simpsons S1.E2 Bart the Genius"));
    assert!(stdout.contains("page 1 of 2 (4 results)"));
    assert!(stdout.contains("next: --page 2"));

    let (stdout, _, success) = run_epb(&config_path, &["search", "--page", "2"]);
    assert!(success);
    assert!(stdout.contains("3. Simpsons S1.E3 Homer's Odyssey"));
    assert!(stdout.contains("4. Simpsons S2.E1 Bart Gets an F"));
    assert!(!stdout.contains("next:"));
}

#[test]
fn test_search_ranked_text() {
    let (_tmp, config_path) = setup_test_env();
    init_and_sync(&config_path);

    let (stdout, _, success) = run_epb(&config_path, &["search", "bart"]);
    assert!(success);
    assert!(stdout.contains("(2 results)"), "got: {}", stdout);
    assert!(stdout.contains("1. ["));
    assert!(!stdout.contains("Homer's Odyssey"));
}

#[test]
fn test_search_filters() {
    let (_tmp, config_path) = setup_test_env();
    init_and_sync(&config_path);

    let (stdout, _, success) = run_epb(
        &config_path,
        &["search", "--min-rating", "8", "--from", "1990-01-01"],
    );
    assert!(success);
    assert!(stdout.contains("Bart Gets an F"));
    assert!(stdout.contains("(1 results)"));

    // An inverted range is ignored rather than matching nothing.
    let (stdout, _, success) = run_epb(
        &config_path,
        &["search", "--from", "2000-01-01", "--to", "1990-01-01"],
    );
    assert!(success);
    assert!(stdout.contains("(4 results)"));
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env();
    init_and_sync(&config_path);

    let (stdout, _, success) = run_epb(&config_path, &["search", "--show", "Seinfeld"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_get_episode_with_similar() {
    let (_tmp, config_path) = setup_test_env();
    init_and_sync(&config_path);

    let (stdout, stderr, success) = run_epb(&config_path, &["get", "Simpsons", "1", "2"]);
    assert!(success, "get failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("--- Episode ---"));
    assert!(stdout.contains("title:    Bart the Genius"));
    assert!(stdout.contains("aired:    1990-01-14"));
    assert!(stdout.contains("--- Similar (2) ---"));
}

#[test]
fn test_get_missing_episode() {
    let (_tmp, config_path) = setup_test_env();
    init_and_sync(&config_path);

    let (_, stderr, success) = run_epb(&config_path, &["get", "Simpsons", "9", "9"]);
    assert!(!success);
    assert!(stderr.contains("episode not found"));
}

#[test]
fn test_similar_respects_limit() {
    let (_tmp, config_path) = setup_test_env();
    init_and_sync(&config_path);

    let (stdout, _, success) = run_epb(
        &config_path,
        &["similar", "Simpsons", "1", "2", "--limit", "1"],
    );
    assert!(success);
    assert!(stdout.contains("1. ["));
    assert!(!stdout.contains("2. ["));
    assert!(!stdout.contains("Bart the Genius"));
}

#[test]
fn test_stats_per_show() {
    let (_tmp, config_path) = setup_test_env();
    init_and_sync(&config_path);

    let (stdout, _, success) = run_epb(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Episodes:    4"));
    assert!(stdout.contains("Shows:       1"));
    assert!(stdout.contains("1989-12-17 – 1990-10-11"));
}
