//! End-to-end tests for the line-oriented host: stdin lines in, JSON lines
//! out, against a mock Datamuse server.

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wordscope::AppConfig;

fn config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.datamuse.base_url = server.uri();
    config.datamuse.retries = 0;
    config.engine.no_matches_delay_ms = 20;
    config
}

async fn run_host(config: AppConfig, input: &str) -> Vec<Value> {
    let mut output = Vec::new();
    wordscope::host::run(config, input.as_bytes(), &mut output)
        .await
        .expect("host run");
    String::from_utf8(output)
        .expect("utf8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

fn last_results(lines: &[Value]) -> Vec<String> {
    lines
        .iter()
        .rev()
        .find(|line| line["signal"] == "results")
        .and_then(|line| line["hits"].as_array())
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit["text"].as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn piped_query_prints_ranked_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sug"))
        .and(query_param("s", "apple"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"word": "apple", "score": 100},
            {"word": "applesauce", "score": 50},
            {"word": "apples", "score": 10}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/words"))
        .and(query_param("sl", "apple"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"word": "apple", "score": 99},
            {"word": "appall", "score": 50},
            {"word": "apel", "score": 1}
        ])))
        .mount(&server)
        .await;

    let lines = run_host(config(&server), "apple\n").await;

    assert_eq!(last_results(&lines), ["apple", "appall", "applesauce"]);
    let session = &lines[0]["session"];
    assert!(lines.iter().all(|line| &line["session"] == session));
    assert!(lines[0]["hits"][0]["help"].is_string());
}

#[tokio::test]
async fn quit_stops_before_later_lines() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let lines = run_host(config(&server), ":quit\napple\n").await;
    assert!(lines.is_empty());
}

#[tokio::test]
async fn disabled_datamuse_reports_no_matches() {
    let server = MockServer::start().await;
    let mut config = config(&server);
    config.datamuse.enabled = false;

    let lines = run_host(config, "zebra\n").await;

    assert_eq!(lines[0], json!({"session": 1, "signal": "results", "hits": []}));
    assert!(
        lines
            .iter()
            .any(|line| line["signal"] == "no-matches" && line["on"] == true)
    );
}

#[tokio::test]
async fn bad_commands_are_skipped() {
    let server = MockServer::start().await;
    let mut config = config(&server);
    config.datamuse.enabled = false;

    let lines = run_host(config, ":frobnicate\n:select 3\n").await;
    assert!(lines.is_empty());
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let server = MockServer::start().await;
    let mut config = config(&server);
    config.engine.poll_interval_ms = 0;

    let mut output = Vec::new();
    let result = wordscope::host::run(config, "apple\n".as_bytes(), &mut output).await;
    assert!(result.is_err());
    assert!(output.is_empty());
}

#[test]
fn config_round_trips_through_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("config.toml");

    let mut config = AppConfig::default();
    config.engine.batch_interval_ms = 125;
    config.provider.cache_capacity = 7;
    config.datamuse.base_url = "http://localhost:9000".into();
    config.logging.level = "wordscope=debug".into();
    config.save_to_file(&path).expect("save");

    let loaded = AppConfig::from_file(&path).expect("load");
    assert_eq!(loaded, config);
}

#[test]
fn invalid_toml_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "this is not valid toml {{{").expect("write");

    assert!(AppConfig::from_file(&path).is_err());
    assert!(AppConfig::load_or_default(&path).is_err());
}
