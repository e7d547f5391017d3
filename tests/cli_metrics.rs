#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    fn history(&self) -> PathBuf {
        self.dir.path().join("state").join("metrics-history.json")
    }

    fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    /// Command isolated from the user's config and history.
    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_toon-metrics"));
        cmd.current_dir(self.dir.path())
            .env("TOON_METRICS_HOME", self.dir.path().join("home"))
            .env("TOON_METRICS_HISTORY", self.history())
            .env_remove("TOON_METRICS_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.cmd().args(args).output().expect("run toon-metrics")
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn component(i: usize) -> Value {
    json!({
        "id": format!("c{i}"),
        "name": format!("Component {i}"),
        "type": "service",
        "path": format!("src/c{i}"),
        "description": "Handles requests",
        "layer": "application"
    })
}

fn architecture(components: usize) -> Value {
    json!({
        "architecture": {
            "components": (0..components).map(component).collect::<Vec<_>>(),
            "dependency_graph": {
                "nodes": [{"id": "c0"}, {"id": "c1"}, {"id": "c2"}],
                "edges": [{"from": "c0", "to": "c1"}, {"from": "c1", "to": "c2"}]
            }
        }
    })
}

fn path_arg(p: &Path) -> &str {
    p.to_str().unwrap()
}

// --- history / trend ---

#[test]
fn trend_on_empty_history_exits_zero() {
    let sb = Sandbox::new();
    let out = sb.run(&["trend"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("No historical data available"));
    assert!(!sb.history().exists());
}

#[test]
fn trend_json_on_empty_history_is_valid_json() {
    let sb = Sandbox::new();
    let out = sb.run(&["--json", "trend"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v: Value = serde_json::from_slice(&out.stdout).expect("trend json");
    assert!(v["summary"].is_null());
    assert_eq!(v["runs"], json!([]));
}

#[test]
fn history_on_empty_history_exits_zero() {
    let sb = Sandbox::new();
    let out = sb.run(&["history"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("No historical data available"));
}

#[test]
fn collect_appends_and_history_lists_it() {
    let sb = Sandbox::new();
    let doc = sb.write_json("arch.json", &architecture(12));

    let out = sb.run(&["--project", "demo", "collect", path_arg(&doc)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("tokens saved:"), "stdout: {}", stdout(&out));
    assert!(sb.history().exists());

    let out = sb.run(&["history"]);
    let text = stdout(&out);
    assert!(out.status.success());
    assert!(text.contains("Historical Metrics (1 entries):"), "{text}");
    assert!(text.contains(": demo - "), "{text}");
    assert!(text.contains("tokens saved ("), "{text}");
}

#[test]
fn collect_twice_then_trend() {
    let sb = Sandbox::new();
    let doc = sb.write_json("arch.json", &architecture(12));
    for _ in 0..2 {
        let out = sb.run(&["--project", "demo", "collect", path_arg(&doc)]);
        assert!(out.status.success(), "stderr: {}", stderr(&out));
    }

    let out = sb.run(&["trend"]);
    let text = stdout(&out);
    assert!(out.status.success());
    assert!(text.contains("# Token Savings Trend Report"), "{text}");
    assert!(text.contains("**Historical Data:** 2 workflow runs"), "{text}");
    assert!(text.contains("| demo | 12 | 2 |"), "{text}");
    assert!(text.contains("**Total Workflow Runs** | 2 |"), "{text}");
}

#[test]
fn trend_json_has_summary_and_runs() {
    let sb = Sandbox::new();
    let doc = sb.write_json("arch.json", &architecture(5));
    assert!(sb.run(&["collect", path_arg(&doc)]).status.success());

    let out = sb.run(&["--json", "trend"]);
    assert!(out.status.success());
    let v: Value = serde_json::from_slice(&out.stdout).expect("trend json");
    assert_eq!(v["summary"]["runCount"], 1);
    assert_eq!(v["runs"].as_array().unwrap().len(), 1);
    assert!(v["runs"][0]["perCategory"]["components"]["itemCount"] == 5);
}

#[test]
fn history_limit_shows_most_recent() {
    let sb = Sandbox::new();
    let doc = sb.write_json("arch.json", &architecture(3));
    for name in ["first", "second", "third"] {
        assert!(sb.run(&["--project", name, "collect", path_arg(&doc)]).status.success());
    }
    let out = sb.run(&["--json", "history", "--limit", "2"]);
    let runs: Value = serde_json::from_slice(&out.stdout).expect("history json");
    let names: Vec<&str> = runs
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["projectName"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["second", "third"]);
}

#[test]
fn history_file_flag_overrides_env() {
    let sb = Sandbox::new();
    let doc = sb.write_json("arch.json", &architecture(3));
    let custom = sb.dir.path().join("custom.json");
    let out = sb.run(&["--history-file", path_arg(&custom), "collect", path_arg(&doc)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(custom.exists());
    assert!(!sb.history().exists());
}

// --- failures ---

#[test]
fn invalid_component_fails_and_leaves_history_untouched() {
    let sb = Sandbox::new();
    let good = sb.write_json("good.json", &architecture(3));
    assert!(sb.run(&["collect", path_arg(&good)]).status.success());
    let before = std::fs::read_to_string(sb.history()).unwrap();

    let bad = sb.write_json(
        "bad.json",
        &json!({"architecture": {"components": [{"id": "x", "name": "X"}]}}),
    );
    let out = sb.run(&["collect", path_arg(&bad)]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("[toon-metrics] error:"), "{err}");
    assert!(err.contains("component 0"), "{err}");
    assert_eq!(std::fs::read_to_string(sb.history()).unwrap(), before);
}

#[test]
fn document_without_categories_is_no_data() {
    let sb = Sandbox::new();
    let doc = sb.write_json("empty.json", &json!({"unrelated": true}));
    let out = sb.run(&["collect", path_arg(&doc)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("no metrics data available"));
    assert!(!sb.history().exists());
}

#[test]
fn missing_input_file_exits_one() {
    let sb = Sandbox::new();
    let out = sb.run(&["collect", "does-not-exist.json"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("file not found"));
}

#[test]
fn malformed_history_is_reported() {
    let sb = Sandbox::new();
    std::fs::create_dir_all(sb.history().parent().unwrap()).unwrap();
    std::fs::write(sb.history(), "not json").unwrap();
    let out = sb.run(&["trend"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("malformed history file"));
}

// --- report ---

#[test]
fn report_renders_markdown_without_persisting() {
    let sb = Sandbox::new();
    let doc = sb.write_json("arch.json", &architecture(12));
    let out = sb.run(&[
        "--project", "demo", "report", path_arg(&doc), "--price", "0.05", "--runs", "10",
    ]);
    let text = stdout(&out);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(text.contains("# Token Savings Report"));
    assert!(text.contains("**Project:** demo"));
    assert!(text.contains("### Components"));
    assert!(text.contains("### Dependency Graph"));
    assert!(text.contains("- API pricing: $0.05 per 1K tokens"));
    assert!(text.contains("- Workflow runs per month: 10"));
    assert!(text.contains("## Recommendations"));
    assert!(!sb.history().exists());
}

#[test]
fn report_uses_project_config_pricing() {
    let sb = Sandbox::new();
    let cfg_dir = sb.dir.path().join(".toon-metrics");
    std::fs::create_dir_all(&cfg_dir).unwrap();
    std::fs::write(
        cfg_dir.join("config.toml"),
        "[pricing]\nprice_per_1k = 0.02\nruns_per_month = 7\n",
    )
    .unwrap();
    let doc = sb.write_json("arch.json", &architecture(4));
    let out = sb.run(&["--json", "report", path_arg(&doc)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v: Value = serde_json::from_slice(&out.stdout).expect("report json");
    assert_eq!(v["cost"]["runsPerMonth"], 7);
    assert_eq!(v["cost"]["pricePer1kTokens"], 0.02);
}

#[test]
fn report_rejects_zero_runs() {
    let sb = Sandbox::new();
    let doc = sb.write_json("arch.json", &architecture(3));
    let out = sb.run(&["report", path_arg(&doc), "--runs", "0"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("runs per month"));
}

#[test]
fn already_compact_document_is_not_measured() {
    let sb = Sandbox::new();
    let doc = sb.write_json(
        "compact.json",
        &json!({
            "architecture_documentation": {
                "formats": {"toon": {"token_savings": {"percent": "42.0%"}}}
            }
        }),
    );
    let out = sb.run(&["collect", path_arg(&doc)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("42.0%"));
    assert!(stderr(&out).contains("already in compact form"));
    assert!(!sb.history().exists());
}

// --- converter ---

#[test]
fn encode_decode_roundtrip_commands() {
    let sb = Sandbox::new();
    let doc = json!({"items": [{"id": "a", "name": "Alice"}, {"id": "b", "name": "Bob"}]});
    let src = sb.write_json("items.json", &doc);

    let out = sb.run(&["encode", path_arg(&src)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let encoded = stdout(&out);
    assert!(encoded.contains("items[2]{id,name}:"), "{encoded}");

    let toon = sb.dir.path().join("items.toon");
    std::fs::write(&toon, &encoded).unwrap();
    let out = sb.run(&["decode", path_arg(&toon)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let decoded: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(decoded, doc);

    let out = sb.run(&["roundtrip", path_arg(&src)]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("round trip lossless"));
}

#[test]
fn encode_with_pipe_delimiter() {
    let sb = Sandbox::new();
    let src = sb.write_json("tags.json", &json!({"tags": ["a", "b", "c"]}));
    let out = sb.run(&["encode", path_arg(&src), "--delimiter", "pipe"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("tags[3|]: a|b|c"), "{}", stdout(&out));
}

#[test]
fn encode_rejects_non_object_root() {
    let sb = Sandbox::new();
    let src = sb.write_json("list.json", &json!([1, 2, 3]));
    let out = sb.run(&["encode", path_arg(&src)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("root must be an object"));
}

#[test]
fn stats_json_reports_savings() {
    let sb = Sandbox::new();
    let src = sb.write_json("arch.json", &architecture(10));
    let out = sb.run(&["--json", "stats", path_arg(&src)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    let verbose = v["verboseTokens"].as_u64().unwrap();
    let compact = v["compactTokens"].as_u64().unwrap();
    assert!(compact < verbose);
    assert_eq!(v["verboseTokens"], v["verboseSize"].as_u64().unwrap().div_ceil(4));
}
