use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

struct CliTestEnv {
    temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, content).expect("failed to write test file");
        path
    }

    fn write_config(&self, content: &str) {
        let dir = self.xdg_config.join("pagetrail");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), content).expect("failed to write config");
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    Command::new(PathBuf::from(assert_cmd::cargo::cargo_bin!("pagetrail")))
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute pagetrail: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    assert!(
        output.status.success(),
        "pagetrail {:?} failed\nstdout:\n{}\nstderr:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn page_referrers(report: &Value) -> Vec<String> {
    report["calls"]
        .as_array()
        .expect("calls array")
        .iter()
        .filter(|call| call["call"] == "page")
        .map(|call| {
            call["properties"]["referrer"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

const PUSH_AND_BACK: &str = r#"{
    "url": "https://ex.com/a?x=1",
    "title": "Page A",
    "referrer": "https://ref.com/",
    "integrations": { "Google Analytics": { "trackingId": "UA-1" } },
    "steps": [
        { "action": "wait", "ms": 20 },
        { "action": "push", "url": "/b", "title": "Page B" },
        { "action": "wait", "ms": 20 },
        { "action": "back", "title": "Page A" }
    ]
}"#;

#[test]
fn test_replay_json_reports_referrers() {
    let env = CliTestEnv::new();
    let script = env.write("script.json", PUSH_AND_BACK);
    let args = ["replay", script.to_str().unwrap(), "--format", "json"];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(report["installed"], true);
    assert_eq!(report["pending_calls"], 0);
    assert_eq!(report["calls"][0]["call"], "initialize");
    assert_eq!(
        page_referrers(&report),
        vec!["https://ref.com/", "https://ex.com/a?x=1", "https://ref.com/"]
    );
}

#[test]
fn test_replay_text_output() {
    let env = CliTestEnv::new();
    let script = env.write("script.json", PUSH_AND_BACK);
    let args = ["replay", script.to_str().unwrap()];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("initialize  Google Analytics"));
    assert!(stdout.contains("page        \"Page B\" url=https://ex.com/b referrer=https://ex.com/a?x=1"));
    assert!(stdout.contains("4 call(s), 0 pending"));
}

#[test]
fn test_replay_uses_config_integrations_and_writes_log() {
    let env = CliTestEnv::new();
    env.write_config("[integrations.Mixpanel]\ntoken = \"abc\"\n\n[tracking]\npopstate_delay_ms = 10\n");
    let script = env.write(
        "script.json",
        r#"{ "url": "https://ex.com/", "title": "Home", "steps": [{ "action": "hash", "fragment": "faq" }] }"#,
    );
    let args = ["replay", script.to_str().unwrap(), "--format", "json"];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(
        report["calls"][0]["integrations"]["Mixpanel"]["token"],
        "abc"
    );
    assert_eq!(report["final_url"], "https://ex.com/#faq");
    assert_eq!(page_referrers(&report), vec!["", ""]);

    let log_dir = env.xdg_state.join("pagetrail");
    let has_log = fs::read_dir(&log_dir)
        .expect("log dir exists")
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_name().to_string_lossy().starts_with("pagetrail.log"));
    assert!(has_log, "expected a log file in {}", log_dir.display());
}

#[test]
fn test_replay_rejects_invalid_script() {
    let env = CliTestEnv::new();
    let script = env.write("script.json", r#"{ "steps": [] }"#);

    let output = run_bin(&env, &["replay", script.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid script"));
}

#[test]
fn test_replay_rejects_bad_config() {
    let env = CliTestEnv::new();
    let config = env.write("bad.toml", "[tracking]\npopstate_delay_ms = 999999\n");
    let script = env.write("script.json", PUSH_AND_BACK);

    let output = run_bin(
        &env,
        &[
            "--config",
            config.to_str().unwrap(),
            "replay",
            script.to_str().unwrap(),
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load configuration"));
}

#[test]
fn test_config_prints_effective_settings() {
    let env = CliTestEnv::new();
    env.write_config("[tracking]\nautorun = false\n\n[integrations.\"Segment.io\"]\n");
    let args = ["config"];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pagetrail/config.toml"));
    assert!(stdout.contains("autorun = false"));
    assert!(stdout.contains("popstate_delay_ms = 50"));
    assert!(stdout.contains("integrations = Segment.io"));
}
