use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
    work: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");
        let work = base.join("work");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");
        fs::create_dir_all(&work).expect("failed to create work dir");

        seed_capture_fixture(&work);

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
            work,
        }
    }

    fn capture(&self) -> PathBuf {
        self.work.join("attach-and-release.csv")
    }

    fn write_config(&self, content: &str) {
        let dir = self.xdg_config.join("s1flow");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), content).expect("failed to write config");
    }
}

fn seed_capture_fixture(work: &Path) {
    let source = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../s1flow-core/tests/fixtures/attach-and-release.csv");
    fs::copy(source, work.join("attach-and-release.csv")).expect("failed to copy capture fixture");
}

fn run_bin(env: &CliTestEnv, bin_name: &str, args: &[&str]) -> Output {
    let bin_path = match bin_name {
        "s1flow" => PathBuf::from(assert_cmd::cargo::cargo_bin!("s1flow")),
        "s1flow-filter" => PathBuf::from(assert_cmd::cargo::cargo_bin!("s1flow-filter")),
        _ => panic!("unsupported binary in test harness: {bin_name}"),
    };

    let mut command = Command::new(bin_path);

    command
        .args(args)
        .current_dir(&env.work)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute {bin_name}: {e}"))
}

fn assert_success(bin_name: &str, args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "{bin_name} {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn read_json(path: &Path) -> Value {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&content).expect("report should be valid JSON")
}

#[test]
fn s1flow_writes_json_report_and_filter_narrows_it() {
    let env = CliTestEnv::new();
    let capture = env.capture();
    let report_path = env.work.join("flows.json");
    let args = [
        capture.to_str().unwrap(),
        "--out",
        report_path.to_str().unwrap(),
    ];

    let output = run_bin(&env, "s1flow", &args);
    assert_success("s1flow", &args, &output);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Wrote 3 session(s)"), "stderr:\n{stderr}");

    let report = read_json(&report_path);
    assert_eq!(report["summary"]["total_sessions"], 3);
    assert_eq!(report["summary"]["success_count"], 1);
    assert_eq!(report["summary"]["failure_count"], 1);
    assert_eq!(report["sessions"][0]["status"], "success");
    assert_eq!(report["sessions"][1]["status"], "failure");

    // The same report is echoed on stdout
    let stdout: Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be the JSON report");
    assert_eq!(stdout["summary"], report["summary"]);

    let filtered_path = env.work.join("flows-filtered.json");
    let filter_args = [
        "--report",
        report_path.to_str().unwrap(),
        "--start",
        "2025-09-17T18:50:01.5Z",
        "--end",
        "1758135002.9",
        "--showtime",
    ];
    let filtered = run_bin(&env, "s1flow-filter", &filter_args);
    assert_success("s1flow-filter", &filter_args, &filtered);

    let filter_stderr = String::from_utf8_lossy(&filtered.stderr);
    assert!(
        filter_stderr.contains("Kept 1 of 3 session(s)"),
        "stderr:\n{filter_stderr}"
    );

    let narrowed = read_json(&filtered_path);
    assert_eq!(narrowed["summary"]["total_sessions"], 1);
    assert_eq!(narrowed["sessions"][0]["flow_no"], 1);
    assert_eq!(narrowed["sessions"][0]["status"], "failure");
    assert_eq!(
        narrowed["sessions"][0]["start_time"],
        "2025-09-17T18:50:02.000Z"
    );
    assert!(
        narrowed["sessions"][0].get("frames").is_none(),
        "frames are dropped without --showframenum"
    );
}

#[test]
fn s1flow_text_output_summarises_sessions() {
    let env = CliTestEnv::new();
    let capture = env.capture();
    let args = [capture.to_str().unwrap(), "--format", "text"];

    let output = run_bin(&env, "s1flow", &args);
    assert_success("s1flow", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 session(s): 1 success, 1 failure, 1 incomplete"));
    assert!(stdout.contains("abnormal cause 'radio-connection-with-ue-lost'"));
    assert!(stdout.contains("procedures: attach, generic-release"));
}

#[test]
fn s1flow_csv_output_has_one_row_per_session() {
    let env = CliTestEnv::new();
    let capture = env.capture();
    let args = [capture.to_str().unwrap(), "--format", "csv"];

    let output = run_bin(&env, "s1flow", &args);
    assert_success("s1flow", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4, "header plus three sessions:\n{stdout}");
    assert!(lines[0].starts_with("flow_no,session_id"));
}

#[test]
fn s1flow_fails_on_missing_input() {
    let env = CliTestEnv::new();
    let missing = env.work.join("no-such-capture.csv");
    let output = run_bin(&env, "s1flow", &[missing.to_str().unwrap()]);

    assert!(!output.status.success());
}

#[test]
fn s1flow_rejects_invalid_config() {
    let env = CliTestEnv::new();
    env.write_config("[classifier]\ndisabled_procedures = [\"teleport\"]\n");
    let capture = env.capture();

    let output = run_bin(&env, "s1flow", &[capture.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("teleport"), "stderr:\n{stderr}");
}

#[test]
fn s1flow_filter_rejects_inverted_window() {
    let env = CliTestEnv::new();
    let capture = env.capture();
    let report_path = env.work.join("flows.json");
    let args = [
        capture.to_str().unwrap(),
        "--out",
        report_path.to_str().unwrap(),
    ];
    assert_success("s1flow", &args, &run_bin(&env, "s1flow", &args));

    let output = run_bin(
        &env,
        "s1flow-filter",
        &[
            "--report",
            report_path.to_str().unwrap(),
            "--start",
            "1758135005",
            "--end",
            "1758135001",
        ],
    );

    assert!(!output.status.success());
}
