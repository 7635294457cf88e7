//! End-to-end tests for the `qna` binary.
//!
//! Each test gets its own HOME and database so settings and data never
//! leak between runs. Stdout is not a terminal under the harness, so
//! every command answers in JSON.

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Sandbox {
    home: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
        }
    }

    fn db(&self) -> PathBuf {
        self.home.path().join("qna.db")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.home.path().join(name)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("qna").unwrap();
        cmd.env("HOME", self.home.path())
            .env_remove("QNA_TEST_DB")
            .env_remove("QNA_DB")
            .env_remove("QNA_CSV_CHARSET")
            .env_remove("QNA_EXPORT_FLAT")
            .env_remove("RUST_LOG")
            .arg("--db")
            .arg(self.db());
        cmd
    }

    fn init(&self) {
        self.cmd().arg("init").assert().success();
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let output = self.cmd().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "qna {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn import(&self, file: &Path) -> Value {
        self.run_json(&["import", file.to_str().unwrap()])
    }
}

#[test]
fn version_reports_schema() {
    let sandbox = Sandbox::new();
    let output = sandbox.run_json(&["version"]);
    assert_eq!(output["schema"], 1);
}

#[test]
fn init_twice_fails_with_exit_code_2() {
    let sandbox = Sandbox::new();
    sandbox.init();
    assert!(sandbox.db().exists());
    assert!(sandbox.path(".qna/config.json").exists());

    sandbox.cmd().arg("init").assert().failure().code(2);
    sandbox.cmd().args(["init", "--force"]).assert().success();
}

#[test]
fn commands_require_init() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["entry", "list"]).assert().failure().code(2);
}

#[test]
fn entry_add_then_get() {
    let sandbox = Sandbox::new();
    sandbox.init();

    let added = sandbox.run_json(&[
        "entry", "add", "opening hours", "when are you open", "--answer", "9 to 5",
    ]);
    let id = added["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("qna_"));

    let fetched = sandbox.run_json(&["entry", "get", "--id", &id]);
    assert_eq!(fetched["questions"][1], "when are you open");
    assert_eq!(fetched["action"], "text");
    assert_eq!(fetched["answerText"], "9 to 5");
    assert_eq!(fetched["enabled"], true);
}

#[test]
fn entry_list_as_csv_quotes_fields() {
    let sandbox = Sandbox::new();
    sandbox.init();
    sandbox.run_json(&["entry", "add", "hours?", "--answer", "9 to 5, weekdays"]);

    let output = sandbox
        .cmd()
        .args(["entry", "list", "--format", "csv"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("id,action,enabled,questions,answer,answer2"));
    let row = lines.next().unwrap();
    assert!(row.ends_with(",text,true,hours?,\"9 to 5, weekdays\","));
}

#[test]
fn entry_add_rejects_missing_answer() {
    let sandbox = Sandbox::new();
    sandbox.init();

    sandbox
        .cmd()
        .args(["entry", "add", "hello", "--action", "redirect"])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn unknown_entry_exits_with_3() {
    let sandbox = Sandbox::new();
    sandbox.init();

    let output = sandbox
        .cmd()
        .args(["entry", "get", "qna_000000000000"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));

    let error: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["error"]["code"], "ENTRY_NOT_FOUND");
}

#[test]
fn import_twice_creates_nothing_the_second_time() {
    let sandbox = Sandbox::new();
    sandbox.init();

    let file = sandbox.path("faq.json");
    fs::write(
        &file,
        r#"[
            {"questions": ["hours?", "open when"], "action": "text", "answer": "9 to 5"},
            {"question": "human please", "action": "redirect", "answer": "handoff.flow.json#agent"}
        ]"#,
    )
    .unwrap();

    let first = sandbox.import(&file);
    assert_eq!(first["ids"].as_array().unwrap().len(), 2);

    let second = sandbox.import(&file);
    assert!(second["ids"].as_array().unwrap().is_empty());
    assert_eq!(second["skipped"], 2);

    let listed = sandbox.run_json(&["entry", "list"]);
    assert_eq!(listed["total"], 2);
}

#[test]
fn invalid_import_writes_nothing() {
    let sandbox = Sandbox::new();
    sandbox.init();

    let file = sandbox.path("bad.json");
    fs::write(
        &file,
        r#"[{"question": "ok", "action": "text", "answer": "fine"}, {"question": "x", "action": "launch"}]"#,
    )
    .unwrap();

    sandbox
        .cmd()
        .args(["import", file.to_str().unwrap()])
        .assert()
        .failure()
        .code(4);

    let listed = sandbox.run_json(&["entry", "list"]);
    assert_eq!(listed["total"], 0);
}

#[test]
fn csv_export_round_trips() {
    let sandbox = Sandbox::new();
    sandbox.init();
    sandbox.run_json(&["entry", "add", "a", "b", "--answer", "same, answer"]);
    sandbox.run_json(&[
        "entry", "add", "refund", "--action", "text_redirect", "--answer", "Sure", "--flow",
        "refund.flow.json",
    ]);

    let out = sandbox.path("backup/faq.csv");
    let exported = sandbox.run_json(&["export", out.to_str().unwrap()]);
    assert_eq!(exported["stats"]["records"], 3);

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("question,action,answer,answer2\n"));
    assert!(text.contains("refund,text_redirect,Sure,refund.flow.json"));

    let again = sandbox.import(&out);
    assert!(again["ids"].as_array().unwrap().is_empty());
}

#[test]
fn gate_check_uses_configured_rules() {
    let sandbox = Sandbox::new();
    fs::create_dir_all(sandbox.path(".qna")).unwrap();
    fs::write(
        sandbox.path(".qna/config.json"),
        r#"{"intercept": {"skipChannels": ["sms"], "skipWhenFlag": "handoff.active"}}"#,
    )
    .unwrap();

    let skipped = sandbox.run_json(&[
        "gate",
        "check",
        "--event",
        r#"{"channel":"SMS","sessionId":"s1","userId":"u1","text":"hi"}"#,
    ]);
    assert_eq!(skipped["decision"], "skip");
    assert_eq!(skipped["rule"], "channel:SMS");

    let flagged = sandbox.run_json(&[
        "gate",
        "check",
        "--event",
        r#"{"channel":"web","sessionId":"s1","userId":"u1","text":"hi"}"#,
        "--state",
        r#"{"handoff":{"active":true}}"#,
    ]);
    assert_eq!(flagged["decision"], "skip");

    let processed = sandbox.run_json(&[
        "gate",
        "check",
        "--event",
        r#"{"channel":"web","sessionId":"s1","userId":"u1","text":"hi"}"#,
    ]);
    assert_eq!(processed["decision"], "process");
    assert!(processed.get("rule").is_none());
}
