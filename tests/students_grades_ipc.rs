use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .env_remove("GRADEBOOKD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(resp: &serde_json::Value) -> Option<&str> {
    resp.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn select_builtin(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    prefix: &str,
) -> PathBuf {
    let workspace = temp_dir(prefix);
    request_ok(
        stdin,
        reader,
        "select",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    workspace
}

#[test]
fn requests_before_workspace_select_are_refused() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health["workspacePath"].is_null());
    assert!(health["store"].is_null());

    for (i, method) in [
        "students.list",
        "students.create",
        "grades.record",
        "grades.get",
        "report.get",
        "curriculum.get",
    ]
    .iter()
    .enumerate()
    {
        let resp = request(
            &mut stdin,
            &mut reader,
            &format!("n{}", i),
            method,
            json!({ "name": "Ann", "subjectKey": "ING05-ICY-Maths|Maths", "value": 10 }),
        );
        assert_eq!(error_code(&resp), Some("no_workspace"), "{}", method);
    }

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn student_lifecycle_errors_leave_the_table_unchanged() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_builtin(&mut stdin, &mut reader, "gradebookd-lifecycle");

    let curriculum = request_ok(&mut stdin, &mut reader, "1", "curriculum.get", json!({}));
    let keys = curriculum["subjectKeys"].as_array().expect("subjectKeys");
    assert_eq!(keys.len(), 7);
    assert_eq!(keys[1].as_str(), Some("ING05-ICY-Maths|Maths"));

    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "name": "Ann" }),
    );

    let dup = request(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "name": "Ann" }),
    );
    assert_eq!(error_code(&dup), Some("duplicate_student"));
    assert_eq!(dup["error"]["details"]["kind"].as_str(), Some("state"));

    let blank = request(
        &mut stdin,
        &mut reader,
        "4",
        "students.create",
        json!({ "name": "   " }),
    );
    assert_eq!(error_code(&blank), Some("empty_name"));

    let missing = request(&mut stdin, &mut reader, "5", "students.create", json!({}));
    assert_eq!(error_code(&missing), Some("bad_params"));

    let unknown_student = request(
        &mut stdin,
        &mut reader,
        "6",
        "grades.record",
        json!({ "name": "Zed", "subjectKey": "ING05-ICY-Maths|Maths", "value": 12 }),
    );
    assert_eq!(error_code(&unknown_student), Some("unknown_student"));

    let unknown_subject = request(
        &mut stdin,
        &mut reader,
        "7",
        "grades.record",
        json!({ "name": "Ann", "subjectKey": "ING05-ICY-Maths|Physics", "value": 12 }),
    );
    assert_eq!(error_code(&unknown_subject), Some("unknown_subject"));
    assert_eq!(
        unknown_subject["error"]["details"]["kind"].as_str(),
        Some("validation")
    );

    let too_high = request(
        &mut stdin,
        &mut reader,
        "8",
        "grades.record",
        json!({ "name": "Ann", "subjectKey": "ING05-ICY-Maths|Maths", "value": 21 }),
    );
    assert_eq!(error_code(&too_high), Some("out_of_range"));

    let negative = request(
        &mut stdin,
        &mut reader,
        "9",
        "grades.record",
        json!({ "name": "Ann", "subjectKey": "ING05-ICY-Maths|Maths", "value": "-0.5" }),
    );
    assert_eq!(error_code(&negative), Some("out_of_range"));

    let text = request(
        &mut stdin,
        &mut reader,
        "10",
        "grades.record",
        json!({ "name": "Ann", "subjectKey": "ING05-ICY-Maths|Maths", "value": "abc" }),
    );
    assert_eq!(error_code(&text), Some("non_numeric"));

    let no_value = request(
        &mut stdin,
        &mut reader,
        "11",
        "grades.record",
        json!({ "name": "Ann", "subjectKey": "ING05-ICY-Maths|Maths" }),
    );
    assert_eq!(error_code(&no_value), Some("bad_params"));

    // Nothing above touched the stored table.
    let list = request_ok(&mut stdin, &mut reader, "12", "students.list", json!({}));
    assert_eq!(list["count"].as_u64(), Some(1));
    assert_eq!(list["students"][0].as_str(), Some("Ann"));
    let cell = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "grades.get",
        json!({ "name": "Ann", "subjectKey": "ING05-ICY-Maths|Maths" }),
    );
    assert!(cell["value"].is_null());

    // Boundaries are accepted.
    for (id, value) in [("14", json!(0)), ("15", json!(20))] {
        request_ok(
            &mut stdin,
            &mut reader,
            id,
            "grades.record",
            json!({ "name": "Ann", "subjectKey": "ING05-ICY-Maths|Maths", "value": value }),
        );
    }

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn invalid_curriculum_leaves_no_workspace_open() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_builtin(&mut stdin, &mut reader, "gradebookd-config-good");

    let dir = temp_dir("gradebookd-config-bad");
    let bad = dir.join("curriculum.json");
    std::fs::write(
        &bad,
        r#"{ "units": [ { "id": "A|B", "coefficient": 1, "subjects": [ { "id": "s", "coefficient": 1 } ] } ] }"#,
    )
    .expect("write curriculum");

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": dir.to_string_lossy(), "curriculumPath": bad.to_string_lossy() }),
    );
    assert_eq!(error_code(&resp), Some("config_invalid"));

    let zero = dir.join("zero.json");
    std::fs::write(
        &zero,
        r#"{ "units": [ { "id": "A", "coefficient": 0, "subjects": [ { "id": "s", "coefficient": 1 } ] } ] }"#,
    )
    .expect("write curriculum");
    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": dir.to_string_lossy(), "curriculumPath": zero.to_string_lossy() }),
    );
    assert_eq!(error_code(&resp), Some("config_invalid"));

    let bad_store = request(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": dir.to_string_lossy(), "store": "parquet" }),
    );
    assert_eq!(error_code(&bad_store), Some("bad_params"));

    let after = request(&mut stdin, &mut reader, "4", "students.list", json!({}));
    assert_eq!(error_code(&after), Some("no_workspace"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn bad_startup_workspace_exits_with_code_2() {
    let dir = temp_dir("gradebookd-startup-bad");
    std::fs::write(dir.join("gradebook.json"), r#"{ "curriculum": { "units": [] } }"#)
        .expect("write config");

    let status = Command::new(env!("CARGO_BIN_EXE_gradebookd"))
        .env("GRADEBOOKD_WORKSPACE", &dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("run gradebookd");
    assert_eq!(status.code(), Some(2));
}

#[test]
fn startup_workspace_is_open_before_first_request() {
    let dir = temp_dir("gradebookd-startup-good");
    let mut child = Command::new(env!("CARGO_BIN_EXE_gradebookd"))
        .env("GRADEBOOKD_WORKSPACE", &dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let mut stdin = child.stdin.take().expect("child stdin");
    let mut reader = BufReader::new(child.stdout.take().expect("child stdout"));

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["store"].as_str(), Some("sqlite"));
    let list = request_ok(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(list["count"].as_u64(), Some(0));

    drop(stdin);
    let _ = child.wait();
}
