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
    let exe = env!("CARGO_BIN_EXE_gradetrackd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradetrackd");
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
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

fn result(value: &serde_json::Value) -> &serde_json::Value {
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "request failed: {}",
        value
    );
    value.get("result").expect("result")
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("gradetrack-router-smoke");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(result(&health).get("version").is_some());

    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created = request(
        &mut stdin,
        &mut reader,
        "3",
        "courses.create",
        json!({ "name": "Analysis I", "semester": "WS 25/26", "credits": 9 }),
    );
    let course_id = result(&created)
        .get("course")
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .expect("course id")
        .to_string();

    let listed = request(&mut stdin, &mut reader, "4", "courses.list", json!({}));
    let courses = result(&listed)
        .get("courses")
        .and_then(|v| v.as_array())
        .expect("courses array");
    assert_eq!(courses.len(), 1);

    let _ = request(
        &mut stdin,
        &mut reader,
        "5",
        "courses.update",
        json!({ "courseId": course_id, "name": "Analysis I", "semester": "WS 25/26", "credits": 10 }),
    );

    let selected = request(
        &mut stdin,
        &mut reader,
        "6",
        "ui.selectCourse",
        json!({ "courseId": course_id }),
    );
    assert_eq!(
        result(&selected)
            .get("view")
            .and_then(|v| v.get("view"))
            .and_then(|v| v.as_str()),
        Some("course")
    );

    let _ = request(
        &mut stdin,
        &mut reader,
        "7",
        "ui.switchTab",
        json!({ "tab": "exams" }),
    );
    let _ = request(&mut stdin, &mut reader, "8", "ui.addExercise", json!({}));
    let added = request(&mut stdin, &mut reader, "9", "ui.addExam", json!({}));
    let view = result(&added).get("view").expect("view");
    let exam_rows = view
        .get("examGrid")
        .and_then(|g| g.get("rows"))
        .and_then(|v| v.as_array())
        .expect("exam rows");
    assert_eq!(exam_rows.len(), 1);
    let exam_id = exam_rows[0]
        .get("id")
        .and_then(|v| v.as_str())
        .expect("exam id")
        .to_string();

    let _ = request(
        &mut stdin,
        &mut reader,
        "10",
        "grid.editCell",
        json!({ "collection": "exercises", "rowIndex": 0, "field": "points_earned", "value": 8.5 }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "11",
        "grid.reorderRows",
        json!({ "collection": "exams", "ids": [exam_id] }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "12",
        "grid.deleteRow",
        json!({ "collection": "exams", "rowIndex": 0 }),
    );

    let overview = request(&mut stdin, &mut reader, "13", "ui.showOverview", json!({}));
    assert_eq!(
        result(&overview)
            .get("view")
            .and_then(|v| v.get("view"))
            .and_then(|v| v.as_str()),
        Some("overview")
    );

    let _ = request(&mut stdin, &mut reader, "14", "ui.view", json!({}));

    let _ = request(
        &mut stdin,
        &mut reader,
        "15",
        "ui.selectCourse",
        json!({ "courseId": course_id }),
    );
    let deleted = request(
        &mut stdin,
        &mut reader,
        "16",
        "ui.deleteCourse",
        json!({ "confirm": true }),
    );
    assert_eq!(
        result(&deleted)
            .get("view")
            .and_then(|v| v.get("view"))
            .and_then(|v| v.as_str()),
        Some("welcome")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn methods_requiring_a_workspace_fail_cleanly_without_one() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(&mut stdin, &mut reader, "1", "ui.addExercise", json!({}));
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("no_workspace")
    );

    let listed = request(&mut stdin, &mut reader, "2", "courses.list", json!({}));
    let courses = result(&listed)
        .get("courses")
        .and_then(|v| v.as_array())
        .expect("courses array");
    assert!(courses.is_empty());

    drop(stdin);
    let _ = child.wait();
}
