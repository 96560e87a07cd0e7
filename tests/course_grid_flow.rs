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
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "request {} failed: {}",
        method,
        value
    );
    value.get("result").cloned().expect("result")
}

fn stats(view: &serde_json::Value) -> &serde_json::Value {
    view.get("stats").expect("stats")
}

fn grid_rows<'a>(view: &'a serde_json::Value, grid: &str) -> &'a Vec<serde_json::Value> {
    view.get(grid)
        .and_then(|g| g.get("rows"))
        .and_then(|v| v.as_array())
        .expect("grid rows")
}

fn row_ids(view: &serde_json::Value, grid: &str) -> Vec<String> {
    grid_rows(view, grid)
        .iter()
        .map(|r| {
            r.get("id")
                .and_then(|v| v.as_str())
                .expect("row id")
                .to_string()
        })
        .collect()
}

fn alerts(result: &serde_json::Value) -> Vec<String> {
    result
        .get("alerts")
        .and_then(|v| v.as_array())
        .map(|a| {
            a.iter()
                .map(|v| v.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn edits_reorders_and_stats_survive_reselection() {
    let workspace = temp_dir("gradetrack-flow");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created_a = request(
        &mut stdin,
        &mut reader,
        "2",
        "courses.create",
        json!({ "name": "Analysis I", "semester": "WS 25/26", "credits": 9 }),
    );
    let course_a = created_a
        .get("course")
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .expect("course id")
        .to_string();
    let created_b = request(
        &mut stdin,
        &mut reader,
        "3",
        "courses.create",
        json!({ "name": "Algebra" }),
    );
    let course_b = created_b
        .get("course")
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .expect("course id")
        .to_string();

    let selected = request(
        &mut stdin,
        &mut reader,
        "4",
        "ui.selectCourse",
        json!({ "courseId": course_a }),
    );
    let view = selected.get("view").expect("view");
    assert_eq!(
        view.get("header").and_then(|h| h.get("name")).and_then(|v| v.as_str()),
        Some("Analysis I")
    );
    assert_eq!(
        view.get("header").and_then(|h| h.get("credits")).and_then(|v| v.as_str()),
        Some("9 ECTS")
    );
    assert_eq!(
        stats(view).get("totalPoints").and_then(|v| v.as_str()),
        Some("0.00 / 0.00")
    );
    assert_eq!(
        stats(view).get("averageGrade").and_then(|v| v.as_str()),
        Some("-")
    );

    // Two exercises with defaults (0 / 10), numbered 1 and 2.
    let _ = request(&mut stdin, &mut reader, "5", "ui.addExercise", json!({}));
    let added = request(&mut stdin, &mut reader, "6", "ui.addExercise", json!({}));
    let view = added.get("view").expect("view");
    let rows = grid_rows(view, "exerciseGrid");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("exercise_number").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(rows[1].get("exercise_number").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(
        stats(view).get("totalPoints").and_then(|v| v.as_str()),
        Some("0.00 / 20.00")
    );
    assert_eq!(
        stats(view).get("exercisePercentage").and_then(|v| v.as_str()),
        Some("0.00%")
    );

    let edited = request(
        &mut stdin,
        &mut reader,
        "7",
        "grid.editCell",
        json!({ "collection": "exercises", "rowIndex": 0, "field": "points_earned", "value": 9 }),
    );
    assert!(alerts(&edited).is_empty());
    let _ = request(
        &mut stdin,
        &mut reader,
        "8",
        "grid.editCell",
        json!({ "collection": "exercises", "rowIndex": 1, "field": "points_earned", "value": 3 }),
    );
    let edited = request(
        &mut stdin,
        &mut reader,
        "9",
        "grid.editCell",
        json!({ "collection": "exercises", "rowIndex": 1, "field": "points_possible", "value": 5 }),
    );
    let view = edited.get("view").expect("view");
    assert_eq!(
        stats(view).get("totalPoints").and_then(|v| v.as_str()),
        Some("12.00 / 15.00")
    );
    assert_eq!(
        stats(view).get("exercisePercentage").and_then(|v| v.as_str()),
        Some("80.00%")
    );

    // Exams: fresh ones have no grade, so averages stay "-" until graded.
    let _ = request(&mut stdin, &mut reader, "10", "ui.addExam", json!({}));
    let added = request(&mut stdin, &mut reader, "11", "ui.addExam", json!({}));
    let view = added.get("view").expect("view");
    assert_eq!(grid_rows(view, "examGrid").len(), 2);
    assert_eq!(
        stats(view).get("averageGrade").and_then(|v| v.as_str()),
        Some("-")
    );
    assert_eq!(
        stats(view).get("weightedAverage").and_then(|v| v.as_str()),
        Some("-")
    );

    let _ = request(
        &mut stdin,
        &mut reader,
        "12",
        "grid.editCell",
        json!({ "collection": "exams", "rowIndex": 0, "field": "grade", "value": 80 }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "13",
        "grid.editCell",
        json!({ "collection": "exams", "rowIndex": 1, "field": "grade", "value": 90 }),
    );
    let edited = request(
        &mut stdin,
        &mut reader,
        "14",
        "grid.editCell",
        json!({ "collection": "exams", "rowIndex": 1, "field": "weight", "value": 3 }),
    );
    let view = edited.get("view").expect("view");
    assert_eq!(
        stats(view).get("averageGrade").and_then(|v| v.as_str()),
        Some("85.00")
    );
    assert_eq!(
        stats(view).get("weightedAverage").and_then(|v| v.as_str()),
        Some("87.50")
    );

    // Reverse the exercise order; the new order must persist.
    let ids = row_ids(view, "exerciseGrid");
    let reversed: Vec<&str> = ids.iter().rev().map(|s| s.as_str()).collect();
    let reordered = request(
        &mut stdin,
        &mut reader,
        "15",
        "grid.reorderRows",
        json!({ "collection": "exercises", "ids": reversed }),
    );
    assert!(alerts(&reordered).is_empty());
    let view = reordered.get("view").expect("view");
    assert_eq!(row_ids(view, "exerciseGrid"), {
        let mut r = ids.clone();
        r.reverse();
        r
    });

    // Switch away and back; everything reloads from the database.
    let _ = request(
        &mut stdin,
        &mut reader,
        "16",
        "ui.selectCourse",
        json!({ "courseId": course_b }),
    );
    let reselected = request(
        &mut stdin,
        &mut reader,
        "17",
        "ui.selectCourse",
        json!({ "courseId": course_a }),
    );
    let view = reselected.get("view").expect("view");
    let rows = grid_rows(view, "exerciseGrid");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("exercise_number").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(rows[0].get("points_earned").and_then(|v| v.as_f64()), Some(3.0));
    assert_eq!(rows[1].get("exercise_number").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(rows[1].get("points_earned").and_then(|v| v.as_f64()), Some(9.0));
    assert_eq!(
        stats(view).get("totalPoints").and_then(|v| v.as_str()),
        Some("12.00 / 15.00")
    );
    assert_eq!(
        stats(view).get("weightedAverage").and_then(|v| v.as_str()),
        Some("87.50")
    );

    // Overview reflects per-course row counts.
    let overview = request(&mut stdin, &mut reader, "18", "ui.showOverview", json!({}));
    let entries = overview
        .get("view")
        .and_then(|v| v.get("overview"))
        .and_then(|v| v.as_array())
        .expect("overview entries");
    assert_eq!(entries.len(), 2);
    let a = entries
        .iter()
        .find(|e| e.get("id").and_then(|v| v.as_str()) == Some(course_a.as_str()))
        .expect("course entry");
    assert_eq!(a.get("exerciseCount").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(a.get("examCount").and_then(|v| v.as_i64()), Some(2));
    let b = entries
        .iter()
        .find(|e| e.get("id").and_then(|v| v.as_str()) == Some(course_b.as_str()))
        .expect("course entry");
    assert_eq!(b.get("exerciseCount").and_then(|v| v.as_i64()), Some(0));

    // Deleting the selected course needs confirmation, then lands on welcome.
    let _ = request(
        &mut stdin,
        &mut reader,
        "19",
        "ui.selectCourse",
        json!({ "courseId": course_a }),
    );
    let declined = request(
        &mut stdin,
        &mut reader,
        "20",
        "ui.deleteCourse",
        json!({ "confirm": false }),
    );
    assert_eq!(
        declined
            .get("view")
            .and_then(|v| v.get("view"))
            .and_then(|v| v.as_str()),
        Some("course")
    );
    let deleted = request(
        &mut stdin,
        &mut reader,
        "21",
        "ui.deleteCourse",
        json!({ "confirm": true }),
    );
    assert_eq!(
        deleted
            .get("view")
            .and_then(|v| v.get("view"))
            .and_then(|v| v.as_str()),
        Some("welcome")
    );
    let listed = request(&mut stdin, &mut reader, "22", "courses.list", json!({}));
    let remaining = listed
        .get("courses")
        .and_then(|v| v.as_array())
        .expect("courses array");
    assert_eq!(remaining.len(), 1);
    assert_eq!(
        remaining[0].get("name").and_then(|v| v.as_str()),
        Some("Algebra")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
