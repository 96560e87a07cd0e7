use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::CourseFields;

fn parse_course_fields(params: &serde_json::Value) -> Result<CourseFields, &'static str> {
    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or("missing name")?
        .to_string();
    let semester = params
        .get("semester")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let credits = params.get("credits").and_then(|v| v.as_i64());
    Ok(CourseFields {
        name,
        semester,
        credits,
    })
}

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_ref() else {
        return ok(&req.id, json!({ "courses": [] }));
    };
    match tracker.course_list() {
        Ok(courses) => ok(&req.id, json!({ "courses": courses })),
        Err(e) => err(&req.id, e.code, e.message, None),
    }
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let fields = match parse_course_fields(&req.params) {
        Ok(f) => f,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match tracker.create_course(&fields) {
        Ok(course) => ok(
            &req.id,
            json!({ "course": course, "view": tracker.view_model() }),
        ),
        Err(e) => err(&req.id, e.code, e.message, None),
    }
}

fn handle_courses_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };
    let fields = match parse_course_fields(&req.params) {
        Ok(f) => f,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match tracker.update_course(&course_id, &fields) {
        Ok(course) => ok(
            &req.id,
            json!({ "course": course, "view": tracker.view_model() }),
        ),
        Err(e) => err(&req.id, e.code, e.message, None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_courses_list(state, req)),
        "courses.create" => Some(handle_courses_create(state, req)),
        "courses.update" => Some(handle_courses_update(state, req)),
        _ => None,
    }
}
