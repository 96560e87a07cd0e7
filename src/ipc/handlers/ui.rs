use serde_json::json;

use super::RequestPrompt;
use crate::app::Tab;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn handle_view(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(&req.id, json!({ "view": tracker.view_model() }))
}

fn handle_select_course(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };
    match tracker.select_course_by_id(&course_id) {
        Ok(()) => ok(&req.id, json!({ "view": tracker.view_model() })),
        Err(e) => err(&req.id, e.code, e.message, None),
    }
}

fn handle_show_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    tracker.show_overview();
    ok(&req.id, json!({ "view": tracker.view_model() }))
}

fn handle_switch_tab(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let tab = match req
        .params
        .get("tab")
        .and_then(|v| v.as_str())
        .and_then(Tab::parse)
    {
        Some(t) => t,
        None => {
            return err(
                &req.id,
                "bad_params",
                "tab must be one of: exercises, exams",
                None,
            )
        }
    };
    tracker.switch_tab(tab);
    ok(&req.id, json!({ "view": tracker.view_model() }))
}

fn handle_add_exercise(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut prompt = RequestPrompt::new(false);
    tracker.add_exercise(&mut prompt);
    ok(
        &req.id,
        json!({ "view": tracker.view_model(), "alerts": prompt.alerts }),
    )
}

fn handle_add_exam(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut prompt = RequestPrompt::new(false);
    tracker.add_exam(&mut prompt);
    ok(
        &req.id,
        json!({ "view": tracker.view_model(), "alerts": prompt.alerts }),
    )
}

fn handle_delete_course(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    // The front-end shows the confirmation dialog and sends the answer along.
    let confirmed = req
        .params
        .get("confirm")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let mut prompt = RequestPrompt::new(confirmed);
    tracker.delete_current_course(&mut prompt);
    ok(
        &req.id,
        json!({ "view": tracker.view_model(), "alerts": prompt.alerts }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "ui.view" => Some(handle_view(state, req)),
        "ui.selectCourse" => Some(handle_select_course(state, req)),
        "ui.showOverview" => Some(handle_show_overview(state, req)),
        "ui.switchTab" => Some(handle_switch_tab(state, req)),
        "ui.addExercise" => Some(handle_add_exercise(state, req)),
        "ui.addExam" => Some(handle_add_exam(state, req)),
        "ui.deleteCourse" => Some(handle_delete_course(state, req)),
        _ => None,
    }
}
