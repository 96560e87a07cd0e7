use std::collections::HashMap;

use serde_json::json;

use super::RequestPrompt;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

#[derive(Clone, Copy, PartialEq)]
enum Collection {
    Exercises,
    Exams,
}

fn parse_collection(params: &serde_json::Value) -> Option<Collection> {
    match params.get("collection").and_then(|v| v.as_str()) {
        Some("exercises") => Some(Collection::Exercises),
        Some("exams") => Some(Collection::Exams),
        _ => None,
    }
}

fn parse_row_index(params: &serde_json::Value) -> Option<usize> {
    params
        .get("rowIndex")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
}

fn handle_edit_cell(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(collection) = parse_collection(&req.params) else {
        return err(&req.id, "bad_params", "missing/invalid collection", None);
    };
    let Some(row_index) = parse_row_index(&req.params) else {
        return err(&req.id, "bad_params", "missing/invalid rowIndex", None);
    };
    let field = match req.params.get("field").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing field", None),
    };
    let value = req
        .params
        .get("value")
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    let mut prompt = RequestPrompt::new(false);
    let result = match collection {
        Collection::Exercises => tracker.edit_exercise_cell(row_index, &field, &value, &mut prompt),
        Collection::Exams => tracker.edit_exam_cell(row_index, &field, &value, &mut prompt),
    };
    match result {
        Ok(()) => ok(
            &req.id,
            json!({ "view": tracker.view_model(), "alerts": prompt.alerts }),
        ),
        Err(e) => err(&req.id, "bad_params", e.message, None),
    }
}

fn handle_delete_row(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(collection) = parse_collection(&req.params) else {
        return err(&req.id, "bad_params", "missing/invalid collection", None);
    };
    let Some(row_index) = parse_row_index(&req.params) else {
        return err(&req.id, "bad_params", "missing/invalid rowIndex", None);
    };

    let mut prompt = RequestPrompt::new(false);
    let result = match collection {
        Collection::Exercises => tracker.delete_exercise_row(row_index, &mut prompt),
        Collection::Exams => tracker.delete_exam_row(row_index, &mut prompt),
    };
    match result {
        Ok(()) => ok(
            &req.id,
            json!({ "view": tracker.view_model(), "alerts": prompt.alerts }),
        ),
        Err(e) => err(&req.id, "bad_params", e.message, None),
    }
}

/// The grid hands back the entire reordered array; on the wire that is the
/// full id sequence, which must be a permutation of the current rows.
fn handle_reorder_rows(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(collection) = parse_collection(&req.params) else {
        return err(&req.id, "bad_params", "missing/invalid collection", None);
    };
    let Some(ids_arr) = req.params.get("ids").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing ids[]", None);
    };
    let mut ids: Vec<&str> = Vec::with_capacity(ids_arr.len());
    for v in ids_arr {
        match v.as_str() {
            Some(s) => ids.push(s),
            None => return err(&req.id, "bad_params", "ids must be strings", None),
        }
    }

    let mut prompt = RequestPrompt::new(false);
    match collection {
        Collection::Exercises => {
            let mut by_id: HashMap<&str, crate::model::Exercise> = tracker
                .exercises()
                .iter()
                .map(|r| (r.id.as_str(), r.clone()))
                .collect();
            if ids.len() != by_id.len() {
                return err(
                    &req.id,
                    "bad_params",
                    "ids must be a permutation of the current rows",
                    Some(json!({ "expected": by_id.len(), "got": ids.len() })),
                );
            }
            let mut reordered = Vec::with_capacity(ids.len());
            for id in &ids {
                match by_id.remove(id) {
                    Some(row) => reordered.push(row),
                    None => {
                        return err(
                            &req.id,
                            "bad_params",
                            "ids must be a permutation of the current rows",
                            Some(json!({ "id": id })),
                        )
                    }
                }
            }
            tracker.reorder_exercises(reordered, &mut prompt);
        }
        Collection::Exams => {
            let mut by_id: HashMap<&str, crate::model::Exam> = tracker
                .exams()
                .iter()
                .map(|r| (r.id.as_str(), r.clone()))
                .collect();
            if ids.len() != by_id.len() {
                return err(
                    &req.id,
                    "bad_params",
                    "ids must be a permutation of the current rows",
                    Some(json!({ "expected": by_id.len(), "got": ids.len() })),
                );
            }
            let mut reordered = Vec::with_capacity(ids.len());
            for id in &ids {
                match by_id.remove(id) {
                    Some(row) => reordered.push(row),
                    None => {
                        return err(
                            &req.id,
                            "bad_params",
                            "ids must be a permutation of the current rows",
                            Some(json!({ "id": id })),
                        )
                    }
                }
            }
            tracker.reorder_exams(reordered, &mut prompt);
        }
    }

    ok(
        &req.id,
        json!({ "view": tracker.view_model(), "alerts": prompt.alerts }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grid.editCell" => Some(handle_edit_cell(state, req)),
        "grid.deleteRow" => Some(handle_delete_row(state, req)),
        "grid.reorderRows" => Some(handle_reorder_rows(state, req)),
        _ => None,
    }
}
