use crate::ipc::error::{core_err, ok};
use crate::ipc::helpers::{gradebook_mut, required_f64, required_str, try_resp};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_grade_bands_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let gb = try_resp!(gradebook_mut(state, req));
    ok(
        &req.id,
        json!({ "gradeBands": gb.grade_bands(), "letterGrade": gb.letter_grade() }),
    )
}

fn handle_grade_bands_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let letter = try_resp!(required_str(req, "letter"));
    let min = try_resp!(required_f64(req, "min"));
    let max = try_resp!(required_f64(req, "max"));
    let gb = try_resp!(gradebook_mut(state, req));
    match gb.set_grade_band(letter, min, max) {
        Ok(()) => ok(
            &req.id,
            json!({ "gradeBands": gb.grade_bands(), "letterGrade": gb.letter_grade() }),
        ),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_grade_bands_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let letter = try_resp!(required_str(req, "letter"));
    let gb = try_resp!(gradebook_mut(state, req));
    match gb.remove_grade_band(letter) {
        Ok(removed) => ok(
            &req.id,
            json!({
                "removed": removed,
                "gradeBands": gb.grade_bands(),
                "letterGrade": gb.letter_grade(),
            }),
        ),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "gradeBands.list" => Some(handle_grade_bands_list(state, req)),
        "gradeBands.set" => Some(handle_grade_bands_set(state, req)),
        "gradeBands.remove" => Some(handle_grade_bands_remove(state, req)),
        _ => None,
    }
}
