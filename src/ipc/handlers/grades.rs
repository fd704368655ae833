use crate::ipc::error::{core_err, ok};
use crate::ipc::helpers::{
    gradebook_mut, optional_date, required_f64, required_str, summary_json, try_resp,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_grades_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let category = try_resp!(required_str(req, "categoryName"));
    let name = try_resp!(required_str(req, "name"));
    let score = try_resp!(required_f64(req, "score"));
    let date = try_resp!(optional_date(req, "date"));
    let gb = try_resp!(gradebook_mut(state, req));
    match gb.add_grade(category, name, score, date) {
        Ok(()) => ok(
            &req.id,
            json!({
                "categoryAverage": gb.category(category).and_then(|c| c.average()),
                "summary": summary_json(gb),
            }),
        ),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_grades_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let category = try_resp!(required_str(req, "categoryName"));
    let name = try_resp!(required_str(req, "name"));
    let gb = try_resp!(gradebook_mut(state, req));
    match gb.remove_grade(category, name) {
        Ok(removed) => ok(
            &req.id,
            json!({
                "removed": { "name": name.trim(), "score": removed.score, "date": removed.date },
                "categoryAverage": gb.category(category).and_then(|c| c.average()),
                "summary": summary_json(gb),
            }),
        ),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.add" => Some(handle_grades_add(state, req)),
        "grades.remove" => Some(handle_grades_remove(state, req)),
        _ => None,
    }
}
