use crate::gradebook::Gradebook;
use crate::ipc::error::{core_err, err, load_err, ok};
use crate::ipc::helpers::{
    gradebook_id, gradebook_mut, optional_bool, optional_f64, required_str, summary_json, try_resp,
};
use crate::ipc::types::{AppState, Request};
use crate::loader;
use serde_json::json;

fn handle_gradebook_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let custom = try_resp!(optional_bool(req, "customGradeBands"));
    let gb = Gradebook::new(custom);
    let id = gb.id();
    let summary = summary_json(&gb);
    state.gradebooks.insert(id, gb);
    ok(&req.id, json!({ "gradebookId": id, "summary": summary }))
}

fn handle_gradebook_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let raw = try_resp!(required_str(req, "path"));
    let path = state.config.resolve_path(raw);
    match loader::load_gradebook_file(&path) {
        Ok(gb) => {
            let id = gb.id();
            let summary = summary_json(&gb);
            state.gradebooks.insert(id, gb);
            ok(
                &req.id,
                json!({
                    "gradebookId": id,
                    "path": path.to_string_lossy(),
                    "summary": summary,
                }),
            )
        }
        Err(e) => load_err(&req.id, &e),
    }
}

fn handle_gradebook_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let raw = try_resp!(required_str(req, "path"));
    let path = state.config.resolve_path(raw);
    let gb = try_resp!(gradebook_mut(state, req));
    match loader::save_gradebook_file(gb, &path) {
        Ok(()) => ok(&req.id, json!({ "path": path.to_string_lossy() })),
        Err(e) => err(&req.id, "save_failed", format!("{e:?}"), None),
    }
}

fn handle_gradebook_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = try_resp!(gradebook_id(req));
    match state.gradebooks.remove(&id) {
        Some(_) => ok(&req.id, json!({ "closed": true })),
        None => err(
            &req.id,
            "not_found",
            "gradebook not open",
            Some(json!({ "gradebookId": id })),
        ),
    }
}

fn handle_gradebook_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let gb = try_resp!(gradebook_mut(state, req));
    ok(&req.id, summary_json(gb))
}

fn handle_gradebook_project(state: &mut AppState, req: &Request) -> serde_json::Value {
    let category = try_resp!(required_str(req, "categoryName"));
    let score = try_resp!(optional_f64(req, "score"));
    let gb = try_resp!(gradebook_mut(state, req));
    match gb.project(category, score) {
        Ok(p) => ok(
            &req.id,
            json!({
                "categoryName": category,
                "current": gb.class_average(),
                "projection": p,
            }),
        ),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "gradebook.create" => Some(handle_gradebook_create(state, req)),
        "gradebook.load" => Some(handle_gradebook_load(state, req)),
        "gradebook.save" => Some(handle_gradebook_save(state, req)),
        "gradebook.close" => Some(handle_gradebook_close(state, req)),
        "gradebook.summary" => Some(handle_gradebook_summary(state, req)),
        "gradebook.project" => Some(handle_gradebook_project(state, req)),
        _ => None,
    }
}
