use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::{
    category_detail_json, gradebook_mut, optional_f64, required_f64, required_str, summary_json,
    try_resp,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_categories_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = try_resp!(required_str(req, "name"));
    let average = try_resp!(optional_f64(req, "average"));
    let weight = try_resp!(optional_f64(req, "weight")).unwrap_or(0.0);
    let gb = try_resp!(gradebook_mut(state, req));
    if gb.category(name.trim()).is_some() {
        return err(
            &req.id,
            "validation_failed",
            format!("category {:?} already exists", name.trim()),
            Some(json!({ "field": "name" })),
        );
    }
    match gb.create_category(name, average, weight) {
        Ok(()) => ok(&req.id, json!({ "name": name.trim(), "summary": summary_json(gb) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_categories_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = try_resp!(required_str(req, "name"));
    let gb = try_resp!(gradebook_mut(state, req));
    match gb.category(name) {
        Some(c) => ok(&req.id, category_detail_json(c, gb.weight(name))),
        None => err(
            &req.id,
            "not_found",
            "category not found",
            Some(json!({ "kind": "category", "name": name })),
        ),
    }
}

fn handle_categories_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = try_resp!(required_str(req, "name"));
    let gb = try_resp!(gradebook_mut(state, req));
    match gb.remove_category(name) {
        Ok(c) => ok(
            &req.id,
            json!({
                "removed": category_detail_json(&c, None),
                "summary": summary_json(gb),
            }),
        ),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_categories_rename(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = try_resp!(required_str(req, "name"));
    let new_name = try_resp!(required_str(req, "newName"));
    let gb = try_resp!(gradebook_mut(state, req));
    match gb.rename_category(name, new_name) {
        Ok(()) => ok(&req.id, summary_json(gb)),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_categories_set_weight(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = try_resp!(required_str(req, "name"));
    let weight = try_resp!(required_f64(req, "weight"));
    let gb = try_resp!(gradebook_mut(state, req));
    match gb.set_weight(name, weight) {
        Ok(()) => ok(&req.id, summary_json(gb)),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_categories_force_average(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = try_resp!(required_str(req, "name"));
    let average = try_resp!(required_f64(req, "average"));
    let gb = try_resp!(gradebook_mut(state, req));
    match gb.force_average(name, average) {
        Ok(forced) => {
            let warning = forced
                .above_scale
                .then_some("average has been set to a number greater than 100");
            ok(
                &req.id,
                json!({ "warning": warning, "summary": summary_json(gb) }),
            )
        }
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_categories_resume_auto(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = try_resp!(required_str(req, "name"));
    let gb = try_resp!(gradebook_mut(state, req));
    match gb.resume_auto_average(name) {
        Ok(()) => ok(&req.id, summary_json(gb)),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "categories.create" => Some(handle_categories_create(state, req)),
        "categories.get" => Some(handle_categories_get(state, req)),
        "categories.remove" => Some(handle_categories_remove(state, req)),
        "categories.rename" => Some(handle_categories_rename(state, req)),
        "categories.setWeight" => Some(handle_categories_set_weight(state, req)),
        "categories.forceAverage" => Some(handle_categories_force_average(state, req)),
        "categories.resumeAutoAverage" => Some(handle_categories_resume_auto(state, req)),
        _ => None,
    }
}
