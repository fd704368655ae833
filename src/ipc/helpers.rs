use serde_json::json;

use crate::category::{AssignmentDate, Category};
use crate::gradebook::{CategoryEntry, Gradebook, GradebookId};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

/// Unwraps a helper result or returns its ready-made error response.
macro_rules! try_resp {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(resp) => return resp,
        }
    };
}
pub(crate) use try_resp;

pub fn required_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) => Ok(v),
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn required_f64(req: &Request, key: &str) -> Result<f64, serde_json::Value> {
    match optional_f64(req, key)? {
        Some(v) => Ok(v),
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

/// Absent or null is `None`; anything else must be a number.
pub fn optional_f64(req: &Request, key: &str) -> Result<Option<f64>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => match v.as_f64() {
            Some(n) => Ok(Some(n)),
            None => Err(err(
                &req.id,
                "bad_params",
                format!("{} must be a number", key),
                None,
            )),
        },
    }
}

pub fn optional_bool(req: &Request, key: &str) -> Result<bool, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(false),
        Some(v) if v.is_null() => Ok(false),
        Some(v) => v.as_bool().ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a boolean", key),
                None,
            )
        }),
    }
}

/// Accepts `"m/d/y"` or `{month, day, year}`.
pub fn optional_date(req: &Request, key: &str) -> Result<Option<AssignmentDate>, serde_json::Value> {
    let bad = |message: String| err(&req.id, "validation_failed", message, Some(json!({ "field": "date" })));
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .parse::<AssignmentDate>()
            .map(Some)
            .map_err(|e| bad(e.to_string())),
        Some(v @ serde_json::Value::Object(_)) => {
            let field = |name: &str| v.get(name).and_then(|x| x.as_i64());
            let (Some(month), Some(day), Some(year)) = (field("month"), field("day"), field("year")) else {
                return Err(bad("date needs integer month, day and year".to_string()));
            };
            let (Ok(month), Ok(day), Ok(year)) = (
                u32::try_from(month),
                u32::try_from(day),
                i32::try_from(year),
            ) else {
                return Err(bad("date fields out of range".to_string()));
            };
            AssignmentDate::new(month, day, year)
                .map(Some)
                .map_err(|e| bad(e.to_string()))
        }
        Some(_) => Err(bad("date must be \"month/day/year\" or an object".to_string())),
    }
}

pub fn gradebook_id(req: &Request) -> Result<GradebookId, serde_json::Value> {
    let raw = required_str(req, "gradebookId")?;
    raw.parse::<GradebookId>()
        .map_err(|_| err(&req.id, "bad_params", "gradebookId is not a valid id", None))
}

pub fn gradebook_mut<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Gradebook, serde_json::Value> {
    let id = gradebook_id(req)?;
    state.gradebooks.get_mut(&id).ok_or_else(|| {
        err(
            &req.id,
            "not_found",
            "gradebook not open",
            Some(json!({ "gradebookId": id })),
        )
    })
}

pub fn category_json(name: &str, entry: &CategoryEntry) -> serde_json::Value {
    let c = &entry.category;
    json!({
        "name": name,
        "weight": entry.weight,
        "average": c.average(),
        "cachedAverage": entry.cached_average,
        "isManual": c.is_manual(),
        "assignmentCount": c.assignment_count(),
    })
}

pub fn category_detail_json(c: &Category, weight: Option<f64>) -> serde_json::Value {
    let assignments: Vec<serde_json::Value> = c
        .assignments()
        .into_iter()
        .map(|(name, a)| {
            json!({
                "name": name,
                "score": a.score,
                "date": a.date,
                "isoDate": a.date.and_then(|d| d.to_naive_date()).map(|d| d.to_string()),
            })
        })
        .collect();
    json!({
        "name": c.name(),
        "weight": weight,
        "average": c.average(),
        "isManual": c.is_manual(),
        "assignments": assignments,
    })
}

pub fn summary_json(gb: &Gradebook) -> serde_json::Value {
    let categories: Vec<serde_json::Value> = gb
        .categories()
        .iter()
        .map(|(name, entry)| category_json(name, entry))
        .collect();
    json!({
        "gradebookId": gb.id(),
        "categories": categories,
        "totalWeight": gb.total_weight(),
        "weightsValid": gb.weights_valid(),
        "classAverage": gb.class_average(),
        "letterGrade": gb.letter_grade(),
        "gradeBands": gb.grade_bands(),
    })
}
