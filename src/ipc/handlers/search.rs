use crate::ipc::error::ok;
use crate::ipc::helpers::{load_corpora, parse_search_params, students_json, with_diagnostics};
use crate::ipc::types::{AppState, Request};
use crate::walker::{list_courses, search_corpora};
use serde_json::json;

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (corpora, diag) = match load_corpora(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let courses = list_courses(&corpora);
    ok(
        &req.id,
        with_diagnostics(
            json!({ "total": courses.len(), "courses": courses }),
            &diag,
        ),
    )
}

fn handle_students_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let params = match parse_search_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (corpora, diag) = match load_corpora(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let students = search_corpora(&corpora, params.mode, &params.query, params.term);
    log::info!(
        "search {:?} {:?} ({:?}): {} students",
        params.mode,
        params.query,
        params.term,
        students.len()
    );
    ok(
        &req.id,
        with_diagnostics(json!({ "students": students_json(&students) }), &diag),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_courses_list(state, req)),
        "students.search" => Some(handle_students_search(state, req)),
        _ => None,
    }
}
