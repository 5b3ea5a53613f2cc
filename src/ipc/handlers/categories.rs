use crate::db;
use crate::extract::{ColumnLayout, LAYOUTS};
use crate::ipc::error::{bad_params, err, no_workspace, ok};
use crate::ipc::helpers::{param_str, workspace_default_layout};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::Path;

fn handle_categories_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "categories": [] }));
    };

    match db::categories_list(conn) {
        Ok(cats) => {
            let rows: Vec<_> = cats
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "name": c.name,
                        "label": c.display_label(),
                        "folder": c.folder,
                        "layout": c.layout,
                    })
                })
                .collect();
            ok(&req.id, json!({ "categories": rows }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_categories_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };

    let name = match param_str(req, "name") {
        Some(v) => v.trim().to_string(),
        None => return bad_params(&req.id, "missing name"),
    };
    if name.is_empty() {
        return bad_params(&req.id, "name must not be empty");
    }
    let folder = match param_str(req, "folder") {
        Some(v) => v.trim().to_string(),
        None => return bad_params(&req.id, "missing folder"),
    };
    if folder.is_empty() {
        return bad_params(&req.id, "folder must not be empty");
    }
    let label = param_str(req, "label").map(str::trim).filter(|s| !s.is_empty());
    let layout = param_str(req, "layout");
    if let Some(l) = layout {
        if ColumnLayout::by_name(l).is_none() {
            return bad_params(&req.id, format!("unknown layout: {}", l));
        }
    }

    match db::category_upsert(conn, &name, &folder, label, layout) {
        Ok(id) => ok(&req.id, json!({ "categoryId": id, "name": name })),
        Err(e) => err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "categories" })),
        ),
    }
}

fn handle_categories_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let Some(name) = param_str(req, "name") else {
        return bad_params(&req.id, "missing name");
    };
    let folder = match db::categories_list(conn) {
        Ok(cats) => cats.into_iter().find(|c| c.name == name).map(|c| c.folder),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    match db::category_delete(conn, name) {
        Ok(true) => {
            let evicted = folder
                .map(|f| state.cache.evict_folder(Path::new(&f)))
                .unwrap_or(0);
            ok(&req.id, json!({ "ok": true, "evicted": evicted }))
        }
        Ok(false) => err(&req.id, "not_found", "category not found", None),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_layouts_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let default_layout = state
        .db
        .as_ref()
        .map(workspace_default_layout)
        .map(|l| l.name)
        .unwrap_or(crate::extract::DEFAULT_LAYOUT);
    ok(
        &req.id,
        json!({ "layouts": LAYOUTS, "defaultLayout": default_layout }),
    )
}

fn handle_set_default_layout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let Some(layout) = param_str(req, "layout") else {
        return bad_params(&req.id, "missing layout");
    };
    if ColumnLayout::by_name(layout).is_none() {
        return bad_params(&req.id, format!("unknown layout: {}", layout));
    }
    if let Err(e) = db::set_default_layout(conn, layout) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "categories.list" => Some(handle_categories_list(state, req)),
        "categories.upsert" => Some(handle_categories_upsert(state, req)),
        "categories.delete" => Some(handle_categories_delete(state, req)),
        "layouts.list" => Some(handle_layouts_list(state, req)),
        "settings.setDefaultLayout" => Some(handle_set_default_layout(state, req)),
        _ => None,
    }
}
