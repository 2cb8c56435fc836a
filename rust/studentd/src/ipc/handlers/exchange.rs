use crate::exchange;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{opt_str_param, path_param, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn exchange_err(req: &Request, e: &crate::error::StoreError, path: &str) -> serde_json::Value {
    err(&req.id, e.code(), e.to_string(), Some(json!({ "path": path })))
}

fn handle_export_students_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let out_path = match path_param(req, "outPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let query = opt_str_param(req, "query");

    match exchange::export_students_csv(conn, &PathBuf::from(&out_path), query.as_deref()) {
        Ok(rows_exported) => ok(
            &req.id,
            json!({ "ok": true, "rowsExported": rows_exported, "path": out_path }),
        ),
        Err(e) => exchange_err(req, &e, &out_path),
    }
}

fn handle_preview_students_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let in_path = match path_param(req, "inPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match exchange::preview_students_csv(conn, &PathBuf::from(&in_path)) {
        Ok(summary) => ok(&req.id, json!({ "summary": summary, "path": in_path })),
        Err(e) => exchange_err(req, &e, &in_path),
    }
}

fn handle_import_students_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let in_path = match path_param(req, "inPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "CSV file not found",
            Some(json!({ "path": in_path })),
        );
    }
    match exchange::import_students_csv(conn, &src) {
        Ok(summary) => ok(&req.id, json!({ "summary": summary, "path": in_path })),
        Err(e) => exchange_err(req, &e, &in_path),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exchange.exportStudentsCsv" => Some(handle_export_students_csv(state, req)),
        "exchange.previewStudentsCsv" => Some(handle_preview_students_csv(state, req)),
        "exchange.importStudentsCsv" => Some(handle_import_students_csv(state, req)),
        _ => None,
    }
}
