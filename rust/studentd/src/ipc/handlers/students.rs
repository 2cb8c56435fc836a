use crate::error::StoreError;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{
    date_value, id_param, id_value, opt_str_param, require_db, str_param, text_value, year_value,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{StudentInput, StudentPatch};
use crate::students;
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let query = opt_str_param(req, "query");
    match students::list_students(conn, query.as_deref()) {
        Ok(rows) => ok(&req.id, json!({ "students": rows })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match id_param(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match students::get_student(conn, student_id) {
        Ok(Some(s)) => ok(&req.id, json!({ "student": s })),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
        Err(e) => store_err(&req.id, &e),
    }
}

fn read_create_input(req: &Request) -> Result<StudentInput, serde_json::Value> {
    let full_name = str_param(req, "fullName")?;
    let email = str_param(req, "email")?;
    let p = &req.params;
    let parsed = (|| -> Result<StudentInput, StoreError> {
        Ok(StudentInput {
            full_name,
            email,
            phone: p.get("phone").map(|v| text_value(v, "phone")).transpose()?,
            address: p
                .get("address")
                .map(|v| text_value(v, "address"))
                .transpose()?,
            date_of_birth: match p.get("dateOfBirth") {
                Some(v) => date_value(v)?,
                None => None,
            },
            enrollment_year: match p.get("enrollmentYear") {
                Some(v) => year_value(v)?,
                None => None,
            },
        })
    })();
    parsed.map_err(|e| store_err(&req.id, &e))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let input = match read_create_input(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match students::create_student(conn, input) {
        Ok(s) => ok(&req.id, json!({ "studentId": s.id, "student": s })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn read_patch(patch: &serde_json::Map<String, serde_json::Value>) -> Result<StudentPatch, StoreError> {
    let text = |key: &str, field: &'static str| -> Result<Option<String>, StoreError> {
        patch.get(key).map(|v| text_value(v, field)).transpose()
    };
    Ok(StudentPatch {
        full_name: text("fullName", "full_name")?,
        email: text("email", "email")?,
        phone: text("phone", "phone")?,
        address: text("address", "address")?,
        date_of_birth: patch.get("dateOfBirth").map(date_value).transpose()?,
        enrollment_year: patch.get("enrollmentYear").map(year_value).transpose()?,
    })
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match id_param(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch", None);
    };
    let patch = match read_patch(patch) {
        Ok(p) => p,
        Err(e) => return store_err(&req.id, &e),
    };

    match students::update_student(conn, student_id, patch) {
        Ok(Some(s)) => ok(&req.id, json!({ "student": s })),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(raw_ids) = req.params.get("studentIds").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing studentIds", None);
    };
    let mut ids = Vec::with_capacity(raw_ids.len());
    for v in raw_ids {
        match id_value(v) {
            Some(id) => ids.push(id),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "studentIds must contain integer ids",
                    Some(json!({ "value": v })),
                )
            }
        }
    }

    match students::delete_students(conn, &ids) {
        Ok(deleted) => ok(&req.id, json!({ "deleted": deleted })),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
