//! CRUD operations over the `students` table.
//!
//! Every write goes through the same normalization (trimmed names, trimmed and
//! lowercased emails, blank optional text stored as NULL) and validation, so
//! the sidecar, the desktop form and CSV import all agree on what a valid
//! record is.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Result, StoreError};
use crate::model::{
    normalize_email, normalize_full_name, normalize_optional, validate_address, validate_email,
    validate_full_name, validate_phone, Student, StudentInput, StudentPatch,
};

const SELECT_COLUMNS: &str = "SELECT id, full_name, email, phone, address, date_of_birth, enrollment_year, updated_at
     FROM students";

fn row_to_student(row: &Row<'_>) -> rusqlite::Result<Student> {
    let date_of_birth: Option<String> = row.get(5)?;
    Ok(Student {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        date_of_birth: date_of_birth.as_deref().and_then(parse_stored_date),
        enrollment_year: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn parse_stored_date(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    // Older rows may carry a time suffix.
    let day = t.get(..10).unwrap_or(t);
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            tracing::warn!(value = t, "unreadable date_of_birth in students table");
            None
        }
    }
}

fn date_to_sql(d: Option<NaiveDate>) -> Option<String> {
    d.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Escape `%`, `_` and `\` so user text matches literally inside LIKE.
fn escape_like(q: &str) -> String {
    let mut out = String::with_capacity(q.len());
    for ch in q.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub fn create_student(conn: &Connection, input: StudentInput) -> Result<Student> {
    let full_name = normalize_full_name(&input.full_name);
    let email = normalize_email(&input.email);
    let phone = normalize_optional(input.phone.as_deref());
    let address = normalize_optional(input.address.as_deref());

    validate_full_name(&full_name)?;
    validate_email(&email)?;
    validate_phone(phone.as_deref())?;
    validate_address(address.as_deref())?;

    conn.execute(
        "INSERT INTO students(
           full_name,
           email,
           phone,
           address,
           date_of_birth,
           enrollment_year,
           updated_at
         ) VALUES(?, ?, ?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
        params![
            full_name,
            email,
            phone,
            address,
            date_to_sql(input.date_of_birth),
            input.enrollment_year,
        ],
    )
    .map_err(|e| StoreError::from_insert(e, &email))?;

    let id = conn.last_insert_rowid();
    tracing::debug!(id, "created student");
    get_student(conn, id)?.ok_or(StoreError::Database(rusqlite::Error::QueryReturnedNoRows))
}

pub fn get_student(conn: &Connection, id: i64) -> Result<Option<Student>> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
    let student = conn.query_row(&sql, [id], row_to_student).optional()?;
    Ok(student)
}

/// All students, or those whose name or email contains `query`
/// (case-insensitive), ordered by full name.
pub fn list_students(conn: &Connection, query: Option<&str>) -> Result<Vec<Student>> {
    let query = query.map(str::trim).filter(|q| !q.is_empty());

    let students = match query {
        None => {
            let sql = format!("{SELECT_COLUMNS} ORDER BY full_name ASC, id ASC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], row_to_student)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        }
        Some(q) => {
            let pattern = format!("%{}%", escape_like(&q.to_lowercase()));
            let sql = format!(
                "{SELECT_COLUMNS}
                 WHERE lower(full_name) LIKE ?1 ESCAPE '\\'
                    OR lower(email) LIKE ?1 ESCAPE '\\'
                 ORDER BY full_name ASC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([&pattern], row_to_student)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        }
    };
    Ok(students)
}

/// Apply `patch` to the student with `id`. Returns `None` when no such row exists.
pub fn update_student(conn: &Connection, id: i64, patch: StudentPatch) -> Result<Option<Student>> {
    let Some(current) = get_student(conn, id)? else {
        return Ok(None);
    };

    let full_name = match patch.full_name.as_deref() {
        Some(v) => normalize_full_name(v),
        None => current.full_name,
    };
    let email = match patch.email.as_deref() {
        Some(v) => normalize_email(v),
        None => current.email,
    };
    let phone = match patch.phone.as_deref() {
        Some(v) => normalize_optional(Some(v)),
        None => current.phone,
    };
    let address = match patch.address.as_deref() {
        Some(v) => normalize_optional(Some(v)),
        None => current.address,
    };
    let date_of_birth = patch.date_of_birth.unwrap_or(current.date_of_birth);
    let enrollment_year = patch.enrollment_year.unwrap_or(current.enrollment_year);

    validate_full_name(&full_name)?;
    validate_email(&email)?;
    validate_phone(phone.as_deref())?;
    validate_address(address.as_deref())?;

    conn.execute(
        "UPDATE students
         SET full_name = ?,
             email = ?,
             phone = ?,
             address = ?,
             date_of_birth = ?,
             enrollment_year = ?,
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')
         WHERE id = ?",
        params![
            full_name,
            email,
            phone,
            address,
            date_to_sql(date_of_birth),
            enrollment_year,
            id
        ],
    )
    .map_err(|e| StoreError::from_insert(e, &email))?;

    tracing::debug!(id, "updated student");
    get_student(conn, id)
}

/// Delete every listed id that exists. Returns how many rows were removed.
pub fn delete_students(conn: &Connection, ids: &[i64]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let tx = conn.unchecked_transaction()?;
    let mut count = 0usize;
    {
        let mut stmt = tx.prepare("DELETE FROM students WHERE id = ?")?;
        for id in ids {
            count += stmt.execute([id])?;
        }
    }
    tx.commit()?;
    tracing::debug!(requested = ids.len(), deleted = count, "deleted students");
    Ok(count)
}
