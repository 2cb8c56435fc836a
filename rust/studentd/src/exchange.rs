//! CSV import and export of student records.
//!
//! Import is best-effort: a row that cannot become a record is skipped and
//! reported as a warning, and the remaining rows are still processed.

use std::collections::HashSet;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::error::Result;
use crate::model::{check_input, StudentInput};
use crate::students;

pub const EXPORT_HEADER: [&str; 7] = [
    "id",
    "full_name",
    "email",
    "phone",
    "address",
    "date_of_birth",
    "enrollment_year",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowWarning {
    pub line: u64,
    pub code: &'static str,
    pub message: String,
}

/// Outcome of an import or preview. For a preview, `created` counts the rows
/// that would be created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub rows_total: usize,
    pub created: usize,
    pub skipped: usize,
    pub warnings: Vec<RowWarning>,
}

impl ImportSummary {
    fn skip(&mut self, line: u64, code: &'static str, message: impl Into<String>) {
        self.skipped += 1;
        self.warnings.push(RowWarning {
            line,
            code,
            message: message.into(),
        });
    }
}

/// Column positions resolved from the header row. Each field lists its
/// accepted header names in priority order.
struct Columns {
    full_name: Vec<usize>,
    email: Vec<usize>,
    phone: Vec<usize>,
    address: Vec<usize>,
    date_of_birth: Vec<usize>,
    enrollment_year: Vec<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let find = |aliases: &[&str]| -> Vec<usize> {
            aliases
                .iter()
                .filter_map(|a| names.iter().position(|n| n == a))
                .collect()
        };
        Self {
            full_name: find(&["full_name", "name"]),
            email: find(&["email"]),
            phone: find(&["phone"]),
            address: find(&["address"]),
            date_of_birth: find(&["date_of_birth", "dob"]),
            enrollment_year: find(&["enrollment_year", "year"]),
        }
    }
}

/// Value of the first candidate column whose cell is non-empty, trimmed.
/// A whitespace-only cell still wins over later aliases.
fn field(rec: &StringRecord, idxs: &[usize]) -> String {
    idxs.iter()
        .filter_map(|&i| rec.get(i))
        .find(|v| !v.is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

enum RowOutcome {
    Ready(StudentInput),
    Skip(&'static str, &'static str),
}

fn parse_row(cols: &Columns, rec: &StringRecord) -> RowOutcome {
    let full_name = field(rec, &cols.full_name);
    let email = field(rec, &cols.email);
    if full_name.is_empty() {
        return RowOutcome::Skip("missing_name", "row has no full_name/name value");
    }
    if email.is_empty() || !email.contains('@') {
        return RowOutcome::Skip("bad_email", "row has no valid email");
    }

    let phone = field(rec, &cols.phone);
    let address = field(rec, &cols.address);
    let dob = field(rec, &cols.date_of_birth);
    let year = field(rec, &cols.enrollment_year);

    // Unreadable dates and years are dropped rather than failing the row.
    let date_of_birth = chrono::NaiveDate::parse_from_str(&dob, "%Y-%m-%d").ok();
    let enrollment_year = if !year.is_empty() && year.chars().all(|c| c.is_ascii_digit()) {
        year.parse::<i32>().ok()
    } else {
        None
    };

    RowOutcome::Ready(StudentInput {
        full_name,
        email,
        phone: (!phone.is_empty()).then_some(phone),
        address: (!address.is_empty()).then_some(address),
        date_of_birth,
        enrollment_year,
    })
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    let rdr = ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path)?;
    Ok(rdr)
}

fn record_line(rec: &StringRecord) -> u64 {
    rec.position().map(|p| p.line()).unwrap_or(0)
}

/// Create a record for every usable row of the CSV at `path`.
pub fn import_students_csv(conn: &Connection, path: &Path) -> Result<ImportSummary> {
    let mut rdr = open_reader(path)?;
    let cols = Columns::from_headers(rdr.headers()?);
    let mut summary = ImportSummary::default();

    let tx = conn.unchecked_transaction()?;
    for rec in rdr.records() {
        summary.rows_total += 1;
        let rec = match rec {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                summary.skip(line, "bad_row", e.to_string());
                continue;
            }
        };
        let line = record_line(&rec);
        match parse_row(&cols, &rec) {
            RowOutcome::Skip(code, message) => summary.skip(line, code, message),
            RowOutcome::Ready(input) => match students::create_student(&tx, input) {
                Ok(_) => summary.created += 1,
                Err(e) => {
                    tracing::debug!(line, error = %e, "skipping CSV row");
                    summary.skip(line, e.code(), e.to_string());
                }
            },
        }
    }
    tx.commit()?;

    tracing::info!(
        path = %path.display(),
        created = summary.created,
        skipped = summary.skipped,
        "imported students CSV"
    );
    Ok(summary)
}

/// Dry run of [`import_students_csv`]: nothing is written.
pub fn preview_students_csv(conn: &Connection, path: &Path) -> Result<ImportSummary> {
    let mut rdr = open_reader(path)?;
    let cols = Columns::from_headers(rdr.headers()?);
    let mut summary = ImportSummary::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut exists_stmt = conn.prepare("SELECT 1 FROM students WHERE email = ?")?;

    for rec in rdr.records() {
        summary.rows_total += 1;
        let rec = match rec {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                summary.skip(line, "bad_row", e.to_string());
                continue;
            }
        };
        let line = record_line(&rec);
        let input = match parse_row(&cols, &rec) {
            RowOutcome::Skip(code, message) => {
                summary.skip(line, code, message);
                continue;
            }
            RowOutcome::Ready(input) => input,
        };
        let email = match check_input(&input) {
            Ok(email) => email,
            Err(e) => {
                summary.skip(line, e.code(), e.to_string());
                continue;
            }
        };
        let exists: Option<i64> = exists_stmt
            .query_row([&email], |r| r.get(0))
            .optional()?;
        if exists.is_some() || !seen.insert(email.clone()) {
            summary.skip(
                line,
                "duplicate_email",
                format!("a student with email {email} already exists"),
            );
            continue;
        }
        summary.created += 1;
    }
    Ok(summary)
}

/// Write the (optionally filtered) student list to `path`. Returns the row count.
pub fn export_students_csv(conn: &Connection, path: &Path, query: Option<&str>) -> Result<usize> {
    let rows = students::list_students(conn, query)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record(EXPORT_HEADER)?;
    for s in &rows {
        wtr.write_record([
            s.id.to_string(),
            s.full_name.clone(),
            s.email.clone(),
            s.phone.clone().unwrap_or_default(),
            s.address.clone().unwrap_or_default(),
            s.date_of_birth_text(),
            s.enrollment_year_text(),
        ])?;
    }
    wtr.flush()?;

    tracing::info!(path = %path.display(), rows = rows.len(), "exported students CSV");
    Ok(rows.len())
}
