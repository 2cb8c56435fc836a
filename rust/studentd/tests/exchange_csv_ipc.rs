use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_studentd");
    let mut child = Command::new(exe)
        .env_remove("STUDENTD_DATA_DIR")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn studentd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded",
        method
    );
    value.get("error").cloned().expect("error object")
}

fn summary_codes(summary: &serde_json::Value) -> Vec<String> {
    summary["warnings"]
        .as_array()
        .expect("warnings array")
        .iter()
        .map(|w| w["code"].as_str().unwrap_or("").to_string())
        .collect()
}

fn open_workspace(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &std::path::Path,
) {
    request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
}

#[test]
fn import_accepts_aliases_and_reports_skipped_rows() {
    let workspace = temp_dir("students-csv-import");
    let csv_path = workspace.join("incoming.csv");
    std::fs::write(
        &csv_path,
        "\u{feff}name,email,phone,dob,year\n\
         Ada Lovelace,ADA@example.org,555,1815-12-10,1833\n\
         ,nobody@example.org,,,\n\
         No Email,,,,\n\
         Bad Bits,bits@example.org,,10/12/1815,19x0\n\
         Ada Again,ada@example.org,,,\n",
    )
    .expect("write csv");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, &workspace);

    let preview = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "exchange.previewStudentsCsv",
        json!({ "inPath": csv_path.to_string_lossy() }),
    );
    let summary = &preview["summary"];
    assert_eq!(summary["rowsTotal"], json!(5));
    assert_eq!(summary["created"], json!(2));
    assert_eq!(summary["skipped"], json!(3));
    assert_eq!(
        summary_codes(summary),
        vec!["missing_name", "bad_email", "duplicate_email"]
    );
    let listed = request_ok(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert!(listed["students"].as_array().expect("array").is_empty());

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "exchange.importStudentsCsv",
        json!({ "inPath": csv_path.to_string_lossy() }),
    );
    let summary = &imported["summary"];
    assert_eq!(summary["created"], json!(2));
    assert_eq!(summary["skipped"], json!(3));
    let lines: Vec<u64> = summary["warnings"]
        .as_array()
        .expect("warnings")
        .iter()
        .map(|w| w["line"].as_u64().unwrap_or(0))
        .collect();
    assert_eq!(lines, vec![3, 4, 6]);

    let listed = request_ok(&mut stdin, &mut reader, "4", "students.list", json!({}));
    let rows = listed["students"].as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["fullName"], json!("Ada Lovelace"));
    assert_eq!(rows[0]["email"], json!("ada@example.org"));
    assert_eq!(rows[0]["phone"], json!("555"));
    assert_eq!(rows[0]["dateOfBirth"], json!("1815-12-10"));
    assert_eq!(rows[0]["enrollmentYear"], json!(1833));
    assert_eq!(rows[1]["fullName"], json!("Bad Bits"));
    assert!(rows[1]["dateOfBirth"].is_null());
    assert!(rows[1]["enrollmentYear"].is_null());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn export_writes_header_and_filtered_rows() {
    let workspace = temp_dir("students-csv-export");
    let out_all = workspace.join("out/all.csv");
    let out_some = workspace.join("some.csv");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, &workspace);
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({
            "fullName": "Zed, Jr.",
            "email": "zed@example.org",
            "dateOfBirth": "2001-02-03",
            "enrollmentYear": 2019
        }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "fullName": "Amy", "email": "amy@example.org", "address": "1 Main St" }),
    );

    let all = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "exchange.exportStudentsCsv",
        json!({ "outPath": out_all.to_string_lossy() }),
    );
    assert_eq!(all["rowsExported"], json!(2));
    let text = std::fs::read_to_string(&out_all).expect("read export");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "id,full_name,email,phone,address,date_of_birth,enrollment_year"
    );
    assert!(lines[1].contains(",Amy,amy@example.org,,1 Main St,,"));
    assert!(lines[2].contains(",\"Zed, Jr.\",zed@example.org,,,2001-02-03,2019"));

    let some = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "exchange.exportStudentsCsv",
        json!({ "outPath": out_some.to_string_lossy(), "query": "zed" }),
    );
    assert_eq!(some["rowsExported"], json!(1));
    let text = std::fs::read_to_string(&out_some).expect("read export");
    assert_eq!(text.lines().count(), 2);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn exported_file_imports_into_a_fresh_workspace() {
    let src = temp_dir("students-csv-src");
    let dst = temp_dir("students-csv-dst");
    let csv_path = src.join("students.csv");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, &src);
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "fullName": "Moved", "email": "moved@example.org", "phone": "42" }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "exchange.exportStudentsCsv",
        json!({ "outPath": csv_path.to_string_lossy() }),
    );
    open_workspace(&mut stdin, &mut reader, &dst);
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "exchange.importStudentsCsv",
        json!({ "inPath": csv_path.to_string_lossy() }),
    );
    assert_eq!(imported["summary"]["created"], json!(1));
    let listed = request_ok(&mut stdin, &mut reader, "4", "students.list", json!({}));
    assert_eq!(listed["students"][0]["phone"], json!("42"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(src);
    let _ = std::fs::remove_dir_all(dst);
}

#[test]
fn missing_input_file_is_not_found() {
    let workspace = temp_dir("students-csv-missing");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, &workspace);

    let e = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "exchange.importStudentsCsv",
        json!({ "inPath": workspace.join("nope.csv").to_string_lossy() }),
    );
    assert_eq!(e["code"], json!("not_found"));

    let e = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "exchange.exportStudentsCsv",
        json!({ "outPath": "  " }),
    );
    assert_eq!(e["code"], json!("bad_params"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
