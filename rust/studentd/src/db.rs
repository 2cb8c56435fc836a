use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "student_mgmt.db";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)?;
    tracing::debug!(path = %db_path.display(), "opened student database");
    init_schema(&conn)?;
    Ok(conn)
}

/// In-memory database with the full schema, for tests.
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name VARCHAR(200) NOT NULL,
            email VARCHAR(200) NOT NULL,
            phone VARCHAR(50),
            address VARCHAR(500),
            date_of_birth DATE,
            enrollment_year INTEGER,
            updated_at TEXT,
            CONSTRAINT uq_students_email UNIQUE (email)
        )",
        [],
    )?;

    // Data files written by older builds have no updated_at column.
    ensure_students_updated_at(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_full_name ON students(full_name)",
        [],
    )?;
    Ok(())
}

fn ensure_students_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "students", "updated_at")? {
        return Ok(());
    }
    tracing::info!("adding students.updated_at column");
    conn.execute("ALTER TABLE students ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_db_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("nested");
        let conn = open_db(&ws).unwrap();
        assert!(ws.join(DB_FILE_NAME).is_file());
        assert!(table_has_column(&conn, "students", "email").unwrap());
        assert!(table_has_column(&conn, "students", "updated_at").unwrap());
        assert!(!table_has_column(&conn, "students", "nope").unwrap());
    }

    #[test]
    fn legacy_table_gains_updated_at() {
        let dir = tempfile::tempdir().unwrap();
        {
            let conn = Connection::open(dir.path().join(DB_FILE_NAME)).unwrap();
            conn.execute(
                "CREATE TABLE students (
                    id INTEGER NOT NULL PRIMARY KEY,
                    full_name VARCHAR(200) NOT NULL,
                    email VARCHAR(200) NOT NULL,
                    phone VARCHAR(50),
                    address VARCHAR(500),
                    date_of_birth DATE,
                    enrollment_year INTEGER,
                    CONSTRAINT uq_students_email UNIQUE (email)
                )",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO students(full_name, email) VALUES('Old Row', 'old@x.org')",
                [],
            )
            .unwrap();
        }

        let conn = open_db(dir.path()).unwrap();
        assert!(table_has_column(&conn, "students", "updated_at").unwrap());
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn reopening_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        drop(open_db(dir.path()).unwrap());
        drop(open_db(dir.path()).unwrap());
    }
}
