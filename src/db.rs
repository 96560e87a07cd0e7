use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("gradetrack.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            semester TEXT,
            credits INTEGER,
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS exercises(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            exercise_number INTEGER NOT NULL,
            points_earned REAL,
            points_possible REAL,
            notes TEXT NOT NULL DEFAULT '',
            sort_order INTEGER NOT NULL,
            updated_at TEXT,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exercises_course ON exercises(course_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exercises_course_sort ON exercises(course_id, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS exams(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            exam_name TEXT NOT NULL,
            grade REAL,
            max_grade REAL,
            weight REAL,
            exam_date TEXT,
            sort_order INTEGER NOT NULL,
            updated_at TEXT,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exams_course ON exams(course_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exams_course_sort ON exams(course_id, sort_order)",
        [],
    )?;

    // Workspaces created before updated_at stamping need the column added.
    ensure_updated_at(&conn, "courses")?;
    ensure_updated_at(&conn, "exercises")?;
    ensure_updated_at(&conn, "exams")?;

    Ok(conn)
}

fn ensure_updated_at(conn: &Connection, table: &str) -> anyhow::Result<()> {
    if table_has_column(conn, table, "updated_at")? {
        return Ok(());
    }
    let sql = format!("ALTER TABLE {} ADD COLUMN updated_at TEXT", table);
    conn.execute(&sql, [])?;
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
