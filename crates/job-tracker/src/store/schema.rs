//! DDL and additive migrations for the tracker database.

use rusqlite::Connection;
use std::collections::HashSet;

use super::StoreError;

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS companies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    industry TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL REFERENCES companies(id),
    title TEXT NOT NULL,
    url TEXT,
    location TEXT,
    remote_type TEXT NOT NULL DEFAULT 'onsite',
    salary_min INTEGER,
    salary_max INTEGER,
    job_type TEXT,
    employment_type TEXT,
    status TEXT NOT NULL DEFAULT 'new',
    priority TEXT NOT NULL DEFAULT 'MEDIUM',
    skills_match INTEGER,
    source TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS applications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL UNIQUE REFERENCES jobs(id),
    status TEXT NOT NULL DEFAULT 'DRAFT',
    applied_date TEXT,
    response_received INTEGER NOT NULL DEFAULT 0,
    response_date TEXT,
    followup_sent INTEGER NOT NULL DEFAULT 0,
    follow_ups_sent INTEGER NOT NULL DEFAULT 0,
    last_follow_up TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS follow_ups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    application_id INTEGER NOT NULL REFERENCES applications(id),
    scheduled_date TEXT NOT NULL,
    channel TEXT NOT NULL DEFAULT 'email',
    recipient TEXT,
    subject TEXT,
    message TEXT,
    sent INTEGER NOT NULL DEFAULT 0,
    sent_date TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_jobs_company ON jobs(company_id);
CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
CREATE INDEX IF NOT EXISTS idx_follow_ups_application ON follow_ups(application_id);
"#;

pub(crate) fn init(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(DDL)?;
    migrate_followup_override(conn)
}

/// Older databases predate per-company follow-up overrides.
fn migrate_followup_override(conn: &Connection) -> Result<(), StoreError> {
    let cols = get_columns(conn, "companies")?;
    add_column_if_missing(conn, &cols, "companies", "followup_override_days", "INTEGER")
}

pub(crate) fn get_columns(conn: &Connection, table: &str) -> Result<HashSet<String>, StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut out = HashSet::new();
    for r in rows {
        out.insert(r?);
    }
    Ok(out)
}

fn add_column_if_missing(
    conn: &Connection,
    cols: &HashSet<String>,
    table: &str,
    col: &str,
    ty: &str,
) -> Result<(), StoreError> {
    if !cols.contains(col) {
        let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, col, ty);
        conn.execute(&sql, [])?;
        tracing::info!(table, column = col, "added missing column");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrades_legacy_companies_table() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "CREATE TABLE companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                industry TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO companies (name) VALUES ('Legacy Co');",
        )
        .expect("legacy schema");

        init(&conn).expect("migrates");

        let cols = get_columns(&conn, "companies").expect("columns");
        assert!(cols.contains("followup_override_days"));
        let history = get_columns(&conn, "follow_ups").expect("follow-up columns");
        assert!(history.contains("subject"));
        let name: String = conn
            .query_row("SELECT name FROM companies", [], |row| row.get(0))
            .expect("row survives");
        assert_eq!(name, "Legacy Co");
    }

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open");
        init(&conn).expect("first init");
        init(&conn).expect("second init");
        let cols = get_columns(&conn, "applications").expect("columns");
        assert!(cols.contains("follow_ups_sent"));
    }
}
