use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password    TEXT NOT NULL,
                name        TEXT NOT NULL,
                external_id TEXT NOT NULL DEFAULT '',
                section     TEXT,
                batch       TEXT NOT NULL DEFAULT '',
                role        TEXT NOT NULL CHECK (role IN ('student', 'teacher')),
                detained    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_users_role_section ON users(role, section);

            CREATE TABLE submissions (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL REFERENCES users(id),
                category        TEXT NOT NULL,
                title           TEXT NOT NULL,
                semester        INTEGER NOT NULL CHECK (semester BETWEEN 1 AND 8),
                section         TEXT NOT NULL,
                document_link   TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_submissions_owner_category
                ON submissions(owner_id, category, created_at);
            CREATE INDEX idx_submissions_category
                ON submissions(category, semester);

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL,
                date        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE message_reads (
                message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                reader_id   TEXT NOT NULL,
                read_at     TEXT NOT NULL,
                PRIMARY KEY (message_id, reader_id)
            );

            CREATE TABLE exam_entries (
                id          TEXT PRIMARY KEY,
                exam_title  TEXT NOT NULL,
                subject     TEXT NOT NULL,
                exam_date   TEXT NOT NULL,
                exam_time   TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_exam_entries_title ON exam_entries(exam_title);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
