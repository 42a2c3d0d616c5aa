use anyhow::Context;
use rusqlite::Connection;

/// Schema migrations, embedded so the binary never depends on a migrations
/// directory being present next to the working directory.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_bookings",
    "CREATE TABLE IF NOT EXISTS bookings (
        id TEXT PRIMARY KEY,
        call_sid TEXT NOT NULL,
        patient_name TEXT NOT NULL,
        reason TEXT NOT NULL,
        date_time TEXT NOT NULL,
        date_of_birth TEXT NOT NULL,
        phone_e164 TEXT NOT NULL,
        phone_spoken TEXT NOT NULL,
        duration_minutes INTEGER NOT NULL DEFAULT 60,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_bookings_date_time ON bookings(date_time);",
)];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}
