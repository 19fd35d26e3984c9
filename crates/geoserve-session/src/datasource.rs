//! Session datasource: a SQLite database with simple-features metadata.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::error::Result;

/// OGC simple-features metadata tables, created on first open.
const SPATIAL_METADATA: &str = "
CREATE TABLE IF NOT EXISTS spatial_ref_sys (
    srid INTEGER PRIMARY KEY,
    auth_name TEXT NOT NULL,
    auth_srid INTEGER NOT NULL,
    srtext TEXT
);
CREATE TABLE IF NOT EXISTS geometry_columns (
    f_table_name TEXT NOT NULL,
    f_geometry_column TEXT NOT NULL,
    geometry_type TEXT NOT NULL,
    coord_dimension INTEGER NOT NULL DEFAULT 2,
    srid INTEGER REFERENCES spatial_ref_sys(srid),
    PRIMARY KEY (f_table_name, f_geometry_column)
);
INSERT OR IGNORE INTO spatial_ref_sys (srid, auth_name, auth_srid, srtext) VALUES
    (4326, 'EPSG', 4326, 'WGS 84'),
    (3857, 'EPSG', 3857, 'WGS 84 / Pseudo-Mercator');
";

/// Shared handle to a session database.
///
/// Thread-safe via an internal mutex; cloning shares the connection.
#[derive(Debug, Clone)]
pub struct Datasource {
    path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl Datasource {
    /// Open (or create) the database at `path` and install spatial metadata.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SPATIAL_METADATA)?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SPATIAL_METADATA)?;

        Ok(Self {
            path: None,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Database file path (`None` for in-memory databases).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> T) -> T {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }

    /// Whether the simple-features metadata tables are present.
    pub fn is_spatial(&self) -> Result<bool> {
        let count: i64 = self.with_connection(|conn| {
            conn.query_row(
                "SELECT count(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('spatial_ref_sys', 'geometry_columns')",
                [],
                |row| row.get(0),
            )
        })?;
        Ok(count == 2)
    }

    /// Whether two handles share the same underlying connection.
    pub fn ptr_eq(&self, other: &Datasource) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }
}
