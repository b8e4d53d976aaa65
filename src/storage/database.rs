//! Database handle and gateway registry

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use rusqlite::Connection;
use crate::record::{AssetKind, FairyTale, Image, Music, Text, Voice};
use crate::{Error, Result};
use super::gateway::{Gateway, Record};
use super::schema;

/// What to do when an existing database does not match the expected schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    /// Report the mismatch and refuse to open
    #[default]
    Fail,
    /// Drop every table and start over
    Recreate,
}

/// The single SQLite connection of the process and its record gateways.
///
/// Gateways are built on first access and cached; concurrent first callers
/// all receive the one instance that won initialization.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
    fairy_tales: OnceLock<Gateway<FairyTale>>,
    voices: OnceLock<Gateway<Voice>>,
    images: OnceLock<Gateway<Image>>,
    texts: OnceLock<Gateway<Text>>,
    musics: OnceLock<Gateway<Music>>,
}

impl Database {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, MismatchPolicy::Fail)
    }

    /// Open a database file, handling a schema mismatch per `policy`
    pub fn open_with(path: &Path, policy: MismatchPolicy) -> Result<Self> {
        let conn = Connection::open(path)?;
        let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Opened {} (journal_mode = {})", path.display(), mode);
        Self::from_connection(conn, Some(path.to_path_buf()), policy)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None, MismatchPolicy::Fail)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>, policy: MismatchPolicy) -> Result<Self> {
        // References between tables are soft
        conn.pragma_update(None, "foreign_keys", "OFF")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            fairy_tales: OnceLock::new(),
            voices: OnceLock::new(),
            images: OnceLock::new(),
            texts: OnceLock::new(),
            musics: OnceLock::new(),
        };

        match db.initialize_schema() {
            Ok(()) => {}
            Err(e @ (Error::SchemaMismatch { .. } | Error::SchemaIdentity { .. })) => {
                if policy == MismatchPolicy::Recreate {
                    tracing::warn!("{}; recreating all tables", e);
                    db.reset()?;
                } else {
                    tracing::error!("{}", e);
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }
        Ok(db)
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::Poisoned)
    }

    /// Create missing tables, then validate every table and the identity hash.
    /// Once an identity is stored, a missing table is a mismatch, not created anew.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        if schema::table_exists(&conn, schema::META_TABLE)? && schema::stored_identity(&conn)?.is_some() {
            for layout in schema::ALL_TABLES {
                schema::validate_table(&conn, layout)?;
            }
        }
        for stmt in schema::all_schema_statements() {
            conn.execute(&stmt, [])?;
        }
        for layout in schema::ALL_TABLES {
            schema::validate_table(&conn, layout)?;
        }

        let expected = schema::identity_hash();
        match schema::stored_identity(&conn)? {
            None => {
                schema::write_identity(&conn)?;
                tracing::info!("Created schema v{} ({})", schema::SCHEMA_VERSION, &expected[..12]);
            }
            Some(found) if found != expected => {
                return Err(Error::SchemaIdentity { expected, found });
            }
            Some(_) => tracing::debug!("Schema identity verified"),
        }
        Ok(())
    }

    /// Drop every table and recreate the schema. All rows are lost.
    pub fn reset(&self) -> Result<()> {
        {
            let conn = self.lock()?;
            for layout in schema::ALL_TABLES {
                conn.execute(&format!("DROP TABLE IF EXISTS {}", layout.table), [])?;
            }
            conn.execute(&format!("DROP TABLE IF EXISTS {}", schema::META_TABLE), [])?;
            // AUTOINCREMENT counters live in sqlite_sequence, which only exists once used
            let has_sequence: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE name = 'sqlite_sequence')",
                [],
                |row| row.get(0),
            )?;
            if has_sequence {
                conn.execute("DELETE FROM sqlite_sequence", [])?;
            }
        }
        tracing::info!("Dropped all tables");
        self.initialize_schema()
    }

    /// Location of the database file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn gateway<'a, R: Record>(&self, slot: &'a OnceLock<Gateway<R>>) -> &'a Gateway<R> {
        slot.get_or_init(|| {
            tracing::debug!("Constructing {} gateway", R::KIND);
            Gateway::new(Arc::clone(&self.conn))
        })
    }

    pub fn fairy_tales(&self) -> &Gateway<FairyTale> {
        self.gateway(&self.fairy_tales)
    }

    pub fn voices(&self) -> &Gateway<Voice> {
        self.gateway(&self.voices)
    }

    pub fn images(&self) -> &Gateway<Image> {
        self.gateway(&self.images)
    }

    pub fn texts(&self) -> &Gateway<Text> {
        self.gateway(&self.texts)
    }

    pub fn musics(&self) -> &Gateway<Music> {
        self.gateway(&self.musics)
    }

    /// Row count of one kind
    pub fn count(&self, kind: AssetKind) -> Result<usize> {
        match kind {
            AssetKind::FairyTale => self.fairy_tales().count(),
            AssetKind::Voice => self.voices().count(),
            AssetKind::Image => self.images().count(),
            AssetKind::Text => self.texts().count(),
            AssetKind::Music => self.musics().count(),
        }
    }

    /// Delete one row of any kind. Returns the number of rows removed.
    pub fn delete(&self, kind: AssetKind, id: i64) -> Result<usize> {
        match kind {
            AssetKind::FairyTale => self.fairy_tales().delete(id),
            AssetKind::Voice => self.voices().delete(id),
            AssetKind::Image => self.images().delete(id),
            AssetKind::Text => self.texts().delete(id),
            AssetKind::Music => self.musics().delete(id),
        }
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            fairy_tales: self.count(AssetKind::FairyTale)?,
            voices: self.count(AssetKind::Voice)?,
            images: self.count(AssetKind::Image)?,
            texts: self.count(AssetKind::Text)?,
            musics: self.count(AssetKind::Music)?,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DbStats {
    pub fairy_tales: usize,
    pub voices: usize,
    pub images: usize,
    pub texts: usize,
    pub musics: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Fairy tales: {}", self.fairy_tales)?;
        writeln!(f, "  Voices: {}", self.voices)?;
        writeln!(f, "  Images: {}", self.images)?;
        writeln!(f, "  Texts: {}", self.texts)?;
        writeln!(f, "  Music: {}", self.musics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_gateway_is_cached() {
        let db = Database::open_in_memory().unwrap();
        let first: *const Gateway<Voice> = db.voices();
        let second: *const Gateway<Voice> = db.voices();
        assert_eq!(first, second);
    }

    #[test]
    fn test_concurrent_first_access_builds_one_gateway() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                thread::spawn(move || db.musics() as *const Gateway<Music> as usize)
            })
            .collect();

        let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addrs.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_concurrent_inserts_get_unique_ids() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    (0..10)
                        .map(|j| db.texts().insert(&Text::new(format!("/t/{}_{}.txt", i, j))).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 40);
    }

    #[test]
    fn test_reopen_validates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tales.db");

        {
            let db = Database::open(&path).unwrap();
            db.voices().insert(&Voice::new("Narrator", "/v.wav", "calm")).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.count(AssetKind::Voice).unwrap(), 1);
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn test_open_rejects_drifted_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "CREATE TABLE voices (voice_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, title TEXT NOT NULL, created_at INTEGER NOT NULL)",
                [],
            )
            .unwrap();
        }

        match Database::open(&path) {
            Err(Error::SchemaMismatch { table, .. }) => assert_eq!(table, "voices"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("drifted schema was accepted"),
        }
    }

    #[test]
    fn test_open_rejects_foreign_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.db");
        {
            let db = Database::open(&path).unwrap();
            let conn = db.lock().unwrap();
            conn.execute("UPDATE schema_meta SET identity_hash = 'abc' WHERE id = 1", []).unwrap();
        }

        assert!(matches!(
            Database::open(&path),
            Err(Error::SchemaIdentity { found, .. }) if found == "abc"
        ));
    }

    #[test]
    fn test_open_rejects_lost_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lost.db");
        {
            let db = Database::open(&path).unwrap();
            db.lock().unwrap().execute("DROP TABLE musics", []).unwrap();
        }

        match Database::open(&path) {
            Err(Error::SchemaMismatch { table, found, .. }) => {
                assert_eq!(table, "musics");
                assert_eq!(found, "no table");
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("lost table was recreated silently"),
        }

        let db = Database::open_with(&path, MismatchPolicy::Recreate).unwrap();
        assert_eq!(db.count(AssetKind::Music).unwrap(), 0);
    }

    #[test]
    fn test_recreate_policy_resets_drifted_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recreate.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE images (image_id INTEGER PRIMARY KEY, name TEXT)", []).unwrap();
            conn.execute("INSERT INTO images VALUES (1, 'stale')", []).unwrap();
        }

        let db = Database::open_with(&path, MismatchPolicy::Recreate).unwrap();
        assert_eq!(db.count(AssetKind::Image).unwrap(), 0);
        assert_eq!(db.images().insert(&Image::new("fresh", "/f.jpg")).unwrap(), 1);
    }

    #[test]
    fn test_reset_clears_rows_and_counters() {
        let db = Database::open_in_memory().unwrap();
        db.voices().insert(&Voice::new("a", "/a.wav", "")).unwrap();
        db.voices().insert(&Voice::new("b", "/b.wav", "")).unwrap();

        db.reset().unwrap();
        assert_eq!(db.stats().unwrap().voices, 0);
        assert_eq!(db.voices().insert(&Voice::new("c", "/c.wav", "")).unwrap(), 1);
    }

    #[test]
    fn test_stats_and_generic_delete() {
        let db = Database::open_in_memory().unwrap();
        let id = db.images().insert(&Image::new("Forest", "/forest.jpg")).unwrap();
        db.musics().insert(&Music::new("Song", "/s.mp3", "calm")).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!((stats.images, stats.musics, stats.voices), (1, 1, 0));
        assert!(stats.to_string().contains("Images: 1"));

        assert_eq!(db.delete(AssetKind::Image, id).unwrap(), 1);
        assert_eq!(db.delete(AssetKind::Image, id).unwrap(), 0);
    }
}
