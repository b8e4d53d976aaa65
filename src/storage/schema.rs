//! Database schema definitions
//!
//! Every table is described once, as an explicit column layout. The layout
//! drives DDL, the column lists of every statement, row decoding, and the
//! validation of an existing database file.

use rusqlite::{Connection, OptionalExtension};
use crate::{Error, Result};

/// Schema version recorded in the metadata table. No migrations exist past 1.
pub const SCHEMA_VERSION: i64 = 1;

/// Declared SQLite type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
        }
    }
}

/// One column of a table layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub primary_key: bool,
}

impl Column {
    /// Autoincrementing integer identity
    pub const fn key(name: &'static str) -> Self {
        Self { name, ty: ColumnType::Integer, primary_key: true }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self { name, ty: ColumnType::Integer, primary_key: false }
    }

    pub const fn text(name: &'static str) -> Self {
        Self { name, ty: ColumnType::Text, primary_key: false }
    }

    fn definition(&self) -> String {
        if self.primary_key {
            format!("{} {} PRIMARY KEY AUTOINCREMENT NOT NULL", self.name, self.ty.as_sql())
        } else {
            format!("{} {} NOT NULL", self.name, self.ty.as_sql())
        }
    }
}

/// The expected shape of one table. The key column comes first.
#[derive(Debug, Clone, Copy)]
pub struct TableLayout {
    pub table: &'static str,
    pub columns: &'static [Column],
}

impl TableLayout {
    pub fn key(&self) -> &'static str {
        self.columns[0].name
    }

    /// Columns after the key, in declaration order
    pub fn value_columns(&self) -> &'static [Column] {
        &self.columns[1..]
    }

    /// Comma separated column list, key first
    pub fn column_list(&self) -> String {
        self.columns.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
    }

    pub fn create_sql(&self) -> String {
        let defs: Vec<String> = self.columns.iter().map(Column::definition).collect();
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.table, defs.join(", "))
    }

    /// Canonical description used both in mismatch reports and the identity hash
    pub fn describe(&self) -> String {
        let cols: Vec<LiveColumn> = self.columns.iter().map(LiveColumn::from).collect();
        describe_columns(&cols)
    }
}

pub const FAIRY_TALES: TableLayout = TableLayout {
    table: "fairy_tales",
    columns: &[
        Column::key("fairy_tales_id"),
        Column::text("title"),
        Column::integer("voice_id"),
        Column::integer("image_id"),
        Column::integer("text_id"),
        Column::integer("music_id"),
        Column::text("attribute"),
        Column::integer("created_at"),
    ],
};

pub const VOICES: TableLayout = TableLayout {
    table: "voices",
    columns: &[
        Column::key("voice_id"),
        Column::text("title"),
        Column::text("voice_path"),
        Column::text("attribute"),
        Column::integer("created_at"),
    ],
};

pub const IMAGES: TableLayout = TableLayout {
    table: "images",
    columns: &[
        Column::key("image_id"),
        Column::text("title"),
        Column::text("image_path"),
        Column::integer("created_at"),
    ],
};

pub const TEXTS: TableLayout = TableLayout {
    table: "texts",
    columns: &[
        Column::key("text_id"),
        Column::text("text_path"),
        Column::integer("created_at"),
    ],
};

pub const MUSICS: TableLayout = TableLayout {
    table: "musics",
    columns: &[
        Column::key("music_id"),
        Column::text("title"),
        Column::text("music_path"),
        Column::text("attribute"),
        Column::integer("created_at"),
    ],
};

/// All record tables
pub const ALL_TABLES: &[&TableLayout] = &[&FAIRY_TALES, &VOICES, &IMAGES, &TEXTS, &MUSICS];

/// SQL to create the metadata table holding the schema identity hash
pub const CREATE_META_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_meta (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL,
    identity_hash TEXT NOT NULL
)
"#;

pub const META_TABLE: &str = "schema_meta";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<String> {
    let mut stmts: Vec<String> = ALL_TABLES.iter().map(|t| t.create_sql()).collect();
    stmts.push(CREATE_META_TABLE.to_string());
    stmts
}

/// Fingerprint of the expected layout of every table plus the version
pub fn identity_hash() -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(format!("v{}", SCHEMA_VERSION).as_bytes());
    for layout in ALL_TABLES {
        hasher.update(format!(";{}({})", layout.table, layout.describe()).as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// A column as reported by `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    pub name: String,
    pub ty: String,
    pub not_null: bool,
    pub primary_key: bool,
}

impl From<&Column> for LiveColumn {
    fn from(column: &Column) -> Self {
        Self {
            name: column.name.to_string(),
            ty: column.ty.as_sql().to_string(),
            not_null: true,
            primary_key: column.primary_key,
        }
    }
}

fn describe_columns(columns: &[LiveColumn]) -> String {
    if columns.is_empty() {
        return "no table".to_string();
    }
    columns
        .iter()
        .map(|c| {
            let mut desc = format!("{} {}", c.name, c.ty);
            if c.primary_key {
                desc.push_str(" PK");
            }
            if c.not_null {
                desc.push_str(" NOT NULL");
            }
            desc
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read the live column set of a table
pub fn live_columns(conn: &Connection, table: &str) -> Result<Vec<LiveColumn>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| {
            let ty: String = row.get(2)?;
            let not_null: i64 = row.get(3)?;
            let pk: i64 = row.get(5)?;
            Ok(LiveColumn {
                name: row.get(1)?,
                ty: ty.to_uppercase(),
                not_null: not_null != 0,
                primary_key: pk != 0,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Compare one table on disk with its expected layout
pub fn validate_table(conn: &Connection, layout: &TableLayout) -> Result<()> {
    let found = live_columns(conn, layout.table)?;
    let expected: Vec<LiveColumn> = layout.columns.iter().map(LiveColumn::from).collect();

    if found != expected {
        return Err(Error::SchemaMismatch {
            table: layout.table.to_string(),
            expected: describe_columns(&expected),
            found: describe_columns(&found),
        });
    }
    Ok(())
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Stored identity hash, if the metadata row exists
pub fn stored_identity(conn: &Connection) -> Result<Option<String>> {
    conn.query_row(
        "SELECT identity_hash FROM schema_meta WHERE id = 1",
        [],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}

pub fn write_identity(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (id, version, identity_hash) VALUES (1, ?1, ?2)",
        rusqlite::params![SCHEMA_VERSION, identity_hash()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for stmt in all_schema_statements() {
            conn.execute(&stmt, []).unwrap();
        }
        conn
    }

    #[test]
    fn test_created_tables_validate() {
        let conn = fresh();
        for layout in ALL_TABLES {
            validate_table(&conn, layout).unwrap();
        }
    }

    #[test]
    fn test_create_sql_declares_not_null() {
        let sql = VOICES.create_sql();
        assert!(sql.contains("voice_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL"));
        assert!(sql.contains("attribute TEXT NOT NULL"));
        assert!(!sql.contains("REFERENCES"));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE images (image_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, title TEXT NOT NULL, created_at INTEGER NOT NULL)",
            [],
        )
        .unwrap();

        match validate_table(&conn, &IMAGES) {
            Err(Error::SchemaMismatch { table, expected, found }) => {
                assert_eq!(table, "images");
                assert!(expected.contains("image_path TEXT NOT NULL"));
                assert!(!found.contains("image_path"));
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_nullable_column_is_reported() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE texts (text_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, text_path TEXT, created_at INTEGER NOT NULL)",
            [],
        )
        .unwrap();
        assert!(matches!(
            validate_table(&conn, &TEXTS),
            Err(Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_identity_hash_is_stable() {
        assert_eq!(identity_hash(), identity_hash());
        assert_eq!(identity_hash().len(), 64);
    }

    #[test]
    fn test_table_exists() {
        let conn = fresh();
        assert!(table_exists(&conn, "voices").unwrap());
        conn.execute("DROP TABLE voices", []).unwrap();
        assert!(!table_exists(&conn, "voices").unwrap());
    }

    #[test]
    fn test_identity_roundtrip() {
        let conn = fresh();
        assert!(stored_identity(&conn).unwrap().is_none());
        write_identity(&conn).unwrap();
        assert_eq!(stored_identity(&conn).unwrap(), Some(identity_hash()));
    }
}
