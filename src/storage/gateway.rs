//! Record gateways - one table, five operations
//!
//! A [`Gateway`] turns insert/update/fetch/delete calls into parameterized
//! SQL against the table of its [`Record`] type. All statements are built
//! from the record's column layout, and every row is decoded by the same
//! routine ([`decode`]) through [`Fields`].

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};
use rusqlite::types::{FromSql, ToSql, Value};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use crate::record::{AssetKind, FairyTale, Image, Music, Text, Voice};
use crate::{Error, Result};
use super::schema::{self, TableLayout};

/// A plain record stored in one table.
pub trait Record: Sized {
    const KIND: AssetKind;
    const LAYOUT: &'static TableLayout;
    /// `ORDER BY` clause for [`Gateway::all`]; engine order when `None`
    const ORDER_BY: Option<&'static str> = None;

    fn id(&self) -> Option<i64>;

    /// Values of the non-key columns, in layout order
    fn values(&self) -> Vec<Value>;

    fn from_fields(fields: &Fields<'_, '_>) -> rusqlite::Result<Self>;
}

/// Named access to the columns of a selected row.
///
/// Rows are always selected with the layout's full column list, so a
/// column's position in the layout is its position in the row.
pub struct Fields<'r, 's> {
    row: &'r Row<'s>,
    layout: &'static TableLayout,
}

impl Fields<'_, '_> {
    /// Fetch a column by name. NULL or a mistyped value is an error.
    pub fn get<T: FromSql>(&self, column: &str) -> rusqlite::Result<T> {
        let idx = self
            .layout
            .columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| rusqlite::Error::InvalidColumnName(column.to_string()))?;
        self.row.get(idx)
    }
}

/// Decode one row into a record
pub fn decode<R: Record>(row: &Row<'_>) -> rusqlite::Result<R> {
    R::from_fields(&Fields { row, layout: R::LAYOUT })
}

/// Gateway for the table of `R`, sharing the database connection.
pub struct Gateway<R> {
    conn: Arc<Mutex<Connection>>,
    insert_sql: String,
    update_sql: String,
    select_by_id_sql: String,
    select_all_sql: String,
    delete_sql: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Gateway<R> {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        let layout = R::LAYOUT;
        let columns = layout.column_list();
        let key = layout.key();
        let values = layout.value_columns();

        let placeholders: Vec<String> = (1..=layout.columns.len()).map(|i| format!("?{}", i)).collect();
        let assignments: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", c.name, i + 1))
            .collect();

        let mut select_all_sql = format!("SELECT {} FROM {}", columns, layout.table);
        if let Some(order) = R::ORDER_BY {
            select_all_sql.push_str(" ORDER BY ");
            select_all_sql.push_str(order);
        }

        Self {
            conn,
            insert_sql: format!(
                "INSERT OR ABORT INTO {} ({}) VALUES ({})",
                layout.table,
                columns,
                placeholders.join(", ")
            ),
            update_sql: format!(
                "UPDATE OR ABORT {} SET {} WHERE {} = ?{}",
                layout.table,
                assignments.join(", "),
                key,
                values.len() + 1
            ),
            select_by_id_sql: format!("SELECT {} FROM {} WHERE {} = ?1", columns, layout.table, key),
            select_all_sql,
            delete_sql: format!("DELETE FROM {} WHERE {} = ?1", layout.table, key),
            _record: PhantomData,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::Poisoned)
    }

    /// Insert a record and return its identity.
    ///
    /// An unset identity is bound as NULL, so the engine assigns the next one.
    pub fn insert(&self, record: &R) -> Result<i64> {
        let mut params = Vec::with_capacity(R::LAYOUT.columns.len());
        params.push(record.id().map(Value::Integer).unwrap_or(Value::Null));
        params.extend(record.values());

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&self.insert_sql)?;
        let id = stmt.insert(params_from_iter(params))?;
        tracing::debug!("Inserted {} {}", R::KIND, id);
        Ok(id)
    }

    /// Replace every column of the row with the record's identity.
    /// Returns the number of rows changed.
    pub fn update(&self, record: &R) -> Result<usize> {
        let Some(id) = record.id() else {
            tracing::debug!("Skipping update of {} without identity", R::KIND);
            return Ok(0);
        };
        let mut params = record.values();
        params.push(Value::Integer(id));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&self.update_sql)?;
        let changed = stmt.execute(params_from_iter(params))?;
        Ok(changed)
    }

    /// Get a record by identity
    pub fn find_by_id(&self, id: i64) -> Result<Option<R>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&self.select_by_id_sql)?;
        stmt.query_row([id], |row| decode::<R>(row))
            .optional()
            .map_err(Into::into)
    }

    /// Get all records
    pub fn all(&self) -> Result<Vec<R>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&self.select_all_sql)?;
        let records = stmt
            .query_map([], |row| decode::<R>(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Delete a record by identity. Deleting a missing row returns 0.
    pub fn delete(&self, id: i64) -> Result<usize> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&self.delete_sql)?;
        let removed = stmt.execute([id])?;
        tracing::debug!("Deleted {} {} ({} row(s))", R::KIND, id, removed);
        Ok(removed)
    }

    /// Count all records
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", R::LAYOUT.table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Records whose `column` equals `value`
    fn find_where(&self, column: &str, value: &dyn ToSql) -> Result<Vec<R>> {
        let layout = R::LAYOUT;
        let sql = format!("SELECT {} FROM {} WHERE {} = ?1", layout.column_list(), layout.table, column);

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([value], |row| decode::<R>(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl Gateway<Music> {
    /// Music whose attribute (genre) equals `genre`
    pub fn by_genre(&self, genre: &str) -> Result<Vec<Music>> {
        self.find_where("attribute", &genre)
    }
}

// ========== Record mappings ==========

impl Record for FairyTale {
    const KIND: AssetKind = AssetKind::FairyTale;
    const LAYOUT: &'static TableLayout = &schema::FAIRY_TALES;
    const ORDER_BY: Option<&'static str> = Some("created_at DESC");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            Value::Integer(self.voice_id),
            Value::Integer(self.image_id),
            Value::Integer(self.text_id),
            Value::Integer(self.music_id),
            Value::Text(self.attribute.clone()),
            Value::Integer(self.created_at),
        ]
    }

    fn from_fields(f: &Fields<'_, '_>) -> rusqlite::Result<Self> {
        Ok(FairyTale {
            id: Some(f.get("fairy_tales_id")?),
            title: f.get("title")?,
            voice_id: f.get("voice_id")?,
            image_id: f.get("image_id")?,
            text_id: f.get("text_id")?,
            music_id: f.get("music_id")?,
            attribute: f.get("attribute")?,
            created_at: f.get("created_at")?,
        })
    }
}

impl Record for Voice {
    const KIND: AssetKind = AssetKind::Voice;
    const LAYOUT: &'static TableLayout = &schema::VOICES;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            Value::Text(self.voice_path.clone()),
            Value::Text(self.attribute.clone()),
            Value::Integer(self.created_at),
        ]
    }

    fn from_fields(f: &Fields<'_, '_>) -> rusqlite::Result<Self> {
        Ok(Voice {
            id: Some(f.get("voice_id")?),
            title: f.get("title")?,
            voice_path: f.get("voice_path")?,
            attribute: f.get("attribute")?,
            created_at: f.get("created_at")?,
        })
    }
}

impl Record for Image {
    const KIND: AssetKind = AssetKind::Image;
    const LAYOUT: &'static TableLayout = &schema::IMAGES;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            Value::Text(self.image_path.clone()),
            Value::Integer(self.created_at),
        ]
    }

    fn from_fields(f: &Fields<'_, '_>) -> rusqlite::Result<Self> {
        Ok(Image {
            id: Some(f.get("image_id")?),
            title: f.get("title")?,
            image_path: f.get("image_path")?,
            created_at: f.get("created_at")?,
        })
    }
}

impl Record for Text {
    const KIND: AssetKind = AssetKind::Text;
    const LAYOUT: &'static TableLayout = &schema::TEXTS;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Text(self.text_path.clone()), Value::Integer(self.created_at)]
    }

    fn from_fields(f: &Fields<'_, '_>) -> rusqlite::Result<Self> {
        Ok(Text {
            id: Some(f.get("text_id")?),
            text_path: f.get("text_path")?,
            created_at: f.get("created_at")?,
        })
    }
}

impl Record for Music {
    const KIND: AssetKind = AssetKind::Music;
    const LAYOUT: &'static TableLayout = &schema::MUSICS;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            Value::Text(self.music_path.clone()),
            Value::Text(self.attribute.clone()),
            Value::Integer(self.created_at),
        ]
    }

    fn from_fields(f: &Fields<'_, '_>) -> rusqlite::Result<Self> {
        Ok(Music {
            id: Some(f.get("music_id")?),
            title: f.get("title")?,
            music_path: f.get("music_path")?,
            attribute: f.get("attribute")?,
            created_at: f.get("created_at")?,
        })
    }
}
