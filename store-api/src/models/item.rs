use rusqlite::{params, OptionalExtension, Row};

use crate::db::{Database, DbError};

/// A priced item. Names are unique across all stores.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemModel {
    pub id: Option<i64>,
    pub name: String,
    pub price: f64,
    pub store_id: i64,
}

impl ItemModel {
    pub fn new(name: impl Into<String>, price: f64, store_id: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            store_id,
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            price: row.get(2)?,
            store_id: row.get(3)?,
        })
    }

    /// Insert a new row, or update price and store of an already saved item.
    ///
    /// Fails with [`DbError::UniqueViolation`] when inserting a taken name and
    /// [`DbError::ForeignKeyViolation`] when `store_id` names no store.
    pub fn save(&mut self, db: &Database) -> Result<(), DbError> {
        match self.id {
            Some(id) => db.with_conn(|conn| {
                conn.execute(
                    "UPDATE items SET price = ?1, store_id = ?2 WHERE id = ?3",
                    params![self.price, self.store_id, id],
                )
                .map(|_| ())
            }),
            None => {
                let id = db.with_conn(|conn| {
                    conn.execute(
                        "INSERT INTO items (name, price, store_id) VALUES (?1, ?2, ?3)",
                        params![self.name, self.price, self.store_id],
                    )?;
                    Ok(conn.last_insert_rowid())
                })?;
                self.id = Some(id);
                Ok(())
            }
        }
    }

    /// Create `name` or, if it already exists, set its price and leave its store alone.
    /// Runs as one statement, so concurrent callers never see a unique violation.
    pub fn put(db: &Database, name: &str, price: f64, store_id: i64) -> Result<Self, DbError> {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO items (name, price, store_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET price = excluded.price",
                params![name, price, store_id],
            )?;
            conn.query_row(
                "SELECT id, name, price, store_id FROM items WHERE name = ?1",
                params![name],
                Self::from_row,
            )
        })
    }

    pub fn find_by_name(db: &Database, name: &str) -> Result<Option<Self>, DbError> {
        db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, price, store_id FROM items WHERE name = ?1",
                params![name],
                Self::from_row,
            )
            .optional()
        })
    }

    /// All items in insertion order.
    pub fn all(db: &Database) -> Result<Vec<Self>, DbError> {
        db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, price, store_id FROM items ORDER BY id")?;
            let rows = stmt.query_map([], Self::from_row)?;
            rows.collect()
        })
    }

    pub fn find_by_store(db: &Database, store_id: i64) -> Result<Vec<Self>, DbError> {
        db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, price, store_id FROM items WHERE store_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![store_id], Self::from_row)?;
            rows.collect()
        })
    }

    /// Returns whether a row was removed.
    pub fn delete_by_name(db: &Database, name: &str) -> Result<bool, DbError> {
        let affected =
            db.with_conn(|conn| conn.execute("DELETE FROM items WHERE name = ?1", params![name]))?;
        Ok(affected > 0)
    }
}
