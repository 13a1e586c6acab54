use rusqlite::{params, OptionalExtension, Row};

use crate::db::{Database, DbError};

use super::ItemModel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreModel {
    pub id: Option<i64>,
    pub name: String,
}

impl StoreModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
        })
    }

    pub fn insert(&mut self, db: &Database) -> Result<(), DbError> {
        let id = db.with_conn(|conn| {
            conn.execute("INSERT INTO stores (name) VALUES (?1)", params![self.name])?;
            Ok(conn.last_insert_rowid())
        })?;
        self.id = Some(id);
        Ok(())
    }

    pub fn find_by_name(db: &Database, name: &str) -> Result<Option<Self>, DbError> {
        db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name FROM stores WHERE name = ?1",
                params![name],
                Self::from_row,
            )
            .optional()
        })
    }

    /// All stores in insertion order.
    pub fn all(db: &Database) -> Result<Vec<Self>, DbError> {
        db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM stores ORDER BY id")?;
            let rows = stmt.query_map([], Self::from_row)?;
            rows.collect()
        })
    }

    /// Items belonging to this store. An unsaved store has none.
    pub fn items(&self, db: &Database) -> Result<Vec<ItemModel>, DbError> {
        match self.id {
            Some(id) => ItemModel::find_by_store(db, id),
            None => Ok(Vec::new()),
        }
    }

    /// Delete the store with this name along with its items. Deleting a
    /// missing store is not an error.
    pub fn delete_by_name(db: &Database, name: &str) -> Result<bool, DbError> {
        let affected =
            db.with_conn(|conn| conn.execute("DELETE FROM stores WHERE name = ?1", params![name]))?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;

    use super::StoreModel;
    use crate::db::{Database, DbError};
    use crate::models::ItemModel;

    #[test]
    fn stores_are_listed_in_insertion_order() -> Result<()> {
        let db = Database::open_in_memory()?;
        StoreModel::new("b").insert(&db)?;
        StoreModel::new("a").insert(&db)?;

        let names: Vec<String> = StoreModel::all(&db)?.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["b", "a"]);
        Ok(())
    }

    #[test]
    fn duplicate_store_name_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        StoreModel::new("test").insert(&db).unwrap();

        let err = StoreModel::new("test").insert(&db).unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation));
    }

    #[test]
    fn deleting_store_removes_its_items() -> Result<()> {
        let db = Database::open_in_memory()?;
        let mut store = StoreModel::new("test");
        store.insert(&db)?;
        let store_id = store.id.expect("insert assigns an id");
        ItemModel::new("widget", 1.5, store_id).save(&db)?;
        assert_eq!(store.items(&db)?.len(), 1);

        assert!(StoreModel::delete_by_name(&db, "test")?);
        assert_eq!(StoreModel::find_by_name(&db, "test")?, None);
        assert_eq!(ItemModel::find_by_name(&db, "widget")?, None);
        assert!(!StoreModel::delete_by_name(&db, "test")?);
        Ok(())
    }

    #[test]
    fn unsaved_store_has_no_items() -> Result<()> {
        let db = Database::open_in_memory()?;
        assert!(StoreModel::new("draft").items(&db)?.is_empty());
        Ok(())
    }
}
