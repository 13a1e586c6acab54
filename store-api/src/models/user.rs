use rusqlite::{params, OptionalExtension, Row};

use crate::db::{Database, DbError};

/// A registered user. `id` is `None` until the row is inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserModel {
    pub id: Option<i64>,
    pub username: String,
    pub password: String,
}

impl UserModel {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            password: password.into(),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            username: row.get(1)?,
            password: row.get(2)?,
        })
    }

    /// Insert the user and record its id. Fails with
    /// [`DbError::UniqueViolation`] if the username is taken.
    pub fn insert(&mut self, db: &Database) -> Result<(), DbError> {
        let id = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                params![self.username, self.password],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        self.id = Some(id);
        Ok(())
    }

    pub fn find_by_username(db: &Database, username: &str) -> Result<Option<Self>, DbError> {
        db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, password FROM users WHERE username = ?1",
                params![username],
                Self::from_row,
            )
            .optional()
        })
    }

    pub fn find_by_id(db: &Database, id: i64) -> Result<Option<Self>, DbError> {
        db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, password FROM users WHERE id = ?1",
                params![id],
                Self::from_row,
            )
            .optional()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;

    use super::UserModel;
    use crate::db::{Database, DbError};

    #[test]
    fn new_user_keeps_credentials() {
        let user = UserModel::new("test", "1234");

        assert_eq!(user.username, "test");
        assert_eq!(user.password, "1234");
        assert_eq!(user.id, None);
    }

    #[test]
    fn inserted_user_is_found_by_username_and_id() -> Result<()> {
        let db = Database::open_in_memory()?;
        let mut user = UserModel::new("test", "1234");
        user.insert(&db)?;

        let id = user.id.expect("insert assigns an id");
        assert_eq!(UserModel::find_by_username(&db, "test")?, Some(user.clone()));
        assert_eq!(UserModel::find_by_id(&db, id)?, Some(user));
        assert_eq!(UserModel::find_by_username(&db, "nobody")?, None);
        Ok(())
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        UserModel::new("test", "1234").insert(&db).unwrap();

        let err = UserModel::new("test", "other").insert(&db).unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation));
    }
}
