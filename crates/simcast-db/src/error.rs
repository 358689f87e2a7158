//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`]. Constraint violations are
//! classified so the in-memory and `PostgreSQL` backends report the same
//! variant for the same mistake.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row (e.g. `scenario`).
        entity: &'static str,
        /// Key that was looked up.
        id: String,
    },

    /// A uniqueness rule was violated.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A write referenced a row that does not exist.
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// A stored value could not be decoded into a domain type.
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Shorthand for [`DbError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classify a failed write, mapping constraint violations onto the
    /// backend-neutral variants.
    pub fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::Duplicate(db.message().to_owned());
            }
            if db.is_foreign_key_violation() {
                return Self::ForeignKey(db.message().to_owned());
            }
        }
        Self::Postgres(err)
    }

    /// Whether this error means the referenced row is absent.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_key() {
        let err = DbError::not_found("scenario", 42);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "scenario 42 not found");
    }

    #[test]
    fn non_database_write_errors_stay_postgres() {
        let err = DbError::from_write(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::Postgres(sqlx::Error::RowNotFound)));
    }
}
