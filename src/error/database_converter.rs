use crate::error::AppError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// Utility for converting database errors to structured AppError variants.
pub struct DatabaseErrorConverter;

impl DatabaseErrorConverter {
    /// Converts a Diesel error to an appropriate AppError variant.
    ///
    /// # Arguments
    /// * `error` - The Diesel error to convert
    /// * `operation` - Description of the database operation that failed
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                let detail = match kind {
                    DatabaseErrorKind::UniqueViolation => "unique constraint violation",
                    DatabaseErrorKind::ForeignKeyViolation => "foreign key violation",
                    DatabaseErrorKind::NotNullViolation => "not null violation",
                    DatabaseErrorKind::CheckViolation => "check constraint violation",
                    DatabaseErrorKind::SerializationFailure => "serialization failure",
                    _ => "database error",
                };
                AppError::Database {
                    operation: operation.to_string(),
                    source: anyhow::anyhow!("{}: {}", detail, message),
                }
            }
            DieselError::NotFound => AppError::NotFound {
                entity: "resource".to_string(),
                field: "id".to_string(),
                value: "unknown".to_string(),
            },
            other => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockDatabaseErrorInfo {
        message: String,
    }

    impl diesel::result::DatabaseErrorInformation for MockDatabaseErrorInfo {
        fn message(&self) -> &str {
            &self.message
        }

        fn details(&self) -> Option<&str> {
            None
        }

        fn hint(&self) -> Option<&str> {
            None
        }

        fn table_name(&self) -> Option<&str> {
            None
        }

        fn column_name(&self) -> Option<&str> {
            None
        }

        fn constraint_name(&self) -> Option<&str> {
            None
        }

        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    #[test]
    fn not_found_maps_to_not_found() {
        let result = DatabaseErrorConverter::convert_diesel_error(DieselError::NotFound, "find job");
        assert!(matches!(result, AppError::NotFound { .. }));
    }

    #[test]
    fn database_errors_carry_operation_context() {
        let info = MockDatabaseErrorInfo {
            message: "duplicate key value violates unique constraint \"sms_ops_pkey\"".to_string(),
        };
        let error = DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, Box::new(info));

        let result = DatabaseErrorConverter::convert_diesel_error(error, "materialize working set");
        match result {
            AppError::Database { operation, source } => {
                assert_eq!(operation, "materialize working set");
                assert!(source.to_string().contains("unique constraint violation"));
            }
            other => panic!("Expected Database error, got: {:?}", other),
        }
    }
}
