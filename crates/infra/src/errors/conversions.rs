//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use teamline_domain::TeamlineError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TeamlineError);

impl From<InfraError> for TeamlineError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TeamlineError> for InfraError {
    fn from(value: TeamlineError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoTeamlineError {
    fn into_teamline(self) -> TeamlineError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → TeamlineError */
/* -------------------------------------------------------------------------- */

impl IntoTeamlineError for SqlError {
    fn into_teamline(self) -> TeamlineError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        TeamlineError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        TeamlineError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        TeamlineError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        TeamlineError::Database("foreign key constraint violation".into())
                    }
                    _ => TeamlineError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => TeamlineError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                TeamlineError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                TeamlineError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                TeamlineError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidParameterName(parameter_name) => {
                TeamlineError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => TeamlineError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => TeamlineError::Database("invalid SQL query".into()),
            other => TeamlineError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_teamline())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → TeamlineError */
/* -------------------------------------------------------------------------- */

impl IntoTeamlineError for r2d2::Error {
    fn into_teamline(self) -> TeamlineError {
        TeamlineError::Database(format!("connection pool error: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_teamline())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TeamlineError */
/* -------------------------------------------------------------------------- */

impl IntoTeamlineError for HttpError {
    fn into_teamline(self) -> TeamlineError {
        if self.is_timeout() {
            return TeamlineError::Network("provider request timed out".into());
        }
        if self.is_connect() {
            return TeamlineError::Network(format!("failed to connect to provider: {self}"));
        }
        if self.is_decode() {
            return TeamlineError::Mapping(format!("failed to decode provider response: {self}"));
        }
        TeamlineError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_teamline())
    }
}
