use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("unique constraint violation: {0}")]
    Constraint(String),

    #[error("stored block {0} is malformed: {1}")]
    MalformedRow(u64, String),
}
