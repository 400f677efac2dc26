use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("entry already exists")]
    AlreadyExists,
    #[error("directory full")]
    Full,
    #[error("entry not found")]
    NotFound,
}
