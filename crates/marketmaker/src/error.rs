use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("market maker is already running")]
    AlreadyRunning,

    #[error("market maker is not running")]
    NotRunning,

    #[error("no reference price available: book is empty and no override or upstream price was given")]
    NoReferencePrice,
}
