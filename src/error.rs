#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Appending would grow a buffer past its fixed capacity.
    #[error("Overflow: {requested} bytes requested, {available} available")]
    Overflow { requested: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
