use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No async runtime available to drive the connection")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, SessionError>;
