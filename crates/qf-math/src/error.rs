use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MathError {
    #[error("Overflow in match calculation")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, MathError>;
