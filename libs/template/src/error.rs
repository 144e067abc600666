use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("unterminated placeholder starting at byte {pos}")]
    Unterminated { pos: usize },

    #[error("empty placeholder at byte {pos}")]
    EmptyName { pos: usize },
}
