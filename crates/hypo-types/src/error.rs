use thiserror::Error;

pub type Result<T> = std::result::Result<T, TypeError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("parse failure at offset {pos} in `{input}`: {reason}")]
    Parse {
        input: String,
        pos: usize,
        reason: String,
    },
}

impl TypeError {
    pub(crate) fn parse(input: &str, pos: usize, reason: impl Into<String>) -> Self {
        TypeError::Parse {
            input: input.to_string(),
            pos,
            reason: reason.into(),
        }
    }
}
