//! Errors raised while validating CRD contents

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrdError {
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("missing field {0}")]
    MissingField(String),
}
