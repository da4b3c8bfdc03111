//! Error types for strata operations.

use thiserror::Error;

/// Errors reported by style compilation and the animated node graph.
///
/// Only programmer mistakes surface here. Conditions that can legitimately
/// occur on every frame (unknown style keys, division by a zero-valued node)
/// degrade to a safe default and are logged instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid pattern {first:?} and {other:?}")]
    InvalidPattern { first: String, other: String },

    #[error("failed to insert CSS rule: {0}")]
    RuleInsert(String),

    #[error("compose() only accepts 2 styles, received {0}")]
    ComposeArity(usize),

    #[error("unknown animated node #{0}")]
    UnknownNode(u32),

    #[error("animated node #{0} has been detached")]
    NodeDetached(u32),

    #[error("animated node #{0} is not a native node")]
    NotNative(u32),

    #[error("animated node #{id} is not a {expected} node")]
    WrongNodeKind { id: u32, expected: &'static str },

    #[error("invalid spring config: {0}")]
    InvalidSpring(String),

    #[error("cannot interpolate an input which is not a number (node #{0})")]
    NonNumericInput(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
