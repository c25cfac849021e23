//! CLI command implementations

pub(crate) mod common;
pub(crate) mod info;
pub(crate) mod migrate;
pub(crate) mod plan;
pub(crate) mod unlock;
pub(crate) mod validate;
