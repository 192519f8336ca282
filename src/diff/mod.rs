//! Diff ingress: wire-format normalization and structural validation

mod op;
mod validate;

pub use op::{DiffOp, ADD_EDGE, ADD_NODE, REMOVE_EDGE, UPDATE_NODE};
pub use validate::{normalize_op, parse_diff, parse_diff_str, validate, Diff, DiffError, DiffResult};
