//! Query Module - Filters and the operator types they are built from

pub mod filter;
pub mod types;

pub use filter::Filter;
pub use types::{QueryOperator, WhereCondition};
