pub mod storage;
pub mod error;

pub use error::{DbError, DbResult, ErrorCategory};
