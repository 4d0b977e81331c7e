pub mod enums;
pub mod holding;
pub mod summary;
pub mod result;

pub use enums::*;
pub use holding::*;
pub use summary::*;
pub use result::*;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },
}
