pub mod error;
pub mod extract;
pub mod models;
pub mod state;
#[cfg(test)]
pub mod test_utils;

pub use error::{CrmError, CrmResult};
pub use extract::{CrmJson, CrmPath};
pub use models::*;
