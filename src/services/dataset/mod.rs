pub mod loader;
pub mod types;
pub mod utils;

pub use loader::load;
pub use types::{ColumnType, Dataset};
