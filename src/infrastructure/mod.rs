pub mod clock;
pub mod duckdb_storage;
pub mod hooks;
pub mod memory;
pub mod plugins;
pub mod repository;
pub mod storage;

#[cfg(test)]
pub mod test_utils;

pub use clock::*;
pub use duckdb_storage::*;
pub use hooks::*;
pub use memory::*;
pub use plugins::*;
pub use repository::*;
pub use storage::*;
