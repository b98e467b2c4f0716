pub mod driver;
pub mod mapper;
pub mod shell;
pub mod storage;
pub mod utils;

// Re-export common items
pub use mapper::{ElementRecord, Mapper, MapperError};
pub use storage::RecordStore;
