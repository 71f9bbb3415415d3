//! Host tools exposed over the stdio protocol.

pub mod backend_status;
pub mod catalog_search;
pub mod registry;
pub mod types;

pub use backend_status::BackendStatusTool;
pub use catalog_search::CatalogSearchTool;
pub use registry::ToolRegistry;
pub use types::Tool;
