// PostgreSQL module - provides PostgreSQL-specific database functionality
//
// This module is split into several sub-modules for better organization:
// - session: the store handle, connect/disconnect lifecycle and statement execution
// - params: Parameter conversion between middleware and PostgreSQL types
// - query: Result extraction and building

pub mod params;
pub mod query;
pub mod session;

pub use params::Params;
pub use query::build_result_set;
pub use session::PostgresStore;
