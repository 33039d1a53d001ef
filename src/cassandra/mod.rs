// Cassandra module - Cassandra/ScyllaDB support on top of the `scylla` driver
//
// - session: the store handle, connect/disconnect lifecycle and statement execution
// - params: binding `RowValues` to CQL column types
// - query: result extraction and catalog reads

pub mod params;
pub mod query;
pub mod session;

pub use query::build_result_set;
pub use session::CassandraStore;
