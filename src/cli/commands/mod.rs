//! Command implementations, one module per subcommand.

pub mod audit_cmd;
pub mod cache_cmd;
pub mod delete;
pub mod get;
pub mod list;
pub mod store;
pub mod test_cmd;
pub mod update;
