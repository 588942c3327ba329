pub mod cipher;
pub mod cli;
pub mod config;
pub mod errors;
pub mod store;
pub mod testsvc;
pub mod vault;
