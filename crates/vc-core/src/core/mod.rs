pub(crate) mod config;
pub(crate) mod errors;
pub(crate) mod repo;
pub(crate) mod store;
pub(crate) mod tooling;
