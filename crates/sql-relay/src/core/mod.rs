pub mod connection;
pub mod limits;
pub mod normalize;
pub mod query;
pub mod schema;
pub mod service;
pub mod tools;
pub mod types;
