//! Data models decoded from admission reviews and the object store.
//!
//! - `OpsRequest`: one administrative action against a managed database
//! - `ManagedDatabase` / `CatalogVersion`: the objects an operation refers to
//! - `DatabaseSchema`: a logical database provisioned inside an instance

mod common;
mod database;
mod engine;
mod ops_request;
mod schema;

pub use common::*;
pub use database::*;
pub use engine::*;
pub use ops_request::*;
pub use schema::*;
