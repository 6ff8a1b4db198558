//! API endpoint implementations.

mod objects;
mod types;

pub use objects::ObjectsApi;
pub use types::TypesApi;
