//! Persistence gateway: the durable store's client side.

mod records;
mod rest;
pub mod traits;

pub use records::{EdgeRecord, MutationResponse, NodeRecord, NodeUpdateBody};
pub use rest::RestGateway;
pub use traits::PersistenceGateway;

#[cfg(test)]
pub(crate) mod mock;
