//! Purchase order storage

pub mod store;

pub use store::{PgPurchaseOrderStore, PurchaseOrderStore};

#[cfg(any(test, feature = "test-utils"))]
pub use store::memory::InMemoryPurchaseOrderStore;
