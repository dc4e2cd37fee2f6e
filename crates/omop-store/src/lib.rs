#![deny(unsafe_code)]

pub mod memory;
pub mod store;

pub use memory::{InMemoryStore, StoreSnapshot};
pub use store::MappingStore;
