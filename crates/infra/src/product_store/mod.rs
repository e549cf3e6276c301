//! Product catalog storage.
//!
//! Each product is its own lockable slot: writers on one product never wait
//! for writers on another.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryProductStore;
pub use r#trait::ProductStore;
