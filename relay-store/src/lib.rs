#![deny(clippy::all)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use traits::DeliveryStore;
