pub mod store;

pub use store::{CategoryStore, StoreError, StoreLoadError};
