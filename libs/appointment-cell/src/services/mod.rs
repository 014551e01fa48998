pub mod cache;
pub mod cached_store;
pub mod coordinator;
pub mod metrics;
pub mod slots;
pub mod store;

pub use cache::*;
pub use cached_store::*;
pub use coordinator::*;
pub use metrics::*;
pub use slots::*;
pub use store::*;
