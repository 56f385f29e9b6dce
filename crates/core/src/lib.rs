//! Content model, storage and in-process plumbing shared by the showcase
//! API server and admin tooling.

pub mod cache;
pub mod document;
pub mod events;
pub mod store;

pub use cache::{Generation, TtlCache};
pub use events::{EventBus, ShowcaseEvent};
pub use store::{Store, StoreError, StoreResult, Upserted};
