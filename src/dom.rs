//! Document model and translation synchronizer.

pub mod document;
pub mod sync;

pub use document::{
    Document,
    Mutation,
    NodeId,
    SubscriptionId,
};
pub use sync::{
    DomSynchronizer,
    SyncState,
    ARIA_MARKER,
};
