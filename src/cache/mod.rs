// Entity cache module.
// Keys, invalidation tags, and the in-memory store behind the query and
// mutation layers.

pub mod key;
pub mod store;
pub mod tags;

pub use key::QueryKey;
pub use store::{
    DEFAULT_RETENTION, EntryStatus, FetchDecision, PatchRecord, Store, Subscription,
};
pub use tags::{Tag, TagIndex, TagType};
