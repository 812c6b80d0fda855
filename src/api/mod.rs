// Todo-list API module.
// Client, endpoint implementations, and the cached tasks API.

pub mod client;
pub mod endpoints;
pub mod tasks;
pub mod types;

pub use client::TodoClient;
pub use endpoints::TasksTransport;
pub use tasks::TasksApi;
pub use types::*;
