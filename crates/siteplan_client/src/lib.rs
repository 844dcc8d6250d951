//! Siteplan client: the asynchronous remote-operation layer.
//!
//! Everything the feature code does against the platform funnels through
//! [`RemoteClient`]; long-running drawing imports are observed through the
//! poller, and recomputation-on-edit goes through [`DebouncedTrigger`].
mod client;
mod debounce;
mod error;
mod identity;
mod poller;
mod settings;
mod wire;

pub use client::{with_fallback, Method, RemoteClient};
pub use debounce::{ApplySink, ChannelApplySink, Compute, DebouncedTrigger};
pub use error::{classify_response, ErrorKind, RequestError};
pub use identity::IdentityContext;
pub use poller::{
    start_poll, ChannelUpdateSink, PollEvent, PollHandle, PollOptions, StatusSource, UpdateSink,
};
pub use settings::{ClientSettings, BASE_URL_ENV};
