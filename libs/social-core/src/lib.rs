//! Headless client core for profile discovery, connection requests and
//! direct messaging over an external managed store.
//!
//! The workflow is a pure client of the [`remote_store::Store`] contract:
//! every operation talks to the remote store and returns an explicit
//! `Result`; nothing here retries automatically. Synchronization is
//! polling-based (see [`sync`]), and a message may only pass between two
//! users with an established connection (see [`messaging::gate`]).

pub mod backoff;
pub mod config;
pub mod counters;
pub mod error;
pub mod ledger;
pub mod messaging;
pub mod models;
pub mod observability;
pub mod profiles;
pub mod registry;
pub mod session;
pub mod sync;
pub mod validation;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::ClientConfig;
pub use counters::{BadgeSnapshot, Counters};
pub use error::{SocialError, SocialResult};
pub use ledger::RequestLedger;
pub use messaging::{ConversationCache, MessagingService};
pub use models::{
    Connection, ConnectionRequest, MediaKind, MediaRef, Message, Profile, RequestStatus,
};
pub use profiles::{ProfileDirectory, ProfileDraft};
pub use registry::{ConnectionPeer, ConnectionRegistry};
pub use session::Session;
pub use sync::{Poller, SendGuard};
