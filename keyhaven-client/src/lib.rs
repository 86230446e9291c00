//! Client-side envelope session for Keyhaven.
//!
//! Orchestrates the end-to-end flows of envelope encryption:
//!
//! - **Write**: generate content key -> seal file -> wrap key under own
//!   public key -> submit blob -> store wrapped key with custody.
//! - **Read**: gated custody fetch -> retrieve blob -> unwrap -> open.
//! - **Share**: unwrap own key, re-wrap under the grantee's published key,
//!   record the grant.
//!
//! The blob store and key directory are narrow collaborator traits; the
//! bundled in-memory implementations serve tests and single-process use.

mod blob;
mod config;
mod directory;
mod error;
mod session;

pub use blob::{BlobStore, MemoryBlobStore};
pub use config::SessionConfig;
pub use directory::{KeyDirectory, MemoryKeyDirectory};
pub use error::{SessionError, SessionResult};
pub use session::EnvelopeSession;
