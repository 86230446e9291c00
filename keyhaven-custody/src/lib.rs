//! Wrapped-key custody service for Keyhaven.
//!
//! Holds the durable mapping from (owner, file) to wrapped-key records and
//! gates every key release on ownership, explicit grants, and optional TOTP
//! step-up authentication. Key material passes through here only in wrapped
//! (RSA-OAEP) form; the service never sees a content key in the clear.
//!
//! The persistence engine is pluggable via [`RecordStore`]; the bundled
//! [`MemoryRecordStore`] is the reference implementation of the store's
//! atomicity contract.

mod custody;
mod error;
mod gate;
mod record;
mod store;
pub mod totp;

pub use custody::KeyCustody;
pub use error::{CustodyError, CustodyResult};
pub use gate::{AccessGate, AccessProof, GateDenial, MemoryStepUpSecrets, StepUpSecrets};
pub use record::{GrantEntry, RecordSummary, ReleasedKey, WrappedKeyRecord};
pub use store::{MemoryRecordStore, RecordMutation, RecordStore};
