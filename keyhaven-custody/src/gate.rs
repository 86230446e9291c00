//! Access gate: ownership check plus optional TOTP step-up.
//!
//! Each fetch request runs the state machine
//! `Received -> OwnershipChecked -> (StepUpPending | Authorized | Denied)`
//! exactly once; there are no internal retries, and lockout after repeated
//! failures is a policy layer above this one. The specific denial reason is
//! logged here at debug level; callers translate it into the generic error
//! kinds they expose.

use crate::error::{CustodyError, CustodyResult};
use crate::record::WrappedKeyRecord;
use crate::totp;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::debug;

/// Identity/auth collaborator supplying registered TOTP secrets.
#[async_trait]
pub trait StepUpSecrets: Send + Sync {
    /// The requester's registered TOTP secret, if any.
    async fn totp_secret(&self, identity: &str) -> CustodyResult<Option<Vec<u8>>>;
}

/// In-memory secret registry, for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct MemoryStepUpSecrets {
    secrets: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStepUpSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, identity: impl Into<String>, secret: Vec<u8>) {
        self.secrets.write().await.insert(identity.into(), secret);
    }
}

#[async_trait]
impl StepUpSecrets for MemoryStepUpSecrets {
    async fn totp_secret(&self, identity: &str) -> CustodyResult<Option<Vec<u8>>> {
        Ok(self.secrets.read().await.get(identity).cloned())
    }
}

/// Credentials presented alongside a fetch request.
#[derive(Clone, Debug, Default)]
pub struct AccessProof {
    /// TOTP code, required when the file's policy demands step-up.
    pub step_up_code: Option<String>,
}

impl AccessProof {
    /// Proof carrying no step-up code.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            step_up_code: Some(code.into()),
        }
    }
}

/// Why the gate denied a request. Consumers map these onto their public
/// error taxonomy; the distinctions never reach unauthorized requesters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDenial {
    /// Requester is neither owner nor grantee.
    NotPermitted,
    /// Policy demands a step-up code and none was presented.
    StepUpRequired,
    /// Presented code matched no step in the accept window, or the
    /// requester has no registered secret.
    InvalidCode,
    /// Code was valid but already consumed in its time step.
    ReplayedCode,
}

/// Post-receipt states of one evaluation; every call begins in the implicit
/// `Received` state and ends in `Authorized` or `Denied`.
#[derive(Debug)]
enum GateState {
    OwnershipChecked,
    StepUpPending,
    Authorized,
    Denied(GateDenial),
}

/// Evaluates whether a requester may obtain a wrapped key.
///
/// Tracks the last consumed TOTP step per identity so a captured code cannot
/// be replayed inside its validity window.
pub struct AccessGate {
    secrets: Arc<dyn StepUpSecrets>,
    consumed_steps: RwLock<HashMap<String, u64>>,
}

impl AccessGate {
    pub fn new(secrets: Arc<dyn StepUpSecrets>) -> Self {
        Self {
            secrets,
            consumed_steps: RwLock::new(HashMap::new()),
        }
    }

    /// Runs one evaluation against the current system clock.
    pub async fn evaluate(
        &self,
        record: &WrappedKeyRecord,
        requester: &str,
        proof: &AccessProof,
    ) -> CustodyResult<Result<(), GateDenial>> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| CustodyError::Storage(format!("system clock before epoch: {e}")))?
            .as_secs();
        self.evaluate_at(record, requester, proof, now).await
    }

    /// Runs one evaluation at an explicit unix time. Deterministic; the
    /// clock is the only ambient input to the state machine.
    pub async fn evaluate_at(
        &self,
        record: &WrappedKeyRecord,
        requester: &str,
        proof: &AccessProof,
        now_unix: u64,
    ) -> CustodyResult<Result<(), GateDenial>> {
        // Received -> OwnershipChecked | Denied
        let mut state = if record.permits(requester) {
            GateState::OwnershipChecked
        } else {
            GateState::Denied(GateDenial::NotPermitted)
        };

        // OwnershipChecked -> StepUpPending | Authorized
        if matches!(state, GateState::OwnershipChecked) {
            state = if record.require_step_up {
                GateState::StepUpPending
            } else {
                GateState::Authorized
            };
        }

        // StepUpPending -> Authorized | Denied
        if matches!(state, GateState::StepUpPending) {
            state = self.check_step_up(requester, proof, now_unix).await?;
        }

        match state {
            GateState::Authorized => {
                debug!(file_id = %record.file_id, %requester, "access authorized");
                Ok(Ok(()))
            }
            GateState::Denied(denial) => {
                debug!(file_id = %record.file_id, %requester, ?denial, "access denied");
                Ok(Err(denial))
            }
            other => Err(CustodyError::Storage(format!(
                "gate evaluation ended in non-terminal state {other:?}"
            ))),
        }
    }

    async fn check_step_up(
        &self,
        requester: &str,
        proof: &AccessProof,
        now_unix: u64,
    ) -> CustodyResult<GateState> {
        let Some(code) = proof.step_up_code.as_deref() else {
            return Ok(GateState::Denied(GateDenial::StepUpRequired));
        };

        let Some(secret) = self.secrets.totp_secret(requester).await? else {
            debug!(%requester, "step-up demanded but no secret registered");
            return Ok(GateState::Denied(GateDenial::InvalidCode));
        };

        let Some(matched_step) = totp::verify(&secret, code, now_unix) else {
            return Ok(GateState::Denied(GateDenial::InvalidCode));
        };

        // One accepted code per time step: the consumed-step watermark only
        // moves forward, so re-presenting a code in its window fails.
        let mut consumed = self.consumed_steps.write().await;
        match consumed.get(requester) {
            Some(&last) if matched_step <= last => {
                Ok(GateState::Denied(GateDenial::ReplayedCode))
            }
            _ => {
                consumed.insert(requester.to_string(), matched_step);
                Ok(GateState::Authorized)
            }
        }
    }
}
