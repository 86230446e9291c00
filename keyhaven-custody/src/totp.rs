//! RFC 6238 time-based one-time codes for step-up authentication.
//!
//! HMAC-SHA-1, 6 digits, 30-second steps: the interoperable defaults every
//! authenticator app ships with.

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Length of one time step in seconds.
pub const STEP_SECS: u64 = 30;

/// Accepted clock skew, in steps, on either side of "now".
pub const SKEW_STEPS: u64 = 1;

const DIGITS_MODULUS: u32 = 1_000_000;

/// The time step containing `unix_secs`.
pub fn step_of(unix_secs: u64) -> u64 {
    unix_secs / STEP_SECS
}

/// Computes the 6-digit code for a secret at a given time step.
pub fn code_at(secret: &[u8], step: u64) -> String {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(&step.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // RFC 4226 dynamic truncation
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset] & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    format!("{:06}", binary % DIGITS_MODULUS)
}

/// Verifies a code against the window `now ± SKEW_STEPS`.
///
/// Returns the matching time step so the caller can enforce one accepted
/// code per step, or `None` if the code matches nowhere in the window.
pub fn verify(secret: &[u8], code: &str, now_unix: u64) -> Option<u64> {
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let current = step_of(now_unix);
    let earliest = current.saturating_sub(SKEW_STEPS);
    (earliest..=current + SKEW_STEPS).find(|&step| code_at(secret, step) == code)
}
