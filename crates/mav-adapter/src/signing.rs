//! MAVLink v2 signing (HMAC-SHA256 over header+payload+link_id+timestamp).
//!
//! Signing is referenced by the wire format but not mandatory: per the
//! spec's open questions, signing is honored when a `Signer` is configured
//! and skipped otherwise — an unsigned frame is never rejected just because
//! signing is available, only when a signature is present and fails to
//! verify.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Capability the adapter consumes; it does not implement cryptography
/// beyond this narrow trait (spec.md Non-goals: "core... consumes a
/// signing/verifying capability").
pub trait Signer: Send + Sync {
    fn sign(&self, link_id: u8, timestamp: u64, payload: &[u8]) -> [u8; 6];
    fn verify(&self, link_id: u8, timestamp: u64, payload: &[u8], signature: &[u8]) -> bool;
}

/// Default HMAC-SHA256 signer over a shared secret key, truncated to
/// MAVLink v2's 48-bit signature field.
pub struct HmacSigner {
    key: [u8; 32],
}

impl HmacSigner {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    fn mac(&self, link_id: u8, timestamp: u64, payload: &[u8]) -> [u8; 6] {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(&[link_id]);
        mac.update(&timestamp.to_le_bytes()[..6]);
        mac.update(payload);
        let digest = mac.finalize().into_bytes();
        let mut out = [0u8; 6];
        out.copy_from_slice(&digest[..6]);
        out
    }
}

impl Signer for HmacSigner {
    fn sign(&self, link_id: u8, timestamp: u64, payload: &[u8]) -> [u8; 6] {
        self.mac(link_id, timestamp, payload)
    }

    fn verify(&self, link_id: u8, timestamp: u64, payload: &[u8], signature: &[u8]) -> bool {
        if signature.len() != 6 {
            return false;
        }
        self.mac(link_id, timestamp, payload) == signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_its_own_signature() {
        let signer = HmacSigner::new([7u8; 32]);
        let sig = signer.sign(1, 12345, b"payload-bytes");
        assert!(signer.verify(1, 12345, b"payload-bytes", &sig));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let signer = HmacSigner::new([7u8; 32]);
        let sig = signer.sign(1, 12345, b"payload-bytes");
        assert!(!signer.verify(1, 12345, b"tampered-bytes", &sig));
    }
}
