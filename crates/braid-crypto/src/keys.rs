//! Key management for Braid nodes
//!
//! Events are signed with Ed25519. The node identity is the BLAKE3 hash of
//! the verifying key, so signatures and roster membership share one keypair.

use braid_core::types::NodeId;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;

/// Complete keypair for a node
pub struct KeyPair {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    /// Deterministically derive a keypair from a 32-byte seed
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(&seed);
        let verifying = signing.verifying_key();
        Self { signing, verifying }
    }

    /// Node ID derived from the verifying key
    pub fn node_id(&self) -> NodeId {
        NodeId::from_public_key(self.verifying.as_bytes())
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying.to_bytes()
    }

    /// Sign a message, returning the 64-byte Ed25519 signature
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }

    /// Verify a signature produced by this keypair
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        self.verifying.verify(message, &signature).is_ok()
    }
}

/// Verify a signature against a raw verifying key
pub fn verify_with_key(public_key: &[u8; 32], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::generate();
        let message = b"event body digest";

        let signature = keypair.sign(message);
        assert!(keypair.verify(message, &signature));
        assert!(!keypair.verify(b"tampered", &signature));
    }

    #[test]
    fn test_verify_with_raw_key() {
        let keypair = KeyPair::from_seed([9u8; 32]);
        let signature = keypair.sign(b"msg");

        assert!(verify_with_key(&keypair.public_key_bytes(), b"msg", &signature));
        assert!(!verify_with_key(&keypair.public_key_bytes(), b"msg", &[0u8; 10]));
    }

    #[test]
    fn test_node_id_is_stable_for_seed() {
        let a = KeyPair::from_seed([1u8; 32]);
        let b = KeyPair::from_seed([1u8; 32]);
        let c = KeyPair::from_seed([2u8; 32]);

        assert_eq!(a.node_id(), b.node_id());
        assert_ne!(a.node_id(), c.node_id());
    }
}
