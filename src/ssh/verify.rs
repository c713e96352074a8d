//! Host key pinning.
//!
//! The expected fingerprint comes from configuration and is the only root of
//! trust: there is no known_hosts lookup and no way to accept an unknown key.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fingerprint mismatch: expected {expected}, got {actual}")]
pub struct FingerprintMismatch {
    pub expected: String,
    pub actual: String,
}

/// Decides whether the key a host presented during the handshake is trusted.
/// Arguments are the host name that was dialed, the address the bytes came
/// from, and the host key in SSH wire encoding.
pub type HostKeyCallback =
    Box<dyn Fn(&str, &str, &[u8]) -> Result<(), FingerprintMismatch> + Send + Sync>;

/// `SHA256:<unpadded base64>` of the key blob, as printed by `ssh-keygen -lf`.
pub fn fingerprint_sha256(key: &[u8]) -> String {
    let digest = Sha256::digest(key);
    format!("SHA256:{}", STANDARD_NO_PAD.encode(digest))
}

pub fn verify_fingerprint(expected: impl Into<String>) -> HostKeyCallback {
    let expected = expected.into();
    Box::new(move |hostname, remote, key| {
        let actual = fingerprint_sha256(key);
        if actual != expected {
            log::debug!("{} ({}) presented {}, expected {}", hostname, remote, actual, expected);
            return Err(FingerprintMismatch {
                expected: expected.clone(),
                actual,
            });
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssh_key::rand_core::OsRng;
    use ssh_key::{Algorithm, HashAlg, PrivateKey};

    #[test]
    fn fingerprint_of_empty_blob() {
        assert_eq!(
            fingerprint_sha256(b""),
            "SHA256:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU"
        );
    }

    #[test]
    fn matches_openssh_fingerprint_format() {
        let key = PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap();
        let public = key.public_key();
        let blob = public.to_bytes().unwrap();
        assert_eq!(
            fingerprint_sha256(&blob),
            public.fingerprint(HashAlg::Sha256).to_string()
        );
    }

    #[test]
    fn accepts_exact_fingerprint() {
        let blob: &[u8] = b"ssh-ed25519 host key blob";
        let check = verify_fingerprint(fingerprint_sha256(blob));
        assert!(check("example.com", "192.0.2.1:22", blob).is_ok());
    }

    #[test]
    fn rejects_single_character_difference() {
        let blob: &[u8] = b"ssh-ed25519 host key blob";
        let good = fingerprint_sha256(blob);

        let mut chars: Vec<char> = good.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();

        let err = verify_fingerprint(tampered.clone())("example.com", "192.0.2.1:22", blob)
            .unwrap_err();
        assert_eq!(err.expected, tampered);
        assert_eq!(err.actual, good);
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let blob: &[u8] = b"another key";
        let lowered = fingerprint_sha256(blob).to_lowercase();
        assert!(verify_fingerprint(lowered)("h", "h:22", blob).is_err());
    }

    #[test]
    fn rejects_other_key() {
        let check = verify_fingerprint(fingerprint_sha256(b"key one"));
        assert!(check("h", "h:22", &b"key two"[..]).is_err());
    }
}
