use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

/// S256 transform from RFC 7636: BASE64URL-ENCODE(SHA256(ASCII(verifier))).
pub fn s256_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Compares the S256 transform of `verifier` against `challenge` without
/// short-circuiting on the first differing byte.
pub fn verify_s256(verifier: &str, challenge: &str) -> bool {
    let expected = s256_challenge(verifier);
    if expected.len() != challenge.len() {
        return false;
    }
    expected
        .bytes()
        .zip(challenge.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
