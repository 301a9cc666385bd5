//! Webhook payload signatures (`X-Hub-Signature-256`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const PREFIX: &str = "sha256=";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("request is not signed")]
    Missing,
    #[error("request signature does not match payload")]
    Invalid,
}

/// How inbound payloads are authenticated.
#[derive(Clone, Default)]
pub struct SignaturePolicy {
    secret: Vec<u8>,
    required: bool,
}

impl SignaturePolicy {
    pub fn new(secret: &str, required: bool) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            required,
        }
    }

    /// Accept everything; signatures are not checked.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Check `header` (the raw signature header value, if any) against `body`.
    ///
    /// Unsigned requests pass unless signatures are required. Without a
    /// secret there is nothing to verify against, so signed requests pass too.
    pub fn check(&self, header: Option<&str>, body: &[u8]) -> Result<(), SignatureError> {
        let Some(value) = header else {
            return if self.required {
                Err(SignatureError::Missing)
            } else {
                Ok(())
            };
        };
        if self.secret.is_empty() {
            return Ok(());
        }

        let digest = value
            .strip_prefix(PREFIX)
            .and_then(|hex_digest| hex::decode(hex_digest).ok())
            .ok_or(SignatureError::Invalid)?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::Invalid)?;
        mac.update(body);
        mac.verify_slice(&digest)
            .map_err(|_| SignatureError::Invalid)
    }
}

/// `sha256=<hex>` signature of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("{PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"ref":"refs/heads/main"}"#;

    #[test]
    fn valid_signature_passes() {
        let policy = SignaturePolicy::new("s3cret", true);
        let header = sign("s3cret", BODY);
        assert!(header.starts_with("sha256="));
        assert_eq!(policy.check(Some(&header), BODY), Ok(()));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2.
        let header = sign("Jefe", b"what do ya want for nothing?");
        assert_eq!(
            header,
            "sha256=5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn empty_secret_still_signs() {
        let header = sign("", BODY);
        assert_eq!(header.len(), PREFIX.len() + 64);
        assert!(header.starts_with(PREFIX));
    }

    #[test]
    fn tampered_body_is_invalid() {
        let policy = SignaturePolicy::new("s3cret", false);
        let header = sign("s3cret", BODY);
        assert_eq!(
            policy.check(Some(&header), b"{}"),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let policy = SignaturePolicy::new("s3cret", true);
        let header = sign("other", BODY);
        assert_eq!(policy.check(Some(&header), BODY), Err(SignatureError::Invalid));
    }

    #[test]
    fn malformed_header_is_invalid() {
        let policy = SignaturePolicy::new("s3cret", true);
        assert_eq!(policy.check(Some("sha1=abcd"), BODY), Err(SignatureError::Invalid));
        assert_eq!(policy.check(Some("sha256=zz"), BODY), Err(SignatureError::Invalid));
    }

    #[test]
    fn missing_header_depends_on_policy() {
        assert_eq!(
            SignaturePolicy::new("s3cret", true).check(None, BODY),
            Err(SignatureError::Missing)
        );
        assert_eq!(SignaturePolicy::new("s3cret", false).check(None, BODY), Ok(()));
        assert_eq!(SignaturePolicy::disabled().check(None, BODY), Ok(()));
    }
}
