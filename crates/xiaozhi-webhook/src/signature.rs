use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("public key is not 32 hex-encoded bytes")]
    InvalidPublicKey,
    #[error("signature is not 64 hex-encoded bytes")]
    MalformedSignature,
    #[error("signature does not match timestamp and body")]
    Mismatch,
}

/// Verifies Discord interaction signatures.
///
/// Discord sends `X-Signature-Ed25519: <hex>` and `X-Signature-Timestamp`;
/// the signed message is the timestamp bytes followed by the raw body.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    pub fn from_hex(public_key_hex: &str) -> Result<Self, SignatureError> {
        let bytes: [u8; 32] = hex::decode(public_key_hex.trim())
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or(SignatureError::InvalidPublicKey)?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| SignatureError::InvalidPublicKey)?;
        Ok(Self { key })
    }

    pub fn verify(
        &self,
        timestamp: &str,
        body: &[u8],
        signature_hex: &str,
    ) -> Result<(), SignatureError> {
        let bytes: [u8; 64] = hex::decode(signature_hex)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or(SignatureError::MalformedSignature)?;
        let signature = Signature::from_bytes(&bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify(&message, &signature)
            .map_err(|_| SignatureError::Mismatch)
    }
}

/// One-shot check of `signature_hex` over `timestamp ++ body` with a hex public key.
pub fn verify(
    body: &[u8],
    signature_hex: &str,
    timestamp: &str,
    public_key_hex: &str,
) -> Result<(), SignatureError> {
    SignatureVerifier::from_hex(public_key_hex)?.verify(timestamp, body, signature_hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::from_hex(&hex::encode(signing_key().verifying_key().as_bytes())).unwrap()
    }

    fn sign(timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(signing_key().sign(&message).to_bytes())
    }

    #[test]
    fn valid_signature_passes() {
        let sig = sign("1700000000", br#"{"type":1}"#);
        assert_eq!(verifier().verify("1700000000", br#"{"type":1}"#, &sig), Ok(()));
    }

    #[test]
    fn one_shot_verify_matches_verifier() {
        let public_key = hex::encode(signing_key().verifying_key().as_bytes());
        let sig = sign("1700000000", b"body");

        assert_eq!(verify(b"body", &sig, "1700000000", &public_key), Ok(()));
        assert_eq!(
            verify(b"other", &sig, "1700000000", &public_key),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify(b"body", &sig, "1700000000", "not-a-key"),
            Err(SignatureError::InvalidPublicKey)
        );
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign("1700000000", br#"{"type":1}"#);
        assert_eq!(
            verifier().verify("1700000000", br#"{"type":2}"#, &sig),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn different_timestamp_fails() {
        let sig = sign("1700000000", b"body");
        assert_eq!(
            verifier().verify("1700000001", b"body", &sig),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn wrong_key_fails() {
        let sig = sign("1", b"body");
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let verifier =
            SignatureVerifier::from_hex(&hex::encode(other.verifying_key().as_bytes())).unwrap();
        assert_eq!(verifier.verify("1", b"body", &sig), Err(SignatureError::Mismatch));
    }

    #[test]
    fn malformed_signature_is_rejected() {
        assert_eq!(
            verifier().verify("1", b"body", "not-hex"),
            Err(SignatureError::MalformedSignature)
        );
        assert_eq!(
            verifier().verify("1", b"body", "abcd"),
            Err(SignatureError::MalformedSignature)
        );
        assert_eq!(
            verifier().verify("1", b"body", ""),
            Err(SignatureError::MalformedSignature)
        );
    }

    #[test]
    fn bad_public_key_is_rejected() {
        assert_eq!(
            SignatureVerifier::from_hex("zz").unwrap_err(),
            SignatureError::InvalidPublicKey
        );
        assert_eq!(
            SignatureVerifier::from_hex("abcd").unwrap_err(),
            SignatureError::InvalidPublicKey
        );
    }
}
