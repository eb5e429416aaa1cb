use crate::config::{public_key_from_env, PUB_KEY_ENV};
use crate::error::{LicenseError, LicenseResult};
use crate::{parse_raw_license, SignedLicense};
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signature, VerifyingKey, PUBLIC_KEY_LENGTH};
use jose_jwk::{Jwk, Key, OkpCurves};
use tracing::{debug, warn};

/// Length of a padded base64 encoding of a 64 byte Ed25519 signature.
pub const MIN_SIGNATURE_B64_LEN: usize = 88;

/// Checks license signatures against one Ed25519 public key.
#[derive(Debug, Clone)]
pub struct LicenseValidator {
    verifying_key: VerifyingKey,
}

impl LicenseValidator {
    pub fn from_env() -> LicenseResult<Self> {
        Self::from_env_var(PUB_KEY_ENV)
    }

    pub fn from_env_var(name: &str) -> LicenseResult<Self> {
        let public_key = public_key_from_env(name)?;
        debug!("Loaded license public key from {}", name);
        Self::from_base64(&public_key)
    }

    /// Builds a validator from a standard, padded base64 encoding of the
    /// 32 byte public key.
    pub fn from_base64(public_key_b64: &str) -> LicenseResult<Self> {
        let public_key_b64 = public_key_b64.trim();
        if public_key_b64.is_empty() {
            return Err(LicenseError::Config(
                "public key should not be 0 length".to_string(),
            ));
        }

        let key_bytes = STANDARD
            .decode(public_key_b64)
            .map_err(|e| LicenseError::KeyFormat(format!("invalid base64: {e}")))?;

        Self::from_key_bytes(&key_bytes)
    }

    /// Builds a validator from an OKP JWK on the Ed25519 curve.
    pub fn from_jwk(public_key: serde_json::Value) -> LicenseResult<Self> {
        let parsed_public_key: Jwk = serde_json::from_value(public_key)
            .map_err(|_| LicenseError::KeyFormat("key is not a JWK".to_string()))?;

        let Key::Okp(okp_key) = parsed_public_key.key else {
            return Err(LicenseError::KeyFormat(
                "key type not supported, expected OKP".to_string(),
            ));
        };
        if !matches!(okp_key.crv, OkpCurves::Ed25519) {
            return Err(LicenseError::KeyFormat(
                "curve not supported, expected Ed25519".to_string(),
            ));
        }

        Self::from_key_bytes(&okp_key.x)
    }

    pub fn from_verifying_key(verifying_key: VerifyingKey) -> Self {
        Self { verifying_key }
    }

    fn from_key_bytes(key_bytes: &[u8]) -> LicenseResult<Self> {
        let key: [u8; PUBLIC_KEY_LENGTH] = key_bytes.try_into().map_err(|_| {
            LicenseError::KeyFormat(format!(
                "public key must be {PUBLIC_KEY_LENGTH} bytes, got {}",
                key_bytes.len()
            ))
        })?;
        let verifying_key = VerifyingKey::from_bytes(&key)
            .map_err(|e| LicenseError::KeyFormat(format!("invalid Ed25519 key: {e}")))?;

        Ok(Self::from_verifying_key(verifying_key))
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Only authenticity is checked; expiry and seat limits are left to the
    /// caller.
    pub fn validate(&self, signed: &SignedLicense) -> LicenseResult<()> {
        let signature_b64 = signed.signature();
        if signature_b64.len() < MIN_SIGNATURE_B64_LEN {
            return Err(LicenseError::InvalidSignature(format!(
                "expected at least {MIN_SIGNATURE_B64_LEN} base64 characters, got {}",
                signature_b64.len()
            )));
        }

        let unsigned_license = signed.unsigned_license();
        let message = unsigned_license.canonical_bytes()?;

        if let Err(e) = verify_signature(&self.verifying_key, &message, signature_b64) {
            warn!(
                "Rejected license for customer {:?}: {}",
                unsigned_license.customer, e
            );
            return Err(e);
        }

        debug!(
            "Validated {:?} license for customer {:?}",
            unsigned_license.license_type, unsigned_license.customer
        );
        Ok(())
    }

    pub fn validate_bytes(&self, raw: &[u8]) -> LicenseResult<SignedLicense> {
        let signed = parse_raw_license(raw)?;
        self.validate(&signed)?;
        Ok(signed)
    }
}

/// Verifies a base64 Ed25519 signature over `message`.
pub fn verify_signature(
    verifying_key: &VerifyingKey,
    message: &[u8],
    signature_b64: &str,
) -> LicenseResult<()> {
    let signature_bytes = STANDARD
        .decode(signature_b64)
        .map_err(|e| LicenseError::SignatureFormat(format!("invalid base64: {e}")))?;
    // A decoded signature of the wrong size can never verify.
    let signature = Signature::from_slice(&signature_bytes)
        .map_err(|_| LicenseError::SignatureVerification)?;

    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| LicenseError::SignatureVerification)
}
