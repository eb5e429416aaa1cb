use crate::error::{LicenseError, LicenseResult};

/// Environment variable holding the base64-encoded Ed25519 public key.
pub const PUB_KEY_ENV: &str = "PUB_KEY";

/// Reads the public key from the environment variable `name`.
///
/// Surrounding whitespace is ignored; an unset, empty or non-unicode value is
/// reported as [`LicenseError::Config`].
pub fn public_key_from_env(name: &str) -> LicenseResult<String> {
    let value = std::env::var(name)
        .map_err(|e| LicenseError::Config(format!("{name} is not available: {e}")))?;

    let value = value.trim();
    if value.is_empty() {
        return Err(LicenseError::Config(format!(
            "{name} should not be 0 length"
        )));
    }

    Ok(value.to_string())
}
