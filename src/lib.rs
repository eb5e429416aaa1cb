//! Validation of Ed25519-signed JSON software licenses.

pub mod canonical;
pub mod config;
pub mod error;
pub mod verification;

pub use error::{LicenseError, LicenseResult};

use canonical::HtmlSafeFormatter;
use chrono::{DateTime, FixedOffset};
use serde_derive::{Deserialize, Serialize};

/// Seconds between the Unix epoch and `0001-01-01T00:00:00Z`.
const ZERO_TIMESTAMP_SECS: i64 = -62_135_596_800;

/// Timestamp used for absent date fields, `0001-01-01T00:00:00Z`.
pub fn zero_timestamp() -> DateTime<FixedOffset> {
    DateTime::from_timestamp(ZERO_TIMESTAMP_SECS, 0)
        .unwrap_or_default()
        .fixed_offset()
}

/// The license fields covered by the signature.
///
/// Field order and the renamed keys form the canonical encoding; changing
/// either invalidates every issued license.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawLicense {
    pub version: String,
    pub customer: String,
    #[serde(rename = "valid-from", with = "canonical::timestamp")]
    pub valid_from: DateTime<FixedOffset>,
    #[serde(rename = "expiry-date", with = "canonical::timestamp")]
    pub expiry: DateTime<FixedOffset>,
    #[serde(rename = "hard-expiry-date", with = "canonical::timestamp")]
    pub hard_expiry: DateTime<FixedOffset>,
    pub seats: i64,
    #[serde(rename = "hard-seats")]
    pub hard_seats: i64,
    #[serde(rename = "type")]
    pub license_type: String,
}

impl Default for RawLicense {
    fn default() -> Self {
        Self {
            version: String::new(),
            customer: String::new(),
            valid_from: zero_timestamp(),
            expiry: zero_timestamp(),
            hard_expiry: zero_timestamp(),
            seats: 0,
            hard_seats: 0,
            license_type: String::new(),
        }
    }
}

impl RawLicense {
    pub fn canonical_bytes(&self) -> LicenseResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, HtmlSafeFormatter);
        serde::Serialize::serialize(self, &mut serializer).map_err(LicenseError::Serialization)?;
        Ok(out)
    }
}

/// A license together with its detached signature.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct SignedLicense {
    #[serde(flatten)]
    license: RawLicense,
    #[serde(default)]
    signature: String,
}

impl SignedLicense {
    pub fn new(license: RawLicense, signature: impl Into<String>) -> Self {
        Self {
            license,
            signature: signature.into(),
        }
    }

    pub fn license(&self) -> &RawLicense {
        &self.license
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The payload covered by the signature. `version` is never signed and
    /// is left empty.
    pub fn unsigned_license(&self) -> RawLicense {
        RawLicense {
            version: String::new(),
            customer: self.license.customer.clone(),
            valid_from: self.license.valid_from,
            expiry: self.license.expiry,
            hard_expiry: self.license.hard_expiry,
            seats: self.license.seats,
            hard_seats: self.license.hard_seats,
            license_type: self.license.license_type.clone(),
        }
    }
}

/// Unknown keys are ignored and missing keys take their zero value.
pub fn parse_raw_license(raw: &[u8]) -> LicenseResult<SignedLicense> {
    serde_json::from_slice(raw).map_err(LicenseError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"version":"v1","expiry-date":"2022-01-01T00:00:00Z","hard-expiry-date":"2022-01-01T00:00:00Z","seats":1,"hard-seats":1,"type":"trial","signature":"h2wNAs5SW4V9X1bqDGVHRZWBCgUkFcOkeK0dkJgescUBsdfIKpHJfyBcbwkKp1IT+RdQVEjMcqYKrVUi4oztDg=="}"#;

    #[test]
    fn parses_all_fields() {
        let signed = parse_raw_license(SAMPLE.as_bytes()).expect("Parsing should work");
        let license = signed.license();

        assert_eq!(license.version, "v1");
        assert_eq!(license.customer, "");
        assert_eq!(license.valid_from, zero_timestamp());
        assert_eq!(license.expiry.to_rfc3339(), "2022-01-01T00:00:00+00:00");
        assert_eq!(license.hard_expiry, license.expiry);
        assert_eq!(license.seats, 1);
        assert_eq!(license.hard_seats, 1);
        assert_eq!(license.license_type, "trial");
        assert_eq!(signed.signature().len(), 88);
    }

    #[test]
    fn missing_fields_take_zero_values() {
        let signed = parse_raw_license(br#"{"customer":"acme"}"#).expect("Parsing should work");

        assert_eq!(signed.license().customer, "acme");
        assert_eq!(signed.license().seats, 0);
        assert_eq!(signed.license().expiry, zero_timestamp());
        assert_eq!(signed.signature(), "");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let signed = parse_raw_license(br#"{"version":"v1","issuer":"someone","extra":[1,2]}"#)
            .expect("Parsing should work");
        assert_eq!(signed.license().version, "v1");
    }

    #[test]
    fn missing_opening_brace_is_a_parse_error() {
        let raw = r#""version": "v1","expiry-date":"2022-01-01T00:00:00Z","seats":1,"type":"trial"}"#;
        let Err(error) = parse_raw_license(raw.as_bytes()) else {
            panic!("An error was expected")
        };
        assert!(matches!(error, LicenseError::Parse(_)));
    }

    #[test]
    fn truncated_and_non_object_inputs_are_parse_errors() {
        for raw in [&SAMPLE[..40], "[]", "\"v1\"", "42", ""] {
            let result = parse_raw_license(raw.as_bytes());
            assert!(
                matches!(result, Err(LicenseError::Parse(_))),
                "{raw:?} should not parse"
            );
        }
    }

    #[test]
    fn mistyped_known_field_is_a_parse_error() {
        let result = parse_raw_license(br#"{"seats":"one"}"#);
        assert!(matches!(result, Err(LicenseError::Parse(_))));
    }

    #[test]
    fn canonical_bytes_have_fixed_order_and_drop_the_signature() {
        let signed = parse_raw_license(SAMPLE.as_bytes()).expect("Parsing should work");
        let canonical = signed
            .unsigned_license()
            .canonical_bytes()
            .expect("Serialization should work");

        assert_eq!(
            String::from_utf8(canonical).unwrap(),
            r#"{"version":"","customer":"","valid-from":"0001-01-01T00:00:00Z","expiry-date":"2022-01-01T00:00:00Z","hard-expiry-date":"2022-01-01T00:00:00Z","seats":1,"hard-seats":1,"type":"trial"}"#
        );
    }

    #[test]
    fn unsigned_license_copies_every_field_but_version() {
        let signed = parse_raw_license(SAMPLE.as_bytes()).expect("Parsing should work");
        let expected = RawLicense {
            version: String::new(),
            ..signed.license().clone()
        };
        assert_eq!(signed.unsigned_license(), expected);
    }

    #[test]
    fn canonical_bytes_keep_timestamp_offsets_and_fractions() {
        let raw = r#"{"customer":"AT&T <EU>","valid-from":"2021-06-01T10:00:00+05:30","expiry-date":"2022-01-01T10:00:00.5Z","hard-expiry-date":"2022-02-01T00:00:00.25-08:00","seats":2,"hard-seats":3,"type":"full"}"#;
        let signed = parse_raw_license(raw.as_bytes()).expect("Parsing should work");
        let canonical = signed
            .unsigned_license()
            .canonical_bytes()
            .expect("Serialization should work");

        assert_eq!(
            String::from_utf8(canonical).unwrap(),
            r#"{"version":"","customer":"AT\u0026T \u003cEU\u003e","valid-from":"2021-06-01T10:00:00+05:30","expiry-date":"2022-01-01T10:00:00.5Z","hard-expiry-date":"2022-02-01T00:00:00.25-08:00","seats":2,"hard-seats":3,"type":"full"}"#
        );
    }

    #[test]
    fn malformed_timestamp_is_a_parse_error() {
        let result = parse_raw_license(br#"{"expiry-date":"2022-01-01"}"#);
        assert!(matches!(result, Err(LicenseError::Parse(_))));
    }
}
