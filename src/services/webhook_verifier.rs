//! Payment notification signature verification
//!
//! The signature header has the form `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`
//! where each `v1` is HMAC-SHA256 over `"<t>.<raw body>"` keyed with the
//! endpoint secret. Any `v1` entry may match (secret rotation).

use crate::error::{ApiError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_seconds: i64,
}

struct SignatureHeader<'a> {
    timestamp: &'a str,
    signatures: Vec<Vec<u8>>,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_seconds,
        }
    }

    /// Verify against the current clock
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<()> {
        self.verify_at(payload, header, time::OffsetDateTime::now_utc().unix_timestamp())
    }

    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<()> {
        let parsed = parse_header(header)?;

        let timestamp: i64 = parsed
            .timestamp
            .parse()
            .map_err(|_| ApiError::InvalidNotification("Malformed timestamp".to_string()))?;

        // abs_diff cannot overflow on extreme header values
        let tolerance = u64::try_from(self.tolerance_seconds).unwrap_or(0);
        if now.abs_diff(timestamp) > tolerance {
            return Err(ApiError::InvalidNotification(
                "Timestamp outside the tolerance window".to_string(),
            ));
        }

        for signature in &parsed.signatures {
            let mut mac = self.mac()?;
            mac.update(parsed.timestamp.as_bytes());
            mac.update(b".");
            mac.update(payload);
            if mac.verify_slice(signature).is_ok() {
                return Ok(());
            }
        }

        Err(ApiError::InvalidNotification(
            "No matching signature".to_string(),
        ))
    }

    /// Produce a header value for `payload`, as the gateway would
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String> {
        let timestamp = timestamp.to_string();
        let mut mac = self.mac()?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("t={},v1={}", timestamp, signature))
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Invalid webhook secret: {}", e)))
    }
}

fn parse_header(header: &str) -> Result<SignatureHeader<'_>> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(ApiError::InvalidNotification(
                "Malformed signature header".to_string(),
            ));
        };
        match key {
            "t" => timestamp = Some(value),
            // Undecodable entries are skipped; they can never match
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| ApiError::InvalidNotification("Missing timestamp".to_string()))?;

    if signatures.is_empty() {
        return Err(ApiError::InvalidNotification(
            "Missing v1 signature".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}
