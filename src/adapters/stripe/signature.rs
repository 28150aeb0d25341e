use {
    crate::domain::error::EngineError,
    hmac::{Hmac, Mac},
    sha2::Sha256,
    std::time::Duration,
};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Parsed `Stripe-Signature` header: `t=<unix>,v1=<hex>[,v1=<hex>...]`.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, EngineError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
                Some(("v1", v)) => {
                    // Undecodable entries can never match; skip them.
                    if let Ok(sig) = hex::decode(v) {
                        signatures.push(sig);
                    }
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            EngineError::WebhookSignature("missing timestamp in signature header".into())
        })?;
        if signatures.is_empty() {
            return Err(EngineError::WebhookSignature(
                "no v1 signature in signature header".into(),
            ));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn check_freshness(&self, now: i64, tolerance: Duration) -> Result<(), EngineError> {
        let age = now.abs_diff(self.timestamp);
        if age > tolerance.as_secs() {
            return Err(EngineError::WebhookSignature(format!(
                "signature timestamp {} is {age}s away from now",
                self.timestamp
            )));
        }
        Ok(())
    }

    /// Constant-time check of every `v1` entry against `secret`.
    pub fn verifies(&self, secret: &str, payload: &[u8]) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(self.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        self.signatures
            .iter()
            .any(|sig| mac.clone().verify_slice(sig).is_ok())
    }
}

/// Header value a sender holding `secret` would attach to `payload`.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, EngineError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| EngineError::Configuration(format!("webhook secret: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

