//! One-time passcodes for transaction confirmation
//!
//! The plain code is handed back once on creation. Only an HMAC-SHA256
//! digest bound to the transaction id is persisted.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct OtpIssuer {
    secret: Vec<u8>,
    ttl: Duration,
}

impl OtpIssuer {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Six digit code, never zero-padded
    pub fn generate(&self) -> String {
        let code: u32 = rand::rng().random_range(100_000..1_000_000);
        code.to_string()
    }

    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + self.ttl
    }

    fn mac(&self, transaction_id: Uuid, otp: &str) -> AppResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Configuration(format!("OTP secret: {}", e)))?;
        mac.update(transaction_id.as_bytes());
        mac.update(otp.as_bytes());
        Ok(mac)
    }

    pub fn digest(&self, transaction_id: Uuid, otp: &str) -> AppResult<String> {
        let mac = self.mac(transaction_id, otp)?;
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Constant-time comparison against a stored digest
    pub fn verify(&self, transaction_id: Uuid, otp: &str, digest: &str) -> AppResult<bool> {
        let expected = STANDARD
            .decode(digest)
            .map_err(|e| AppError::Internal(format!("stored OTP digest is not base64: {}", e)))?;
        Ok(self.mac(transaction_id, otp)?.verify_slice(&expected).is_ok())
    }
}
