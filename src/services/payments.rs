//! Payment gateway abstraction.
//!
//! Checkout talks to a [`PaymentGateway`] trait object selected once at
//! startup from configuration; request handlers never decide between the
//! real gateway and the sandbox.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::{instrument, warn};

type HmacSha256 = Hmac<Sha256>;

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway rejected order creation: {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key identifier handed to the browser checkout widget.
    fn key_id(&self) -> &str;

    /// Open a gateway-side transaction for `amount_minor` (paise) and
    /// return its gateway order id.
    async fn create_gateway_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<String, GatewayError>;

    /// Check the client-supplied payment signature. Fail closed: any doubt
    /// means `false`.
    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool;
}

/// Live Razorpay client. Orders are opened over the REST API with basic
/// auth; signatures are checked locally against the key secret.
pub struct RazorpayGateway {
    key_id: String,
    key_secret: String,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct RazorpayOrderResponse {
    id: String,
}

impl RazorpayGateway {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self::with_base_url(key_id, key_secret, RAZORPAY_API_BASE.to_string())
    }

    pub fn with_base_url(key_id: String, key_secret: String, base_url: String) -> Self {
        Self {
            key_id,
            key_secret,
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// HMAC-SHA256 over `"{order_id}|{payment_id}"`, hex-encoded. This is
    /// the signature Razorpay hands back after a successful payment.
    fn expected_signature(&self, gateway_order_id: &str, payment_id: &str) -> String {
        let payload = format!("{}|{}", gateway_order_id, payment_id);
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .unwrap_or_else(|_| unreachable!("hmac accepts keys of any length"));
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    #[instrument(skip(self))]
    async fn create_gateway_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount_minor,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let order: RazorpayOrderResponse = response.json().await?;
        Ok(order.id)
    }

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        let expected = self.expected_signature(gateway_order_id, payment_id);
        constant_time_eq(&expected, signature)
    }
}

/// Development stand-in. Never performs network I/O, mints deterministic
/// order ids, and accepts every signature (loudly).
pub struct SandboxGateway {
    key_id: String,
}

impl SandboxGateway {
    pub fn new(key_id: String) -> Self {
        Self { key_id }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_gateway_order(
        &self,
        _amount_minor: i64,
        _currency: &str,
        receipt: &str,
    ) -> Result<String, GatewayError> {
        warn!(receipt, "sandbox gateway: minting order without payment provider");
        Ok(format!("sandbox_order_{}", receipt))
    }

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        _payment_id: &str,
        _signature: &str,
    ) -> bool {
        warn!(
            gateway_order_id,
            "sandbox gateway: accepting payment signature without verification"
        );
        true
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn razorpay_accepts_its_own_signature() {
        let gw = RazorpayGateway::new("rzp_test_key".into(), "secret".into());
        let sig = gw.expected_signature("order_123", "pay_456");
        assert!(gw.verify_payment_signature("order_123", "pay_456", &sig));
    }

    #[test]
    fn razorpay_rejects_tampered_signature() {
        let gw = RazorpayGateway::new("rzp_test_key".into(), "secret".into());
        let mut sig = gw.expected_signature("order_123", "pay_456");
        // flip the last hex digit
        let last = sig.pop().map(|c| if c == '0' { '1' } else { '0' });
        sig.push(last.unwrap_or('0'));
        assert!(!gw.verify_payment_signature("order_123", "pay_456", &sig));
    }

    #[test]
    fn razorpay_rejects_signature_for_other_order() {
        let gw = RazorpayGateway::new("rzp_test_key".into(), "secret".into());
        let sig = gw.expected_signature("order_123", "pay_456");
        assert!(!gw.verify_payment_signature("order_999", "pay_456", &sig));
    }

    #[test]
    fn different_secret_produces_different_signature() {
        let a = RazorpayGateway::new("k".into(), "secret_a".into());
        let b = RazorpayGateway::new("k".into(), "secret_b".into());
        assert_ne!(
            a.expected_signature("order_1", "pay_1"),
            b.expected_signature("order_1", "pay_1")
        );
    }

    #[tokio::test]
    async fn sandbox_order_ids_are_deterministic() {
        let gw = SandboxGateway::new("sandbox_key".into());
        let id = gw
            .create_gateway_order(286138, "INR", "rcpt_1")
            .await
            .unwrap();
        assert_eq!(id, "sandbox_order_rcpt_1");
    }

    #[test]
    fn sandbox_accepts_any_signature() {
        let gw = SandboxGateway::new("sandbox_key".into());
        assert!(gw.verify_payment_signature("order_x", "pay_y", "garbage"));
    }

    #[test]
    fn constant_time_eq_length_mismatch() {
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("abc", "abc"));
    }
}
