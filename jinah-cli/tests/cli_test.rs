//! Integration tests for jinah-cli

use assert_cmd::Command;
use jinah_webhooks::signature::finpay_signature;
use predicates::prelude::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CONFIG: &str = r#"
default_service = "finpay"
app_url = "https://shop.test"

[services.finpay]
driver = "finpay"
name = "FinPay"
development_url = "http://127.0.0.1:9"
client_id = "merchant"
client_secret = "s3cret"

[services.jinah]
driver = "jinah"
name = "Jinah"

[services.jinah.channels.vabca]
service = "finpay"
code = "vabca"

[services.jinah.channels.qris]
service = "finpay"
code = "qris"
kind = "qr"

[services.broken]
driver = "paypal"

[webhook]
route_prefix = "payment-webhook"

[webhook.finpay]
secret = "finpay-secret"
ip_whitelist = "103.10.128.0/24"

[logging]
enabled = false
"#;

fn workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("jinah.toml");
    std::fs::write(&path, CONFIG).unwrap();
    (dir, path)
}

fn jinah(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("jinah").unwrap();
    cmd.arg("--no-color").arg("--config").arg(config);
    cmd.env_remove("JINAH_DEFAULT_SERVICE")
        .env_remove("JINAH_WEBHOOK_IP_WHITELIST")
        .env_remove("JINAH_WEBHOOK_VERIFY_SIGNATURE")
        .env_remove("JINAH_FINPAY_WEBHOOK_SECRET");
    cmd
}

fn finpay_body(dir: &TempDir, secret: &str) -> PathBuf {
    let mut payload = json!({
        "merchant": {"id": "FP-MERCHANT"},
        "order": {"id": "INV-77", "reference": "FP-REF-77", "amount": 150000, "currency": "IDR"},
        "result": {"payment": {"status": "PAID", "datetime": "2024-05-01 10:15:00", "channel": "vabca"}}
    });
    payload["signature"] = json!(finpay_signature(&payload, secret).unwrap());
    let path = dir.path().join("notify.json");
    std::fs::write(&path, payload.to_string()).unwrap();
    path
}

// ============================================================================
// Services
// ============================================================================

#[test]
fn test_list_services() {
    let (_dir, config) = workspace();
    jinah(&config)
        .arg("list-services")
        .assert()
        .success()
        .stdout(predicate::str::contains("finpay - FinPay (default)"))
        .stdout(predicate::str::contains("jinah - Jinah"))
        .stdout(predicate::str::contains("broken"));
}

#[test]
fn test_payment_methods() {
    let (_dir, config) = workspace();
    jinah(&config)
        .arg("payment-methods")
        .assert()
        .success()
        .stdout(predicate::str::contains("vabca"))
        .stdout(predicate::str::contains("virtual account"))
        .stdout(predicate::str::contains("QR"));
}

#[test]
fn test_switch_to_unknown_service_fails() {
    let (_dir, config) = workspace();
    jinah(&config)
        .args(["switch-service", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn test_charge_rejects_zero_amount() {
    let (_dir, config) = workspace();
    jinah(&config)
        .args(["test-charge", "--amount", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_service_flag_skips_broken_default() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("jinah.toml");
    std::fs::write(
        &config,
        CONFIG.replace(r#"default_service = "finpay""#, r#"default_service = "broken""#),
    )
    .unwrap();

    jinah(&config)
        .args(["test-charge", "--service", "finpay", "--amount", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid amount"))
        .stderr(predicate::str::contains("paypal").not());
}

// ============================================================================
// Webhooks
// ============================================================================

#[test]
fn test_health() {
    let (_dir, config) = workspace();
    jinah(&config)
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"service\": \"jinah-webhook\""))
        .stdout(predicate::str::contains("\"status\": \"ok\""));
}

#[test]
fn test_webhook_info() {
    let (_dir, config) = workspace();
    jinah(&config)
        .arg("webhook-info")
        .assert()
        .success()
        .stdout(predicate::str::contains("POST https://shop.test/payment-webhook"))
        .stdout(predicate::str::contains("POST https://shop.test/payment-webhook/finpay"));
}

#[test]
fn test_verify_signed_finpay_webhook() {
    let (dir, config) = workspace();
    let body = finpay_body(&dir, "finpay-secret");
    jinah(&config)
        .arg("verify-webhook")
        .arg("--body")
        .arg(&body)
        .args(["--header", "Client-Id: FINPAY", "--ip", "103.10.128.9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("finpay (ClientIdHeader)"))
        .stdout(predicate::str::contains("HTTP 200"))
        .stdout(predicate::str::contains("\"auto_detected\": true"));
}

#[test]
fn test_verify_rejects_wrong_secret() {
    let (dir, config) = workspace();
    let body = finpay_body(&dir, "other-secret");
    jinah(&config)
        .args(["verify-webhook", "--service", "finpay", "--ip", "103.10.128.9"])
        .arg("--body")
        .arg(&body)
        .assert()
        .success()
        .stdout(predicate::str::contains("HTTP 401"))
        .stdout(predicate::str::contains("Invalid signature"));
}

#[test]
fn test_verify_rejects_malformed_header() {
    let (dir, config) = workspace();
    let body = finpay_body(&dir, "finpay-secret");
    jinah(&config)
        .arg("verify-webhook")
        .arg("--body")
        .arg(&body)
        .args(["--header", "no-colon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Name:value"));
}
