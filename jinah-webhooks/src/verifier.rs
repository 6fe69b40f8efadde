//! Webhook verification state machine
//!
//! Each request passes through three stages in order, and the first failure
//! rejects it:
//!
//! 1. **Enablement**: `webhook.<service>.verify_signature`, else
//!    `webhook.global.verify_signature`, else enabled.
//! 2. **IP allow-list**: `webhook.<service>.ip_whitelist`, else the global
//!    list. An empty list allows every address.
//! 3. **Signature**: the scheme matching the service name.

use crate::ip::IpAllowList;
use crate::request::WebhookRequest;
use crate::signature::{
    STRIPE_SIGNATURE_HEADER, SignatureScheme, generic_signature_headers, verify_finpay,
    verify_generic, verify_midtrans, verify_stripe,
};
use crate::{Result, WebhookError};
use jinah_payments::config::{JinahConfig, WebhookServiceSettings};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Verifies inbound webhooks against the webhook configuration
#[derive(Clone)]
pub struct WebhookVerifier {
    config: Arc<JinahConfig>,
}

impl WebhookVerifier {
    pub fn new(config: Arc<JinahConfig>) -> Self {
        Self { config }
    }

    /// Verify a request for `service` at the current time
    pub fn verify(&self, service: &str, request: &WebhookRequest) -> Result<()> {
        self.verify_at(service, request, chrono::Utc::now().timestamp())
    }

    /// Verify a request for `service` at unix time `now`
    pub fn verify_at(&self, service: &str, request: &WebhookRequest, now: i64) -> Result<()> {
        if !self.is_enabled(service) {
            info!(service, "Signature verification disabled");
            return Ok(());
        }

        let result = self
            .check_ip(service, request)
            .and_then(|()| self.check_signature(service, request, now));

        if let Err(e) = &result {
            warn!(
                service,
                ip = request.client_ip.as_deref().unwrap_or("unknown"),
                headers = ?request.headers(),
                error = %e,
                "Webhook verification rejected"
            );
        }
        result
    }

    /// Whether signature verification applies to `service`
    pub fn is_enabled(&self, service: &str) -> bool {
        self.service_config(service)
            .and_then(|s| s.verify_signature)
            .or(self.config.webhook.global.verify_signature)
            .unwrap_or(true)
    }

    /// Allow-list in effect for `service`
    pub fn allow_list(&self, service: &str) -> IpAllowList {
        let service_list = self
            .service_config(service)
            .and_then(|s| s.ip_whitelist.as_deref())
            .filter(|list| !list.trim().is_empty());
        let list = service_list.or(self.config.webhook.global.ip_whitelist.as_deref());
        IpAllowList::parse(list.unwrap_or_default())
    }

    fn check_ip(&self, service: &str, request: &WebhookRequest) -> Result<()> {
        let allow_list = self.allow_list(service);
        if allow_list.is_empty() {
            return Ok(());
        }
        let ip = request.client_ip.as_deref().unwrap_or_default();
        if allow_list.allows(ip) {
            Ok(())
        } else {
            Err(WebhookError::IpNotAllowed { ip: ip.to_string() })
        }
    }

    fn check_signature(&self, service: &str, request: &WebhookRequest, now: i64) -> Result<()> {
        let settings = self.service_config(service);

        match SignatureScheme::for_service(service) {
            SignatureScheme::FinPay => {
                let secret = required_secret(service, settings.and_then(|s| s.secret.as_ref()))?;
                verify_finpay(&request.body_json()?, secret)
            }
            SignatureScheme::Stripe => {
                let secret =
                    required_secret(service, settings.and_then(|s| s.endpoint_secret.as_ref()))?;
                let header = request
                    .header(STRIPE_SIGNATURE_HEADER)
                    .filter(|h| !h.is_empty())
                    .ok_or(WebhookError::SignatureMissing)?;
                verify_stripe(&request.body, header, secret, now)
            }
            SignatureScheme::Midtrans => {
                let key = required_secret(service, settings.and_then(|s| s.server_key.as_ref()))?;
                verify_midtrans(&request.body_json()?, key)
            }
            SignatureScheme::Generic => {
                let Some(secret) = present_secret(settings.and_then(|s| s.secret.as_ref())) else {
                    info!(service, "No webhook secret configured, skipping signature verification");
                    return Ok(());
                };
                let signature = generic_signature_headers(service)
                    .iter()
                    .find_map(|name| request.header(name))
                    .filter(|s| !s.is_empty())
                    .ok_or(WebhookError::SignatureMissing)?;
                let algorithm = verify_generic(&request.body, signature, secret)?;
                debug!(service, algorithm = algorithm.name(), "Generic signature matched");
                Ok(())
            }
        }
    }

    /// Webhook section for a service
    pub fn service_config(&self, service: &str) -> Option<&WebhookServiceSettings> {
        self.config.webhook.service(service)
    }

    pub fn has_service_config(&self, service: &str) -> bool {
        self.service_config(service).is_some()
    }

    /// Services with a webhook section
    pub fn supported_services(&self) -> Vec<String> {
        self.config.webhook.services.keys().cloned().collect()
    }
}

fn present_secret(secret: Option<&SecretString>) -> Option<&str> {
    secret
        .map(|s| s.expose_secret())
        .filter(|s| !s.is_empty())
}

fn required_secret<'a>(service: &str, secret: Option<&'a SecretString>) -> Result<&'a str> {
    present_secret(secret).ok_or_else(|| WebhookError::SecretMissing(service.to_string()))
}
