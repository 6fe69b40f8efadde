//! Webhook receiver pipeline
//!
//! `parse body -> resolve service -> verify -> normalize -> dispatch`

use crate::detect::detect_service;
use crate::dispatch::{DispatchReport, EventDispatcher};
use crate::request::WebhookRequest;
use crate::verifier::WebhookVerifier;
use crate::{Result, WebhookError};
use jinah_payments::config::JinahConfig;
use jinah_payments::normalize::normalize;
use jinah_payments::webhook::{WebhookPayload, WebhookSource};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Name reported by the health endpoint
pub const HEALTH_SERVICE_NAME: &str = "jinah-webhook";

/// HTTP-shaped result of handling a webhook
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: Value,
}

impl WebhookResponse {
    fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A webhook that passed verification
#[derive(Debug)]
pub struct ProcessedWebhook {
    pub service: String,
    pub payload: WebhookPayload,
    pub report: DispatchReport,
}

/// Receives, verifies and dispatches provider webhooks
#[derive(Clone)]
pub struct WebhookReceiver {
    config: Arc<JinahConfig>,
    verifier: WebhookVerifier,
    dispatcher: EventDispatcher,
}

impl WebhookReceiver {
    pub fn new(config: Arc<JinahConfig>) -> Self {
        Self {
            verifier: WebhookVerifier::new(config.clone()),
            dispatcher: EventDispatcher::new(),
            config,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn verifier(&self) -> &WebhookVerifier {
        &self.verifier
    }

    /// Handle a request; `hint` is the service named in the URL, if any
    pub async fn handle(&self, request: &WebhookRequest, hint: Option<&str>) -> WebhookResponse {
        self.handle_at(request, hint, chrono::Utc::now().timestamp()).await
    }

    /// [`handle`](Self::handle) with an explicit unix time for timestamp checks
    pub async fn handle_at(&self, request: &WebhookRequest, hint: Option<&str>, now: i64) -> WebhookResponse {
        match self.process(request, hint, now).await {
            Ok(processed) => {
                let mut body = json!({
                    "success": true,
                    "message": "Webhook processed successfully",
                    "service": processed.service,
                });
                if hint.is_none() {
                    body["auto_detected"] = json!(true);
                }
                WebhookResponse::new(200, body)
            }
            Err(e) if e.is_verification_failure() => {
                WebhookResponse::new(401, json!({"error": "Invalid signature"}))
            }
            Err(WebhookError::PayloadError(message)) => {
                warn!(
                    ip = request.client_ip.as_deref().unwrap_or("unknown"),
                    error = %message,
                    "Invalid webhook payload"
                );
                WebhookResponse::new(400, json!({"success": false, "error": "Invalid payload"}))
            }
            Err(e) => {
                error!(hint, error = %e, "Webhook processing failed");
                WebhookResponse::new(
                    500,
                    json!({"success": false, "error": "Webhook processing failed"}),
                )
            }
        }
    }

    /// Run the pipeline and return the typed result
    pub async fn process(&self, request: &WebhookRequest, hint: Option<&str>, now: i64) -> Result<ProcessedWebhook> {
        let body = request.body_json()?;
        let service = self.resolve_service(request, &body, hint);

        if self.config.logging.enabled {
            info!(
                service = %service,
                method = %request.method,
                path = %request.path,
                ip = request.client_ip.as_deref(),
                user_agent = request.user_agent(),
                headers = ?request.headers(),
                payload = %body,
                "Webhook received"
            );
        }

        self.verifier.verify_at(&service, request, now)?;

        let payload = normalize(
            &WebhookSource::from_name(&service),
            &body,
            &request.normalize_context(),
        );
        let report = self.dispatcher.dispatch(payload.clone()).await;

        info!(
            service = %service,
            event_type = %payload.event_type,
            transaction_id = payload.transaction_id.as_deref(),
            status = payload.status.as_ref().map(|s| s.as_str()),
            "Webhook processed successfully"
        );
        Ok(ProcessedWebhook {
            service,
            payload,
            report,
        })
    }

    /// Service to verify and normalize with
    ///
    /// Detected evidence overrides a URL hint. Without evidence the hint is
    /// used, else the configured default.
    pub fn resolve_service(&self, request: &WebhookRequest, body: &Value, hint: Option<&str>) -> String {
        let detection = detect_service(request, Some(body), &self.config.webhook.default_service);
        match hint {
            Some(hint) if detection.has_evidence() && !detection.service.eq_ignore_ascii_case(hint) => {
                info!(
                    url_service = hint,
                    detected_service = %detection.service,
                    evidence = ?detection.evidence,
                    "Service auto-detection override"
                );
                detection.service
            }
            Some(hint) => hint.to_ascii_lowercase(),
            None => {
                info!(service = %detection.service, evidence = ?detection.evidence, "Auto-detected webhook service");
                detection.service
            }
        }
    }

    /// Static health report
    pub fn health(&self) -> Value {
        json!({
            "status": "ok",
            "service": HEALTH_SERVICE_NAME,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "supported_services": self.verifier.supported_services(),
        })
    }
}
