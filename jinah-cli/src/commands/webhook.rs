//! Webhook inspection and verification commands.

use colored::Colorize;
use jinah_payments::JinahConfig;
use jinah_webhooks::{WebhookReceiver, WebhookRequest, detect_service};
use std::path::Path;

use super::{failure, field, header, success, yes_no};
use crate::error::{CliError, CliResult};

/// Split a `Name: value` header argument
pub fn parse_header(raw: &str) -> CliResult<(String, String)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(CliError::InvalidArgument(format!(
            "header '{}' is not in Name:value form",
            raw
        ))),
    }
}

/// Print webhook endpoints and their security settings.
pub fn webhook_info(config: &JinahConfig, receiver: &WebhookReceiver) -> CliResult<()> {
    let verifier = receiver.verifier();
    let base = format!(
        "{}/{}",
        config.app_url.trim_end_matches('/'),
        config.webhook.route_prefix.trim_matches('/')
    );

    header("Webhook Endpoints");
    field("Auto-detect", format!("POST {}", base).cyan());
    field("Default service", &config.webhook.default_service);
    field(
        "Global IP list",
        config.webhook.global.ip_whitelist.as_deref().unwrap_or("(allow all)"),
    );

    for service in verifier.supported_services() {
        println!();
        println!("  {}", service.bright_white().bold());
        field("Endpoint", format!("POST {}/{}", base, service));
        field("Verify signature", yes_no(verifier.is_enabled(&service)));
        let allow_list = verifier.allow_list(&service);
        if allow_list.is_empty() {
            field("IP allow-list", "(allow all)");
        } else {
            field("IP allow-list", format!("{} entries", allow_list.len()));
        }
        let has_secret = verifier.service_config(&service).is_some_and(|s| {
            s.secret.is_some() || s.endpoint_secret.is_some() || s.server_key.is_some()
        });
        field("Secret configured", yes_no(has_secret));
    }
    println!();
    Ok(())
}

pub struct VerifyOptions<'a> {
    pub service: Option<&'a str>,
    pub body: &'a Path,
    pub headers: &'a [String],
    pub ip: Option<&'a str>,
}

/// Run a stored webhook body through the full receiver pipeline.
pub async fn verify_webhook(config: &JinahConfig, receiver: &WebhookReceiver, options: VerifyOptions<'_>) -> CliResult<()> {
    let body = std::fs::read(options.body)?;
    let path = match options.service {
        Some(service) => format!("/{}/{}", config.webhook.route_prefix, service),
        None => format!("/{}", config.webhook.route_prefix),
    };

    let mut request = WebhookRequest::post(path, body);
    for raw in options.headers {
        let (name, value) = parse_header(raw)?;
        request.insert_header(&name, value);
    }
    if let Some(ip) = options.ip {
        request.client_ip = Some(ip.to_string());
    }

    header("Webhook Verification");
    let parsed = request.body_json().ok();
    let detection = detect_service(&request, parsed.as_ref(), &config.webhook.default_service);
    field("URL service", options.service.unwrap_or("(none)"));
    field(
        "Detected",
        format!("{} ({:?})", detection.service, detection.evidence),
    );

    let response = receiver.handle(&request, options.service).await;
    println!();
    if response.is_success() {
        success(&format!("HTTP {}", response.status));
    } else {
        failure(&format!("HTTP {}", response.status));
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&response.body).unwrap_or_default()
    );
    println!();
    Ok(())
}

/// Print the health report.
pub fn health(receiver: &WebhookReceiver) -> CliResult<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&receiver.health()).unwrap_or_default()
    );
    Ok(())
}
