//! Service listing and selection commands.

use colored::Colorize;
use jinah_payments::{ContentType, Jinah, JinahConfig, PaymentChannel, ProviderRouter};

use super::{failure, field, header, info, success, warn};
use crate::error::CliResult;

/// List configured services and whether each can be constructed.
pub fn list_services(router: &ProviderRouter) -> CliResult<()> {
    let default = &router.config().default_service;
    header("Payment Services");

    for service in router.list_available() {
        let marker = if &service.name == default { " (default)".dimmed().to_string() } else { String::new() };
        let label = format!("{} - {}{}", service.name.bright_white().bold(), service.display_name, marker);
        if service.configured {
            success(&label);
        } else {
            failure(&label);
            if let Some(error) = &service.error {
                println!("      {}", error.dimmed());
            }
        }
    }
    println!();
    Ok(())
}

/// Resolve a service and report it; the selection lasts for this run only.
pub fn switch_service(router: &ProviderRouter, name: &str) -> CliResult<()> {
    let switched = Jinah::with_service(router.clone(), name)?;
    let provider = switched.current_provider();
    success(&format!(
        "Switched from {} to {} ({})",
        router.config().default_service,
        switched.current_service_name().cyan(),
        provider.display_name()
    ));
    info("Set JINAH_DEFAULT_SERVICE to make the selection persistent");
    Ok(())
}

fn kind_label(kind: Option<ContentType>) -> &'static str {
    match kind {
        Some(ContentType::Va) => "virtual account",
        Some(ContentType::Qr) => "QR",
        Some(ContentType::Cc) => "card",
        None => "-",
    }
}

/// List channels routed by a meta service.
pub fn payment_methods(config: &JinahConfig, service: &str) -> CliResult<()> {
    let section = config.service(service)?;
    header(&format!("Payment Methods ({})", service));

    if section.channels.is_empty() {
        warn("No channels configured");
        return Ok(());
    }
    println!(
        "  {:<14} {:<12} {:<14} {}",
        "CHANNEL".dimmed(),
        "SERVICE".dimmed(),
        "CODE".dimmed(),
        "KIND".dimmed()
    );
    for (channel, route) in &section.channels {
        let kind = route
            .kind
            .or_else(|| PaymentChannel::new(route.code.clone()).content_type());
        println!(
            "  {:<14} {:<12} {:<14} {}",
            channel.bright_white(),
            route.service,
            route.code,
            kind_label(kind)
        );
    }
    println!();
    field("Fallback", section.fallback_service.as_deref().unwrap_or("finpay"));
    println!();
    Ok(())
}
