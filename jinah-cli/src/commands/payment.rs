//! Charge, inquiry and cancel commands.

use colored::Colorize;
use jinah_payments::{Jinah, PaymentRequest, PaymentResponse, ProviderRouter};
use rust_decimal::Decimal;
use tracing::debug;

use super::{failure, field, header, info, success, warn};
use crate::error::CliResult;

pub struct ChargeOptions {
    pub order_id: Option<String>,
    pub amount: Decimal,
    pub service: Option<String>,
    pub channel: Option<String>,
}

/// Default order id for test charges
pub fn default_order_id() -> String {
    format!("ORDER-{}", chrono::Utc::now().timestamp())
}

/// Facade bound to `service`, else to the default service
pub fn bind(router: &ProviderRouter, service: Option<&str>) -> CliResult<Jinah> {
    let jinah = match service {
        Some(name) => Jinah::with_service(router.clone(), name)?,
        None => Jinah::new(router.clone())?,
    };
    debug!(service = jinah.current_service_name(), "Bound payment service");
    Ok(jinah)
}

/// Run a test charge against the selected service.
pub async fn test_charge(router: &ProviderRouter, options: ChargeOptions) -> CliResult<()> {
    let jinah = bind(router, options.service.as_deref())?;
    let order_id = options.order_id.unwrap_or_else(default_order_id);

    header("Test Charge");
    field("Service", jinah.current_service_name().cyan());
    field("Order ID", &order_id);
    field("Amount", options.amount);
    if let Some(channel) = &options.channel {
        field("Channel", channel);
    }

    let request = PaymentRequest::new(order_id, options.amount, "Jinah CLI test charge")
        .currency(jinah.config().payment.default_currency)
        .customer_name("Test Customer")
        .customer_email("test@example.com")
        .customer_phone("081234567890");

    let response = match &options.channel {
        Some(channel) => jinah.charge_channel(&request, channel.as_str()).await?,
        None => jinah.charge(&request).await?,
    };
    print_response(&response);
    Ok(())
}

/// Query a transaction by transaction id or merchant order id.
pub async fn test_inquiry(
    router: &ProviderRouter,
    transaction_id: Option<&str>,
    order_id: Option<&str>,
    service: Option<&str>,
) -> CliResult<()> {
    let jinah = bind(router, service)?;
    header("Transaction Inquiry");
    field("Service", jinah.current_service_name().cyan());

    let response = match (transaction_id, order_id) {
        (Some(id), _) => {
            field("Transaction ID", id);
            jinah.inquiry_by_transaction_id(id).await?
        }
        (None, Some(id)) => {
            field("Order ID", id);
            jinah.inquiry_by_merchant_order_id(id).await?
        }
        (None, None) => {
            warn("Provide --transaction-id or --order-id");
            return Ok(());
        }
    };
    print_response(&response);
    Ok(())
}

/// Ask the selected service to cancel a transaction.
pub async fn test_cancel(router: &ProviderRouter, transaction_id: &str, service: Option<&str>) -> CliResult<()> {
    let jinah = bind(router, service)?;
    header("Cancel Transaction");
    field("Service", jinah.current_service_name().cyan());
    field("Transaction ID", transaction_id);

    let response = jinah.cancel(transaction_id).await?;
    print_response(&response);
    Ok(())
}

fn print_response(response: &PaymentResponse) {
    println!();
    if response.success {
        success("Request accepted");
    } else {
        failure("Request failed");
    }
    if let Some(via) = &response.via {
        field("Via", via);
    }
    if let Some(id) = &response.transaction_id {
        field("Transaction ID", id);
    }
    if let Some(status) = &response.status {
        field("Status", status.as_str().bright_white());
    }
    if let (Some(amount), Some(currency)) = (&response.amount, &response.currency) {
        field("Amount", format!("{} {}", amount, currency));
    }
    if let Some(url) = &response.redirect_url {
        field("Redirect URL", url.underline());
    }
    if let Some(content) = &response.content {
        let value = if content.value.chars().count() > 60 {
            format!("{}…", content.value.chars().take(60).collect::<String>())
        } else {
            content.value.clone()
        };
        field(&format!("Content ({:?})", content.content_type), value);
    }
    if let Some(expiry) = &response.expiry_time {
        field("Expires", expiry.to_rfc3339());
    }
    if let Some(message) = &response.message {
        field("Message", message);
    }
    if let Some(code) = &response.error_code {
        field("Error code", code.red());
    }
    if !response.success {
        info("Raw response:");
        println!("{}", serde_json::to_string_pretty(&response.raw_response).unwrap_or_default());
    }
    println!();
}
