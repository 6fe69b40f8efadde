//! QR payment content rendering

use crate::error::{PaymentError, PaymentResult};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use qrcode::QrCode;
use qrcode::render::svg;

/// Render a QR payload as an SVG data URI
pub fn qr_data_uri(data: &str) -> PaymentResult<String> {
    let svg = qr_svg(data)?;
    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
}

/// Render a QR payload as an SVG document
pub fn qr_svg(data: &str) -> PaymentResult<String> {
    if data.is_empty() {
        return Err(PaymentError::Render("QR payload is empty".to_string()));
    }
    let code = QrCode::new(data.as_bytes()).map_err(|e| PaymentError::Render(e.to_string()))?;
    Ok(code.render::<svg::Color>().min_dimensions(300, 300).build())
}
