//! QR code rendering for points vouchers.

use base64::{Engine, engine::general_purpose::STANDARD};
use qrcode::QrCode;
use qrcode::render::svg;

/// Side length the rendered code is scaled up to, in pixels.
const MIN_DIMENSION: u32 = 240;

/// Render `data` as an SVG QR code wrapped in a `data:` URL.
///
/// # Errors
///
/// Returns `QrError` when the data does not fit in a QR code.
pub fn data_url(data: &str) -> Result<String, qrcode::types::QrError> {
    let code = QrCode::new(data.as_bytes())?;
    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image)
    ))
}
