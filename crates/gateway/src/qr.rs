//! Terminal rendering of pairing codes.

use qrcode::render::unicode::Dense1x2;
use qrcode::types::QrError;
use qrcode::QrCode;

/// Render `code` as a compact QR block (two modules per character row).
pub fn render(code: &str) -> Result<String, QrError> {
    let qr = QrCode::new(code.as_bytes())?;
    Ok(qr
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

/// Print the pairing QR for `session_key` to stderr, keeping stdout for
/// the JSON log stream.
pub fn print_pairing_code(session_key: &str, code: &str) {
    match render(code) {
        Ok(block) => eprintln!("Scan to pair {session_key}:\n{block}"),
        Err(e) => tracing::warn!(session_key = %session_key, error = %e, "cannot render pairing code"),
    }
}
