//! Conversion of key set certificates (`x5c` entries) into PEM blocks.

use crate::errors::AuthError;
use base64::{engine::general_purpose::STANDARD, Engine};

/// Width of a PEM body line.
pub const PEM_LINE_WIDTH: usize = 64;

const CERTIFICATE_HEADER: &str = "-----BEGIN CERTIFICATE-----";
const CERTIFICATE_FOOTER: &str = "-----END CERTIFICATE-----";

/// Wrap a base64 DER certificate into a PEM `CERTIFICATE` block.
///
/// The body is split into 64-character lines; header, body lines and footer
/// each end with a newline. The output is a pure function of the input.
///
/// # Errors
///
/// Returns `AuthError::InvalidCertificateEncoding` if the input is not
/// canonical, padded standard base64 or decodes to nothing.
pub fn certificate_to_pem(der_base64: &str) -> Result<String, AuthError> {
    let der = STANDARD.decode(der_base64).map_err(|e| {
        tracing::debug!(target: "authz.auth.pem", error = %e, "Certificate is not valid base64");
        AuthError::InvalidCertificateEncoding(e.to_string())
    })?;

    if der.is_empty() {
        return Err(AuthError::InvalidCertificateEncoding(
            "certificate is empty".to_string(),
        ));
    }

    // Canonical base64 round-trips to the same text
    let body = STANDARD.encode(&der);

    let line_breaks = body.len() / PEM_LINE_WIDTH + 3;
    let mut pem = String::with_capacity(
        CERTIFICATE_HEADER.len() + CERTIFICATE_FOOTER.len() + body.len() + line_breaks,
    );
    pem.push_str(CERTIFICATE_HEADER);
    pem.push('\n');
    for line in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        let line = std::str::from_utf8(line)
            .map_err(|e| AuthError::InvalidCertificateEncoding(e.to_string()))?;
        pem.push_str(line);
        pem.push('\n');
    }
    pem.push_str(CERTIFICATE_FOOTER);
    pem.push('\n');

    Ok(pem)
}
