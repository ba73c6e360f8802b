use crate::error::{AuthError, Result};
use base32::Alphabet;
use image::Luma;
use qrcode::QrCode;
use rand::Rng;
use totp_lite::{totp_custom, Sha1};

const TOTP_DIGITS: u32 = 6;
const TOTP_STEP: u64 = 30; // 30 seconds

/// Generate a random secret for TOTP (160 bits, base32-encoded)
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let secret_bytes: Vec<u8> = (0..20).map(|_| rng.gen()).collect();
    base32::encode(Alphabet::Rfc4648 { padding: false }, &secret_bytes)
}

fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    base32::decode(Alphabet::Rfc4648 { padding: false }, secret)
        .ok_or_else(|| AuthError::Validation("Invalid secret format".to_string()))
}

fn unix_now() -> Result<u64> {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AuthError::Internal(format!("Time error: {}", e)))
}

/// Generate the TOTP code for a given secret at an explicit unix time
pub fn generate_totp_at(secret: &str, time: u64) -> Result<String> {
    let secret_bytes = decode_secret(secret)?;
    Ok(totp_custom::<Sha1>(
        TOTP_STEP,
        TOTP_DIGITS,
        &secret_bytes,
        time,
    ))
}

/// Generate the current TOTP code for a given secret
pub fn generate_totp(secret: &str) -> Result<String> {
    generate_totp_at(secret, unix_now()?)
}

/// Verify a TOTP code against a secret at an explicit unix time.
/// Allows a time window of ±1 period (30 seconds) to account for clock drift.
pub fn verify_totp_at(secret: &str, code: &str, time: u64) -> Result<bool> {
    let secret_bytes = decode_secret(secret)?;

    // Check current time and ±1 period (total 3 windows)
    for time_offset in [-1i64, 0, 1] {
        let check_time = (time as i64 + (time_offset * TOTP_STEP as i64)) as u64;
        let expected_code = totp_custom::<Sha1>(TOTP_STEP, TOTP_DIGITS, &secret_bytes, check_time);

        if constant_time_compare(&expected_code, code) {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Verify a TOTP code against a secret at the current time
pub fn verify_totp(secret: &str, code: &str) -> Result<bool> {
    verify_totp_at(secret, code, unix_now()?)
}

/// Generate a TOTP URI for QR code generation (otpauth:// format)
/// This is the format that authenticator apps expect
pub fn generate_totp_uri(secret: &str, account_name: &str, issuer: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
        urlencoding::encode(issuer),
        urlencoding::encode(account_name),
        secret,
        urlencoding::encode(issuer),
        TOTP_DIGITS,
        TOTP_STEP
    )
}

/// Generate a QR code image from a TOTP URI
/// Returns PNG image bytes
pub fn generate_qr_code(totp_uri: &str) -> Result<Vec<u8>> {
    let qr = QrCode::new(totp_uri.as_bytes())
        .map_err(|e| AuthError::Internal(format!("QR code generation failed: {}", e)))?;

    let image = qr.render::<Luma<u8>>().min_dimensions(256, 256).build();

    let mut png_bytes = Vec::new();
    image::DynamicImage::ImageLuma8(image)
        .write_to(
            &mut std::io::Cursor::new(&mut png_bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| AuthError::Internal(format!("PNG encoding failed: {}", e)))?;

    Ok(png_bytes)
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut result = 0u8;
    for i in 0..a_bytes.len() {
        result |= a_bytes[i] ^ b_bytes[i];
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 test secret "12345678901234567890" in base32
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn generated_secret_has_totp_entropy() {
        let secret = generate_secret();
        assert!(!secret.is_empty());
        assert!(secret.len() >= 32); // Base32 encoded 20 bytes
    }

    #[test]
    fn code_is_six_digits() {
        let secret = generate_secret();
        let code = generate_totp(&secret).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn rfc6238_vector() {
        // Time 59 falls in step 1; the 8-digit vector is 94287082
        let code = generate_totp_at(RFC_SECRET, 59).unwrap();
        assert_eq!(code, "287082");
    }

    #[test]
    fn current_code_verifies() {
        let secret = generate_secret();
        let code = generate_totp(&secret).unwrap();
        assert!(verify_totp(&secret, &code).unwrap());
    }

    #[test]
    fn window_accepts_adjacent_step_only() {
        let base = 1_700_000_000u64;
        let code = generate_totp_at(RFC_SECRET, base).unwrap();

        assert!(verify_totp_at(RFC_SECRET, &code, base).unwrap());
        assert!(verify_totp_at(RFC_SECRET, &code, base + 30).unwrap());
        assert!(verify_totp_at(RFC_SECRET, &code, base - 30).unwrap());
        assert!(!verify_totp_at(RFC_SECRET, &code, base + 90).unwrap());
    }

    #[test]
    fn code_from_another_secret_fails() {
        let time = 1_700_000_000u64;
        let other = generate_secret();
        let foreign_code = generate_totp_at(&other, time).unwrap();
        let own_code = generate_totp_at(RFC_SECRET, time).unwrap();

        if foreign_code != own_code {
            assert!(!verify_totp_at(RFC_SECRET, &foreign_code, time).unwrap());
        }
    }

    #[test]
    fn invalid_secret_rejected() {
        assert!(generate_totp("not-base32!!").is_err());
        assert!(verify_totp("not-base32!!", "123456").is_err());
    }

    #[test]
    fn uri_embeds_issuer_and_account() {
        let secret = "JBSWY3DPEHPK3PXP";
        let uri = generate_totp_uri(secret, "user@example.com", "EduAid");
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("secret=JBSWY3DPEHPK3PXP"));
        assert!(uri.contains("issuer=EduAid"));
    }

    #[test]
    fn qr_code_renders_png() {
        let uri = generate_totp_uri("JBSWY3DPEHPK3PXP", "user@example.com", "EduAid");
        let png = generate_qr_code(&uri).unwrap();
        // PNG magic bytes
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn compare_is_length_sensitive() {
        assert!(constant_time_compare("123456", "123456"));
        assert!(!constant_time_compare("123456", "123457"));
        assert!(!constant_time_compare("123456", "12345"));
    }
}
