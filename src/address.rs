//! Bluetooth address and Fast Pair parameter helpers.
//!
//! The board reports addresses least-significant byte first without
//! separators (`EEFF33221100`); Android and the test beds use BD_ADDR
//! notation (`00:11:22:33:FF:EE`).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static VALID_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$").expect("static regex"));
static RAW_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{12}$").expect("static regex"));
static RAW_MODEL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{6}$").expect("static regex"));

/// Length of a decoded Fast Pair anti-spoofing private key.
pub const FP_PRIVATE_KEY_LEN: usize = 32;

/// Errors raised while converting addresses or Fast Pair parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid Bluetooth address {0}.")]
    InvalidAddress(String),

    #[error("Cannot convert {0} to Bluetooth device address.")]
    Unconvertible(String),

    #[error("Invalid Fast Pair model ID {0}.")]
    InvalidModelId(String),

    #[error("Invalid Fast Pair private key {0}.")]
    InvalidPrivateKey(String),
}

/// True if `address` is a colon-separated BD_ADDR.
pub fn is_valid_address(address: &str) -> bool {
    VALID_ADDRESS.is_match(address)
}

/// Fails with [`AddressError::InvalidAddress`] unless `address` is a BD_ADDR.
pub fn ensure_valid_address(address: &str) -> Result<(), AddressError> {
    if is_valid_address(address) {
        Ok(())
    } else {
        Err(AddressError::InvalidAddress(address.to_string()))
    }
}

/// Convert an LSB-ordered raw address to BD_ADDR.
///
/// `EEFF33221100` becomes `00:11:22:33:FF:EE`. Input that already is a
/// BD_ADDR is returned unchanged.
pub fn lsb_addr_to_bd_addr(lsb_address: &str) -> Result<String, AddressError> {
    if is_valid_address(lsb_address) {
        return Ok(lsb_address.to_string());
    }
    if RAW_ADDRESS.is_match(lsb_address) {
        return Ok(reversed_octets(lsb_address).join(":"));
    }
    Err(AddressError::Unconvertible(lsb_address.to_string()))
}

/// Strip colons and upper-case, as the board's connect commands expect.
pub fn compact_address(address: &str) -> String {
    address.replace(':', "").to_uppercase()
}

/// Reverse a Fast Pair model ID into colon-separated lower-case octets.
///
/// Accepts `XXXXXX` or `0xXXXXXX`: `0x1A2B3C` becomes `3c:2b:1a`.
pub fn reverse_fp_model_id(model_id: &str) -> Result<String, AddressError> {
    let raw = model_id.strip_prefix("0x").unwrap_or(model_id);
    if !RAW_MODEL_ID.is_match(raw) {
        return Err(AddressError::InvalidModelId(model_id.to_string()));
    }
    Ok(reversed_octets(raw).join(":").to_lowercase())
}

/// Decode a base64 anti-spoofing key into the hex string the board takes.
pub fn decode_fp_private_key(private_key: &str) -> Result<String, AddressError> {
    let decoded = STANDARD
        .decode(private_key.as_bytes())
        .map_err(|_| AddressError::InvalidPrivateKey(private_key.to_string()))?;
    if decoded.len() != FP_PRIVATE_KEY_LEN {
        return Err(AddressError::InvalidPrivateKey(private_key.to_string()));
    }
    Ok(decoded.iter().map(|b| format!("{b:02x}")).collect())
}

fn reversed_octets(raw: &str) -> Vec<&str> {
    // Callers validated `raw` as ASCII hex of even length.
    let mut octets: Vec<&str> = (0..raw.len()).step_by(2).map(|i| &raw[i..i + 2]).collect();
    octets.reverse();
    octets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        assert!(is_valid_address("11:22:33:44:55:66"));
        assert!(is_valid_address("aa:BB:cc:DD:ee:FF"));
        assert!(!is_valid_address("11:22:33:44:55"));
        assert!(!is_valid_address("11-22-33-44-55-66"));
        assert!(!is_valid_address("11:22:33:44:55:66:77"));
        assert!(!is_valid_address("112233445566"));
    }

    #[test]
    fn test_lsb_conversion() {
        assert_eq!(lsb_addr_to_bd_addr("EEFF33221100").unwrap(), "00:11:22:33:FF:EE");
        assert_eq!(
            lsb_addr_to_bd_addr("00:11:22:33:FF:EE").unwrap(),
            "00:11:22:33:FF:EE"
        );
        assert!(matches!(
            lsb_addr_to_bd_addr("not an address"),
            Err(AddressError::Unconvertible(_))
        ));
    }

    #[test]
    fn test_compact_address() {
        assert_eq!(compact_address("aa:bb:cc:00:11:22"), "AABBCC001122");
    }

    #[test]
    fn test_model_id() {
        assert_eq!(reverse_fp_model_id("0x1A2B3C").unwrap(), "3c:2b:1a");
        assert_eq!(reverse_fp_model_id("abcdef").unwrap(), "ef:cd:ab");
        assert!(reverse_fp_model_id("0x1A2B").is_err());
        assert!(reverse_fp_model_id("zzzzzz").is_err());
    }

    #[test]
    fn test_private_key() {
        let key = STANDARD.encode([0xABu8; 32]);
        assert_eq!(decode_fp_private_key(&key).unwrap(), "ab".repeat(32));

        let short = STANDARD.encode([1u8; 16]);
        assert!(decode_fp_private_key(&short).is_err());
        assert!(decode_fp_private_key("!!not base64!!").is_err());
    }
}
