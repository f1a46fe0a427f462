//! Per-byte hex conversion for helper arguments and dump output.
//!
//! Dump output renders every byte as a separate token (`"0x0f"`, sometimes
//! `"0xf"`); arguments are passed as bare two-digit pairs (`0f`).

use thiserror::Error;

/// Failure to turn a token array back into bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("invalid hex token '{0}'")]
    InvalidToken(String),

    #[error("expected {expected} bytes, helper returned {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Renders one byte as a command-line argument: two lowercase hex digits.
pub fn encode_arg(byte: u8) -> String {
    format!("{:02x}", byte)
}

/// Renders one byte in the helper's token form (`0x0f`).
pub fn encode_token(byte: u8) -> String {
    format!("0x{:02x}", byte)
}

/// Decodes a single `0x`-prefixed token with one or two hex digits.
///
/// `"0xf"` and `"0x0f"` decode to the same byte.
pub fn decode_token(token: &str) -> Option<u8> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))?;
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

/// Decodes a token array that must hold exactly `expected` bytes.
pub fn decode_tokens<S: AsRef<str>>(tokens: &[S], expected: usize) -> Result<Vec<u8>, HexError> {
    if tokens.len() != expected {
        return Err(HexError::LengthMismatch {
            expected,
            actual: tokens.len(),
        });
    }
    tokens
        .iter()
        .map(|t| {
            let t = t.as_ref();
            decode_token(t).ok_or_else(|| HexError::InvalidToken(t.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_known_tokens() {
        assert_eq!(decode_token("0x21"), Some(0x21));
        assert_eq!(decode_token("0x01"), Some(0x01));
        assert_eq!(decode_token("0xf"), Some(0x0f));
        assert_eq!(decode_token("0x0f"), Some(0x0f));
        assert_eq!(decode_token("0x00"), Some(0x00));
        assert_eq!(decode_token("0xFF"), Some(0xff));
        assert_eq!(decode_token("0Xab"), Some(0xab));
    }

    #[test]
    fn test_round_trip_every_byte() {
        for b in 0..=u8::MAX {
            assert_eq!(decode_token(&encode_token(b)), Some(b));
            let compact = format!("0x{:x}", b);
            assert_eq!(decode_token(&compact), Some(b));
        }
    }

    #[test]
    fn test_reject_malformed_tokens() {
        assert_eq!(decode_token("21"), None);
        assert_eq!(decode_token("0x"), None);
        assert_eq!(decode_token("0x123"), None);
        assert_eq!(decode_token("0xg1"), None);
        assert_eq!(decode_token("0x+1"), None);
        assert_eq!(decode_token(""), None);
    }

    #[test]
    fn test_encode_arg_is_two_digits() {
        assert_eq!(encode_arg(0x0f), "0f");
        assert_eq!(encode_arg(0x00), "00");
        assert_eq!(encode_arg(0xab), "ab");
    }

    #[test]
    fn test_decode_tokens() {
        let tokens = ["0x12", "0x34", "0x5", "0x78"];
        assert_eq!(decode_tokens(&tokens, 4), Ok(vec![0x12, 0x34, 0x05, 0x78]));
        assert_eq!(
            decode_tokens(&tokens, 5),
            Err(HexError::LengthMismatch {
                expected: 5,
                actual: 4
            })
        );
        assert_eq!(
            decode_tokens(&["0x12", "zz"], 2),
            Err(HexError::InvalidToken("zz".to_string()))
        );
    }
}
