//! UTF-8 byte decoding under an [`ErrorPolicy`].

use std::borrow::Cow;

use ft_ast::ErrorPolicy;
use thiserror::Error;

/// Undecodable input under [`ErrorPolicy::Strict`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'utf-8' codec can't decode byte 0x{byte:02x} in position {position}: invalid utf-8")]
pub struct DecodeError {
    pub byte: u8,
    pub position: usize,
}

/// Decode `bytes` as UTF-8, substituting or dropping invalid sequences
/// according to `errors`.
pub fn decode_bytes(bytes: &[u8], errors: ErrorPolicy) -> Result<Cow<'_, str>, DecodeError> {
    match errors {
        ErrorPolicy::Strict => std::str::from_utf8(bytes).map(Cow::Borrowed).map_err(|e| {
            let position = e.valid_up_to();
            DecodeError {
                byte: bytes[position],
                position,
            }
        }),
        ErrorPolicy::Replace => Ok(String::from_utf8_lossy(bytes)),
        ErrorPolicy::Ignore => Ok(drop_invalid(bytes)),
    }
}

fn drop_invalid(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(s) => {
                out.push_str(s);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let skip = e.error_len().unwrap_or(after.len());
                rest = &after[skip..];
            }
        }
    }
    Cow::Owned(out)
}

/// Number of trailing bytes that start a multi-byte sequence not yet complete.
pub(crate) fn incomplete_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let b = bytes[bytes.len() - back];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let needed = match b {
            0xF0.. => 4,
            0xE0.. => 3,
            0xC0.. => 2,
            _ => 1,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INVALID: &[u8] = b"ok \xff done";

    #[test]
    fn strict_reports_position() {
        assert_eq!(
            decode_bytes(INVALID, ErrorPolicy::Strict),
            Err(DecodeError {
                byte: 0xff,
                position: 3
            })
        );
        assert_eq!(
            decode_bytes("héllo".as_bytes(), ErrorPolicy::Strict).unwrap(),
            "héllo"
        );
    }

    #[test]
    fn lenient_policies() {
        assert_eq!(
            decode_bytes(INVALID, ErrorPolicy::Replace).unwrap(),
            "ok \u{fffd} done"
        );
        assert_eq!(decode_bytes(INVALID, ErrorPolicy::Ignore).unwrap(), "ok  done");
    }

    #[test]
    fn incomplete_tails() {
        let e_acute = "é".as_bytes();
        assert_eq!(incomplete_tail(b"abc"), 0);
        assert_eq!(incomplete_tail(&e_acute[..1]), 1);
        assert_eq!(incomplete_tail(e_acute), 0);
        let snake = "🐍".as_bytes();
        assert_eq!(incomplete_tail(&snake[..3]), 3);
    }
}
