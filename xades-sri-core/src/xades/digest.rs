//! Digest encoding shared by every `DigestValue` in the signature.
use base64ct::{Base64, Encoding};
use sha1::{Digest, Sha1};
use std::fmt::Write;

/// SHA-1 of `data`, rendered as lowercase hex, then base64 over the hex *text*.
///
/// The SRI verification stack expects this double encoding; base64 of the raw hash is rejected.
/// Do not replace it with the standard XML-DSig encoding.
pub fn digest(data: impl AsRef<[u8]>) -> String {
    let hash = Sha1::digest(data.as_ref());
    hex_hash_to_base64(&hash)
}

fn hex_hash_to_base64(hash: &[u8]) -> String {
    let mut hex_hash = String::with_capacity(hash.len() * 2);
    for byte in hash {
        let _ = write!(&mut hex_hash, "{:02x}", byte);
    }
    Base64::encode_string(hex_hash.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_base64_of_hex_text() {
        // sha1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
        let expected = Base64::encode_string(b"a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(digest("abc"), expected);
        assert_eq!(
            digest("abc"),
            "YTk5OTNlMzY0NzA2ODE2YWJhM2UyNTcxNzg1MGMyNmM5Y2QwZDg5ZA=="
        );
    }

    #[test]
    fn digest_differs_from_base64_of_raw_hash() {
        let raw = Base64::encode_string(&Sha1::digest(b"abc"));
        assert_eq!(raw, "qZk+NkcGgWq6PiVxeFDCbJzQ2J0=");
        assert_ne!(digest("abc"), raw);
    }

    #[test]
    fn digest_is_stable_and_has_fixed_length() {
        let first = digest("<factura id=\"comprobante\"></factura>");
        let second = digest("<factura id=\"comprobante\"></factura>");
        assert_eq!(first, second);
        // 40 hex chars -> 56 base64 chars
        assert_eq!(first.len(), 56);
        assert_eq!(digest(""), Base64::encode_string(b"da39a3ee5e6b4b0d3255bfef95601890afd80709"));
    }
}
