//! PKCS#12 credential handling: decoding, signer selection and validity checks.
mod pfx;
mod selector;
mod store;
mod validity;

pub use selector::{IssuerConvention, SigningContext};
pub use store::{CertificateEntry, CredentialStore, KeyEntry};
pub use validity::ValidityWindow;

use der::Tagged;

/// Renders an ASN.1 string value. BMPString is UTF-16BE; every other string type is read as
/// UTF-8. der rejects the UniversalString tag while decoding, so it never reaches here.
pub(crate) fn decode_string(value: &der::Any) -> String {
    let bytes = value.value();
    match value.tag() {
        der::Tag::BmpString => char::decode_utf16(
            bytes
                .chunks(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)])),
        )
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}
