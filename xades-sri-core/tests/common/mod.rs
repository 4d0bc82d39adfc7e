use base64ct::{Base64, Encoding};
use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};

pub const PASSWORD: &str = "prueba123";
pub const NAMESPACES: &str =
    "xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\" xmlns:etsi=\"http://uri.etsi.org/01903/v1.3.2#\"";

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[allow(dead_code)]
pub fn credential(name: &str) -> Vec<u8> {
    let path = fixtures().join("credentials").join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

#[allow(dead_code)]
pub fn document() -> String {
    std::fs::read_to_string(fixtures().join("documents/factura.xml")).expect("read document")
}

/// Inside the validity window of every non-expired fixture credential.
#[allow(dead_code)]
pub fn signing_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn capture(xml: &str, pattern: &str) -> String {
    let re = Regex::new(pattern).expect("pattern");
    re.captures(xml)
        .and_then(|caps| caps.get(1))
        .unwrap_or_else(|| panic!("no match for {pattern}"))
        .as_str()
        .to_string()
}

pub fn decode_wrapped(text: &str) -> Vec<u8> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    Base64::decode_vec(&compact).expect("base64")
}

#[allow(dead_code)]
pub fn namespaced(fragment: &str, root_tag: &str) -> String {
    fragment.replacen(root_tag, &format!("{root_tag} {NAMESPACES}"), 1)
}

/// Recomputes the SignedInfo hash and checks SignatureValue with the KeyInfo public key.
#[allow(dead_code)]
pub fn verify_signature(signed: &str) {
    let signed_info = capture(signed, r"(?s)(<ds:SignedInfo .*?</ds:SignedInfo>)");
    let signature = decode_wrapped(&capture(
        signed,
        r#"(?s)<ds:SignatureValue Id="[^"]+">(.*?)</ds:SignatureValue>"#,
    ));
    let modulus = decode_wrapped(&capture(signed, r"(?s)<ds:Modulus>(.*?)</ds:Modulus>"));
    let exponent = decode_wrapped(&capture(signed, r"(?s)<ds:Exponent>(.*?)</ds:Exponent>"));

    let key = RsaPublicKey::new(
        BigUint::from_bytes_be(&modulus),
        BigUint::from_bytes_be(&exponent),
    )
    .expect("public key");
    let hashed = Sha1::digest(namespaced(&signed_info, "<ds:SignedInfo").as_bytes());
    key.verify(Pkcs1v15Sign::new::<Sha1>(), &hashed, &signature)
        .expect("signature verifies against KeyInfo key");
}
