mod common;

use std::path::Path;
use xades_sri_core::canonical_document_digest;
use xades_sri_core::xades::canonicalize;

const FACTURA_DIGEST: &str = "ZTM1MGZiN2JlYWE2ODY4YTdiNDEwNzQ0OThmOWQxNWRlZjEzZDg0Yw==";

fn canonical_fixture() -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/documents/factura.canonical.xml");
    std::fs::read_to_string(path).expect("read canonical fixture")
}

#[test]
fn fixture_voucher_canonicalizes_to_recorded_form() {
    let canonical = canonicalize(&common::document());
    assert_eq!(canonical, canonical_fixture());
    assert!(canonical.contains("<razonSocial>COMERCIAL EJEMPLO S.A.</razonSocial>"));
    assert!(canonical.contains("Colón"));
}

#[test]
fn fixture_voucher_matches_recorded_digest() {
    assert_eq!(canonical_document_digest(&common::document()), FACTURA_DIGEST);
    assert_eq!(canonical_document_digest(&canonical_fixture()), FACTURA_DIGEST);
}

#[test]
fn signed_voucher_references_recorded_digest() {
    let signer = xades_sri_core::DocumentSigner::from_pkcs12_at(
        &common::credential("security-data.p12"),
        common::PASSWORD,
        xades_sri_core::SignerConfig::default(),
        common::signing_time(),
    )
    .expect("signer");
    let signed = signer.sign(&common::document()).expect("sign");
    let document_digest = common::capture(
        &signed,
        r##"(?s)URI="#comprobante">.*?<ds:DigestValue>([^<]+)</ds:DigestValue>"##,
    );
    assert_eq!(document_digest, FACTURA_DIGEST);
}
