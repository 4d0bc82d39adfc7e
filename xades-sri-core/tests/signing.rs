mod common;

use rand::{SeedableRng, rngs::StdRng};
use regex::Regex;
use xades_sri_core::credential::IssuerConvention;
use xades_sri_core::xades::{canonicalize, digest};
use xades_sri_core::{DocumentSigner, IdRange, SignerConfig};

fn security_data_signer(config: SignerConfig) -> DocumentSigner {
    DocumentSigner::from_pkcs12_at(
        &common::credential("security-data.p12"),
        common::PASSWORD,
        config,
        common::signing_time(),
    )
    .expect("signer")
}

fn sign_seeded(signer: &DocumentSigner, seed: u64) -> String {
    signer
        .sign_with(
            &common::document(),
            &mut StdRng::seed_from_u64(seed),
            common::signing_time(),
        )
        .expect("sign document")
}

#[test]
fn signs_voucher_with_verifiable_signature() {
    let signer = security_data_signer(SignerConfig::default());
    assert_eq!(signer.context().convention(), IssuerConvention::SecurityData);

    for seed in [1, 2] {
        let signed = sign_seeded(&signer, seed);
        common::verify_signature(&signed);
        assert_eq!(signed.matches("<ds:Signature ").count(), 1);
        assert_eq!(signed.matches("</ds:Signature>").count(), 1);
    }
}

#[test]
fn signature_sits_just_inside_root_end_tag() {
    let signer = security_data_signer(SignerConfig::default());
    let signed = sign_seeded(&signer, 3);

    assert!(signed.ends_with("</ds:Object></ds:Signature></factura>"));
    assert!(signed.starts_with(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<factura id=\"comprobante\" version=\"1.1.0\"><infoTributaria>"
    ));
    assert!(!signed.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\n"));

    // Removing the signature gives back the canonical document.
    let signature_start = signed.find("<ds:Signature ").expect("signature");
    let unsigned = format!(
        "{}</factura>",
        signed[..signature_start].replacen("?>\n", "?>", 1)
    );
    assert_eq!(unsigned, canonicalize(&common::document()));
}

#[test]
fn declaration_line_break_can_be_turned_off() {
    let signer = security_data_signer(SignerConfig::default().with_declaration_line_break(false));
    let signed = sign_seeded(&signer, 4);
    assert!(signed.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><factura"));
    common::verify_signature(&signed);
}

#[test]
fn byte_order_mark_is_not_carried_into_signed_output() {
    let signer = security_data_signer(SignerConfig::default());
    let with_bom = format!("\u{feff}{}", common::document());
    let signed = signer
        .sign_with(&with_bom, &mut StdRng::seed_from_u64(8), common::signing_time())
        .expect("sign document");

    assert!(signed.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<factura"));
    let document_digest = common::capture(
        &signed,
        r##"(?s)URI="#comprobante">.*?<ds:DigestValue>([^<]+)</ds:DigestValue>"##,
    );
    assert_eq!(document_digest, digest(canonicalize(&common::document())));
    common::verify_signature(&signed);
}

#[test]
fn reference_digests_match_embedded_fragments() {
    let signer = security_data_signer(SignerConfig::default());
    let signed = sign_seeded(&signer, 5);

    let digest_values: Vec<String> = Regex::new(r"<ds:DigestValue>([^<]+)</ds:DigestValue>")
        .expect("regex")
        .captures_iter(&signed)
        .map(|caps| caps[1].to_string())
        .collect();
    // SignedProperties, KeyInfo, document, then the certificate digest inside SignedProperties.
    assert_eq!(digest_values.len(), 4);

    let signed_properties = common::capture(
        &signed,
        r"(?s)(<etsi:SignedProperties .*?</etsi:SignedProperties>)",
    );
    let key_info = common::capture(&signed, r"(?s)(<ds:KeyInfo .*?</ds:KeyInfo>)");

    assert_eq!(
        digest_values[0],
        digest(common::namespaced(&signed_properties, "<etsi:SignedProperties"))
    );
    assert_eq!(
        digest_values[1],
        digest(common::namespaced(&key_info, "<ds:KeyInfo"))
    );
    assert_eq!(
        digest_values[2],
        digest(canonicalize(&common::document()))
    );

    let certificate = common::decode_wrapped(&common::capture(
        &signed,
        r"(?s)<ds:X509Certificate>(.*?)</ds:X509Certificate>",
    ));
    assert_eq!(certificate, signer.context().certificate_der());
    assert_eq!(digest_values[3], digest(&certificate));
}

#[test]
fn signed_properties_describe_signer_certificate() {
    let signer = security_data_signer(SignerConfig::default());
    let signed = sign_seeded(&signer, 6);

    assert!(signed.contains("<etsi:SigningTime>2025-06-01T12:00:00Z</etsi:SigningTime>"));
    assert!(signed.contains(
        "<ds:X509IssuerName>CN=AUTORIDAD DE CERTIFICACION SUBCA-2 SECURITY DATA,OU=ENTIDAD DE CERTIFICACION DE INFORMACION,O=SECURITY DATA SEGURIDAD EN DATOS Y FIRMA DIGITAL S.A.,C=EC</ds:X509IssuerName>"
    ));
    assert!(signed.contains(
        "<ds:X509SerialNumber>237821363505177722729502849</ds:X509SerialNumber>"
    ));
    assert!(signed.contains("<etsi:Description>contenido comprobante</etsi:Description>"));
    assert!(signed.contains("<etsi:MimeType>text/xml</etsi:MimeType>"));
    assert!(signed.contains("<ds:Exponent>AQAB</ds:Exponent>"));
}

#[test]
fn ids_are_declared_and_referenced_consistently() {
    let signer = security_data_signer(SignerConfig::default());
    let signed = sign_seeded(&signer, 7);

    let signature_id = common::capture(&signed, r#"<ds:Signature [^>]*Id="([^"]+)""#);
    let signed_properties_id = common::capture(&signed, r#"<etsi:SignedProperties Id="([^"]+)""#);
    let certificate_id = common::capture(&signed, r#"<ds:KeyInfo Id="([^"]+)""#);
    let document_reference_id = common::capture(
        &signed,
        r##"<ds:Reference Id="([^"]+)" URI="#comprobante""##,
    );

    assert!(signed.contains(&format!(
        "Type=\"http://uri.etsi.org/01903#SignedProperties\" URI=\"#{signed_properties_id}\""
    )));
    assert!(signed.contains(&format!("<ds:Reference URI=\"#{certificate_id}\">")));
    assert!(signed.contains(&format!(
        "<etsi:DataObjectFormat ObjectReference=\"#{document_reference_id}\">"
    )));
    assert!(signed.contains(&format!(
        "<etsi:QualifyingProperties Target=\"#{signature_id}\">"
    )));
    assert!(signed_properties_id.starts_with(&format!("{signature_id}-SignedProperties")));

    let object_id = common::capture(&signed, r#"<ds:Object Id="([^"]+)""#);
    assert!(object_id.starts_with(&format!("{signature_id}-Object")));
    common::capture(&signed, r#"<ds:SignedInfo Id="(Signature-SignedInfo\d+)""#);
    common::capture(&signed, r#"<ds:SignatureValue Id="(SignatureValue\d+)""#);

    // Every fragment reference resolves to a declared Id (or to the voucher root).
    let declared: Vec<String> = Regex::new(r#"\b[Ii]d="([^"]+)""#)
        .expect("regex")
        .captures_iter(&signed)
        .map(|caps| caps[1].to_string())
        .collect();
    let references = Regex::new(r##"(?:URI|ObjectReference|Target)="#([^"]+)""##).expect("regex");
    for caps in references.captures_iter(&signed) {
        assert!(
            declared.iter().any(|id| id == &caps[1]),
            "dangling reference #{}",
            &caps[1]
        );
    }
}

#[test]
fn seeded_signing_is_reproducible() {
    let signer = security_data_signer(SignerConfig::default());
    assert_eq!(sign_seeded(&signer, 11), sign_seeded(&signer, 11));
    assert_ne!(sign_seeded(&signer, 11), sign_seeded(&signer, 12));
}

#[test]
fn colliding_id_suffixes_are_not_masked() {
    let config = SignerConfig::default().with_id_range(IdRange::new(4242, 4242).expect("range"));
    let signer = security_data_signer(config);
    let signed = sign_seeded(&signer, 13);

    // All eight suffixes collide; output is still produced and still verifies.
    assert!(signed.contains("<ds:KeyInfo Id=\"Certificate4242\">"));
    assert!(signed.contains("<ds:Object Id=\"Signature4242-Object4242\">"));
    assert!(signed.contains("<ds:SignatureValue Id=\"SignatureValue4242\">"));
    let suffixes = Regex::new(r#"[Ii]d="[A-Za-z-]*(\d+)(?:-[A-Za-z]+(\d+))?""#).expect("regex");
    for caps in suffixes.captures_iter(&signed) {
        assert_eq!(&caps[1], "4242");
    }
    common::verify_signature(&signed);
}

#[test]
fn default_range_draws_suffixes_between_990_and_9999() {
    let signer = security_data_signer(SignerConfig::default());
    let suffix = Regex::new(r"Certificate(\d+)").expect("regex");
    for seed in 0..20 {
        let signed = sign_seeded(&signer, seed);
        let value: u32 = suffix.captures(&signed).expect("certificate id")[1]
            .parse()
            .expect("number");
        assert!((990..=9999).contains(&value));
    }
}

#[test]
fn banco_central_store_uses_signing_key_bag() {
    let signer = DocumentSigner::from_pkcs12_at(
        &common::credential("banco-central.p12"),
        common::PASSWORD,
        SignerConfig::default(),
        common::signing_time(),
    )
    .expect("signer");
    assert_eq!(signer.context().convention(), IssuerConvention::BancoCentral);
    assert_eq!(
        signer.context().issuer_name(),
        "CN=AC BANCO CENTRAL DEL ECUADOR,OU=ENTIDAD DE CERTIFICACION DE INFORMACION-ECIBCE,O=BANCO CENTRAL DEL ECUADOR,C=EC"
    );

    let signed = signer
        .sign_with(
            &common::document(),
            &mut StdRng::seed_from_u64(21),
            common::signing_time(),
        )
        .expect("sign");
    common::verify_signature(&signed);
}

#[test]
fn top_level_sign_uses_current_time() {
    let signed = xades_sri_core::sign(
        &common::credential("security-data.p12"),
        common::PASSWORD,
        &common::document(),
    )
    .expect("sign");
    common::verify_signature(&signed);
    let year = chrono::Utc::now().format("%Y").to_string();
    assert!(signed.contains(&format!("<etsi:SigningTime>{year}-")));
}
