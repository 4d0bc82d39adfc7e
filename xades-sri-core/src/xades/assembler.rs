use super::constants::{
    BASE64_LINE_WIDTH, C14N_ALGORITHM, DATA_OBJECT_DESCRIPTION, DATA_OBJECT_MIME_TYPE,
    DOCUMENT_ID, ENVELOPED_SIGNATURE_TRANSFORM, NAMESPACE_DECLARATIONS, RSA_SHA1_ALGORITHM,
    SHA1_DIGEST_ALGORITHM, SIGNED_PROPERTIES_TYPE,
};
use super::digest::digest;
use crate::config::IdRange;
use crate::credential::SigningContext;
use crate::sign::SigningError;
use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use rand::Rng;
use rsa::Pkcs1v15Sign;
use sha1::{Digest, Sha1};
use tracing::debug;

/// Numeric suffixes of the eight `Id` attributes of one signature.
///
/// Drawn independently, so two of them may coincide; nothing here relies on them being
/// distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureIds {
    pub certificate: u32,
    pub signature: u32,
    pub signed_properties: u32,
    pub signed_info: u32,
    pub signed_properties_reference: u32,
    pub document_reference: u32,
    pub signature_value: u32,
    pub object: u32,
}

impl SignatureIds {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, range: &IdRange) -> Self {
        let mut next = || rng.gen_range(range.as_range());
        SignatureIds {
            certificate: next(),
            signature: next(),
            signed_properties: next(),
            signed_info: next(),
            signed_properties_reference: next(),
            document_reference: next(),
            signature_value: next(),
            object: next(),
        }
    }

    pub fn signature_id(&self) -> String {
        format!("Signature{}", self.signature)
    }

    pub fn signed_properties_id(&self) -> String {
        format!(
            "Signature{}-SignedProperties{}",
            self.signature, self.signed_properties
        )
    }

    pub fn certificate_id(&self) -> String {
        format!("Certificate{}", self.certificate)
    }

    pub fn signed_info_id(&self) -> String {
        format!("Signature-SignedInfo{}", self.signed_info)
    }

    pub fn signed_properties_reference_id(&self) -> String {
        format!("SignedPropertiesID{}", self.signed_properties_reference)
    }

    pub fn document_reference_id(&self) -> String {
        format!("Reference-ID-{}", self.document_reference)
    }

    pub fn signature_value_id(&self) -> String {
        format!("SignatureValue{}", self.signature_value)
    }

    pub fn object_id(&self) -> String {
        format!("Signature{}-Object{}", self.signature, self.object)
    }
}

/// A fragment in embedded form plus the digest of its namespaced form.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DigestedFragment {
    xml: String,
    namespaced: String,
    digest: String,
}

impl DigestedFragment {
    fn new(xml: String, root_tag: &str) -> Self {
        let namespaced = with_namespaces(&xml, root_tag);
        let digest = digest(&namespaced);
        Self {
            xml,
            namespaced,
            digest,
        }
    }
}

/// Builds the complete `ds:Signature` element for a document whose canonical digest is
/// `document_digest`.
pub fn assemble(
    context: &SigningContext,
    ids: &SignatureIds,
    document_digest: &str,
    signing_time: DateTime<Utc>,
) -> Result<String, SigningError> {
    let signed_properties = DigestedFragment::new(
        signed_properties_xml(context, ids, signing_time),
        "<etsi:SignedProperties",
    );
    let key_info = DigestedFragment::new(key_info_xml(context, ids), "<ds:KeyInfo");
    let signed_info = DigestedFragment::new(
        signed_info_xml(ids, &signed_properties.digest, &key_info.digest, document_digest),
        "<ds:SignedInfo",
    );
    debug!(
        signed_properties = %signed_properties.digest,
        key_info = %key_info.digest,
        document = document_digest,
        "computed reference digests"
    );

    let signature_value = sign_signed_info(context, &signed_info.namespaced)?;

    let mut xml = String::new();
    xml.push_str(&format!(
        "<ds:Signature {NAMESPACE_DECLARATIONS} Id=\"{}\">",
        ids.signature_id()
    ));
    xml.push('\n');
    xml.push_str(&signed_info.xml);
    xml.push_str(&format!(
        "\n<ds:SignatureValue Id=\"{}\">\n",
        ids.signature_value_id()
    ));
    xml.push_str(&signature_value);
    xml.push_str("\n</ds:SignatureValue>");
    xml.push('\n');
    xml.push_str(&key_info.xml);
    xml.push_str(&format!("\n<ds:Object Id=\"{}\">", ids.object_id()));
    xml.push_str(&format!(
        "<etsi:QualifyingProperties Target=\"#{}\">",
        ids.signature_id()
    ));
    xml.push_str(&signed_properties.xml);
    xml.push_str("</etsi:QualifyingProperties>");
    xml.push_str("</ds:Object>");
    xml.push_str("</ds:Signature>");
    Ok(xml)
}

fn signed_properties_xml(
    context: &SigningContext,
    ids: &SignatureIds,
    signing_time: DateTime<Utc>,
) -> String {
    let mut xml = String::new();
    xml.push_str(&format!(
        "<etsi:SignedProperties Id=\"{}\">",
        ids.signed_properties_id()
    ));
    xml.push_str("<etsi:SignedSignatureProperties>");
    xml.push_str(&format!(
        "<etsi:SigningTime>{}</etsi:SigningTime>",
        format_signing_time(&signing_time)
    ));
    xml.push_str("<etsi:SigningCertificate>");
    xml.push_str("<etsi:Cert>");
    xml.push_str("<etsi:CertDigest>");
    xml.push_str(&format!(
        "<ds:DigestMethod Algorithm=\"{SHA1_DIGEST_ALGORITHM}\"></ds:DigestMethod>"
    ));
    xml.push_str(&format!(
        "<ds:DigestValue>{}</ds:DigestValue>",
        digest(context.certificate_der())
    ));
    xml.push_str("</etsi:CertDigest>");
    xml.push_str("<etsi:IssuerSerial>");
    xml.push_str(&format!(
        "<ds:X509IssuerName>{}</ds:X509IssuerName>",
        context.issuer_name()
    ));
    xml.push_str(&format!(
        "<ds:X509SerialNumber>{}</ds:X509SerialNumber>",
        context.serial_number()
    ));
    xml.push_str("</etsi:IssuerSerial>");
    xml.push_str("</etsi:Cert>");
    xml.push_str("</etsi:SigningCertificate>");
    xml.push_str("</etsi:SignedSignatureProperties>");
    xml.push_str("<etsi:SignedDataObjectProperties>");
    xml.push_str(&format!(
        "<etsi:DataObjectFormat ObjectReference=\"#{}\">",
        ids.document_reference_id()
    ));
    xml.push_str(&format!(
        "<etsi:Description>{DATA_OBJECT_DESCRIPTION}</etsi:Description>"
    ));
    xml.push_str(&format!(
        "<etsi:MimeType>{DATA_OBJECT_MIME_TYPE}</etsi:MimeType>"
    ));
    xml.push_str("</etsi:DataObjectFormat>");
    xml.push_str("</etsi:SignedDataObjectProperties>");
    xml.push_str("</etsi:SignedProperties>");
    xml
}

fn key_info_xml(context: &SigningContext, ids: &SignatureIds) -> String {
    let mut xml = String::new();
    xml.push_str(&format!("<ds:KeyInfo Id=\"{}\">", ids.certificate_id()));
    xml.push_str("\n<ds:X509Data>");
    xml.push_str("\n<ds:X509Certificate>\n");
    xml.push_str(&wrapped_base64(context.certificate_der()));
    xml.push_str("\n</ds:X509Certificate>");
    xml.push_str("\n</ds:X509Data>");
    xml.push_str("\n<ds:KeyValue>");
    xml.push_str("\n<ds:RSAKeyValue>");
    xml.push_str("\n<ds:Modulus>\n");
    xml.push_str(&wrapped_base64(context.modulus()));
    xml.push_str("\n</ds:Modulus>");
    xml.push_str(&format!(
        "\n<ds:Exponent>{}</ds:Exponent>",
        Base64::encode_string(context.exponent())
    ));
    xml.push_str("\n</ds:RSAKeyValue>");
    xml.push_str("\n</ds:KeyValue>");
    xml.push_str("\n</ds:KeyInfo>");
    xml
}

fn signed_info_xml(
    ids: &SignatureIds,
    signed_properties_digest: &str,
    key_info_digest: &str,
    document_digest: &str,
) -> String {
    let digest_method =
        format!("\n<ds:DigestMethod Algorithm=\"{SHA1_DIGEST_ALGORITHM}\"></ds:DigestMethod>");
    let mut xml = String::new();
    xml.push_str(&format!(
        "<ds:SignedInfo Id=\"{}\">",
        ids.signed_info_id()
    ));
    xml.push_str(&format!(
        "\n<ds:CanonicalizationMethod Algorithm=\"{C14N_ALGORITHM}\"></ds:CanonicalizationMethod>"
    ));
    xml.push_str(&format!(
        "\n<ds:SignatureMethod Algorithm=\"{RSA_SHA1_ALGORITHM}\"></ds:SignatureMethod>"
    ));

    xml.push_str(&format!(
        "\n<ds:Reference Id=\"{}\" Type=\"{SIGNED_PROPERTIES_TYPE}\" URI=\"#{}\">",
        ids.signed_properties_reference_id(),
        ids.signed_properties_id()
    ));
    xml.push_str(&digest_method);
    xml.push_str(&format!(
        "\n<ds:DigestValue>{signed_properties_digest}</ds:DigestValue>"
    ));
    xml.push_str("\n</ds:Reference>");

    xml.push_str(&format!(
        "\n<ds:Reference URI=\"#{}\">",
        ids.certificate_id()
    ));
    xml.push_str(&digest_method);
    xml.push_str(&format!("\n<ds:DigestValue>{key_info_digest}</ds:DigestValue>"));
    xml.push_str("\n</ds:Reference>");

    xml.push_str(&format!(
        "\n<ds:Reference Id=\"{}\" URI=\"#{DOCUMENT_ID}\">",
        ids.document_reference_id()
    ));
    xml.push_str("\n<ds:Transforms>");
    xml.push_str(&format!(
        "\n<ds:Transform Algorithm=\"{ENVELOPED_SIGNATURE_TRANSFORM}\"></ds:Transform>"
    ));
    xml.push_str("\n</ds:Transforms>");
    xml.push_str(&digest_method);
    xml.push_str(&format!("\n<ds:DigestValue>{document_digest}</ds:DigestValue>"));
    xml.push_str("\n</ds:Reference>");
    xml.push_str("\n</ds:SignedInfo>");
    xml
}

/// RSA-SHA1 (PKCS#1 v1.5) over the namespaced `SignedInfo` bytes, base64 wrapped.
fn sign_signed_info(
    context: &SigningContext,
    namespaced_signed_info: &str,
) -> Result<String, SigningError> {
    let hashed = Sha1::digest(namespaced_signed_info.as_bytes());
    let signature = context
        .private_key()
        .sign(Pkcs1v15Sign::new::<Sha1>(), &hashed)
        .map_err(|e| SigningError::Signing(format!("Failed to sign SignedInfo: {e:?}")))?;
    Ok(wrapped_base64(&signature))
}

/// Declares both signature namespaces on the fragment root. Only the first occurrence of
/// `root_tag` is touched.
fn with_namespaces(fragment: &str, root_tag: &str) -> String {
    fragment.replacen(root_tag, &format!("{root_tag} {NAMESPACE_DECLARATIONS}"), 1)
}

fn format_signing_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Base64 of `bytes` split into lines of [`BASE64_LINE_WIDTH`] joined by `\n`.
fn wrapped_base64(bytes: &[u8]) -> String {
    let encoded = Base64::encode_string(bytes);
    encoded
        .as_bytes()
        .chunks(BASE64_LINE_WIDTH)
        .map(|line| std::str::from_utf8(line).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}
