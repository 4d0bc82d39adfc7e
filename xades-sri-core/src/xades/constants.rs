pub(crate) const DS_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
pub(crate) const XADES_NS: &str = "http://uri.etsi.org/01903/v1.3.2#";

/// Declarations carried by the outer `ds:Signature` element and injected into each fragment
/// root while it is digested.
pub(crate) const NAMESPACE_DECLARATIONS: &str = concat!(
    "xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\"",
    " ",
    "xmlns:etsi=\"http://uri.etsi.org/01903/v1.3.2#\"",
);

pub(crate) const C14N_ALGORITHM: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub(crate) const RSA_SHA1_ALGORITHM: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
pub(crate) const SHA1_DIGEST_ALGORITHM: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub(crate) const ENVELOPED_SIGNATURE_TRANSFORM: &str =
    "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
pub(crate) const SIGNED_PROPERTIES_TYPE: &str = "http://uri.etsi.org/01903#SignedProperties";

/// `id` attribute value of the voucher root element, target of the enveloped reference.
pub const DOCUMENT_ID: &str = "comprobante";

pub(crate) const DATA_OBJECT_DESCRIPTION: &str = "contenido comprobante";
pub(crate) const DATA_OBJECT_MIME_TYPE: &str = "text/xml";

/// Column width for base64 payloads embedded in the signature.
pub(crate) const BASE64_LINE_WIDTH: usize = 76;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_declarations_use_both_namespaces() {
        assert_eq!(
            NAMESPACE_DECLARATIONS,
            format!("xmlns:ds=\"{DS_NS}\" xmlns:etsi=\"{XADES_NS}\"")
        );
    }
}
