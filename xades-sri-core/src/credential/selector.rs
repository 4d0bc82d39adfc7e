use super::store::{CertificateEntry, CredentialStore, KeyEntry};
use super::validity::ValidityWindow;
use crate::sign::SigningError;
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    traits::PublicKeyParts,
};
use tracing::{debug, warn};
use x509_cert::{
    Certificate,
    attr::AttributeTypeAndValue,
    der::{Encode, asn1::ObjectIdentifier},
    name::Name,
};

/// Key bag friendly name used by Banco Central del Ecuador stores for the signing key.
const BANCO_CENTRAL_SIGNING_KEY: &str = "SIGNING KEY";

/// Packaging conventions of the certification authorities whose stores are understood.
///
/// Classified from the friendly name of the store's reference certificate entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuerConvention {
    /// Several key bags; the signing one is named "Signing Key".
    BancoCentral,
    /// The first key bag is the signing key.
    SecurityData,
    Unsupported,
}

impl IssuerConvention {
    /// Case-insensitive substring match on the friendly name.
    pub fn classify(friendly_name: &str) -> Self {
        let name = friendly_name.to_uppercase();
        if name.contains("BANCO CENTRAL") {
            IssuerConvention::BancoCentral
        } else if name.contains("SECURITY DATA") {
            IssuerConvention::SecurityData
        } else {
            IssuerConvention::Unsupported
        }
    }

    fn select_key<'a>(&self, keys: &'a [KeyEntry]) -> Option<&'a KeyEntry> {
        match self {
            IssuerConvention::BancoCentral => keys.iter().find(|key| {
                key.friendly_name()
                    .is_some_and(|name| name.to_uppercase().contains(BANCO_CENTRAL_SIGNING_KEY))
            }),
            IssuerConvention::SecurityData => keys.first(),
            IssuerConvention::Unsupported => None,
        }
    }
}

/// Everything the signature assembler needs from the credential, derived once per store.
#[derive(Clone)]
pub struct SigningContext {
    certificate: Certificate,
    certificate_der: Vec<u8>,
    private_key: RsaPrivateKey,
    issuer_name: String,
    serial_number: String,
    modulus: Vec<u8>,
    exponent: Vec<u8>,
    convention: IssuerConvention,
    validity: ValidityWindow,
}

impl SigningContext {
    /// Picks the leaf certificate and its private key out of `store`.
    pub fn select(store: &CredentialStore) -> Result<Self, SigningError> {
        let leaf = leaf_certificate(store.certificates()).ok_or_else(|| {
            SigningError::Credential("PKCS#12 store holds no X.509 certificate".into())
        })?;
        let reference_name = reference_friendly_name(store.certificates());
        let convention = IssuerConvention::classify(reference_name);
        debug!(
            reference_name,
            ?convention,
            extensions = leaf.extension_count(),
            "selected leaf certificate"
        );

        let key_entry = match convention {
            IssuerConvention::Unsupported => {
                return Err(SigningError::UnsupportedCertificate {
                    friendly_name: reference_name.to_string(),
                });
            }
            IssuerConvention::BancoCentral | IssuerConvention::SecurityData => convention
                .select_key(store.keys())
                .ok_or_else(|| {
                    SigningError::Credential(format!(
                        "No signing key entry found for {convention:?} store"
                    ))
                })?,
        };

        let private_key = RsaPrivateKey::from_pkcs8_der(key_entry.private_key_der())
            .map_err(|e| SigningError::Signing(format!("Private key parse error: {e:?}")))?;
        warn_on_key_mismatch(leaf.certificate(), &private_key);

        let certificate = leaf.certificate().clone();
        let issuer_name = issuer_display_name(&certificate.tbs_certificate.issuer);
        let serial_number =
            serial_bytes_to_decimal_string(certificate.tbs_certificate.serial_number.as_bytes());
        let validity = ValidityWindow::of(&certificate)?;

        Ok(Self {
            certificate_der: leaf.der().to_vec(),
            certificate,
            modulus: private_key.n().to_bytes_be(),
            exponent: private_key.e().to_bytes_be(),
            private_key,
            issuer_name,
            serial_number,
            convention,
            validity,
        })
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Issuer attributes in reverse order, rendered `SHORT=value` and joined with `,`.
    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// RSA modulus, big-endian without leading zero bytes.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// RSA public exponent, big-endian in its shortest form.
    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    pub fn convention(&self) -> IssuerConvention {
        self.convention
    }

    pub fn validity(&self) -> ValidityWindow {
        self.validity
    }
}

impl std::fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningContext")
            .field("issuer_name", &self.issuer_name)
            .field("serial_number", &self.serial_number)
            .field("convention", &self.convention)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

/// The entry with the most X.509 extensions; the first one wins ties.
///
/// A heuristic for "end-entity, not CA". It is not an identity check.
fn leaf_certificate(entries: &[CertificateEntry]) -> Option<&CertificateEntry> {
    entries.iter().fold(None::<&CertificateEntry>, |best, entry| match best {
        Some(best) if best.extension_count() >= entry.extension_count() => Some(best),
        _ => Some(entry),
    })
}

/// Friendly name of the second certificate entry, or of the only one.
fn reference_friendly_name(entries: &[CertificateEntry]) -> &str {
    entries
        .get(1)
        .or_else(|| entries.first())
        .and_then(CertificateEntry::friendly_name)
        .unwrap_or("")
}

fn warn_on_key_mismatch(certificate: &Certificate, private_key: &RsaPrivateKey) {
    let certificate_key = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .ok()
        .and_then(|der| RsaPublicKey::from_public_key_der(&der).ok());
    match certificate_key {
        Some(key) if key == RsaPublicKey::from(private_key) => {}
        Some(_) => warn!("selected private key does not match the leaf certificate public key"),
        None => warn!("leaf certificate does not carry an RSA public key"),
    }
}

/// Short names for issuer attribute types; anything else renders as a dotted OID.
const SHORT_NAMES: [(ObjectIdentifier, &str); 9] = [
    (ObjectIdentifier::new_unwrap("2.5.4.3"), "CN"),
    (ObjectIdentifier::new_unwrap("2.5.4.5"), "SERIALNUMBER"),
    (ObjectIdentifier::new_unwrap("2.5.4.6"), "C"),
    (ObjectIdentifier::new_unwrap("2.5.4.7"), "L"),
    (ObjectIdentifier::new_unwrap("2.5.4.8"), "ST"),
    (ObjectIdentifier::new_unwrap("2.5.4.9"), "STREET"),
    (ObjectIdentifier::new_unwrap("2.5.4.10"), "O"),
    (ObjectIdentifier::new_unwrap("2.5.4.11"), "OU"),
    (ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1"), "E"),
];

fn short_name(oid: &ObjectIdentifier) -> String {
    SHORT_NAMES
        .iter()
        .find(|(known, _)| known == oid)
        .map_or_else(|| oid.to_string(), |(_, name)| name.to_string())
}

fn attribute_value(attribute: &AttributeTypeAndValue) -> String {
    super::decode_string(&attribute.value)
}

pub(crate) fn issuer_display_name(issuer: &Name) -> String {
    let mut attributes: Vec<&AttributeTypeAndValue> =
        issuer.0.iter().flat_map(|rdn| rdn.0.iter()).collect();
    attributes.reverse();
    attributes
        .into_iter()
        .map(|attribute| format!("{}={}", short_name(&attribute.oid), attribute_value(attribute)))
        .collect::<Vec<_>>()
        .join(",")
}

fn serial_bytes_to_decimal_string(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "0".to_string();
    }

    let mut digits: Vec<u8> = vec![0];
    for &byte in bytes {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            let value = (*digit as u32) * 256 + carry;
            *digit = (value % 10) as u8;
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }

    while digits.len() > 1 && matches!(digits.last(), Some(0)) {
        digits.pop();
    }

    digits.iter().rev().map(|d| (b'0' + *d) as char).collect()
}
