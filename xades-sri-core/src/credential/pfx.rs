//! PKCS#12 (RFC 7292) decoding: integrity MAC check, content decryption and bag extraction.
//!
//! Legacy PKCS#12 PBE ciphers (SHA-1 key derivation with 3DES or 40-bit RC2) and PBES2 are both
//! understood, together with SHA-1 and SHA-2 MACs, so stores written by older signing tools and
//! by current OpenSSL defaults load the same way.
use crate::sign::SigningError;
use cbc::cipher::{BlockDecryptMut, InnerIvInit, KeyIvInit, block_padding::Pkcs7};
use cms::content_info::ContentInfo;
use cms::encrypted_data::EncryptedData;
use der::asn1::{ObjectIdentifier, OctetString};
use der::{Any, Decode, Encode, Sequence};
use hmac::{Hmac, Mac, digest::KeyInit};
use pkcs12::kdf::{Pkcs12KeyType, derive_key_utf8};
use pkcs12::mac_data::MacData;
use pkcs12::pfx::Pfx;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use tracing::debug;
use x509_cert::attr::Attributes;
use x509_cert::spki::AlgorithmIdentifierOwned;

const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
const ID_ENCRYPTED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.6");

const KEY_BAG: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.1");
const SHROUDED_KEY_BAG: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.2");
const CERT_BAG: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.3");
const X509_CERTIFICATE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.22.1");
const FRIENDLY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.20");

const PBES2: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.13");
const PBE_SHA1_3DES: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.3");
const PBE_SHA1_RC2_40: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.6");

const ID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
const ID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
const ID_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
const ID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

/// `SafeBag`, with the bag value left undecoded until its type is known.
#[derive(Clone, Debug, Sequence)]
struct SafeBag {
    bag_id: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
    bag_value: Any,
    bag_attributes: Option<Attributes>,
}

#[derive(Clone, Debug, Sequence)]
struct CertBag {
    cert_id: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
    cert_value: OctetString,
}

/// `EncryptedPrivateKeyInfo` with the algorithm kept generic, since legacy PKCS#12 PBE
/// identifiers are not PKCS#5 schemes.
#[derive(Clone, Debug, Sequence)]
struct ShroudedKeyBag {
    encryption_algorithm: AlgorithmIdentifierOwned,
    encrypted_data: OctetString,
}

/// `pkcs-12PbeParams`.
#[derive(Clone, Debug, Sequence)]
struct LegacyPbeParams {
    salt: OctetString,
    iterations: i32,
}

/// A certificate or private key recovered from the store, in bag order.
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum Bag {
    Certificate {
        der: Vec<u8>,
        friendly_name: Option<String>,
    },
    /// PKCS#8 `PrivateKeyInfo` DER.
    Key {
        der: Vec<u8>,
        friendly_name: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MacDigest {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl MacDigest {
    fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [
            (ID_SHA1, MacDigest::Sha1),
            (ID_SHA256, MacDigest::Sha256),
            (ID_SHA384, MacDigest::Sha384),
            (ID_SHA512, MacDigest::Sha512),
        ]
        .into_iter()
        .find(|(known, _)| known == oid)
        .map(|(_, digest)| digest)
    }

    /// Derives the MAC key from `password` (RFC 7292 appendix B) and checks `expected`.
    fn verify(
        self,
        password: &str,
        salt: &[u8],
        rounds: i32,
        content: &[u8],
        expected: &[u8],
    ) -> Result<bool, SigningError> {
        let mac = Pkcs12KeyType::Mac;
        let derivation = "PKCS#12 MAC key derivation";
        Ok(match self {
            MacDigest::Sha1 => {
                let key = derive_key_utf8::<Sha1>(password, salt, mac, rounds, 20)
                    .map_err(malformed(derivation))?;
                hmac_matches::<Hmac<Sha1>>(&key, content, expected)
            }
            MacDigest::Sha256 => {
                let key = derive_key_utf8::<Sha256>(password, salt, mac, rounds, 32)
                    .map_err(malformed(derivation))?;
                hmac_matches::<Hmac<Sha256>>(&key, content, expected)
            }
            MacDigest::Sha384 => {
                let key = derive_key_utf8::<Sha384>(password, salt, mac, rounds, 48)
                    .map_err(malformed(derivation))?;
                hmac_matches::<Hmac<Sha384>>(&key, content, expected)
            }
            MacDigest::Sha512 => {
                let key = derive_key_utf8::<Sha512>(password, salt, mac, rounds, 64)
                    .map_err(malformed(derivation))?;
                hmac_matches::<Hmac<Sha512>>(&key, content, expected)
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encryption {
    Pbes2,
    LegacyTripleDes,
    LegacyRc2,
}

impl Encryption {
    fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [
            (PBES2, Encryption::Pbes2),
            (PBE_SHA1_3DES, Encryption::LegacyTripleDes),
            (PBE_SHA1_RC2_40, Encryption::LegacyRc2),
        ]
        .into_iter()
        .find(|(known, _)| known == oid)
        .map(|(_, encryption)| encryption)
    }
}

/// Decodes `der`, verifies its MAC with `password` and returns every certificate and key bag.
pub(crate) fn decode(der: &[u8], password: &str) -> Result<Vec<Bag>, SigningError> {
    let pfx = Pfx::from_der(der).map_err(malformed("PKCS#12 parse error"))?;
    let auth_safe = octets(&pfx.auth_safe.content)?;
    match &pfx.mac_data {
        Some(mac_data) => verify_mac(mac_data, &auth_safe, password)?,
        None => debug!("PKCS#12 store carries no integrity MAC"),
    }

    let contents =
        Vec::<ContentInfo>::from_der(&auth_safe).map_err(malformed("PKCS#12 authenticated safe"))?;
    let mut bags = Vec::new();
    for content in &contents {
        let safe_contents = if content.content_type == ID_DATA {
            octets(&content.content)?
        } else if content.content_type == ID_ENCRYPTED_DATA {
            encrypted_content(&content.content, password)?
        } else {
            debug!(content_type = %content.content_type, "skipping unsupported PKCS#12 content");
            continue;
        };
        let safe_bags =
            Vec::<SafeBag>::from_der(&safe_contents).map_err(malformed("PKCS#12 safe contents"))?;
        for bag in &safe_bags {
            if let Some(bag) = decode_bag(bag, password)? {
                bags.push(bag);
            }
        }
    }
    Ok(bags)
}

fn verify_mac(mac_data: &MacData, content: &[u8], password: &str) -> Result<(), SigningError> {
    let algorithm = &mac_data.mac.algorithm.oid;
    let digest = MacDigest::from_oid(algorithm).ok_or_else(|| {
        SigningError::Credential(format!("Unsupported PKCS#12 MAC digest algorithm {algorithm}"))
    })?;
    let verified = digest.verify(
        password,
        mac_data.mac_salt.as_bytes(),
        mac_data.iterations,
        content,
        mac_data.mac.digest.as_bytes(),
    )?;
    if !verified {
        return Err(SigningError::Credential(
            "PKCS#12 integrity check failed (wrong password?)".into(),
        ));
    }
    debug!(?digest, "verified PKCS#12 integrity MAC");
    Ok(())
}

fn hmac_matches<M: Mac + KeyInit>(key: &[u8], content: &[u8], expected: &[u8]) -> bool {
    match <M as Mac>::new_from_slice(key) {
        Ok(mut mac) => {
            mac.update(content);
            mac.verify_slice(expected).is_ok()
        }
        Err(_) => false,
    }
}

/// Content bytes of a `Data` payload.
fn octets(content: &Any) -> Result<Vec<u8>, SigningError> {
    let encoded = content.to_der().map_err(malformed("PKCS#12 content"))?;
    let octets = OctetString::from_der(&encoded).map_err(malformed("PKCS#12 data content"))?;
    Ok(octets.as_bytes().to_vec())
}

fn encrypted_content(content: &Any, password: &str) -> Result<Vec<u8>, SigningError> {
    let encoded = content.to_der().map_err(malformed("PKCS#12 content"))?;
    let encrypted =
        EncryptedData::from_der(&encoded).map_err(malformed("PKCS#12 encrypted data"))?;
    let info = encrypted.enc_content_info;
    let ciphertext = info.encrypted_content.ok_or_else(|| {
        SigningError::Credential("PKCS#12 encrypted data has no content".into())
    })?;
    decrypt(&info.content_enc_alg, ciphertext.as_bytes(), password)
}

fn decode_bag(bag: &SafeBag, password: &str) -> Result<Option<Bag>, SigningError> {
    let friendly_name = friendly_name(bag.bag_attributes.as_ref());
    let value = bag.bag_value.to_der().map_err(malformed("PKCS#12 bag"))?;

    if bag.bag_id == CERT_BAG {
        let cert_bag = CertBag::from_der(&value).map_err(malformed("PKCS#12 certificate bag"))?;
        if cert_bag.cert_id != X509_CERTIFICATE {
            debug!(cert_type = %cert_bag.cert_id, "skipping non-X.509 certificate bag");
            return Ok(None);
        }
        Ok(Some(Bag::Certificate {
            der: cert_bag.cert_value.as_bytes().to_vec(),
            friendly_name,
        }))
    } else if bag.bag_id == SHROUDED_KEY_BAG {
        let shrouded = ShroudedKeyBag::from_der(&value).map_err(malformed("PKCS#12 key bag"))?;
        let der = decrypt(
            &shrouded.encryption_algorithm,
            shrouded.encrypted_data.as_bytes(),
            password,
        )
        .map_err(|_| {
            SigningError::Credential(format!(
                "Failed to decrypt key entry {:?}",
                friendly_name.as_deref().unwrap_or("")
            ))
        })?;
        Ok(Some(Bag::Key { der, friendly_name }))
    } else if bag.bag_id == KEY_BAG {
        Ok(Some(Bag::Key {
            der: value,
            friendly_name,
        }))
    } else {
        debug!(bag_id = %bag.bag_id, ?friendly_name, "skipping unsupported PKCS#12 bag");
        Ok(None)
    }
}

fn friendly_name(attributes: Option<&Attributes>) -> Option<String> {
    attributes?
        .iter()
        .find(|attribute| attribute.oid == FRIENDLY_NAME)?
        .values
        .iter()
        .next()
        .map(super::decode_string)
}

/// Decrypts PBES2 or legacy PKCS#12 PBE `ciphertext`.
fn decrypt(
    algorithm: &AlgorithmIdentifierOwned,
    ciphertext: &[u8],
    password: &str,
) -> Result<Vec<u8>, SigningError> {
    let encryption = Encryption::from_oid(&algorithm.oid).ok_or_else(|| {
        SigningError::Credential(format!(
            "Unsupported PKCS#12 encryption algorithm {}",
            algorithm.oid
        ))
    })?;

    match encryption {
        Encryption::Pbes2 => {
            let encoded = algorithm
                .to_der()
                .map_err(malformed("PBES2 algorithm identifier"))?;
            let scheme = pkcs5::EncryptionScheme::from_der(&encoded)
                .map_err(malformed("PBES2 parameters"))?;
            scheme
                .decrypt(password, ciphertext)
                .map_err(malformed("PBES2 decryption failed"))
        }
        Encryption::LegacyTripleDes => {
            let params = legacy_params(algorithm)?;
            let key = legacy_key(password, &params, Pkcs12KeyType::EncryptionKey, 24)?;
            let iv = legacy_key(password, &params, Pkcs12KeyType::Iv, 8)?;
            cbc::Decryptor::<des::TdesEde3>::new_from_slices(&key, &iv)
                .map_err(malformed("3DES key setup"))?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(malformed("3DES decryption failed"))
        }
        Encryption::LegacyRc2 => {
            let params = legacy_params(algorithm)?;
            let key = legacy_key(password, &params, Pkcs12KeyType::EncryptionKey, 5)?;
            let iv = legacy_key(password, &params, Pkcs12KeyType::Iv, 8)?;
            let cipher = rc2::Rc2::new_with_eff_key_len(&key, 40);
            cbc::Decryptor::<rc2::Rc2>::inner_iv_slice_init(cipher, &iv)
                .map_err(malformed("RC2 key setup"))?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(malformed("RC2 decryption failed"))
        }
    }
}

fn legacy_params(algorithm: &AlgorithmIdentifierOwned) -> Result<LegacyPbeParams, SigningError> {
    let parameters = algorithm.parameters.as_ref().ok_or_else(|| {
        SigningError::Credential(format!(
            "PKCS#12 encryption algorithm {} has no parameters",
            algorithm.oid
        ))
    })?;
    let encoded = parameters
        .to_der()
        .map_err(malformed("PKCS#12 PBE parameters"))?;
    LegacyPbeParams::from_der(&encoded).map_err(malformed("PKCS#12 PBE parameters"))
}

fn legacy_key(
    password: &str,
    params: &LegacyPbeParams,
    key_type: Pkcs12KeyType,
    len: usize,
) -> Result<Vec<u8>, SigningError> {
    derive_key_utf8::<Sha1>(password, params.salt.as_bytes(), key_type, params.iterations, len)
        .map_err(malformed("PKCS#12 key derivation"))
}

fn malformed<E: std::fmt::Debug>(what: &'static str) -> impl FnOnce(E) -> SigningError {
    move |e| SigningError::Credential(format!("{what}: {e:?}"))
}
