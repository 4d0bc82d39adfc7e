use crate::sign::SigningError;
use super::pfx::{self, Bag};
use tracing::debug;
use x509_cert::{Certificate, der::Decode};

/// Certificate bag decoded from a PKCS#12 store.
#[derive(Debug, Clone)]
pub struct CertificateEntry {
    certificate: Certificate,
    der: Vec<u8>,
    friendly_name: Option<String>,
}

impl CertificateEntry {
    pub fn from_der(der: Vec<u8>, friendly_name: Option<String>) -> Result<Self, SigningError> {
        let certificate = Certificate::from_der(&der)
            .map_err(|e| SigningError::Credential(format!("Certificate parse error: {e:?}")))?;
        Ok(Self {
            certificate,
            der,
            friendly_name,
        })
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// DER bytes exactly as stored in the bag.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    pub fn extension_count(&self) -> usize {
        self.certificate
            .tbs_certificate
            .extensions
            .as_ref()
            .map_or(0, |extensions| extensions.len())
    }
}

/// Decrypted key bag. Holds PKCS#8 `PrivateKeyInfo` DER.
#[derive(Clone)]
pub struct KeyEntry {
    private_key_der: Vec<u8>,
    friendly_name: Option<String>,
}

impl KeyEntry {
    pub fn new(private_key_der: Vec<u8>, friendly_name: Option<String>) -> Self {
        Self {
            private_key_der,
            friendly_name,
        }
    }

    pub fn private_key_der(&self) -> &[u8] {
        &self.private_key_der
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }
}

impl std::fmt::Debug for KeyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyEntry")
            .field("friendly_name", &self.friendly_name)
            .finish_non_exhaustive()
    }
}

/// Certificate and key bags of a decoded PKCS#12 store, in bag order.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    certificates: Vec<CertificateEntry>,
    keys: Vec<KeyEntry>,
}

impl CredentialStore {
    pub fn new(certificates: Vec<CertificateEntry>, keys: Vec<KeyEntry>) -> Self {
        Self { certificates, keys }
    }

    /// Decodes `der` as PKCS#12, checks its MAC and decrypts every bag with `password`.
    pub fn from_pkcs12(der: &[u8], password: &str) -> Result<Self, SigningError> {
        let mut certificates = Vec::new();
        let mut keys = Vec::new();
        for bag in pfx::decode(der, password)? {
            match bag {
                Bag::Certificate { der, friendly_name } => {
                    certificates.push(CertificateEntry::from_der(der, friendly_name)?);
                }
                Bag::Key { der, friendly_name } => keys.push(KeyEntry::new(der, friendly_name)),
            }
        }

        if certificates.is_empty() {
            return Err(SigningError::Credential(
                "PKCS#12 store holds no X.509 certificate".into(),
            ));
        }
        debug!(
            certificates = certificates.len(),
            keys = keys.len(),
            "decoded credential store"
        );
        Ok(Self { certificates, keys })
    }

    pub fn certificates(&self) -> &[CertificateEntry] {
        &self.certificates
    }

    pub fn keys(&self) -> &[KeyEntry] {
        &self.keys
    }
}
