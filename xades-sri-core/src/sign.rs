//! The signing pipeline:
//! Load -> Select -> Validate -> Canonicalize -> Digest -> Assemble -> Splice.
use crate::config::SignerConfig;
use crate::credential::{CredentialStore, SigningContext};
use crate::xades::{self, DOCUMENT_ID, SignatureIds};
use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure kinds of the signing engine. No output is produced when any of them is returned.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Malformed PKCS#12 / DER, wrong password, or a store without usable entries.
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("Unsupported certificate issuer: {friendly_name:?}")]
    UnsupportedCertificate { friendly_name: String },
    #[error("Certificate not valid at {now}: valid from {not_before} to {not_after}")]
    ExpiredCertificate {
        now: DateTime<Utc>,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    },
    #[error("Signing error: {0}")]
    Signing(String),
}

/// Signs vouchers with one credential.
///
/// The credential is decoded, the signer selected and its validity checked once at
/// construction. Every signature re-checks validity against its own signing time.
///
/// # Examples
/// ```no_run
/// use xades_sri_core::{DocumentSigner, SignerConfig};
///
/// let p12 = std::fs::read("firma.p12")?;
/// let signer = DocumentSigner::from_pkcs12(&p12, "clave", SignerConfig::default())?;
/// let signed = signer.sign("<factura id=\"comprobante\"></factura>")?;
/// # let _ = signed;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct DocumentSigner {
    context: SigningContext,
    config: SignerConfig,
}

impl DocumentSigner {
    pub fn new(context: SigningContext, config: SignerConfig) -> Self {
        Self { context, config }
    }

    pub fn from_pkcs12(
        credential: &[u8],
        password: &str,
        config: SignerConfig,
    ) -> Result<Self, SigningError> {
        Self::from_pkcs12_at(credential, password, config, Utc::now())
    }

    pub fn from_pkcs12_at(
        credential: &[u8],
        password: &str,
        config: SignerConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, SigningError> {
        let store = CredentialStore::from_pkcs12(credential, password)?;
        let context = SigningContext::select(&store)?;
        context.validity().ensure_contains(now)?;
        debug!(
            issuer = context.issuer_name(),
            serial = context.serial_number(),
            "loaded signing credential"
        );
        Ok(Self::new(context, config))
    }

    pub fn context(&self) -> &SigningContext {
        &self.context
    }

    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// Signs `xml` with fresh random Ids and the current time.
    pub fn sign(&self, xml: &str) -> Result<String, SigningError> {
        self.sign_with(xml, &mut rand::thread_rng(), Utc::now())
    }

    /// Signs `xml` drawing Id suffixes from `rng` and stamping `now` as the signing time.
    pub fn sign_with<R: Rng + ?Sized>(
        &self,
        xml: &str,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<String, SigningError> {
        self.context.validity().ensure_contains(now)?;

        let canonical = xades::canonicalize(xml);
        if !canonical.contains(&format!("id=\"{DOCUMENT_ID}\"")) {
            warn!("document has no element with id=\"{DOCUMENT_ID}\"");
        }
        let document_digest = xades::digest(&canonical);

        let ids = SignatureIds::generate(rng, &self.config.id_range());
        let signature = xades::assemble(&self.context, &ids, &document_digest, now)?;
        let signed = xades::splice(&canonical, &signature, self.config.declaration_line_break())?;

        info!(
            signature_id = %ids.signature_id(),
            signing_time = %now,
            "signed document"
        );
        Ok(signed)
    }
}

/// Signs `xml` with the credential in `credential` (PKCS#12 DER) using default options.
pub fn sign(credential: &[u8], password: &str, xml: &str) -> Result<String, SigningError> {
    DocumentSigner::from_pkcs12(credential, password, SignerConfig::default())?.sign(xml)
}

/// Digest of the canonicalized document, as placed in the `#comprobante` reference.
pub fn canonical_document_digest(xml: &str) -> String {
    xades::digest(xades::canonicalize(xml))
}
