//! XAdES-BES signing for SRI (Ecuador) electronic vouchers.
//!
//! Takes a PKCS#12 credential and a voucher XML whose root carries `id="comprobante"`, and
//! returns the voucher in canonical whitespace form with an enveloped `ds:Signature` inside
//! its root element.
//!
//! # Examples
//! ```no_run
//! let p12 = std::fs::read("firma.p12")?;
//! let xml = std::fs::read_to_string("factura.xml")?;
//! let signed = xades_sri_core::sign(&p12, "clave", &xml)?;
//! # let _ = signed;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod config;
pub mod credential;
pub mod sign;
pub mod xades;

pub use config::{ConfigError, IdRange, SignerConfig};
pub use sign::{DocumentSigner, SigningError, canonical_document_digest, sign};

use thiserror::Error;

/// Top-level error wrapper for core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
