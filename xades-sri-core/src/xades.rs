//! XAdES-BES signature construction over the canonicalized voucher.
//!
//! Fragments are assembled as literal text. Every digest covers the exact bytes produced here,
//! so attribute order, line breaks and namespace placement are part of the format.
pub mod assembler;
pub mod canon;
pub mod constants;
pub mod digest;
pub mod splice;

pub use assembler::{SignatureIds, assemble};
pub use canon::canonicalize;
pub use constants::DOCUMENT_ID;
pub use digest::digest;
pub use splice::splice;
