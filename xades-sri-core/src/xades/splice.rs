use crate::sign::SigningError;
use regex::Regex;
use std::sync::LazyLock;

/// The last `<...` run of the document: its closing root tag once canonicalized.
static FINAL_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<]+$").expect("final tag regex"));

const DECLARATION_START: &str = "<?xml";
const DECLARATION_END: &str = "?>";

/// Inserts `signature` just inside the root end tag of the canonical document.
///
/// With `declaration_line_break`, the XML declaration (if any) is followed by exactly one `\n`.
pub fn splice(
    canonical: &str,
    signature: &str,
    declaration_line_break: bool,
) -> Result<String, SigningError> {
    let final_tag = FINAL_TAG
        .find(canonical)
        .ok_or_else(|| SigningError::Signing("Document has no closing tag".into()))?;
    if !final_tag.as_str().starts_with("</") {
        return Err(SigningError::Signing(format!(
            "Document root has no end tag to sign into: {}",
            final_tag.as_str()
        )));
    }

    let (body, tail) = canonical.split_at(final_tag.start());
    let mut signed = String::with_capacity(canonical.len() + signature.len() + 1);
    signed.push_str(body);
    signed.push_str(signature);
    signed.push_str(tail);

    if declaration_line_break {
        signed = break_after_declaration(signed);
    }
    Ok(signed)
}

fn break_after_declaration(document: String) -> String {
    if !document.starts_with(DECLARATION_START) {
        return document;
    }
    match document.find(DECLARATION_END) {
        Some(end) => {
            let split = end + DECLARATION_END.len();
            let (declaration, rest) = document.split_at(split);
            format!("{declaration}\n{}", rest.trim_start_matches(['\n', '\r', ' ', '\t']))
        }
        None => document,
    }
}
