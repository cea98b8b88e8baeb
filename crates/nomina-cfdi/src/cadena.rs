//! Cadena original derivation.
//!
//! The cadena is the canonical string the certificate seals. The
//! jurisdiction publishes it as an XSLT over the document; here the
//! transform is a trait over the typed tree so deployments can swap the
//! walk when the published stylesheet revs without touching sealing.

use crate::document::CfdiDocument;

/// Produces the canonical string to be sealed for a document.
///
/// Implementations must be pure: the same document always yields the
/// same cadena, bit for bit.
pub trait CadenaTransform: Send + Sync {
    fn cadena(&self, document: &CfdiDocument) -> String;

    /// Short name for logs.
    fn transform_name(&self) -> &'static str;
}

/// Default transform: document fields in schema order, pipe-delimited,
/// wrapped in double pipes (`||f1|f2|…||`).
///
/// Field values never contain `|` because free text is sanitized during
/// aggregation, so the delimiter is unambiguous.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipeDelimited;

impl CadenaTransform for PipeDelimited {
    fn cadena(&self, document: &CfdiDocument) -> String {
        let fields = document.cadena_fields();
        let mut out = String::with_capacity(fields.iter().map(|f| f.len() + 1).sum::<usize>() + 3);
        out.push_str("||");
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push('|');
            }
            out.push_str(field);
        }
        out.push_str("||");
        out
    }

    fn transform_name(&self) -> &'static str {
        "pipe-delimited"
    }
}
