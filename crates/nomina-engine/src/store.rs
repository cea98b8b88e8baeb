//! Append-only attachment storage.
//!
//! Rendered document bytes are audit material: once a version is
//! written it is never mutated in place. A re-signature or a stamped
//! replacement appends a new version and the old bytes stay readable.

use std::sync::Arc;

use dashmap::DashMap;
use nomina_core::PayslipId;
use nomina_crypto::sha256_hex;

/// One stored rendition of a document.
#[derive(Debug, Clone)]
pub struct AttachmentVersion {
    /// File name the version was stored under.
    pub name: String,
    /// Rendered (and possibly stamped) document bytes.
    pub content: Arc<str>,
    /// SHA-256 fingerprint of the content, for drift detection between
    /// regenerations.
    pub digest: String,
}

/// Versioned attachment store keyed by payslip.
#[derive(Debug, Default)]
pub struct AttachmentStore {
    versions: DashMap<PayslipId, Vec<AttachmentVersion>>,
}

impl AttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new version and return its index.
    pub fn push(&self, id: PayslipId, name: &str, content: &str) -> usize {
        let mut entry = self.versions.entry(id).or_default();
        entry.push(AttachmentVersion {
            name: name.to_owned(),
            content: Arc::from(content),
            digest: sha256_hex(content.as_bytes()),
        });
        entry.len() - 1
    }

    /// The most recent version for a payslip.
    pub fn latest(&self, id: &PayslipId) -> Option<AttachmentVersion> {
        self.versions
            .get(id)
            .and_then(|versions| versions.last().cloned())
    }

    /// All versions in append order.
    pub fn history(&self, id: &PayslipId) -> Vec<AttachmentVersion> {
        self.versions
            .get(id)
            .map(|versions| versions.clone())
            .unwrap_or_default()
    }

    /// Number of stored versions for a payslip.
    pub fn version_count(&self, id: &PayslipId) -> usize {
        self.versions.get(id).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_appends_and_latest_tracks() {
        let store = AttachmentStore::new();
        let id = PayslipId::new();
        assert_eq!(store.push(id, "a.xml", "<a/>"), 0);
        assert_eq!(store.push(id, "a.xml", "<a sellado/>"), 1);
        assert_eq!(store.latest(&id).unwrap().content.as_ref(), "<a sellado/>");
        assert_eq!(store.version_count(&id), 2);
    }

    #[test]
    fn old_versions_survive_new_pushes() {
        let store = AttachmentStore::new();
        let id = PayslipId::new();
        store.push(id, "a.xml", "original");
        store.push(id, "a.xml", "replacement");
        let history = store.history(&id);
        assert_eq!(history[0].content.as_ref(), "original");
    }

    #[test]
    fn identical_content_yields_identical_digest() {
        let store = AttachmentStore::new();
        let id = PayslipId::new();
        store.push(id, "a.xml", "<same/>");
        store.push(id, "a.xml", "<same/>");
        let history = store.history(&id);
        assert_eq!(history[0].digest, history[1].digest);
        assert_eq!(history[0].digest.len(), 64);
    }

    #[test]
    fn missing_payslip_has_no_versions() {
        let store = AttachmentStore::new();
        assert!(store.latest(&PayslipId::new()).is_none());
        assert_eq!(store.version_count(&PayslipId::new()), 0);
    }
}
