use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::Rc,
};

use bytes::Bytes;

use crate::error::ObjectUrlError;

/// A live object URL. Dropping the handle does not release it; pass it back to
/// [`ObjectUrls::revoke`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creates and releases object URLs backed by in-memory blobs.
pub trait ObjectUrls {
    /// Wraps the payload in a blob and returns a URL usable as a media source.
    fn create(&mut self, blob: Bytes, mime_type: &str) -> Result<ObjectUrl, ObjectUrlError>;

    /// Releases the blob behind `url`. Revoking an unknown URL is a no-op.
    fn revoke(&mut self, url: &ObjectUrl);
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    blobs: HashMap<ObjectUrl, (Bytes, String)>,
}

/// Object URLs for native front-ends, held in a shared in-memory table.
///
/// Clones share the same table, so a view can resolve the URLs the controller
/// created.
#[derive(Clone, Default)]
pub struct MemoryObjectUrls {
    inner: Rc<RefCell<Registry>>,
}

impl MemoryObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the payload behind a live URL.
    pub fn resolve(&self, url: &ObjectUrl) -> Option<Bytes> {
        self.inner.borrow().blobs.get(url).map(|(blob, _)| blob.clone())
    }

    /// Number of URLs created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.inner.borrow().blobs.len()
    }
}

impl fmt::Debug for MemoryObjectUrls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryObjectUrls")
            .field("live", &self.live_count())
            .finish()
    }
}

impl ObjectUrls for MemoryObjectUrls {
    fn create(&mut self, blob: Bytes, mime_type: &str) -> Result<ObjectUrl, ObjectUrlError> {
        let mut registry = self.inner.borrow_mut();
        let url = ObjectUrl::new(format!("blob:veo-studio/{}", registry.next_id));
        registry.next_id += 1;
        registry
            .blobs
            .insert(url.clone(), (blob, mime_type.to_string()));
        log::debug!("Created {url} ({mime_type})");
        Ok(url)
    }

    fn revoke(&mut self, url: &ObjectUrl) {
        if self.inner.borrow_mut().blobs.remove(url).is_some() {
            log::debug!("Revoked {url}");
        }
    }
}
