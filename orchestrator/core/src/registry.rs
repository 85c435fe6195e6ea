use std::collections::BTreeMap;

/// Images produced by earlier build steps, keyed by their build-time alias.
///
/// Populated before orchestration begins and read-only during a run.
#[derive(Clone, Debug, Default)]
pub struct BuiltImageRegistry {
    images: BTreeMap<String, String>,
}

impl BuiltImageRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the image identifier a build-time alias resolved to.
    pub fn register(&mut self, alias: impl Into<String>, image_id: impl Into<String>) {
        self.images.insert(alias.into(), image_id.into());
    }

    /// Resolve an image reference: a registered alias yields the built image
    /// identifier, anything else passes through unchanged.
    #[must_use]
    pub fn resolve<'a>(&'a self, reference: &'a str) -> &'a str {
        self.images
            .get(reference)
            .map_or(reference, String::as_str)
    }

    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.images.contains_key(alias)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
