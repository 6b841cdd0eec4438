//! Annotation store
//!
//! The single owner of annotation state. Tools, the interaction controller and
//! the exporter all go through it; anything rendered on screen is derived from
//! its contents. Insertion order is preserved and doubles as stacking order.

use crate::annotation::{
    Annotation, AnnotationDraft, AnnotationError, AnnotationId, AnnotationPatch,
};
use crate::config::OverlayConfig;

#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    page_count: Option<u32>,
    config: OverlayConfig,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OverlayConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Page count reported by the renderer, if known yet
    pub fn page_count(&self) -> Option<u32> {
        self.page_count
    }

    pub fn set_page_count(&mut self, page_count: u32) {
        self.page_count = Some(page_count);
    }

    /// Validate a draft, assign it a fresh id and append it
    pub fn create(&mut self, draft: AnnotationDraft) -> Result<AnnotationId, AnnotationError> {
        let annotation = draft.into_annotation(AnnotationId::next(), self.page_count, &self.config)?;
        let id = annotation.id();
        tracing::debug!(%id, kind = annotation.kind.label(), page = annotation.page(), "annotation created");
        self.annotations.push(annotation);
        Ok(id)
    }

    /// Merge `patch` into the annotation with `id`
    ///
    /// Unknown ids are ignored and yield `Ok(false)`. A patch that would leave
    /// the annotation invalid is rejected and nothing changes.
    pub fn update(
        &mut self,
        id: AnnotationId,
        patch: AnnotationPatch,
    ) -> Result<bool, AnnotationError> {
        let Some(annotation) = self.annotations.iter_mut().find(|a| a.id() == id) else {
            tracing::trace!(%id, "update for unknown annotation ignored");
            return Ok(false);
        };
        annotation.apply(patch, self.page_count, &self.config).inspect_err(|error| {
            tracing::debug!(%id, %error, "update rejected");
        })?;
        Ok(true)
    }

    pub fn delete(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id() == id)?;
        tracing::debug!(%id, "annotation deleted");
        Some(self.annotations.remove(index))
    }

    pub fn delete_all(&mut self) {
        tracing::debug!(count = self.annotations.len(), "all annotations deleted");
        self.annotations.clear();
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    /// Whether the annotation's page exists in the loaded document
    pub fn is_valid(&self, annotation: &Annotation) -> bool {
        self.page_in_range(annotation.page())
    }

    fn page_in_range(&self, page: u32) -> bool {
        page >= 1 && self.page_count.map_or(true, |count| page <= count)
    }

    /// Annotations on `page`, in insertion order
    ///
    /// Pages beyond the known page count yield nothing.
    pub fn list_by_page(&self, page: u32) -> impl Iterator<Item = &Annotation> + '_ {
        let visible = self.page_in_range(page);
        self.annotations.iter().filter(move |a| visible && a.page() == page)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Create annotations from a JSON array of drafts
    ///
    /// All-or-nothing: if any draft fails to parse or validate the store is
    /// left untouched.
    pub fn extend_from_json(&mut self, json: &str) -> Result<Vec<AnnotationId>, AnnotationError> {
        let drafts: Vec<AnnotationDraft> = serde_json::from_str(json)?;
        let mut staged = self.clone();
        let ids = drafts
            .into_iter()
            .map(|draft| staged.create(draft))
            .collect::<Result<Vec<_>, _>>()?;
        *self = staged;
        Ok(ids)
    }

    pub fn to_json(&self) -> Result<String, AnnotationError> {
        Ok(serde_json::to_string_pretty(&self.annotations)?)
    }
}
