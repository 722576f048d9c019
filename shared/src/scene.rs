use std::collections::HashSet;

use crate::annotation::{Annotation, AnnotationId, BoxGeometry, Geometry, Shape};
use crate::geometry::{resize_box, ResizeHandle};
use crate::style::{restyle, StylePatch};

/// Stored ids above this are treated as unassigned, leaving headroom for
/// fresh ids after a load.
pub const MAX_TRUSTED_ID: u64 = u64::MAX / 2;

/// Ordered annotations plus the current selection. Paint order is slice
/// order; selection is tracked by id so structural edits cannot leave it
/// pointing at the wrong entry.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    items: Vec<Annotation>,
    selected: Option<AnnotationId>,
    last_id: u64,
}

fn is_trusted(id: AnnotationId) -> bool {
    id.is_assigned() && id.0 <= MAX_TRUSTED_ID
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a scene from loaded annotations, keeping their ids where they
    /// are usable and assigning fresh ones otherwise.
    pub fn from_annotations(annotations: Vec<Annotation>) -> Self {
        let mut scene = Self::new();
        scene.extend_below(annotations);
        scene
    }

    /// Inserts `annotations` underneath the existing items. Used when a load
    /// resolves after the user already started drawing.
    pub fn extend_below(&mut self, annotations: Vec<Annotation>) {
        let mut seen: HashSet<AnnotationId> = self.items.iter().map(|item| item.id).collect();
        let highest_loaded = annotations
            .iter()
            .map(|item| item.id)
            .filter(|id| is_trusted(*id))
            .map(|id| id.0)
            .max()
            .unwrap_or(0);
        self.last_id = self.last_id.max(highest_loaded);
        let mut loaded = Vec::with_capacity(annotations.len() + self.items.len());
        for mut annotation in annotations {
            if !is_trusted(annotation.id) || seen.contains(&annotation.id) {
                annotation.id = self.fresh_id(&seen);
            }
            seen.insert(annotation.id);
            loaded.push(annotation);
        }
        loaded.append(&mut self.items);
        self.items = loaded;
    }

    fn next_id(&mut self) -> AnnotationId {
        let taken: HashSet<AnnotationId> = self.items.iter().map(|item| item.id).collect();
        self.fresh_id(&taken)
    }

    /// Counts up from the highest id handed out so far; once that reaches
    /// the ceiling, falls back to the lowest id not in `taken`.
    fn fresh_id(&mut self, taken: &HashSet<AnnotationId>) -> AnnotationId {
        if let Some(id) = self.last_id.checked_add(1).filter(|id| *id <= MAX_TRUSTED_ID) {
            self.last_id = id;
            return AnnotationId(id);
        }
        log::warn!("annotation ids exhausted; reusing the lowest free id");
        (1..=MAX_TRUSTED_ID)
            .map(AnnotationId)
            .find(|id| !taken.contains(id))
            .unwrap_or(AnnotationId(MAX_TRUSTED_ID))
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.items
    }

    pub fn to_vec(&self) -> Vec<Annotation> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn append(&mut self, shape: Shape) -> AnnotationId {
        let id = self.next_id();
        self.items.push(Annotation { id, shape });
        id
    }

    pub fn index_of(&self, id: AnnotationId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.index_of(id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(self.items.remove(index))
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Annotation> {
        let id = self.items.get(index)?.id;
        self.remove(id)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = None;
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.index_of(self.selected?)
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.get(self.selected?)
    }

    /// Selects `id` if it exists; returns whether the selection changed.
    pub fn select(&mut self, id: AnnotationId) -> bool {
        if self.get(id).is_none() || self.selected == Some(id) {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn clear_selection(&mut self) -> bool {
        self.selected.take().is_some()
    }

    pub fn set_geometry(&mut self, id: AnnotationId, geometry: Geometry) -> bool {
        match self.get_mut(id) {
            Some(annotation) => annotation.shape.set_geometry(geometry),
            None => false,
        }
    }

    /// Moves the selected annotation to its pre-gesture geometry `origin`
    /// offset by the cumulative delta `(dx, dy)`.
    pub fn move_selection_from(&mut self, origin: &Geometry, dx: f64, dy: f64) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        let Some(annotation) = self.get_mut(id) else {
            return false;
        };
        annotation.shape.set_geometry(origin.translated(dx, dy))
    }

    /// Resizes the selected rectangle from its pre-gesture geometry by the
    /// cumulative delta `(dx, dy)`.
    pub fn resize_selection(
        &mut self,
        handle: ResizeHandle,
        origin: BoxGeometry,
        dx: f64,
        dy: f64,
    ) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        let Some(Shape::Rect(rect)) = self.get_mut(id).map(|item| &mut item.shape) else {
            return false;
        };
        rect.set_geometry(resize_box(origin, handle, dx, dy));
        true
    }

    pub fn apply_style_to_selection(&mut self, patch: &StylePatch) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        match self.get_mut(id) {
            Some(annotation) => {
                restyle(&mut annotation.shape, patch);
                true
            }
            None => false,
        }
    }
}
