//! Pointer-driven interaction state machine.
//!
//! A [`Session`] owns everything one overlay activation needs: the scene,
//! the active tool and style, and the gesture in flight. The host feeds it
//! normalized [`InputEvent`]s and carries out the returned [`Effect`]s; the
//! session itself never touches the page.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::annotation::{
    Annotation, AnnotationId, ArrowShape, BoxGeometry, Geometry, PencilStroke, RectShape, Shape,
    TextNote,
};
use crate::coords::DocPoint;
use crate::geometry::{
    hit_test, resize_handle_at, topmost_hit, topmost_intersecting, Bounds,
    ResizeHandle, TextMetrics, MIN_RECT_SIZE,
};
use crate::scene::Scene;
use crate::style::{Style, StylePatch};

#[cfg(test)]
mod tests;

/// Release within this many pixels of the press (both axes) counts as a click
/// for the text tool.
pub const CLICK_SLOP: f64 = 5.0;
/// Arrows need strictly more movement than this on some axis.
pub const MIN_ARROW_DRAG: f64 = 2.0;
/// Area selections must be strictly larger than this on both axes.
pub const MIN_AREA_SELECT: f64 = 5.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Select,
    Pencil,
    Rect,
    Arrow,
    Text,
}

impl Tool {
    pub fn name(self) -> &'static str {
        match self {
            Tool::Select => "select",
            Tool::Pencil => "pencil",
            Tool::Rect => "rect",
            Tool::Arrow => "arrow",
            Tool::Text => "text",
        }
    }

    fn idle_cursor(self) -> Cursor {
        match self {
            Tool::Select => Cursor::Default,
            Tool::Pencil | Tool::Rect | Tool::Arrow => Cursor::Crosshair,
            Tool::Text => Cursor::Text,
        }
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "select" => Ok(Tool::Select),
            "pencil" => Ok(Tool::Pencil),
            "rect" | "rectangle" => Ok(Tool::Rect),
            "arrow" => Ok(Tool::Arrow),
            "text" => Ok(Tool::Text),
            other => Err(format!("unknown tool: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cursor {
    Default,
    Move,
    Crosshair,
    Text,
    Resize(ResizeHandle),
}

impl Cursor {
    pub fn css(self) -> &'static str {
        match self {
            Cursor::Default => "default",
            Cursor::Move => "move",
            Cursor::Crosshair => "crosshair",
            Cursor::Text => "text",
            Cursor::Resize(handle) => handle.cursor(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Gesture {
    Idle,
    Drawing {
        tool: Tool,
        anchor: DocPoint,
        current: DocPoint,
        /// Live pencil stroke; other tools create their object on release.
        stroke: Option<AnnotationId>,
    },
    DraggingObject {
        id: AnnotationId,
        anchor: DocPoint,
        snapshot: Geometry,
    },
    ResizingObject {
        id: AnnotationId,
        handle: ResizeHandle,
        anchor: DocPoint,
        snapshot: BoxGeometry,
    },
    AreaSelecting {
        anchor: DocPoint,
        current: DocPoint,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureKind {
    Idle,
    Drawing,
    DraggingObject,
    ResizingObject,
    AreaSelecting,
}

impl Gesture {
    pub fn kind(&self) -> GestureKind {
        match self {
            Gesture::Idle => GestureKind::Idle,
            Gesture::Drawing { .. } => GestureKind::Drawing,
            Gesture::DraggingObject { .. } => GestureKind::DraggingObject,
            Gesture::ResizingObject { .. } => GestureKind::ResizingObject,
            Gesture::AreaSelecting { .. } => GestureKind::AreaSelecting,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmRequest {
    /// Nothing selected: the only destructive option is clearing the page.
    ClearAll,
    /// Something selected: offer deleting it or clearing everything.
    DeleteSelectedOrClearAll,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmChoice {
    DeleteSelected,
    ClearAll,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    PointerDown(DocPoint),
    PointerMove(DocPoint),
    PointerUp(DocPoint),
    Cancel,
    Delete,
    SetTool(Tool),
    ApplyStyle(StylePatch),
    TextCommitted { at: DocPoint, text: String },
    TextPromptDismissed,
    StylePanelOpened,
    StylePanelClosed,
    Confirmed(ConfirmChoice),
    ConfirmCancelled,
    Loaded(Vec<Annotation>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Repaint,
    /// Write the scene to storage. Always emitted after the mutation it covers.
    Persist,
    SetCursor(Cursor),
    OpenTextPrompt { at: DocPoint },
    /// Close the text prompt; `commit` asks the host to submit what was typed.
    CloseTextPrompt { commit: bool },
    CloseStylePanel,
    RequestConfirm(ConfirmRequest),
    ToolChanged(Tool),
    Deactivate,
}

/// Transient shape painted on top of the committed scene.
#[derive(Clone, Debug, PartialEq)]
pub enum Preview {
    Shape(Shape),
    /// Area selection rectangle; width and height keep their sign until commit.
    Area(BoxGeometry),
}

pub struct Session {
    scene: Scene,
    tool: Tool,
    style: Style,
    gesture: Gesture,
    text_prompt: Option<DocPoint>,
    style_panel_open: bool,
    pending_confirm: Option<ConfirmRequest>,
    cursor: Cursor,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Style::default())
    }
}

impl Session {
    pub fn new(style: Style) -> Self {
        Self {
            scene: Scene::new(),
            tool: Tool::Select,
            style,
            gesture: Gesture::Idle,
            text_prompt: None,
            style_panel_open: false,
            pending_confirm: None,
            cursor: Cursor::Default,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn text_prompt(&self) -> Option<DocPoint> {
        self.text_prompt
    }

    pub fn handle(&mut self, event: InputEvent, metrics: &dyn TextMetrics) -> Vec<Effect> {
        match event {
            InputEvent::PointerDown(point) => self.pointer_down(point, metrics),
            InputEvent::PointerMove(point) => self.pointer_move(point, metrics),
            InputEvent::PointerUp(point) => self.pointer_up(point, metrics),
            InputEvent::Cancel => self.cancel(),
            InputEvent::Delete => self.delete(),
            InputEvent::SetTool(tool) => self.set_tool(tool),
            InputEvent::ApplyStyle(patch) => self.apply_style(&patch),
            InputEvent::TextCommitted { at, text } => self.commit_text(at, &text),
            InputEvent::TextPromptDismissed => {
                self.text_prompt = None;
                Vec::new()
            }
            InputEvent::StylePanelOpened => {
                self.style_panel_open = true;
                Vec::new()
            }
            InputEvent::StylePanelClosed => {
                self.style_panel_open = false;
                Vec::new()
            }
            InputEvent::Confirmed(choice) => self.confirmed(choice),
            InputEvent::ConfirmCancelled => {
                self.pending_confirm = None;
                Vec::new()
            }
            InputEvent::Loaded(annotations) => self.loaded(annotations),
        }
    }

    /// What to paint over the committed scene for the gesture in flight.
    pub fn preview(&self) -> Option<Preview> {
        match &self.gesture {
            Gesture::Drawing {
                tool: Tool::Rect,
                anchor,
                current,
                ..
            } => Some(Preview::Shape(self.rect_from(*anchor, *current))),
            Gesture::Drawing {
                tool: Tool::Arrow,
                anchor,
                current,
                ..
            } => Some(Preview::Shape(self.arrow_from(*anchor, *current))),
            Gesture::AreaSelecting { anchor, current } => {
                Some(Preview::Area(BoxGeometry::from_corners(*anchor, *current)))
            }
            _ => None,
        }
    }

    fn set_cursor(&mut self, cursor: Cursor, effects: &mut Vec<Effect>) {
        if self.cursor != cursor {
            self.cursor = cursor;
            effects.push(Effect::SetCursor(cursor));
        }
    }

    fn pointer_down(&mut self, point: DocPoint, metrics: &dyn TextMetrics) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.gesture.is_idle() || !point.is_finite() {
            return effects;
        }
        if self.text_prompt.is_some() {
            // The press only closes the prompt; it does not start a gesture.
            self.text_prompt = None;
            effects.push(Effect::CloseTextPrompt { commit: true });
            return effects;
        }
        if self.style_panel_open {
            self.style_panel_open = false;
            effects.push(Effect::CloseStylePanel);
        }

        match self.tool {
            Tool::Select => self.select_down(point, metrics, &mut effects),
            Tool::Pencil => {
                self.scene.clear_selection();
                let id = self.scene.append(Shape::Pencil(PencilStroke {
                    points: vec![point],
                    color: self.style.color.clone(),
                    line_width: self.style.line_width,
                    line_dash: self.style.line_dash(),
                }));
                self.gesture = Gesture::Drawing {
                    tool: Tool::Pencil,
                    anchor: point,
                    current: point,
                    stroke: Some(id),
                };
                effects.push(Effect::Repaint);
            }
            tool => {
                if self.scene.clear_selection() {
                    effects.push(Effect::Repaint);
                }
                self.gesture = Gesture::Drawing {
                    tool,
                    anchor: point,
                    current: point,
                    stroke: None,
                };
            }
        }
        effects
    }

    fn select_down(&mut self, point: DocPoint, metrics: &dyn TextMetrics, effects: &mut Vec<Effect>) {
        let handle_hit = self.scene.selected_annotation().and_then(|selected| {
            let rect = selected.shape.as_rect()?;
            let handle = resize_handle_at(rect, point)?;
            Some((selected.id, handle, rect.geometry()))
        });
        if let Some((id, handle, snapshot)) = handle_hit {
            self.gesture = Gesture::ResizingObject {
                id,
                handle,
                anchor: point,
                snapshot,
            };
            self.set_cursor(Cursor::Resize(handle), effects);
            return;
        }

        if let Some(index) = topmost_hit(self.scene.annotations(), point, metrics) {
            let target = &self.scene.annotations()[index];
            let id = target.id;
            let snapshot = target.shape.geometry();
            self.scene.select(id);
            self.gesture = Gesture::DraggingObject {
                id,
                anchor: point,
                snapshot,
            };
            self.set_cursor(Cursor::Move, effects);
            effects.push(Effect::Repaint);
            return;
        }

        self.scene.clear_selection();
        self.gesture = Gesture::AreaSelecting {
            anchor: point,
            current: point,
        };
        effects.push(Effect::Repaint);
    }

    fn pointer_move(&mut self, point: DocPoint, metrics: &dyn TextMetrics) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !point.is_finite() {
            return effects;
        }
        if self.gesture.is_idle() {
            let cursor = self.hover_cursor(point, metrics);
            self.set_cursor(cursor, &mut effects);
            return effects;
        }
        match &mut self.gesture {
            Gesture::ResizingObject {
                handle,
                anchor,
                snapshot,
                ..
            } => {
                let (dx, dy) = point.delta_from(*anchor);
                self.scene.resize_selection(*handle, *snapshot, dx, dy);
                effects.push(Effect::Repaint);
            }
            Gesture::DraggingObject {
                anchor, snapshot, ..
            } => {
                let (dx, dy) = point.delta_from(*anchor);
                self.scene.move_selection_from(snapshot, dx, dy);
                effects.push(Effect::Repaint);
            }
            Gesture::Drawing {
                tool,
                current,
                stroke,
                ..
            } => {
                *current = point;
                let tool = *tool;
                if let Some(id) = *stroke {
                    if let Some(Shape::Pencil(pencil)) =
                        self.scene.get_mut(id).map(|item| &mut item.shape)
                    {
                        if pencil.points.last() != Some(&point) {
                            pencil.points.push(point);
                        }
                    }
                }
                if tool != Tool::Text {
                    effects.push(Effect::Repaint);
                }
            }
            Gesture::AreaSelecting { current, .. } => {
                *current = point;
                effects.push(Effect::Repaint);
            }
            Gesture::Idle => {}
        }
        effects
    }

    fn hover_cursor(&self, point: DocPoint, metrics: &dyn TextMetrics) -> Cursor {
        if self.tool != Tool::Select {
            return self.tool.idle_cursor();
        }
        if let Some(selected) = self.scene.selected_annotation() {
            if let Some(handle) = selected
                .shape
                .as_rect()
                .and_then(|rect| resize_handle_at(rect, point))
            {
                return Cursor::Resize(handle);
            }
            if hit_test(point, selected, metrics) {
                return Cursor::Move;
            }
        }
        if topmost_hit(self.scene.annotations(), point, metrics).is_some() {
            return Cursor::Move;
        }
        Cursor::Default
    }

    fn pointer_up(&mut self, point: DocPoint, metrics: &dyn TextMetrics) -> Vec<Effect> {
        let mut effects = if point.is_finite() {
            self.pointer_move(point, metrics)
        } else {
            Vec::new()
        };
        effects.retain(|effect| !matches!(effect, Effect::Repaint));

        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Idle => return effects,
            Gesture::ResizingObject { id, .. } => {
                if let Some(Shape::Rect(rect)) = self.scene.get_mut(id).map(|item| &mut item.shape)
                {
                    let normalized = rect.geometry().normalized();
                    rect.set_geometry(normalized);
                }
                log::debug!("resize committed for {id:?}");
                effects.push(Effect::Persist);
                effects.push(Effect::Repaint);
            }
            Gesture::DraggingObject { id, .. } => {
                log::debug!("move committed for {id:?}");
                effects.push(Effect::Persist);
                effects.push(Effect::Repaint);
            }
            Gesture::Drawing {
                tool,
                anchor,
                current,
                stroke,
            } => self.finish_drawing(tool, anchor, current, stroke, &mut effects),
            Gesture::AreaSelecting { anchor, current } => {
                let area = BoxGeometry::from_corners(anchor, current).normalized();
                let hit = if area.width > MIN_AREA_SELECT && area.height > MIN_AREA_SELECT {
                    topmost_intersecting(self.scene.annotations(), &Bounds::from_box(area), metrics)
                } else {
                    None
                };
                match hit.map(|index| self.scene.annotations()[index].id) {
                    Some(id) => {
                        self.scene.select(id);
                    }
                    None => {
                        self.scene.clear_selection();
                    }
                }
                effects.push(Effect::Repaint);
            }
        }

        let cursor = self.hover_cursor(point, metrics);
        self.set_cursor(cursor, &mut effects);
        effects
    }

    fn finish_drawing(
        &mut self,
        tool: Tool,
        anchor: DocPoint,
        current: DocPoint,
        stroke: Option<AnnotationId>,
        effects: &mut Vec<Effect>,
    ) {
        let (dx, dy) = current.delta_from(anchor);
        match tool {
            Tool::Pencil => {
                let Some(id) = stroke else {
                    return;
                };
                let point_count = match self.scene.get(id).map(|item| &item.shape) {
                    Some(Shape::Pencil(pencil)) => pencil.points.len(),
                    _ => 0,
                };
                if point_count < 2 {
                    self.scene.remove(id);
                    effects.push(Effect::Repaint);
                    return;
                }
                log::debug!("pencil stroke committed with {point_count} points");
                effects.push(Effect::Persist);
                effects.push(Effect::Repaint);
            }
            Tool::Rect => {
                let threshold = MIN_RECT_SIZE / 2.0;
                if dx.abs() <= threshold && dy.abs() <= threshold {
                    effects.push(Effect::Repaint);
                    return;
                }
                let shape = self.rect_from(anchor, current);
                self.scene.append(shape);
                effects.push(Effect::Persist);
                effects.push(Effect::Repaint);
            }
            Tool::Arrow => {
                if dx.abs() <= MIN_ARROW_DRAG && dy.abs() <= MIN_ARROW_DRAG {
                    effects.push(Effect::Repaint);
                    return;
                }
                let shape = self.arrow_from(anchor, current);
                self.scene.append(shape);
                effects.push(Effect::Persist);
                effects.push(Effect::Repaint);
            }
            Tool::Text => {
                if dx.abs() <= CLICK_SLOP && dy.abs() <= CLICK_SLOP {
                    self.text_prompt = Some(anchor);
                    effects.push(Effect::OpenTextPrompt { at: anchor });
                }
            }
            Tool::Select => {}
        }
    }

    fn rect_from(&self, anchor: DocPoint, current: DocPoint) -> Shape {
        let geometry = BoxGeometry::from_corners(anchor, current).normalized();
        Shape::Rect(RectShape {
            x: geometry.x,
            y: geometry.y,
            width: geometry.width,
            height: geometry.height,
            color: self.style.color.clone(),
            line_width: self.style.line_width,
            line_dash: self.style.line_dash(),
        })
    }

    fn arrow_from(&self, anchor: DocPoint, current: DocPoint) -> Shape {
        Shape::Arrow(ArrowShape {
            x1: anchor.x,
            y1: anchor.y,
            x2: current.x,
            y2: current.y,
            color: self.style.color.clone(),
            line_width: self.style.line_width,
            line_dash: self.style.line_dash(),
        })
    }

    /// Aborts the gesture in flight without committing it. Returns whether
    /// the scene kept something that still has to be saved.
    fn abort_gesture(&mut self) -> bool {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Drawing {
                stroke: Some(id), ..
            } => {
                let short = match self.scene.get(id).map(|item| &item.shape) {
                    Some(Shape::Pencil(pencil)) => pencil.points.len() < 2,
                    _ => false,
                };
                if short {
                    self.scene.remove(id);
                }
                !short
            }
            Gesture::DraggingObject { id, snapshot, .. } => {
                self.scene.set_geometry(id, snapshot);
                false
            }
            Gesture::ResizingObject { id, snapshot, .. } => {
                self.scene.set_geometry(id, Geometry::Box(snapshot));
                false
            }
            _ => false,
        }
    }

    fn cancel(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.gesture.is_idle() {
            if self.abort_gesture() {
                effects.push(Effect::Persist);
            }
            let cursor = self.tool.idle_cursor();
            self.set_cursor(cursor, &mut effects);
            effects.push(Effect::Repaint);
        } else if self.text_prompt.take().is_some() {
            effects.push(Effect::CloseTextPrompt { commit: false });
        } else if self.style_panel_open {
            self.style_panel_open = false;
            effects.push(Effect::CloseStylePanel);
        } else if self.tool != Tool::Select {
            self.tool = Tool::Select;
            effects.push(Effect::ToolChanged(Tool::Select));
            self.set_cursor(Cursor::Default, &mut effects);
        } else {
            effects.push(Effect::Deactivate);
        }
        effects
    }

    fn delete(&mut self) -> Vec<Effect> {
        if !self.gesture.is_idle() || self.text_prompt.is_some() {
            return Vec::new();
        }
        let request = if self.scene.selected().is_some() {
            ConfirmRequest::DeleteSelectedOrClearAll
        } else if !self.scene.is_empty() {
            ConfirmRequest::ClearAll
        } else {
            return Vec::new();
        };
        self.pending_confirm = Some(request);
        vec![Effect::RequestConfirm(request)]
    }

    fn confirmed(&mut self, choice: ConfirmChoice) -> Vec<Effect> {
        let Some(request) = self.pending_confirm.take() else {
            return Vec::new();
        };
        match (request, choice) {
            (ConfirmRequest::DeleteSelectedOrClearAll, ConfirmChoice::DeleteSelected) => {
                let Some(id) = self.scene.selected() else {
                    return Vec::new();
                };
                self.scene.remove(id);
            }
            (_, ConfirmChoice::ClearAll) => self.scene.clear(),
            (ConfirmRequest::ClearAll, ConfirmChoice::DeleteSelected) => return Vec::new(),
        }
        vec![Effect::Persist, Effect::Repaint]
    }

    fn set_tool(&mut self, tool: Tool) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.gesture.is_idle() {
            if self.abort_gesture() {
                effects.push(Effect::Persist);
            }
            effects.push(Effect::Repaint);
        }
        if tool != Tool::Select && self.scene.clear_selection() {
            effects.push(Effect::Repaint);
        }
        self.tool = tool;
        self.set_cursor(tool.idle_cursor(), &mut effects);
        effects.dedup();
        effects
    }

    fn apply_style(&mut self, patch: &StylePatch) -> Vec<Effect> {
        self.style.apply(patch);
        if self.scene.apply_style_to_selection(patch) {
            vec![Effect::Persist, Effect::Repaint]
        } else {
            Vec::new()
        }
    }

    fn commit_text(&mut self, at: DocPoint, text: &str) -> Vec<Effect> {
        self.text_prompt = None;
        let text = text.trim();
        if text.is_empty() || !at.is_finite() {
            return Vec::new();
        }
        self.scene.append(Shape::Text(TextNote {
            x: at.x,
            y: at.y,
            text: text.to_string(),
            color: self.style.color.clone(),
            font_family: self.style.font_family.clone(),
            font_size: self.style.font_size,
            text_align: self.style.text_align,
        }));
        vec![Effect::Persist, Effect::Repaint]
    }

    fn loaded(&mut self, annotations: Vec<Annotation>) -> Vec<Effect> {
        let had_local = !self.scene.is_empty();
        self.scene.extend_below(annotations);
        if had_local {
            vec![Effect::Persist, Effect::Repaint]
        } else {
            vec![Effect::Repaint]
        }
    }
}
