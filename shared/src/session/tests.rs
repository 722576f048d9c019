use super::*;
use crate::geometry::ApproxTextMetrics;

fn p(x: f64, y: f64) -> DocPoint {
    DocPoint::new(x, y)
}

fn session_with_tool(tool: Tool) -> Session {
    let mut session = Session::default();
    session.handle(InputEvent::SetTool(tool), &ApproxTextMetrics);
    session
}

fn run(session: &mut Session, events: Vec<InputEvent>) -> Vec<Effect> {
    events
        .into_iter()
        .flat_map(|event| session.handle(event, &ApproxTextMetrics))
        .collect()
}

fn gesture(session: &mut Session, points: &[DocPoint]) -> Vec<Effect> {
    let (first, rest) = points.split_first().expect("at least one point");
    let mut events = vec![InputEvent::PointerDown(*first)];
    for point in rest {
        events.push(InputEvent::PointerMove(*point));
    }
    events.push(InputEvent::PointerUp(*points.last().unwrap()));
    run(session, events)
}

fn add_rect(session: &mut Session, from: DocPoint, to: DocPoint) -> AnnotationId {
    session.handle(InputEvent::SetTool(Tool::Rect), &ApproxTextMetrics);
    gesture(session, &[from, to]);
    session.handle(InputEvent::SetTool(Tool::Select), &ApproxTextMetrics);
    session.scene().annotations().last().unwrap().id
}

fn rect_of(session: &Session, id: AnnotationId) -> RectShape {
    session.scene().get(id).unwrap().shape.as_rect().unwrap().clone()
}

#[test]
fn pencil_stroke_commits_all_points() {
    let mut session = session_with_tool(Tool::Pencil);
    let effects = gesture(&mut session, &[p(10.0, 10.0), p(20.0, 10.0), p(20.0, 30.0)]);

    assert_eq!(session.scene().len(), 1);
    let Shape::Pencil(stroke) = &session.scene().annotations()[0].shape else {
        panic!("pencil expected");
    };
    assert_eq!(stroke.points, vec![p(10.0, 10.0), p(20.0, 10.0), p(20.0, 30.0)]);
    assert!(effects.contains(&Effect::Persist));
    assert!(session.gesture().is_idle());
}

#[test]
fn pencil_click_is_discarded() {
    let mut session = session_with_tool(Tool::Pencil);
    let effects = gesture(&mut session, &[p(10.0, 10.0)]);
    assert!(session.scene().is_empty());
    assert!(!effects.contains(&Effect::Persist));
}

#[test]
fn rect_drag_commits_normalized_rect() {
    let mut session = session_with_tool(Tool::Rect);
    gesture(&mut session, &[p(0.0, 0.0), p(60.0, 20.0), p(100.0, 50.0)]);
    let rect = session.scene().annotations()[0].shape.as_rect().unwrap().clone();
    assert_eq!((rect.x, rect.y, rect.width, rect.height), (0.0, 0.0, 100.0, 50.0));
}

#[test]
fn rect_from_opposite_corner_is_normalized() {
    let mut session = session_with_tool(Tool::Rect);
    gesture(&mut session, &[p(100.0, 50.0), p(0.0, 0.0)]);
    let rect = session.scene().annotations()[0].shape.as_rect().unwrap().clone();
    assert_eq!((rect.x, rect.y, rect.width, rect.height), (0.0, 0.0, 100.0, 50.0));
}

#[test]
fn tiny_rect_and_arrow_are_discarded() {
    let mut session = session_with_tool(Tool::Rect);
    let threshold = MIN_RECT_SIZE / 2.0;
    let effects = gesture(&mut session, &[p(0.0, 0.0), p(threshold, threshold)]);
    assert!(session.scene().is_empty());
    assert!(!effects.contains(&Effect::Persist));

    session.handle(InputEvent::SetTool(Tool::Arrow), &ApproxTextMetrics);
    gesture(&mut session, &[p(0.0, 0.0), p(2.0, -2.0)]);
    assert!(session.scene().is_empty());

    gesture(&mut session, &[p(0.0, 0.0), p(0.0, 3.0)]);
    assert_eq!(session.scene().len(), 1);
}

#[test]
fn rect_preview_does_not_touch_scene() {
    let mut session = session_with_tool(Tool::Rect);
    run(
        &mut session,
        vec![
            InputEvent::PointerDown(p(0.0, 0.0)),
            InputEvent::PointerMove(p(40.0, 40.0)),
        ],
    );
    assert!(session.scene().is_empty());
    let Some(Preview::Shape(Shape::Rect(rect))) = session.preview() else {
        panic!("rect preview expected");
    };
    assert_eq!((rect.width, rect.height), (40.0, 40.0));
}

#[test]
fn arrow_keeps_direction() {
    let mut session = session_with_tool(Tool::Arrow);
    gesture(&mut session, &[p(50.0, 50.0), p(10.0, 20.0)]);
    let Shape::Arrow(arrow) = &session.scene().annotations()[0].shape else {
        panic!("arrow expected");
    };
    assert_eq!((arrow.x1, arrow.y1, arrow.x2, arrow.y2), (50.0, 50.0, 10.0, 20.0));
}

#[test]
fn resize_se_handle_grows_rect() {
    let mut session = Session::default();
    let id = add_rect(&mut session, p(0.0, 0.0), p(100.0, 50.0));
    gesture(&mut session, &[p(50.0, 25.0)]);
    assert_eq!(session.scene().selected(), Some(id));

    let effects = gesture(&mut session, &[p(100.0, 50.0), p(110.0, 60.0)]);
    let rect = rect_of(&session, id);
    assert_eq!((rect.x, rect.y, rect.width, rect.height), (0.0, 0.0, 110.0, 60.0));
    assert!(effects.contains(&Effect::Persist));
}

#[test]
fn resize_below_floor_keeps_original_axis() {
    let mut session = Session::default();
    let id = add_rect(&mut session, p(0.0, 0.0), p(100.0, 50.0));
    gesture(&mut session, &[p(50.0, 25.0)]);

    gesture(&mut session, &[p(100.0, 50.0), p(5.0, 0.0)]);
    let rect = rect_of(&session, id);
    assert_eq!((rect.width, rect.height), (100.0, 50.0));
    assert!(rect.width >= MIN_RECT_SIZE && rect.height >= MIN_RECT_SIZE);
}

#[test]
fn dragging_moves_object_from_snapshot() {
    let mut session = Session::default();
    let id = add_rect(&mut session, p(0.0, 0.0), p(100.0, 50.0));
    let effects = gesture(
        &mut session,
        &[p(50.0, 25.0), p(55.0, 30.0), p(70.0, 45.0)],
    );
    let rect = rect_of(&session, id);
    assert_eq!((rect.x, rect.y), (20.0, 20.0));
    assert!(effects.contains(&Effect::Persist));
    assert_eq!(session.scene().selected(), Some(id));
}

#[test]
fn cancel_during_drag_restores_position() {
    let mut session = Session::default();
    let id = add_rect(&mut session, p(0.0, 0.0), p(100.0, 50.0));
    let effects = run(
        &mut session,
        vec![
            InputEvent::PointerDown(p(50.0, 25.0)),
            InputEvent::PointerMove(p(90.0, 90.0)),
            InputEvent::Cancel,
        ],
    );
    let rect = rect_of(&session, id);
    assert_eq!((rect.x, rect.y), (0.0, 0.0));
    assert!(!effects.contains(&Effect::Persist));
    assert!(session.gesture().is_idle());
}

#[test]
fn cancel_discards_single_point_stroke() {
    let mut session = session_with_tool(Tool::Pencil);
    run(
        &mut session,
        vec![InputEvent::PointerDown(p(1.0, 1.0)), InputEvent::Cancel],
    );
    assert!(session.scene().is_empty());
    assert!(session.gesture().is_idle());
}

#[test]
fn cancelled_stroke_that_is_kept_gets_saved() {
    let mut session = session_with_tool(Tool::Pencil);
    let effects = run(
        &mut session,
        vec![
            InputEvent::PointerDown(p(1.0, 1.0)),
            InputEvent::PointerMove(p(8.0, 4.0)),
            InputEvent::Cancel,
        ],
    );
    assert_eq!(session.scene().len(), 1);
    assert!(session.gesture().is_idle());
    assert!(effects.contains(&Effect::Persist));
}

#[test]
fn area_select_picks_topmost_enclosed_object() {
    let mut session = Session::default();
    let first = add_rect(&mut session, p(20.0, 20.0), p(60.0, 60.0));
    let second = add_rect(&mut session, p(100.0, 100.0), p(150.0, 150.0));
    let _far = add_rect(&mut session, p(500.0, 500.0), p(560.0, 560.0));

    gesture(&mut session, &[p(-30.0, -30.0), p(100.0, 100.0), p(170.0, 170.0)]);
    assert_eq!(session.scene().selected(), Some(second));
    assert_ne!(session.scene().selected(), Some(first));
}

#[test]
fn small_area_select_clears_selection() {
    let mut session = Session::default();
    let id = add_rect(&mut session, p(20.0, 20.0), p(60.0, 60.0));
    gesture(&mut session, &[p(40.0, 40.0)]);
    assert_eq!(session.scene().selected(), Some(id));

    let effects = gesture(&mut session, &[p(300.0, 300.0), p(303.0, 303.0)]);
    assert_eq!(session.scene().selected(), None);
    assert!(!effects.contains(&Effect::Persist));
}

#[test]
fn area_preview_keeps_sign_while_dragging() {
    let mut session = Session::default();
    run(
        &mut session,
        vec![
            InputEvent::PointerDown(p(100.0, 100.0)),
            InputEvent::PointerMove(p(40.0, 70.0)),
        ],
    );
    assert_eq!(
        session.preview(),
        Some(Preview::Area(BoxGeometry {
            x: 100.0,
            y: 100.0,
            width: -60.0,
            height: -30.0
        }))
    );
}

#[test]
fn text_click_opens_prompt_and_commit_persists() {
    let mut session = session_with_tool(Tool::Text);
    let effects = gesture(&mut session, &[p(30.0, 40.0), p(32.0, 43.0)]);
    assert!(effects.contains(&Effect::OpenTextPrompt { at: p(30.0, 40.0) }));
    assert!(!effects.contains(&Effect::Persist));
    assert_eq!(session.text_prompt(), Some(p(30.0, 40.0)));

    let effects = session.handle(
        InputEvent::TextCommitted {
            at: p(30.0, 40.0),
            text: "  hello\nworld  ".into(),
        },
        &ApproxTextMetrics,
    );
    assert_eq!(effects, vec![Effect::Persist, Effect::Repaint]);
    let Shape::Text(note) = &session.scene().annotations()[0].shape else {
        panic!("text expected");
    };
    assert_eq!(note.text, "hello\nworld");
    assert_eq!(session.text_prompt(), None);
}

#[test]
fn text_drag_creates_nothing() {
    let mut session = session_with_tool(Tool::Text);
    let effects = gesture(&mut session, &[p(0.0, 0.0), p(40.0, 0.0)]);
    assert!(effects
        .iter()
        .all(|effect| !matches!(effect, Effect::OpenTextPrompt { .. })));
    assert!(session.scene().is_empty());
}

#[test]
fn blank_text_is_not_persisted() {
    let mut session = session_with_tool(Tool::Text);
    let effects = session.handle(
        InputEvent::TextCommitted {
            at: p(0.0, 0.0),
            text: " \n\t ".into(),
        },
        &ApproxTextMetrics,
    );
    assert!(effects.is_empty());
    assert!(session.scene().is_empty());
}

#[test]
fn press_while_prompt_open_closes_it() {
    let mut session = session_with_tool(Tool::Text);
    gesture(&mut session, &[p(0.0, 0.0)]);
    let effects = session.handle(InputEvent::PointerDown(p(200.0, 200.0)), &ApproxTextMetrics);
    assert_eq!(effects, vec![Effect::CloseTextPrompt { commit: true }]);
    assert!(session.gesture().is_idle());
}

#[test]
fn cancel_cascade_prompt_then_tool_then_deactivate() {
    let mut session = session_with_tool(Tool::Text);
    gesture(&mut session, &[p(0.0, 0.0)]);

    let effects = session.handle(InputEvent::Cancel, &ApproxTextMetrics);
    assert_eq!(effects, vec![Effect::CloseTextPrompt { commit: false }]);

    let effects = session.handle(InputEvent::Cancel, &ApproxTextMetrics);
    assert!(effects.contains(&Effect::ToolChanged(Tool::Select)));
    assert_eq!(session.tool(), Tool::Select);

    let effects = session.handle(InputEvent::Cancel, &ApproxTextMetrics);
    assert_eq!(effects, vec![Effect::Deactivate]);
}

#[test]
fn cancel_closes_style_panel_before_deactivating() {
    let mut session = Session::default();
    session.handle(InputEvent::StylePanelOpened, &ApproxTextMetrics);
    let effects = session.handle(InputEvent::Cancel, &ApproxTextMetrics);
    assert_eq!(effects, vec![Effect::CloseStylePanel]);
}

#[test]
fn delete_without_selection_asks_to_clear_all() {
    let mut session = Session::default();
    assert!(session.handle(InputEvent::Delete, &ApproxTextMetrics).is_empty());

    add_rect(&mut session, p(0.0, 0.0), p(50.0, 50.0));
    let effects = session.handle(InputEvent::Delete, &ApproxTextMetrics);
    assert_eq!(effects, vec![Effect::RequestConfirm(ConfirmRequest::ClearAll)]);

    let effects = session.handle(InputEvent::ConfirmCancelled, &ApproxTextMetrics);
    assert!(effects.is_empty());
    assert_eq!(session.scene().len(), 1);

    session.handle(InputEvent::Delete, &ApproxTextMetrics);
    let effects = session.handle(
        InputEvent::Confirmed(ConfirmChoice::ClearAll),
        &ApproxTextMetrics,
    );
    assert_eq!(effects, vec![Effect::Persist, Effect::Repaint]);
    assert!(session.scene().is_empty());
}

#[test]
fn delete_selected_removes_only_that_object() {
    let mut session = Session::default();
    let keep = add_rect(&mut session, p(0.0, 0.0), p(50.0, 50.0));
    let doomed = add_rect(&mut session, p(200.0, 0.0), p(250.0, 50.0));
    gesture(&mut session, &[p(225.0, 25.0)]);
    assert_eq!(session.scene().selected(), Some(doomed));

    let effects = session.handle(InputEvent::Delete, &ApproxTextMetrics);
    assert_eq!(
        effects,
        vec![Effect::RequestConfirm(ConfirmRequest::DeleteSelectedOrClearAll)]
    );
    session.handle(
        InputEvent::Confirmed(ConfirmChoice::DeleteSelected),
        &ApproxTextMetrics,
    );
    assert_eq!(session.scene().len(), 1);
    assert!(session.scene().get(keep).is_some());
    assert_eq!(session.scene().selected(), None);
}

#[test]
fn confirmation_without_request_is_ignored() {
    let mut session = Session::default();
    add_rect(&mut session, p(0.0, 0.0), p(50.0, 50.0));
    let effects = session.handle(
        InputEvent::Confirmed(ConfirmChoice::ClearAll),
        &ApproxTextMetrics,
    );
    assert!(effects.is_empty());
    assert_eq!(session.scene().len(), 1);
}

#[test]
fn style_edit_restyles_selection_and_persists() {
    let mut session = Session::default();
    let id = add_rect(&mut session, p(0.0, 0.0), p(50.0, 50.0));
    gesture(&mut session, &[p(25.0, 25.0)]);
    let effects = session.handle(
        InputEvent::ApplyStyle(StylePatch {
            color: Some("#123456".into()),
            ..Default::default()
        }),
        &ApproxTextMetrics,
    );
    assert_eq!(effects, vec![Effect::Persist, Effect::Repaint]);
    assert_eq!(rect_of(&session, id).color, "#123456");
    assert_eq!(session.style().color, "#123456");
}

#[test]
fn hover_feedback_changes_cursor_only() {
    let mut session = Session::default();
    let id = add_rect(&mut session, p(0.0, 0.0), p(100.0, 50.0));
    gesture(&mut session, &[p(50.0, 25.0)]);
    assert_eq!(session.scene().selected(), Some(id));

    let effects = session.handle(InputEvent::PointerMove(p(100.0, 50.0)), &ApproxTextMetrics);
    assert_eq!(
        effects,
        vec![Effect::SetCursor(Cursor::Resize(ResizeHandle::Se))]
    );
    let effects = session.handle(InputEvent::PointerMove(p(40.0, 20.0)), &ApproxTextMetrics);
    assert_eq!(effects, vec![Effect::SetCursor(Cursor::Move)]);
    let effects = session.handle(InputEvent::PointerMove(p(400.0, 400.0)), &ApproxTextMetrics);
    assert_eq!(effects, vec![Effect::SetCursor(Cursor::Default)]);
    assert!(session.gesture().is_idle());
}

#[test]
fn switching_tool_clears_selection() {
    let mut session = Session::default();
    add_rect(&mut session, p(0.0, 0.0), p(100.0, 50.0));
    gesture(&mut session, &[p(50.0, 25.0)]);
    let effects = session.handle(InputEvent::SetTool(Tool::Pencil), &ApproxTextMetrics);
    assert_eq!(session.scene().selected(), None);
    assert!(effects.contains(&Effect::SetCursor(Cursor::Crosshair)));
}

#[test]
fn late_load_keeps_local_drawing_on_top() {
    let mut session = session_with_tool(Tool::Rect);
    gesture(&mut session, &[p(0.0, 0.0), p(40.0, 40.0)]);
    let loaded = vec![Annotation {
        id: AnnotationId(1),
        shape: Shape::Rect(RectShape {
            x: 5.0,
            y: 5.0,
            width: 20.0,
            height: 20.0,
            color: "#000".into(),
            line_width: 1.0,
            line_dash: None,
        }),
    }];
    let effects = session.handle(InputEvent::Loaded(loaded), &ApproxTextMetrics);
    assert_eq!(effects, vec![Effect::Persist, Effect::Repaint]);
    assert_eq!(session.scene().len(), 2);
    let top = session.scene().annotations()[1].shape.as_rect().unwrap();
    assert_eq!(top.width, 40.0);
}

#[test]
fn tool_names_parse() {
    assert_eq!("Rect".parse::<Tool>(), Ok(Tool::Rect));
    assert_eq!("pencil".parse::<Tool>(), Ok(Tool::Pencil));
    assert!("laser".parse::<Tool>().is_err());
}
