//! End-to-end action flows against the in-memory tree and a recording
//! dispatcher.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use ax_adapter::fake::{FakeAxTree, NodeSpec};
use ax_adapter::{action, role, AxPort};
use axdriver_core_types::{
    DriverError, Element, ElementQuery, NodeRef, Point, ScrollDirection, ScrollMethod,
};
use element_actions::{
    ActionTiming, Actions, CaptureImage, CapturePort, ClickOptions, DragMode, ExecCtx,
    ScrollOptions, TypeMethod,
};
use humanize::MotionProfile;
use input_dispatch::{InputDispatcher, InputEvent, Modifiers, MouseButton, RecordingDispatcher};

use async_trait::async_trait;
use axdriver_core_types::Rect;

/// Recording dispatcher whose wheel events also move fake-tree content, so
/// the synthetic scroll loop observes progress.
struct ScrollingDispatcher {
    rec: RecordingDispatcher,
    tree: FakeAxTree,
    anchor: Mutex<Option<NodeRef>>,
}

impl ScrollingDispatcher {
    fn new(tree: FakeAxTree) -> Self {
        Self {
            rec: RecordingDispatcher::new(),
            tree,
            anchor: Mutex::new(None),
        }
    }

    fn set_anchor(&self, node: &NodeRef) {
        *self.anchor.lock() = Some(node.clone());
    }
}

impl InputDispatcher for ScrollingDispatcher {
    fn mouse_move(&self, to: Point) -> Result<(), DriverError> {
        self.rec.mouse_move(to)
    }
    fn mouse_down(&self, at: Point, button: MouseButton) -> Result<(), DriverError> {
        self.rec.mouse_down(at, button)
    }
    fn mouse_up(&self, at: Point, button: MouseButton) -> Result<(), DriverError> {
        self.rec.mouse_up(at, button)
    }
    fn mouse_drag(&self, to: Point, button: MouseButton) -> Result<(), DriverError> {
        self.rec.mouse_drag(to, button)
    }
    fn scroll(&self, wheel_y: f64, wheel_x: f64) -> Result<(), DriverError> {
        self.rec.scroll(wheel_y, wheel_x)?;
        if let Some(anchor) = self.anchor.lock().as_ref() {
            self.tree.apply_wheel(anchor, wheel_x, wheel_y);
        }
        Ok(())
    }
    fn key_down(&self, keycode: u16, modifiers: Modifiers) -> Result<(), DriverError> {
        self.rec.key_down(keycode, modifiers)
    }
    fn key_up(&self, keycode: u16, modifiers: Modifiers) -> Result<(), DriverError> {
        self.rec.key_up(keycode, modifiers)
    }
    fn key_unicode(&self, text: &str) -> Result<(), DriverError> {
        self.rec.key_unicode(text)
    }
}

fn fast_timing() -> ActionTiming {
    ActionTiming {
        activate_settle_ms: 1,
        focus_settle_ms: 2,
        value_verify_delay_ms: 1,
        key_press_ms: (1, 2),
        key_gap_ms: (1, 3),
        click_dwell_ms: (1, 3),
        scroll_settle_ms: 2,
        ..ActionTiming::default()
    }
}

fn fast_motion() -> MotionProfile {
    MotionProfile {
        min_duration_ms: 1,
        fitts_a: 0.001,
        fitts_b: 0.001,
        seed: Some(11),
        ..MotionProfile::default()
    }
}

struct Fixture {
    tree: FakeAxTree,
    dispatcher: Arc<ScrollingDispatcher>,
    actions: Actions,
}

fn fixture() -> Fixture {
    let tree = FakeAxTree::new();
    let dispatcher = Arc::new(ScrollingDispatcher::new(tree.clone()));
    let actions = Actions::new(
        Arc::new(tree.clone()),
        Arc::new(tree.clone()),
        dispatcher.clone(),
    )
    .with_timing(fast_timing())
    .with_motion(fast_motion());
    Fixture {
        tree,
        dispatcher,
        actions,
    }
}

fn find(actions: &Actions, query: ElementQuery) -> Element {
    actions.engine().find_first(&query).expect("element present")
}

#[tokio::test]
async fn click_posts_move_down_up_in_order() {
    let f = fixture();
    let app = f.tree.add_app("Demo", 55);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
    f.tree.add_child(
        &window,
        NodeSpec::new("AXButton").title("Save").frame(100.0, 100.0, 80.0, 30.0),
    );

    let button = find(&f.actions, ElementQuery::new().with_text("Save"));
    let ctx = ExecCtx::default();
    let report = f
        .actions
        .click(&ctx, &button, ClickOptions { humanize: false, ..ClickOptions::default() })
        .await
        .unwrap();

    assert_eq!(report.point, Point::new(140.0, 115.0));
    assert_eq!(f.tree.activations(), vec![55]);

    let events = f.dispatcher.rec.events();
    let down = events
        .iter()
        .position(|e| matches!(e, InputEvent::MouseDown { .. }))
        .unwrap();
    let up = events
        .iter()
        .position(|e| matches!(e, InputEvent::MouseUp { .. }))
        .unwrap();
    assert!(matches!(events[down - 1], InputEvent::MouseMove { .. }));
    assert!(down < up);
}

#[tokio::test]
async fn click_zero_size_without_autoscroll_is_not_visible() {
    let f = fixture();
    let app = f.tree.add_app("Demo", 55);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
    f.tree.add_child(
        &window,
        NodeSpec::new("AXButton").title("Ghost").frame(10.0, 10.0, 0.0, 0.0),
    );

    let button = find(&f.actions, ElementQuery::new().with_text("Ghost"));
    let err = f
        .actions
        .click(
            &ExecCtx::default(),
            &button,
            ClickOptions { auto_scroll: false, humanize: false, ..ClickOptions::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::ElementNotVisible(_)));
}

#[tokio::test]
async fn synthetic_scroll_brings_offscreen_row_to_viewport_center() {
    let f = fixture();
    let app = f.tree.add_app("Pages", 56);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 1200.0, 1000.0));
    let scroll = f.tree.add_child(
        &window,
        NodeSpec::new(role::SCROLL_AREA).frame(0.0, 100.0, 1200.0, 800.0),
    );
    let row = f.tree.add_child(
        &scroll,
        NodeSpec::new("AXStaticText").title("Row42").frame(800.0, 2400.0, 40.0, 20.0),
    );
    f.dispatcher.set_anchor(&row);

    let element = find(&f.actions, ElementQuery::new().with_text("Row42"));
    assert!(!element.visibility.unwrap().in_viewport);

    let ctx = ExecCtx::default();
    let result = f.actions.scroll_to_element(&ctx, &element).await.unwrap();
    assert!(result.success);
    assert_eq!(result.method, ScrollMethod::Synthetic);
    assert!(result.attempts <= 8);
    assert!((result.scrolled_by.y - 1910.0).abs() < 1.0);
    // Element center landed on the viewport center (y = 500).
    assert!((result.final_position.y + 10.0 - 500.0).abs() < 5.0);

    // A subsequent click targets the scrolled-in position.
    let refreshed = find(&f.actions, ElementQuery::new().with_text("Row42"));
    let report = f
        .actions
        .click(&ctx, &refreshed, ClickOptions { humanize: false, ..ClickOptions::default() })
        .await
        .unwrap();
    assert!((report.point.y - 500.0).abs() < 5.0);
}

#[tokio::test]
async fn native_scroll_action_is_preferred_when_advertised() {
    let f = fixture();
    let app = f.tree.add_app("Pages", 56);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 1200.0, 1000.0));
    let scroll = f.tree.add_child(
        &window,
        NodeSpec::new(role::SCROLL_AREA).frame(0.0, 100.0, 1200.0, 800.0),
    );
    f.tree.add_child(
        &scroll,
        NodeSpec::new("AXStaticText")
            .title("Row7")
            .frame(100.0, 3000.0, 200.0, 20.0)
            .action(action::SCROLL_TO_VISIBLE),
    );

    let element = find(&f.actions, ElementQuery::new().with_text("Row7"));
    let result = f
        .actions
        .scroll_to_element(&ExecCtx::default(), &element)
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.method, ScrollMethod::AxScrollToVisible);
    assert_eq!(result.attempts, 1);
    assert!(f
        .tree
        .performed_actions()
        .iter()
        .any(|(_, name)| name == action::SCROLL_TO_VISIBLE));
}

#[tokio::test]
async fn offscreen_element_without_container_fails() {
    let f = fixture();
    let app = f.tree.add_app("Demo", 55);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
    f.tree.add_child(
        &window,
        NodeSpec::new("AXButton").title("Far").frame(0.0, 5000.0, 40.0, 20.0),
    );

    let element = find(&f.actions, ElementQuery::new().with_text("Far"));
    let err = f
        .actions
        .scroll_to_element(&ExecCtx::default(), &element)
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::NoScrollContainer));
}

#[tokio::test]
async fn vanished_element_stops_scrolling_with_no_progress() {
    let f = fixture();
    let app = f.tree.add_app("Pages", 56);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 1200.0, 1000.0));
    let scroll = f.tree.add_child(
        &window,
        NodeSpec::new(role::SCROLL_AREA).frame(0.0, 100.0, 1200.0, 800.0),
    );
    let row = f.tree.add_child(
        &scroll,
        NodeSpec::new("AXStaticText").title("Gone").frame(800.0, 2400.0, 40.0, 20.0),
    );
    f.dispatcher.set_anchor(&row);

    let element = find(&f.actions, ElementQuery::new().with_text("Gone"));
    f.tree.remove(&row);
    let err = f
        .actions
        .scroll_to_element(&ExecCtx::default(), &element)
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::NoProgress));
}

#[tokio::test]
async fn hard_timeout_preempts_the_scroll_loop() {
    let f = fixture();
    let app = f.tree.add_app("Pages", 56);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 1200.0, 1000.0));
    let scroll = f.tree.add_child(
        &window,
        NodeSpec::new(role::SCROLL_AREA).frame(0.0, 100.0, 1200.0, 800.0),
    );
    f.tree.add_child(
        &scroll,
        NodeSpec::new("AXStaticText").title("Slow").frame(800.0, 2400.0, 40.0, 20.0),
    );

    let timing = ActionTiming {
        scroll_hard_timeout_ms: 0,
        ..fast_timing()
    };
    let actions = Actions::new(
        Arc::new(f.tree.clone()),
        Arc::new(f.tree.clone()),
        f.dispatcher.clone(),
    )
    .with_timing(timing)
    .with_motion(fast_motion());

    let element = find(&actions, ElementQuery::new().with_text("Slow"));
    let err = actions
        .scroll_to_element(&ExecCtx::default(), &element)
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::HardTimeout { .. }));
}

#[tokio::test]
async fn type_prefers_verified_value_set_and_posts_no_keys() {
    let f = fixture();
    let app = f.tree.add_app("Forms", 57);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
    f.tree.add_child(
        &window,
        NodeSpec::new("AXTextField").identifier("name").frame(100.0, 100.0, 200.0, 24.0),
    );

    let field = find(&f.actions, ElementQuery::new().with_identifier("name"));
    let report = f
        .actions
        .type_text(&ExecCtx::default(), &field, "hello")
        .await
        .unwrap();
    assert_eq!(report.method, TypeMethod::ValueSet);
    assert!(f.dispatcher.rec.key_events().is_empty());

    let node = field.node.as_ref().unwrap();
    let ax: &dyn AxPort = &f.tree;
    assert_eq!(ax.string_attribute(node, "AXValue").as_deref(), Some("hello"));
}

#[tokio::test]
async fn type_falls_back_to_plain_letter_keystrokes() {
    let f = fixture();
    let app = f.tree.add_app("Forms", 57);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
    let node = f.tree.add_child(
        &window,
        NodeSpec::new("AXTextField").identifier("web-field").frame(100.0, 100.0, 200.0, 24.0),
    );
    // This field acknowledges value sets but never applies them, like some
    // web form controls.
    f.tree.reject_value_sets(&node);

    let field = find(&f.actions, ElementQuery::new().with_identifier("web-field"));
    let report = f
        .actions
        .type_text(&ExecCtx::default(), &field, "hello")
        .await
        .unwrap();
    assert_eq!(report.method, TypeMethod::Keystrokes);

    let keys = f.dispatcher.rec.key_events();
    assert_eq!(keys.len(), 10, "five down/up pairs");
    let expected = [4u16, 14, 37, 37, 31]; // h e l l o
    for (pair, code) in keys.chunks(2).zip(expected) {
        assert_eq!(
            pair[0],
            InputEvent::KeyDown { keycode: code, modifiers: Modifiers::empty() }
        );
        assert_eq!(
            pair[1],
            InputEvent::KeyUp { keycode: code, modifiers: Modifiers::empty() }
        );
    }
}

#[tokio::test]
async fn type_uses_unicode_payload_outside_the_key_map() {
    let f = fixture();
    let app = f.tree.add_app("Forms", 57);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
    let node = f.tree.add_child(
        &window,
        NodeSpec::new("AXTextField").identifier("intl").frame(100.0, 100.0, 200.0, 24.0),
    );
    f.tree.reject_value_sets(&node);

    let field = find(&f.actions, ElementQuery::new().with_identifier("intl"));
    f.actions
        .type_text(&ExecCtx::default(), &field, "aé")
        .await
        .unwrap();
    let keys = f.dispatcher.rec.key_events();
    assert!(keys.contains(&InputEvent::KeyUnicode { text: "é".into() }));
}

#[tokio::test]
async fn read_follows_the_value_title_description_chain() {
    let f = fixture();
    let app = f.tree.add_app("Demo", 55);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
    f.tree.add_child(
        &window,
        NodeSpec::new("AXTextField")
            .title("Name")
            .value("Ada")
            .frame(10.0, 10.0, 100.0, 20.0),
    );

    let field = find(&f.actions, ElementQuery::new().with_role("AXTextField"));
    assert_eq!(f.actions.read(&field).as_deref(), Some("Ada"));

    // Snapshot fallback when the handle is gone.
    let mut detached = field.clone();
    detached.node = None;
    detached.value = None;
    assert_eq!(f.actions.read(&detached).as_deref(), Some("Name"));
}

#[tokio::test]
async fn capture_rejects_zero_size_and_uses_the_element_frame() {
    struct FrameEcho;
    #[async_trait]
    impl CapturePort for FrameEcho {
        async fn capture_region(&self, region: Rect) -> Result<CaptureImage, DriverError> {
            Ok(CaptureImage {
                width: region.width as u32,
                height: region.height as u32,
                bytes: Vec::new(),
            })
        }
    }

    let f = fixture();
    let app = f.tree.add_app("Demo", 55);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
    f.tree.add_child(
        &window,
        NodeSpec::new("AXImage").title("Logo").frame(10.0, 10.0, 120.0, 60.0),
    );
    let actions = Actions::new(
        Arc::new(f.tree.clone()),
        Arc::new(f.tree.clone()),
        f.dispatcher.clone(),
    )
    .with_capture(Arc::new(FrameEcho));

    let image = actions
        .capture(
            &ExecCtx::default(),
            &find(&actions, ElementQuery::new().with_text("Logo")),
        )
        .await
        .unwrap();
    assert_eq!((image.width, image.height), (120, 60));

    let mut ghost = Element::with_role("AXImage");
    ghost.title = Some("ghost".into());
    let err = actions.capture(&ExecCtx::default(), &ghost).await.unwrap_err();
    assert!(matches!(err, DriverError::ElementNotVisible(_)));
}

#[tokio::test]
async fn interpolated_drag_is_wall_clock_paced_and_lands_exactly() {
    let f = fixture();
    let ctx = ExecCtx::default();
    let report = f
        .actions
        .drag(
            &ctx,
            Point::new(10.0, 10.0),
            Point::new(310.0, 110.0),
            MouseButton::Left,
            DragMode::Interpolated { duration: Duration::from_millis(100) },
        )
        .await
        .unwrap();
    assert_eq!(report.steps, 6, "100 ms at 60 Hz");

    let events = f.dispatcher.rec.events();
    let drags: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            InputEvent::MouseDrag { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(drags.len(), 6);
    assert_eq!(*drags.last().unwrap(), Point::new(310.0, 110.0));
    assert!(matches!(events.last().unwrap(), InputEvent::MouseUp { .. }));
}

#[tokio::test]
async fn page_scroll_at_point_uses_window_extent() {
    let f = fixture();
    let app = f.tree.add_app("Browser", 58);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 1440.0, 900.0));
    f.tree.add_child(
        &window,
        NodeSpec::new(role::WEB_AREA).frame(0.0, 60.0, 1440.0, 840.0),
    );

    let report = f
        .actions
        .scroll_at(
            &ExecCtx::default(),
            Point::new(500.0, 300.0),
            ScrollOptions { direction: ScrollDirection::Down, pages: 1.0 },
        )
        .await
        .unwrap();
    assert_eq!(report.direction, ScrollDirection::Down);
    assert!((report.amount - 810.0).abs() < 0.01);

    let events = f.dispatcher.rec.events();
    assert!(matches!(events[0], InputEvent::MouseMove { to } if to == Point::new(500.0, 300.0)));
    let wheels = f.dispatcher.rec.scroll_events();
    assert_eq!(wheels.len(), 1);
    assert!((wheels[0].0 + 810.0).abs() < 0.01);
    assert_eq!(wheels[0].1, 0.0);
}

#[tokio::test]
async fn perform_passes_named_actions_through() {
    let f = fixture();
    let app = f.tree.add_app("Demo", 55);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
    f.tree.add_child(
        &window,
        NodeSpec::new("AXButton")
            .title("Menu")
            .frame(10.0, 10.0, 40.0, 20.0)
            .action("AXPress")
            .action("AXShowMenu"),
    );

    let button = find(&f.actions, ElementQuery::new().with_text("Menu"));
    f.actions.perform(&button, "AXShowMenu").unwrap();
    assert!(f
        .tree
        .performed_actions()
        .iter()
        .any(|(_, name)| name == "AXShowMenu"));

    let err = f.actions.perform(&button, "AXConfirm").unwrap_err();
    assert!(matches!(err, DriverError::ActionFailed { .. }));
}

#[tokio::test]
async fn scroll_here_anchored_to_element_targets_its_container() {
    let f = fixture();
    let app = f.tree.add_app("Pages", 56);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 1200.0, 1000.0));
    let scroll = f.tree.add_child(
        &window,
        NodeSpec::new(role::SCROLL_AREA).frame(0.0, 100.0, 1200.0, 800.0),
    );
    f.tree.add_child(
        &scroll,
        NodeSpec::new("AXStaticText").title("Body").frame(10.0, 200.0, 100.0, 20.0),
    );

    let body = find(&f.actions, ElementQuery::new().with_text("Body"));
    let report = f
        .actions
        .scroll_at_element(
            &ExecCtx::default(),
            &body,
            ScrollOptions { direction: ScrollDirection::Down, pages: 1.0 },
        )
        .await
        .unwrap();
    // 0.9 pages of the container's 800 px visible extent.
    assert!((report.amount - 720.0).abs() < 0.01);

    let events = f.dispatcher.rec.events();
    assert!(
        matches!(events[0], InputEvent::MouseMove { to } if to == Point::new(600.0, 500.0)),
        "pointer should center on the scroll container"
    );
}

#[tokio::test]
async fn cancellation_stops_multi_step_operations() {
    let f = fixture();
    let app = f.tree.add_app("Demo", 55);
    let window = f
        .tree
        .add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 800.0, 600.0));
    f.tree.add_child(
        &window,
        NodeSpec::new("AXButton").title("Save").frame(100.0, 100.0, 80.0, 30.0),
    );

    let button = find(&f.actions, ElementQuery::new().with_text("Save"));
    let ctx = ExecCtx::default();
    ctx.cancel.cancel();
    let err = f
        .actions
        .click(&ctx, &button, ClickOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::HardTimeout { .. }));
}
