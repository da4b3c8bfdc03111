//! Graph-level tests: attachment, evaluation, animations, native driver
//! commands and the props binding.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;

use super::*;
use crate::error::Error;
use crate::style::{StyleInput, StyleValue, TransformArg, TransformEntry};

struct View(u32);

impl HostInstance for View {
    fn view_tag(&self) -> u32 {
        self.0
    }
}

fn linear_timing(to_value: f64, duration_ms: f64) -> Box<dyn Animation> {
    Box::new(TimingAnimation::new(TimingConfig {
        to_value,
        duration_ms,
        easing: Easing::Linear,
        ..TimingConfig::default()
    }))
}

// ============================================================================
// Attachment
// ============================================================================

#[test]
fn test_attach_on_first_listener_and_detach_on_last() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(1.0);
    let sum = graph.add(v, 2.0).unwrap();
    let doubled = graph.multiply(sum, 2).unwrap();

    assert_eq!(graph.state(doubled).unwrap(), NodeState::Unattached);
    assert!(graph.children(v).unwrap().is_empty());

    let first = graph.add_listener(doubled, |_| {}).unwrap();
    let second = graph.add_listener(doubled, |_| {}).unwrap();
    assert_eq!(graph.state(v).unwrap(), NodeState::Attached);
    assert_eq!(graph.children(v).unwrap(), &[sum]);
    assert_eq!(graph.children(sum).unwrap(), &[doubled]);

    assert!(graph.remove_listener(doubled, first).unwrap());
    assert_eq!(graph.state(doubled).unwrap(), NodeState::Attached);

    assert!(graph.remove_listener(doubled, second).unwrap());
    for id in [v, sum, doubled] {
        assert_eq!(graph.state(id).unwrap(), NodeState::Unattached);
        assert!(graph.children(id).unwrap().is_empty());
    }
}

#[test]
fn test_listeners_see_downstream_values() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(1.0);
    let sum = graph.add(v, 2.0).unwrap();
    let doubled = graph.multiply(sum, 2).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    graph
        .add_listener(doubled, move |value| {
            sink.borrow_mut().push(value.as_number().unwrap())
        })
        .unwrap();

    graph.set_value(v, 4.0).unwrap();
    graph.set_value(v, 0.0).unwrap();
    assert_eq!(*seen.borrow(), vec![12.0, 4.0]);
}

#[test]
fn test_dispose_is_final() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(1.0);
    let scaled = graph.multiply(v, 3).unwrap();
    graph.add_listener(scaled, |_| {}).unwrap();

    graph.dispose(scaled).unwrap();
    assert_eq!(graph.state(scaled).unwrap(), NodeState::Detached);
    assert_eq!(graph.state(v).unwrap(), NodeState::Unattached);
    assert!(graph.children(v).unwrap().is_empty());

    assert!(matches!(graph.get_value(scaled), Err(Error::NodeDetached(_))));
    assert!(matches!(
        graph.add_listener(scaled, |_| {}),
        Err(Error::NodeDetached(_))
    ));
    assert!(matches!(graph.add(scaled, 1), Err(Error::NodeDetached(_))));
}

#[test]
fn test_disposed_slot_is_reused_without_reviving_old_id() {
    let mut graph = AnimatedGraph::new();
    let old = graph.value(1.0);
    graph.dispose(old).unwrap();
    assert!(graph.is_empty());

    let fresh = graph.value(2.0);
    assert_eq!(fresh.index(), old.index());
    assert_eq!(graph.capacity(), 1);
    assert_eq!(graph.number(fresh).unwrap(), 2.0);

    assert_eq!(graph.state(old).unwrap(), NodeState::Detached);
    assert!(matches!(graph.get_value(old), Err(Error::NodeDetached(_))));
    assert!(matches!(graph.set_value(old, 5.0), Err(Error::NodeDetached(_))));
    graph.dispose(old).unwrap();
    assert_eq!(graph.number(fresh).unwrap(), 2.0);
}

#[test]
fn test_unknown_node() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(0.0);
    let other = AnimatedGraph::new();
    assert!(matches!(other.get_value(v), Err(Error::UnknownNode(0))));
    assert!(graph.set_value(v, 1.0).is_ok());
}

// ============================================================================
// Evaluation
// ============================================================================

#[test]
fn test_arithmetic() {
    let mut graph = AnimatedGraph::new();
    let a = graph.value(7.0);
    let b = graph.value(2.0);
    let sub = graph.subtract(a, b).unwrap();
    let div = graph.divide(a, b).unwrap();
    let rem = graph.modulo(a, 3.0).unwrap();
    assert_eq!(graph.number(sub).unwrap(), 5.0);
    assert_eq!(graph.number(div).unwrap(), 3.5);
    assert_eq!(graph.number(rem).unwrap(), 1.0);

    graph.set_value(a, -1.0).unwrap();
    assert_eq!(graph.number(rem).unwrap(), 2.0);
}

#[test]
fn test_division_by_zero_reports_once() {
    let mut graph = AnimatedGraph::new();
    let a = graph.value(10.0);
    let b = graph.value(0.0);
    let d = graph.divide(a, b).unwrap();

    assert_eq!(graph.division_warned(d), Some(false));
    assert_eq!(graph.number(d).unwrap(), 0.0);
    assert_eq!(graph.division_warned(d), Some(true));
    assert_eq!(graph.number(d).unwrap(), 0.0);
    assert_eq!(graph.division_warned(d), Some(true));

    graph.set_value(b, 2.0).unwrap();
    assert_eq!(graph.number(d).unwrap(), 5.0);
    assert_eq!(graph.division_warned(d), Some(false));
}

#[test]
fn test_diff_clamp_accumulates_changes() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(0.0);
    let clamped = graph.diff_clamp(v, 0.0, 10.0).unwrap();

    graph.set_value(v, 5.0).unwrap();
    assert_eq!(graph.number(clamped).unwrap(), 5.0);
    graph.set_value(v, 20.0).unwrap();
    assert_eq!(graph.number(clamped).unwrap(), 10.0);
    graph.set_value(v, 15.0).unwrap();
    assert_eq!(graph.number(clamped).unwrap(), 5.0);
}

#[test]
fn test_interpolation_node() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(0.5);
    let rotation = graph
        .interpolate(v, InterpolationConfig::new(vec![0.0, 1.0], vec!["0deg", "90deg"]))
        .unwrap();
    assert_eq!(
        graph.get_value(rotation).unwrap(),
        NodeValue::String("45deg".to_string())
    );

    let chained = graph
        .interpolate(rotation, InterpolationConfig::new(vec![0.0, 1.0], vec![0.0, 1.0]))
        .unwrap();
    assert!(matches!(
        graph.get_value(chained),
        Err(Error::NonNumericInput(_))
    ));
}

#[test]
fn test_interpolation_rejects_bad_config() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(0.0);
    let err = graph
        .interpolate(v, InterpolationConfig::new(vec![1.0, 0.0], vec![0.0, 1.0]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRange(_)));
}

#[test]
fn test_transform_node() {
    let mut graph = AnimatedGraph::new();
    let x = graph.value(12.0);
    let t = graph
        .transform(vec![
            ("translateX".to_string(), TransformLeaf::Node(x)),
            ("rotate".to_string(), TransformLeaf::Static(TransformArg::from("5deg"))),
        ])
        .unwrap();
    assert_eq!(
        graph.get_value(t).unwrap(),
        NodeValue::Transform(vec![
            TransformEntry::new("translateX", 12.0),
            TransformEntry::new("rotate", "5deg"),
        ])
    );
}

// ============================================================================
// Value operations and animations
// ============================================================================

#[test]
fn test_offsets() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(10.0);
    graph.set_offset(v, 5.0).unwrap();
    assert_eq!(graph.number(v).unwrap(), 15.0);
    graph.flatten_offset(v).unwrap();
    assert_eq!(graph.number(v).unwrap(), 15.0);
    graph.extract_offset(v).unwrap();
    graph.set_value(v, 1.0).unwrap();
    assert_eq!(graph.number(v).unwrap(), 16.0);
}

#[test]
fn test_timing_animation_runs_on_tick() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(0.0);
    let done = Rc::new(Cell::new(None));
    let flag = Rc::clone(&done);
    graph
        .animate(
            v,
            linear_timing(100.0, 100.0),
            Some(Rc::new(move |finished| flag.set(Some(finished)))),
        )
        .unwrap();

    assert!(graph.is_animating(v).unwrap());
    assert_eq!(graph.tick(0.0).unwrap(), 1);
    assert_eq!(graph.tick(50.0).unwrap(), 1);
    assert_eq!(graph.number(v).unwrap(), 50.0);
    assert_eq!(graph.tick(100.0).unwrap(), 0);
    assert_eq!(graph.number(v).unwrap(), 100.0);
    assert_eq!(done.get(), Some(true));
}

#[test]
fn test_set_value_interrupts_animation() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(0.0);
    let done = Rc::new(Cell::new(None));
    let flag = Rc::clone(&done);
    graph
        .animate(
            v,
            linear_timing(1.0, 1000.0),
            Some(Rc::new(move |finished| flag.set(Some(finished)))),
        )
        .unwrap();
    graph.tick(0.0).unwrap();
    graph.set_value(v, 3.0).unwrap();
    assert_eq!(done.get(), Some(false));
    assert!(!graph.is_animating(v).unwrap());
}

#[test]
fn test_stop_and_reset() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(3.0);
    graph.animate(v, linear_timing(13.0, 100.0), None).unwrap();
    graph.tick(0.0).unwrap();
    graph.tick(50.0).unwrap();
    assert_eq!(graph.stop_animation(v).unwrap(), 8.0);
    assert_eq!(graph.tick(100.0).unwrap(), 0);
    assert_eq!(graph.number(v).unwrap(), 8.0);
    assert_eq!(graph.reset_animation(v).unwrap(), 3.0);
}

#[test]
fn test_tracking_follows_target() {
    let mut graph = AnimatedGraph::new();
    let target = graph.value(0.0);
    let follower = graph.value(0.0);
    let factory: AnimationFactory =
        Rc::new(|to_value: f64| -> Box<dyn Animation> { linear_timing(to_value, 0.0) });

    let tracking = graph.track(follower, target, factory, None).unwrap();
    assert_eq!(graph.state(tracking).unwrap(), NodeState::Attached);
    assert_eq!(graph.children(target).unwrap(), &[tracking]);

    graph.set_value(target, 50.0).unwrap();
    graph.tick(0.0).unwrap();
    assert_eq!(graph.number(follower).unwrap(), 50.0);
    assert_eq!(graph.number(tracking).unwrap(), 50.0);

    graph.stop_animation(follower).unwrap();
    assert_eq!(graph.state(tracking).unwrap(), NodeState::Detached);
    assert!(graph.children(target).unwrap().is_empty());
}

// ============================================================================
// Native driver
// ============================================================================

#[test]
fn test_make_native_records_graph() {
    let mut graph = AnimatedGraph::new();
    let a = graph.value(1.0);
    let b = graph.value(2.0);
    let sum = graph.add(a, b).unwrap();

    let seen = Rc::new(Cell::new(0.0));
    let sink = Rc::clone(&seen);
    let listener = graph
        .add_listener(sum, move |value| sink.set(value.as_number().unwrap()))
        .unwrap();
    graph.make_native(sum).unwrap();

    let (ta, tb, ts) = (
        graph.native_tag(a).unwrap(),
        graph.native_tag(b).unwrap(),
        graph.native_tag(sum).unwrap(),
    );
    let ops = graph.take_native_ops();
    assert!(ops.contains(&NativeOp::CreateNode {
        tag: ta,
        config: NativeNodeConfig::Value {
            value: 1.0,
            offset: 0.0
        }
    }));
    assert!(ops.contains(&NativeOp::CreateNode {
        tag: ts,
        config: NativeNodeConfig::Addition { input: [ta, tb] }
    }));
    assert!(ops.contains(&NativeOp::ConnectNodes { parent: ta, child: ts }));
    assert!(ops.contains(&NativeOp::ConnectNodes { parent: tb, child: ts }));
    assert!(ops.contains(&NativeOp::StartListening { tag: ts }));
    assert_eq!(
        ops.iter()
            .filter(|op| matches!(op, NativeOp::ConnectNodes { .. }))
            .count(),
        2
    );

    graph.set_value(a, 5.0).unwrap();
    assert_eq!(
        graph.take_native_ops(),
        vec![NativeOp::SetValue { tag: ta, value: 5.0 }]
    );

    graph.receive_native_value(ts, 7.0).unwrap();
    assert_eq!(seen.get(), 7.0);

    graph.remove_listener(sum, listener).unwrap();
    let ops = graph.take_native_ops();
    assert!(ops.contains(&NativeOp::StopListening { tag: ts }));
    assert!(ops.contains(&NativeOp::DisconnectNodes { parent: ta, child: ts }));
    assert!(ops.contains(&NativeOp::DropNode { tag: ts }));
}

#[test]
fn test_native_set_value_leaves_props_to_the_driver() {
    let mut graph = AnimatedGraph::new();
    let opacity = graph.value(0.0);
    let spec = AnimatedPropsSpec::new().with("style", AnimatedStyle::new().with("opacity", opacity));
    let mut binding = AnimatedPropsBinding::new(&mut graph, spec).unwrap();
    binding.set_instance(&mut graph, &View(4)).unwrap();

    graph.set_value(opacity, 0.5).unwrap();
    assert!(binding.take_needs_update());

    graph.make_native(binding.node()).unwrap();
    graph.take_native_ops();
    graph.set_value(opacity, 1.0).unwrap();
    assert!(!binding.take_needs_update());
    let tag = graph.native_tag(opacity).unwrap();
    assert_eq!(
        graph.take_native_ops(),
        vec![NativeOp::SetValue { tag, value: 1.0 }]
    );
    assert_eq!(graph.number(opacity).unwrap(), 1.0);
}

#[test]
fn test_native_tag_requires_native_node() {
    let mut graph = AnimatedGraph::new();
    let v = graph.value(0.0);
    assert!(matches!(graph.native_tag(v), Err(Error::NotNative(_))));
}

// ============================================================================
// Props
// ============================================================================

#[test]
fn test_reduced_props() {
    let mut graph = AnimatedGraph::new();
    let opacity = graph.value(0.5);
    let spec = AnimatedPropsSpec::new()
        .with("style", AnimatedStyle::new().with("opacity", opacity))
        .with("testID", StyleValue::from("box"));
    let binding = AnimatedPropsBinding::new(&mut graph, spec).unwrap();

    let reduced = binding.reduced(&graph).unwrap();
    assert!(!reduced.collapsable);
    assert_eq!(
        reduced.props.get("testID"),
        Some(&ReducedProp::Value(StyleValue::from("box")))
    );
    assert_eq!(
        reduced.style,
        Some(StyleInput::List(vec![StyleInput::Raw(
            crate::style! { "opacity" => 0.5 }
        )]))
    );
}

#[test]
fn test_binding_schedules_updates() {
    let mut graph = AnimatedGraph::new();
    let opacity = graph.value(0.0);
    let spec = AnimatedPropsSpec::new().with("style", AnimatedStyle::new().with("opacity", opacity));
    let mut binding = AnimatedPropsBinding::new(&mut graph, spec).unwrap();

    graph.set_value(opacity, 0.2).unwrap();
    assert!(!binding.take_needs_update());

    binding.set_instance(&mut graph, &View(7)).unwrap();
    graph.set_value(opacity, 1.0).unwrap();
    assert!(binding.take_needs_update());
    assert!(!binding.take_needs_update());

    binding.clear_instance(&mut graph).unwrap();
    graph.set_value(opacity, 0.0).unwrap();
    assert!(!binding.take_needs_update());
}

#[test]
fn test_binding_swaps_nodes_without_dropping_values() {
    let mut graph = AnimatedGraph::new();
    let opacity = graph.value(1.0);
    let spec = AnimatedPropsSpec::new().with("style", AnimatedStyle::new().with("opacity", opacity));
    let mut binding = AnimatedPropsBinding::new(&mut graph, spec.clone()).unwrap();
    let first = binding.node();

    binding.update(&mut graph, spec).unwrap();
    assert_eq!(binding.node(), first);

    let next = AnimatedPropsSpec::new().with(
        "style",
        AnimatedStyle::new().with("opacity", opacity).with("width", 10),
    );
    binding.update(&mut graph, next).unwrap();
    assert_ne!(binding.node(), first);
    assert_eq!(graph.state(first).unwrap(), NodeState::Detached);
    assert_eq!(graph.children(opacity).unwrap(), &[binding.node()]);
    assert_eq!(graph.state(opacity).unwrap(), NodeState::Attached);

    binding.unmount(&mut graph).unwrap();
    assert!(graph.children(opacity).unwrap().is_empty());
    assert_eq!(graph.state(opacity).unwrap(), NodeState::Unattached);
}

#[test]
fn test_repeated_updates_keep_the_arena_bounded() {
    let mut graph = AnimatedGraph::new();
    let a = graph.value(0.0);
    let b = graph.value(1.0);
    let spec_for = |id: NodeId| {
        AnimatedPropsSpec::new().with(
            "style",
            AnimatedStyle::new().with("opacity", id).with(
                "transform",
                StyleLeaf::Transform(vec![("translateX".to_string(), TransformLeaf::Node(id))]),
            ),
        )
    };
    let mut binding = AnimatedPropsBinding::new(&mut graph, spec_for(a)).unwrap();
    // Two values, the props node and its lowered transform.
    assert_eq!(graph.len(), 4);

    for i in 0..1000 {
        let target = if i % 2 == 0 { b } else { a };
        binding.update(&mut graph, spec_for(target)).unwrap();
    }
    assert_eq!(graph.len(), 4);
    assert!(graph.capacity() <= 6);

    let reduced = binding.reduced(&graph).unwrap();
    let expected = crate::Style::new()
        .with("opacity", 0.0)
        .with("transform", vec![TransformEntry::new("translateX", 0.0)]);
    assert_eq!(
        reduced.style,
        Some(StyleInput::List(vec![StyleInput::Raw(expected)]))
    );

    binding.unmount(&mut graph).unwrap();
    assert_eq!(graph.len(), 2);
    assert!(graph.children(a).unwrap().is_empty());
    assert!(graph.children(b).unwrap().is_empty());
}

#[test]
fn test_native_props_are_left_to_the_driver() {
    let mut graph = AnimatedGraph::new();
    let progress = graph.value(0.3);
    let spec = AnimatedPropsSpec::new().with("progress", progress);
    let binding = AnimatedPropsBinding::new(&mut graph, spec).unwrap();
    assert!(binding.reduced(&graph).unwrap().props.contains_key("progress"));

    graph.make_native(progress).unwrap();
    assert!(!binding.reduced(&graph).unwrap().props.contains_key("progress"));
}

#[test]
fn test_js_event_dispatch() {
    let mut graph = AnimatedGraph::new();
    let scroll = graph.value(0.0);
    let event = AnimatedEvent::new().map("nativeEvent.contentOffset.y", scroll);
    let spec = AnimatedPropsSpec::new().with("onScroll", event.clone());
    let binding = AnimatedPropsBinding::new(&mut graph, spec).unwrap();

    let reduced = binding.reduced(&graph).unwrap();
    let Some(ReducedProp::Handler(handler)) = reduced.props.get("onScroll") else {
        panic!("expected an event handler");
    };
    assert_eq!(handler, &event);

    handler
        .dispatch(&mut graph, |path| {
            (path == "nativeEvent.contentOffset.y").then_some(42.0)
        })
        .unwrap();
    assert_eq!(graph.number(scroll).unwrap(), 42.0);
}

#[test]
fn test_native_event_attaches_to_view() {
    let mut graph = AnimatedGraph::new();
    let scroll = graph.value(0.0);
    let event = AnimatedEvent::new()
        .map("nativeEvent.contentOffset.y", scroll)
        .use_native_driver();
    let spec = AnimatedPropsSpec::new().with("onScroll", event);
    let mut binding = AnimatedPropsBinding::new(&mut graph, spec).unwrap();
    assert!(!binding.reduced(&graph).unwrap().props.contains_key("onScroll"));

    binding.set_instance(&mut graph, &View(3)).unwrap();
    let tag = graph.native_tag(scroll).unwrap();
    let ops = graph.take_native_ops();
    assert!(ops.contains(&NativeOp::AddEventToView {
        view: 3,
        event: "onScroll".to_string(),
        mapping: vec![EventMapping {
            native_event_path: vec![
                "nativeEvent".to_string(),
                "contentOffset".to_string(),
                "y".to_string()
            ],
            animated_value_tag: tag,
        }],
    }));

    binding.clear_instance(&mut graph).unwrap();
    assert_eq!(
        graph.take_native_ops(),
        vec![NativeOp::RemoveEventFromView {
            view: 3,
            event: "onScroll".to_string(),
            tag
        }]
    );
}

#[test]
fn test_animated_transform_in_style() {
    let mut graph = AnimatedGraph::new();
    let angle = graph.value(0.0);
    let rotate = graph
        .interpolate(angle, InterpolationConfig::new(vec![0.0, 1.0], vec!["0deg", "360deg"]))
        .unwrap();
    let spec = AnimatedPropsSpec::new().with(
        "style",
        AnimatedStyle::new().with(
            "transform",
            StyleLeaf::Transform(vec![
                ("rotate".to_string(), TransformLeaf::Node(rotate)),
                ("scale".to_string(), TransformLeaf::Static(TransformArg::Number(2.0))),
            ]),
        ),
    );
    let binding = AnimatedPropsBinding::new(&mut graph, spec).unwrap();

    graph.set_value(angle, 0.25).unwrap();
    let reduced = binding.reduced(&graph).unwrap();
    let expected = crate::Style::new().with(
        "transform",
        vec![
            TransformEntry::new("rotate", "90deg"),
            TransformEntry::new("scale", 2.0),
        ],
    );
    assert_eq!(
        reduced.style,
        Some(StyleInput::List(vec![StyleInput::Raw(expected)]))
    );
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_diff_clamp_stays_in_bounds(values in prop::collection::vec(-1000.0f64..1000.0, 1..30)) {
        let mut graph = AnimatedGraph::new();
        let v = graph.value(0.0);
        let clamped = graph.diff_clamp(v, -10.0, 10.0).unwrap();
        for x in values {
            graph.set_value(v, x).unwrap();
            let out = graph.number(clamped).unwrap();
            prop_assert!((-10.0..=10.0).contains(&out));
        }
    }

    #[test]
    fn prop_clamped_interpolation_stays_in_output_range(
        input in -1e6f64..1e6,
        a in -100.0f64..100.0,
        b in -100.0f64..100.0,
    ) {
        let interpolator = Interpolator::new(
            InterpolationConfig::new(vec![0.0, 1.0], vec![a, b]).extrapolate(Extrapolate::Clamp),
        )
        .unwrap();
        let out = interpolator.apply(input).as_number().unwrap();
        prop_assert!(out >= a.min(b) - 1e-9 && out <= a.max(b) + 1e-9);
    }

    #[test]
    fn prop_removing_last_listener_releases_chain(depth in 1usize..8) {
        let mut graph = AnimatedGraph::new();
        let root = graph.value(0.0);
        let mut chain = vec![root];
        for _ in 0..depth {
            let last = *chain.last().unwrap();
            chain.push(graph.add(last, 1).unwrap());
        }
        let leaf = *chain.last().unwrap();
        let listener = graph.add_listener(leaf, |_| {}).unwrap();
        graph.remove_listener(leaf, listener).unwrap();
        for id in chain {
            prop_assert_eq!(graph.state(id).unwrap(), NodeState::Unattached);
            prop_assert!(graph.children(id).unwrap().is_empty());
        }
    }
}
