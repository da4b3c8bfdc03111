//! Animated graph tests through the public API: values driving styles,
//! animations stepping over time, and components bound to props nodes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use strata::animated::{
    AnimatedGraph, AnimatedPropsBinding, AnimatedPropsSpec, AnimatedStyle, Easing, Extrapolate,
    HostInstance, InterpolationConfig, NativeOp, NodeState, NodeValue, SpringAnimation,
    SpringConfig, TimingAnimation, TimingConfig,
};
use strata::style::{StyleContext, StyleOptions};
use strata::{Error, style};

struct View(u32);

impl HostInstance for View {
    fn view_tag(&self) -> u32 {
        self.0
    }
}

// ============================================================================
// Values over time
// ============================================================================

#[test]
fn test_timing_drives_interpolated_color() {
    let mut graph = AnimatedGraph::new();
    let progress = graph.value(0.0);
    let color = graph
        .interpolate(
            progress,
            InterpolationConfig::new(vec![0.0, 1.0], vec!["#000000", "#ffffff"])
                .extrapolate(Extrapolate::Clamp),
        )
        .unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    graph
        .add_listener(color, move |value| {
            if let Some(s) = value.as_str() {
                sink.borrow_mut().push(s.to_string());
            }
        })
        .unwrap();

    let finished = Rc::new(Cell::new(None));
    let flag = Rc::clone(&finished);
    graph
        .animate(
            progress,
            Box::new(TimingAnimation::new(TimingConfig {
                to_value: 1.0,
                duration_ms: 100.0,
                easing: Easing::Linear,
                ..TimingConfig::default()
            })),
            Some(Rc::new(move |done: bool| flag.set(Some(done)))),
        )
        .unwrap();

    assert_eq!(graph.tick(0.0).unwrap(), 1);
    assert_eq!(graph.tick(50.0).unwrap(), 1);
    assert_eq!(graph.tick(100.0).unwrap(), 0);
    assert_eq!(finished.get(), Some(true));

    let seen = seen.borrow();
    assert_eq!(seen.first().map(String::as_str), Some("rgba(0, 0, 0, 1)"));
    assert_eq!(seen.last().map(String::as_str), Some("rgba(255, 255, 255, 1)"));
    assert_eq!(
        graph.get_value(color).unwrap(),
        NodeValue::String("rgba(255, 255, 255, 1)".to_string())
    );
}

#[test]
fn test_spring_settles_on_target() {
    let mut graph = AnimatedGraph::new();
    let x = graph.value(0.0);
    graph
        .animate(
            x,
            Box::new(SpringAnimation::new(SpringConfig {
                to_value: 10.0,
                ..SpringConfig::default()
            })
            .unwrap()),
            None,
        )
        .unwrap();

    graph.tick(0.0).unwrap();
    graph.tick(16.0).unwrap();
    assert!(graph.is_animating(x).unwrap());
    let early = graph.number(x).unwrap();
    assert!(early > 0.0 && early < 10.0);

    assert_eq!(graph.tick(10_000.0).unwrap(), 0);
    assert_eq!(graph.number(x).unwrap(), 10.0);
}

#[test]
fn test_new_animation_interrupts_running_one() {
    let mut graph = AnimatedGraph::new();
    let x = graph.value(0.0);
    let outcome = Rc::new(Cell::new(None));
    let flag = Rc::clone(&outcome);
    graph
        .animate(
            x,
            Box::new(TimingAnimation::new(TimingConfig {
                to_value: 1.0,
                ..TimingConfig::default()
            })),
            Some(Rc::new(move |done: bool| flag.set(Some(done)))),
        )
        .unwrap();
    graph.tick(0.0).unwrap();

    graph
        .animate(
            x,
            Box::new(TimingAnimation::new(TimingConfig::default())),
            None,
        )
        .unwrap();
    assert_eq!(outcome.get(), Some(false));
}

// ============================================================================
// Components
// ============================================================================

#[test]
fn test_bound_component_resolves_with_compiled_styles() {
    let mut context = StyleContext::default();
    let base = context.register(style! { "backgroundColor" => "red", "opacity" => 1 });

    let mut graph = AnimatedGraph::new();
    let fade = graph.value(0.25);
    let spec = AnimatedPropsSpec::new().with(
        "style",
        AnimatedStyle::new().compiled(base).with("opacity", fade),
    );
    let mut binding = AnimatedPropsBinding::new(&mut graph, spec).unwrap();
    binding.set_instance(&mut graph, &View(7)).unwrap();

    graph.set_value(fade, 0.75).unwrap();
    assert!(binding.take_needs_update());
    assert!(!binding.take_needs_update());

    let reduced = binding.reduced(&graph).unwrap();
    assert!(!reduced.collapsable);
    let style = reduced.style.expect("style prop should reduce to a style input");
    let resolved = context.resolve(&style, &StyleOptions::default());
    assert_eq!(resolved.classes().count(), 1);
    assert_eq!(
        resolved.inline.as_ref().and_then(|i| i.get("opacity")),
        Some("0.75")
    );

    let node = binding.node();
    binding.unmount(&mut graph).unwrap();
    assert_eq!(graph.state(node).unwrap(), NodeState::Detached);
    assert_eq!(graph.state(fade).unwrap(), NodeState::Unattached);
}

#[test]
fn test_native_component_records_driver_commands() {
    let mut graph = AnimatedGraph::new();
    let fade = graph.value(0.0);
    let spec = AnimatedPropsSpec::new().with("opacity", fade);
    let mut binding = AnimatedPropsBinding::new(&mut graph, spec).unwrap();
    graph.make_native(binding.node()).unwrap();
    binding.set_instance(&mut graph, &View(3)).unwrap();

    let ops = graph.take_native_ops();
    assert!(ops.iter().any(|op| matches!(op, NativeOp::CreateNode { .. })));
    assert!(ops.iter().any(|op| matches!(op, NativeOp::ConnectNodes { .. })));
    assert!(ops.iter().any(|op| matches!(op, NativeOp::ConnectToView { view: 3, .. })));

    // The driver owns the prop now; it is not part of the JS snapshot.
    assert!(binding.reduced(&graph).unwrap().props.is_empty());

    let tag = graph.native_tag(fade).unwrap();
    graph.receive_native_value(tag, 0.4).unwrap();
    assert_eq!(graph.number(fade).unwrap(), 0.4);

    binding.unmount(&mut graph).unwrap();
    let ops = graph.take_native_ops();
    assert!(ops.iter().any(|op| matches!(op, NativeOp::DisconnectFromView { view: 3, .. })));
    assert!(ops.iter().any(|op| matches!(op, NativeOp::DropNode { .. })));
}

#[test]
fn test_detached_node_rejects_use() {
    let mut graph = AnimatedGraph::new();
    let x = graph.value(1.0);
    graph.dispose(x).unwrap();
    assert!(matches!(graph.set_value(x, 2.0), Err(Error::NodeDetached(_))));
}
