//! Animated component props.
//!
//! A component describes its props as an [`AnimatedPropsSpec`]: a mix of
//! static values, animated nodes, a layered animated style and event
//! mappings. The graph wraps the spec in a props node whose value is the
//! [`ReducedProps`] snapshot a host renders. [`AnimatedPropsBinding`] ties a
//! props node to a component's lifecycle.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use super::graph::AnimatedGraph;
use super::native::{EventMapping, NativeOp};
use super::node::{NodeId, NodeValue, TransformLeaf};
use crate::error::Result;
use crate::style::{Style, StyleInput, StyleRef, StyleValue};

/// One prop of an animated component.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Static(StyleValue),
    Node(NodeId),
    Style(AnimatedStyle),
    Event(AnimatedEvent),
}

impl From<NodeId> for PropValue {
    fn from(id: NodeId) -> Self {
        PropValue::Node(id)
    }
}

impl From<AnimatedStyle> for PropValue {
    fn from(style: AnimatedStyle) -> Self {
        PropValue::Style(style)
    }
}

impl From<AnimatedEvent> for PropValue {
    fn from(event: AnimatedEvent) -> Self {
        PropValue::Event(event)
    }
}

impl From<StyleValue> for PropValue {
    fn from(value: StyleValue) -> Self {
        PropValue::Static(value)
    }
}

/// A leaf of an animated style layer.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleLeaf {
    Static(StyleValue),
    Node(NodeId),
    Transform(Vec<(String, TransformLeaf)>),
}

impl From<NodeId> for StyleLeaf {
    fn from(id: NodeId) -> Self {
        StyleLeaf::Node(id)
    }
}

impl From<StyleValue> for StyleLeaf {
    fn from(value: StyleValue) -> Self {
        StyleLeaf::Static(value)
    }
}

impl From<f64> for StyleLeaf {
    fn from(value: f64) -> Self {
        StyleLeaf::Static(value.into())
    }
}

impl From<i32> for StyleLeaf {
    fn from(value: i32) -> Self {
        StyleLeaf::Static(value.into())
    }
}

impl From<&str> for StyleLeaf {
    fn from(value: &str) -> Self {
        StyleLeaf::Static(value.into())
    }
}

/// One layer of an animated style, in override order.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleLayer {
    Compiled(StyleRef),
    Animated(IndexMap<String, StyleLeaf>),
}

/// A style array whose entries may hold animated values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimatedStyle {
    layers: Vec<StyleLayer>,
}

impl AnimatedStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a registered style layer.
    pub fn compiled(mut self, handle: StyleRef) -> Self {
        self.layers.push(StyleLayer::Compiled(handle));
        self
    }

    /// Set a key in the trailing animated layer, starting one if needed.
    pub fn with(mut self, key: impl Into<String>, leaf: impl Into<StyleLeaf>) -> Self {
        if !matches!(self.layers.last(), Some(StyleLayer::Animated(_))) {
            self.layers.push(StyleLayer::Animated(IndexMap::new()));
        }
        if let Some(StyleLayer::Animated(map)) = self.layers.last_mut() {
            map.insert(key.into(), leaf.into());
        }
        self
    }

    pub fn layers(&self) -> &[StyleLayer] {
        &self.layers
    }

    fn leaves_mut(&mut self) -> impl Iterator<Item = &mut StyleLeaf> {
        self.layers
            .iter_mut()
            .filter_map(|layer| match layer {
                StyleLayer::Animated(map) => Some(map.values_mut()),
                StyleLayer::Compiled(_) => None,
            })
            .flatten()
    }
}

/// Maps event payload paths onto value nodes.
///
/// JS-driven events surface as a handler prop the host calls with
/// [`dispatch`](Self::dispatch); native events are registered with the
/// driver once the component has a view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimatedEvent {
    mappings: Vec<(String, NodeId)>,
    native: bool,
}

impl AnimatedEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a dotted payload path such as `nativeEvent.contentOffset.y`.
    pub fn map(mut self, path: impl Into<String>, node: NodeId) -> Self {
        self.mappings.push((path.into(), node));
        self
    }

    pub fn use_native_driver(mut self) -> Self {
        self.native = true;
        self
    }

    pub fn is_native(&self) -> bool {
        self.native
    }

    pub fn mappings(&self) -> &[(String, NodeId)] {
        &self.mappings
    }

    /// Write every mapped payload value into its node.
    pub fn dispatch(
        &self,
        graph: &mut AnimatedGraph,
        lookup: impl Fn(&str) -> Option<f64>,
    ) -> Result<()> {
        for (path, node) in &self.mappings {
            if let Some(value) = lookup(path) {
                graph.set_value(*node, value)?;
            }
        }
        Ok(())
    }

    pub(crate) fn attach_to_view(&self, graph: &mut AnimatedGraph, view: u32, event: &str) -> Result<()> {
        let mut mapping = Vec::with_capacity(self.mappings.len());
        for (path, node) in &self.mappings {
            graph.make_native(*node)?;
            mapping.push(EventMapping {
                native_event_path: path.split('.').map(str::to_string).collect(),
                animated_value_tag: graph.native_tag(*node)?,
            });
        }
        graph.queue_native(NativeOp::AddEventToView {
            view,
            event: event.to_string(),
            mapping,
        });
        Ok(())
    }

    pub(crate) fn detach_from_view(&self, graph: &mut AnimatedGraph, view: u32, event: &str) -> Result<()> {
        for (_, node) in &self.mappings {
            let tag = graph.native_tag(*node)?;
            graph.queue_native(NativeOp::RemoveEventFromView {
                view,
                event: event.to_string(),
                tag,
            });
        }
        Ok(())
    }
}

/// Props of an animated component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimatedPropsSpec {
    props: IndexMap<String, PropValue>,
}

impl AnimatedPropsSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn native_events(&self) -> impl Iterator<Item = (&str, &AnimatedEvent)> {
        self.iter().filter_map(|(name, value)| match value {
            PropValue::Event(event) if event.is_native() => Some((name, event)),
            _ => None,
        })
    }
}

/// A props spec whose style transforms have been lowered to transform nodes.
pub(crate) type PropsSpec = AnimatedPropsSpec;

impl PropsSpec {
    /// Nodes a props node reads from.
    pub(crate) fn nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for value in self.props.values() {
            match value {
                PropValue::Node(id) => out.push(*id),
                PropValue::Style(style) => {
                    for layer in &style.layers {
                        if let StyleLayer::Animated(map) = layer {
                            for leaf in map.values() {
                                match leaf {
                                    StyleLeaf::Node(id) => out.push(*id),
                                    StyleLeaf::Transform(entries) => {
                                        out.extend(entries.iter().filter_map(|(_, t)| match t {
                                            TransformLeaf::Node(id) => Some(*id),
                                            TransformLeaf::Static(_) => None,
                                        }))
                                    }
                                    StyleLeaf::Static(_) => {}
                                }
                            }
                        }
                    }
                }
                PropValue::Static(_) | PropValue::Event(_) => {}
            }
        }
        out
    }

    /// Replace animated transform lists with transform nodes.
    pub(crate) fn lower_transforms(
        mut self,
        mut make_transform: impl FnMut(Vec<(String, TransformLeaf)>) -> Result<NodeId>,
    ) -> Result<Self> {
        for value in self.props.values_mut() {
            if let PropValue::Style(style) = value {
                for leaf in style.leaves_mut() {
                    if let StyleLeaf::Transform(entries) = leaf
                        && entries.iter().any(|(_, t)| matches!(t, TransformLeaf::Node(_)))
                    {
                        let id = make_transform(std::mem::take(entries))?;
                        *leaf = StyleLeaf::Node(id);
                    }
                }
            }
        }
        Ok(self)
    }

    /// Style key and node for every animated style leaf.
    pub(crate) fn style_nodes(&self) -> impl Iterator<Item = (String, NodeId)> + '_ {
        self.props
            .values()
            .filter_map(|value| match value {
                PropValue::Style(style) => Some(style.layers.iter()),
                _ => None,
            })
            .flatten()
            .filter_map(|layer| match layer {
                StyleLayer::Animated(map) => Some(map.iter()),
                StyleLayer::Compiled(_) => None,
            })
            .flatten()
            .filter_map(|(key, leaf)| match leaf {
                StyleLeaf::Node(id) => Some((key.clone(), *id)),
                _ => None,
            })
    }

    /// Prop name and node for every plain animated prop.
    pub(crate) fn node_props(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.iter().filter_map(|(name, value)| match value {
            PropValue::Node(id) => Some((name, *id)),
            _ => None,
        })
    }
}

/// A reduced prop value.
#[derive(Debug, Clone, PartialEq)]
pub enum ReducedProp {
    Value(StyleValue),
    /// A JS-driven event; the host calls [`AnimatedEvent::dispatch`].
    Handler(AnimatedEvent),
}

/// Snapshot of a component's props with every animated value read out.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedProps {
    pub props: IndexMap<String, ReducedProp>,
    pub style: Option<StyleInput>,
    /// Always `false`: an animated view must keep its own host node.
    pub collapsable: bool,
}

impl Default for ReducedProps {
    fn default() -> Self {
        Self {
            props: IndexMap::new(),
            style: None,
            collapsable: false,
        }
    }
}

pub(crate) fn node_to_style_value(value: NodeValue) -> StyleValue {
    match value {
        NodeValue::Number(n) => StyleValue::Number(n),
        NodeValue::String(s) => StyleValue::String(s),
        NodeValue::Transform(entries) => StyleValue::Transform(entries),
        NodeValue::Props(_) => StyleValue::Null,
    }
}

/// Read every value of a props spec.
///
/// Plain props driven by native nodes are omitted: the driver writes them to
/// the view directly. Style values are always read.
pub(crate) fn reduce(graph: &AnimatedGraph, spec: &PropsSpec) -> Result<ReducedProps> {
    let mut reduced = ReducedProps::default();
    for (name, value) in spec.iter() {
        match value {
            PropValue::Static(v) => {
                reduced
                    .props
                    .insert(name.to_string(), ReducedProp::Value(v.clone()));
            }
            PropValue::Node(id) => {
                if graph.is_native(*id)? {
                    continue;
                }
                let v = node_to_style_value(graph.get_value(*id)?);
                reduced.props.insert(name.to_string(), ReducedProp::Value(v));
            }
            PropValue::Event(event) => {
                if !event.is_native() {
                    reduced
                        .props
                        .insert(name.to_string(), ReducedProp::Handler(event.clone()));
                }
            }
            PropValue::Style(style) => {
                let mut layers = Vec::with_capacity(style.layers.len());
                for layer in &style.layers {
                    match layer {
                        StyleLayer::Compiled(handle) => layers.push(StyleInput::Compiled(*handle)),
                        StyleLayer::Animated(map) => {
                            let mut raw = Style::new();
                            for (key, leaf) in map {
                                let v = match leaf {
                                    StyleLeaf::Static(v) => v.clone(),
                                    StyleLeaf::Node(id) => node_to_style_value(graph.get_value(*id)?),
                                    StyleLeaf::Transform(entries) => {
                                        StyleValue::Transform(graph.transform_entries(entries)?)
                                    }
                                };
                                raw.set(key.clone(), v);
                            }
                            layers.push(StyleInput::Raw(raw));
                        }
                    }
                }
                reduced.style = Some(StyleInput::List(layers));
            }
        }
    }
    Ok(reduced)
}

/// A host view an animated component renders into.
pub trait HostInstance {
    /// Tag the native driver addresses this view by.
    fn view_tag(&self) -> u32;
}

/// Props node lifecycle for one mounted component.
///
/// Each distinct props spec gets its own props node. The new node is
/// attached before the previous one restores its defaults and is detached,
/// so animated values never briefly drop to zero listeners.
pub struct AnimatedPropsBinding {
    spec: AnimatedPropsSpec,
    node: NodeId,
    on_update: Rc<RefCell<Option<Rc<dyn Fn()>>>>,
    needs_update: Rc<Cell<bool>>,
    view: Option<u32>,
}

impl AnimatedPropsBinding {
    pub fn new(graph: &mut AnimatedGraph, spec: AnimatedPropsSpec) -> Result<Self> {
        let on_update: Rc<RefCell<Option<Rc<dyn Fn()>>>> = Rc::new(RefCell::new(None));
        let node = Self::create_node(graph, spec.clone(), &on_update)?;
        graph.retain(node)?;
        Ok(Self {
            spec,
            node,
            on_update,
            needs_update: Rc::new(Cell::new(false)),
            view: None,
        })
    }

    fn create_node(
        graph: &mut AnimatedGraph,
        spec: AnimatedPropsSpec,
        on_update: &Rc<RefCell<Option<Rc<dyn Fn()>>>>,
    ) -> Result<NodeId> {
        let hook = Rc::clone(on_update);
        graph.props(
            spec,
            Rc::new(move || {
                let callback = hook.borrow().clone();
                if let Some(callback) = callback {
                    callback();
                }
            }),
        )
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn spec(&self) -> &AnimatedPropsSpec {
        &self.spec
    }

    /// Swap in a new props spec. An equal spec keeps the current node.
    pub fn update(&mut self, graph: &mut AnimatedGraph, spec: AnimatedPropsSpec) -> Result<()> {
        if spec == self.spec {
            return Ok(());
        }

        let next = Self::create_node(graph, spec.clone(), &self.on_update)?;
        graph.retain(next)?;

        let view = self.view;
        if let Some(view) = view {
            self.detach_events(graph, view)?;
        }

        let previous = std::mem::replace(&mut self.node, next);
        self.spec = spec;
        if let Some(view) = view {
            graph.set_native_view(next, view)?;
            self.attach_events(graph, view)?;
        }

        graph.restore_default_values(previous)?;
        graph.dispose(previous)
    }

    /// Current props snapshot.
    pub fn reduced(&self, graph: &AnimatedGraph) -> Result<ReducedProps> {
        graph.reduce_props(self.node)
    }

    /// Connect the component's host view; animated updates then schedule a
    /// re-render and native events are registered with the driver.
    pub fn set_instance(&mut self, graph: &mut AnimatedGraph, instance: &dyn HostInstance) -> Result<()> {
        self.clear_instance(graph)?;

        let view = instance.view_tag();
        self.view = Some(view);
        graph.set_native_view(self.node, view)?;

        let flag = Rc::clone(&self.needs_update);
        *self.on_update.borrow_mut() = Some(Rc::new(move || flag.set(true)));

        self.attach_events(graph, view)
    }

    /// Undo [`set_instance`](Self::set_instance).
    pub fn clear_instance(&mut self, graph: &mut AnimatedGraph) -> Result<()> {
        if let Some(view) = self.view.take() {
            *self.on_update.borrow_mut() = None;
            self.detach_events(graph, view)?;
        }
        Ok(())
    }

    /// Whether an animated update asked for a re-render since the last call.
    pub fn take_needs_update(&self) -> bool {
        self.needs_update.replace(false)
    }

    /// Tear down without restoring defaults; the view is going away.
    pub fn unmount(mut self, graph: &mut AnimatedGraph) -> Result<()> {
        self.clear_instance(graph)?;
        graph.dispose(self.node)
    }

    fn attach_events(&self, graph: &mut AnimatedGraph, view: u32) -> Result<()> {
        for (name, event) in self.spec.native_events() {
            event.attach_to_view(graph, view, name)?;
        }
        Ok(())
    }

    fn detach_events(&self, graph: &mut AnimatedGraph, view: u32) -> Result<()> {
        for (name, event) in self.spec.native_events() {
            event.detach_from_view(graph, view, name)?;
        }
        Ok(())
    }
}
