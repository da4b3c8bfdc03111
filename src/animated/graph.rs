//! Arena-backed animated node graph.
//!
//! Nodes live in a slot `Vec` and refer to each other by [`NodeId`].
//! Disposing a node frees its slot for reuse; the slot's generation moves on
//! so the old id keeps failing with [`Error::NodeDetached`]. Edges run
//! both ways: every node knows its operands through its [`NodeKind`], and an
//! attached node is listed among its operands' children. A node attaches the
//! first time it gains a child, a listener or an explicit retain, and detaches
//! (releasing its upstream links) when the last of those goes away.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::animation::{Animation, EndCallback};
use super::interpolation::{InterpolationConfig, Interpolator};
use super::native::{NativeNodeConfig, NativeOp, NativeQueue, NativeTransform};
use super::node::{
    AnimationFactory, ListenerId, Node, NodeId, NodeKind, NodeState, NodeValue, Operand,
    RunningAnimation, TransformLeaf,
};
use super::props::{self, AnimatedPropsSpec, ReducedProps};
use crate::error::{Error, Result};
use crate::style::{TransformArg, TransformEntry};

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Owner of every animated node.
#[derive(Debug, Default)]
pub struct AnimatedGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    next_listener: u64,
    native: NativeQueue,
    tags: HashMap<u32, NodeId>,
}

impl AnimatedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes that have not been disposed.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots allocated so far, free ones included.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    fn push(&mut self, kind: NodeKind) -> NodeId {
        log::trace!("created {} node", kind.name());
        let node = Some(Node::new(kind));
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = node;
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node,
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn operand(&mut self, operand: Operand) -> Result<NodeId> {
        match operand {
            Operand::Node(id) => {
                self.live(id)?;
                Ok(id)
            }
            Operand::Const(value) => Ok(self.value(value)),
        }
    }

    /// A plain numeric value.
    pub fn value(&mut self, value: f64) -> NodeId {
        self.push(NodeKind::Value {
            value,
            offset: 0.0,
            starting: value,
            animation: None,
            tracking: None,
        })
    }

    pub fn add(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Result<NodeId> {
        let a = self.operand(a.into())?;
        let b = self.operand(b.into())?;
        Ok(self.push(NodeKind::Addition(a, b)))
    }

    pub fn subtract(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Result<NodeId> {
        let a = self.operand(a.into())?;
        let b = self.operand(b.into())?;
        Ok(self.push(NodeKind::Subtraction(a, b)))
    }

    pub fn multiply(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Result<NodeId> {
        let a = self.operand(a.into())?;
        let b = self.operand(b.into())?;
        Ok(self.push(NodeKind::Multiplication(a, b)))
    }

    /// `a / b`. Reading it while `b` is zero yields 0.
    pub fn divide(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Result<NodeId> {
        let a = self.operand(a.into())?;
        let b = self.operand(b.into())?;
        if self.get_value(b)?.as_number() == Some(0.0) {
            log::error!("Detected potential division by zero in AnimatedDivision");
        }
        Ok(self.push(NodeKind::Division {
            a,
            b,
            warned: Default::default(),
        }))
    }

    /// Non-negative remainder of `a` by `modulus`.
    pub fn modulo(&mut self, a: impl Into<Operand>, modulus: f64) -> Result<NodeId> {
        let a = self.operand(a.into())?;
        Ok(self.push(NodeKind::Modulo { a, modulus }))
    }

    /// Accumulates changes of `a`, clamping the running total into `[min, max]`.
    pub fn diff_clamp(&mut self, a: impl Into<Operand>, min: f64, max: f64) -> Result<NodeId> {
        let a = self.operand(a.into())?;
        let start = self.number(a)?;
        Ok(self.push(NodeKind::DiffClamp {
            a,
            min,
            max,
            value: start.into(),
            last_value: start.into(),
        }))
    }

    pub fn interpolate(&mut self, parent: NodeId, config: InterpolationConfig) -> Result<NodeId> {
        self.live(parent)?;
        let interpolator = Interpolator::new(config)?;
        Ok(self.push(NodeKind::Interpolation {
            parent,
            interpolator,
        }))
    }

    /// An ordered transform list with animated entries.
    pub fn transform(&mut self, entries: Vec<(String, TransformLeaf)>) -> Result<NodeId> {
        for (_, leaf) in &entries {
            if let TransformLeaf::Node(id) = leaf {
                self.live(*id)?;
            }
        }
        Ok(self.push(NodeKind::Transform(entries)))
    }

    /// Make `value` follow `target`: whenever the target changes, an
    /// animation built by `factory` runs `value` toward the target's value.
    pub fn track(
        &mut self,
        value: NodeId,
        target: NodeId,
        factory: AnimationFactory,
        callback: Option<EndCallback>,
    ) -> Result<NodeId> {
        self.expect_value(value)?;
        self.live(target)?;

        let id = self.push(NodeKind::Tracking {
            value,
            parent: target,
            factory,
            callback,
        });
        self.retain(id)?;

        self.stop_tracking(value)?;
        if let NodeKind::Value { tracking, .. } = &mut self.node_mut(value)?.kind {
            *tracking = Some(id);
        }
        self.update_tracking(id)?;
        Ok(id)
    }

    /// A props node. `update` runs whenever an upstream value changes.
    pub fn props(&mut self, spec: AnimatedPropsSpec, update: Rc<dyn Fn()>) -> Result<NodeId> {
        for id in spec.nodes() {
            self.live(id)?;
        }
        let mut lowered = Vec::new();
        let spec = spec.lower_transforms(|entries| {
            let id = self.transform(entries)?;
            lowered.push(id);
            Ok(id)
        })?;
        Ok(self.push(NodeKind::Props {
            spec,
            update,
            view: None,
            lowered,
        }))
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    fn node(&self, id: NodeId) -> Result<&Node> {
        let slot = self
            .slots
            .get(id.index as usize)
            .ok_or(Error::UnknownNode(id.index))?;
        match &slot.node {
            Some(node) if slot.generation == id.generation => Ok(node),
            _ => Err(Error::NodeDetached(id.index)),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .ok_or(Error::UnknownNode(id.index))?;
        match &mut slot.node {
            Some(node) if slot.generation == id.generation => Ok(node),
            _ => Err(Error::NodeDetached(id.index)),
        }
    }

    /// Whether `id` names a node that was disposed.
    fn is_disposed(&self, id: NodeId) -> Result<bool> {
        match self.node(id) {
            Ok(node) => Ok(node.state == NodeState::Detached),
            Err(Error::NodeDetached(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    fn live(&self, id: NodeId) -> Result<&Node> {
        let node = self.node(id)?;
        if node.state == NodeState::Detached {
            return Err(Error::NodeDetached(id.index));
        }
        Ok(node)
    }

    fn live_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        let node = self.node_mut(id)?;
        if node.state == NodeState::Detached {
            return Err(Error::NodeDetached(id.index));
        }
        Ok(node)
    }

    fn expect_value(&self, id: NodeId) -> Result<()> {
        match self.live(id)?.kind {
            NodeKind::Value { .. } => Ok(()),
            _ => Err(Error::WrongNodeKind {
                id: id.index,
                expected: "value",
            }),
        }
    }

    pub fn state(&self, id: NodeId) -> Result<NodeState> {
        if self.is_disposed(id)? {
            return Ok(NodeState::Detached);
        }
        Ok(self.node(id)?.state)
    }

    pub fn is_native(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.native)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    pub fn listener_count(&self, id: NodeId) -> Result<usize> {
        Ok(self.node(id)?.listeners.len())
    }

    pub fn kind_name(&self, id: NodeId) -> Result<&'static str> {
        Ok(self.node(id)?.kind.name())
    }

    pub fn is_animating(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.is_animating())
    }

    #[cfg(test)]
    pub(crate) fn division_warned(&self, id: NodeId) -> Option<bool> {
        match &self.node(id).ok()?.kind {
            NodeKind::Division { warned, .. } => Some(warned.get()),
            _ => None,
        }
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Current value of a node, computed from its operands.
    pub fn get_value(&self, id: NodeId) -> Result<NodeValue> {
        let node = self.live(id)?;
        let value = match &node.kind {
            NodeKind::Value { value, offset, .. } => NodeValue::Number(value + offset),
            NodeKind::Addition(a, b) => NodeValue::Number(self.number(*a)? + self.number(*b)?),
            NodeKind::Subtraction(a, b) => NodeValue::Number(self.number(*a)? - self.number(*b)?),
            NodeKind::Multiplication(a, b) => {
                NodeValue::Number(self.number(*a)? * self.number(*b)?)
            }
            NodeKind::Division { a, b, warned } => {
                let a = self.number(*a)?;
                let b = self.number(*b)?;
                if b == 0.0 {
                    if !warned.replace(true) {
                        log::error!("Detected division by zero in AnimatedDivision");
                    }
                    NodeValue::Number(0.0)
                } else {
                    warned.set(false);
                    NodeValue::Number(a / b)
                }
            }
            NodeKind::Modulo { a, modulus } => {
                let a = self.number(*a)?;
                NodeValue::Number((a % modulus + modulus) % modulus)
            }
            NodeKind::DiffClamp {
                a,
                min,
                max,
                value,
                last_value,
            } => {
                let a = self.number(*a)?;
                let diff = a - last_value.replace(a);
                let next = (value.get() + diff).max(*min).min(*max);
                value.set(next);
                NodeValue::Number(next)
            }
            NodeKind::Interpolation {
                parent,
                interpolator,
            } => interpolator.apply(self.number(*parent)?),
            NodeKind::Transform(entries) => NodeValue::Transform(self.transform_entries(entries)?),
            NodeKind::Tracking { parent, .. } => self.get_value(*parent)?,
            NodeKind::Props { spec, .. } => NodeValue::Props(Box::new(props::reduce(self, spec)?)),
        };
        Ok(value)
    }

    /// Current value of a node that must be numeric.
    pub fn number(&self, id: NodeId) -> Result<f64> {
        self.get_value(id)?
            .as_number()
            .ok_or(Error::NonNumericInput(id.index))
    }

    pub(crate) fn transform_entries(
        &self,
        entries: &[(String, TransformLeaf)],
    ) -> Result<Vec<TransformEntry>> {
        entries
            .iter()
            .map(|(name, leaf)| {
                let value = match leaf {
                    TransformLeaf::Static(arg) => arg.clone(),
                    TransformLeaf::Node(id) => match self.get_value(*id)? {
                        NodeValue::Number(n) => TransformArg::Number(n),
                        NodeValue::String(s) => TransformArg::String(s),
                        _ => return Err(Error::NonNumericInput(id.index)),
                    },
                };
                Ok(TransformEntry::new(name.clone(), value))
            })
            .collect()
    }

    pub(crate) fn reduce_props(&self, id: NodeId) -> Result<ReducedProps> {
        match &self.live(id)?.kind {
            NodeKind::Props { spec, .. } => props::reduce(self, spec),
            _ => Err(Error::WrongNodeKind {
                id: id.index,
                expected: "props",
            }),
        }
    }

    // ========================================================================
    // Attachment
    // ========================================================================

    /// Keep a node attached without a child or listener.
    pub fn retain(&mut self, id: NodeId) -> Result<()> {
        let node = self.live_mut(id)?;
        let was = node.ref_count();
        node.retains += 1;
        if was == 0 {
            self.attach(id)?;
        }
        Ok(())
    }

    /// Undo one [`retain`](Self::retain).
    pub fn release(&mut self, id: NodeId) -> Result<()> {
        let node = self.live_mut(id)?;
        if node.retains == 0 {
            log::warn!("Trying to release animated node #{} which is not retained", id.index);
            return Ok(());
        }
        node.retains -= 1;
        if node.ref_count() == 0 {
            self.detach(id)?;
        }
        Ok(())
    }

    /// Detach a node for good. Later use of the id fails with
    /// [`Error::NodeDetached`].
    ///
    /// A props node takes the transform nodes built for its style with it.
    pub fn dispose(&mut self, id: NodeId) -> Result<()> {
        if self.is_disposed(id)? {
            return Ok(());
        }

        let is_value = matches!(self.node(id)?.kind, NodeKind::Value { .. });
        if is_value {
            self.stop_tracking(id)?;
            self.stop_running(id)?;
        }
        if self.node(id)?.state == NodeState::Attached {
            self.detach(id)?;
        }

        let node = self.node_mut(id)?;
        node.listeners.clear();
        node.children.clear();
        node.retains = 0;
        node.state = NodeState::Detached;
        let listening = std::mem::take(&mut node.native_listening);
        let tag = node.native_tag.take();
        if let Some(tag) = tag {
            if listening {
                self.native.push(NativeOp::StopListening { tag });
            }
            self.native.push(NativeOp::DropNode { tag });
            self.tags.remove(&tag);
        }

        let slot = &mut self.slots[id.index as usize];
        let freed = slot.node.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        log::trace!("disposed node #{}", id.index);

        if let Some(Node {
            kind: NodeKind::Props { lowered, .. },
            ..
        }) = freed
        {
            for transform in lowered {
                self.dispose(transform)?;
            }
        }
        Ok(())
    }

    fn attach(&mut self, id: NodeId) -> Result<()> {
        let node = self.live_mut(id)?;
        if node.state == NodeState::Attached {
            return Ok(());
        }
        node.state = NodeState::Attached;
        for operand in node.kind.operands() {
            self.add_child(operand, id)?;
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.state != NodeState::Attached {
            return Ok(());
        }
        node.state = NodeState::Unattached;
        let operands = node.kind.operands();
        let is_value = matches!(node.kind, NodeKind::Value { .. });

        if is_value {
            self.stop_running(id)?;
        }
        for operand in operands {
            self.remove_child(operand, id)?;
        }

        let node = self.node_mut(id)?;
        if node.native {
            let view = match node.kind {
                NodeKind::Props { view, .. } => view,
                _ => None,
            };
            if let Some(tag) = node.native_tag.take() {
                node.native_listening = false;
                if let Some(view) = view {
                    self.native.push(NativeOp::DisconnectFromView { tag, view });
                }
                self.native.push(NativeOp::DropNode { tag });
                self.tags.remove(&tag);
            }
        }
        Ok(())
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let node = self.live_mut(parent)?;
        let was = node.ref_count();
        node.children.push(child);
        if was == 0 {
            self.attach(parent)?;
        }
        if self.node(parent)?.native {
            self.make_native(child)?;
            let parent_tag = self.native_tag(parent)?;
            let child_tag = self.native_tag(child)?;
            self.native.push(NativeOp::ConnectNodes {
                parent: parent_tag,
                child: child_tag,
            });
        }
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.is_disposed(parent)? {
            return Ok(());
        }
        let node = self.node(parent)?;
        let Some(index) = node.children.iter().position(|c| *c == child) else {
            log::warn!("Trying to remove a child that doesn't exist");
            return Ok(());
        };

        let parent_tag = node.native_tag.filter(|_| node.native);
        let child_tag = self.node(child)?.native_tag;
        if let (Some(parent), Some(child)) = (parent_tag, child_tag) {
            self.native.push(NativeOp::DisconnectNodes { parent, child });
        }

        let node = self.node_mut(parent)?;
        node.children.remove(index);
        if node.ref_count() == 0 {
            self.detach(parent)?;
        }
        Ok(())
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Observe a node's value. The listener fires whenever an upstream value
    /// node is set or animated.
    pub fn add_listener(
        &mut self,
        id: NodeId,
        listener: impl Fn(&NodeValue) + 'static,
    ) -> Result<ListenerId> {
        let listener_id = ListenerId(self.next_listener);
        self.next_listener += 1;

        let node = self.live_mut(id)?;
        let was = node.ref_count();
        node.listeners.push((listener_id, Rc::new(listener)));
        if node.native && !node.native_listening {
            node.native_listening = true;
            let tag = self.native_tag(id)?;
            self.native.push(NativeOp::StartListening { tag });
        }
        if was == 0 {
            self.attach(id)?;
        }
        Ok(listener_id)
    }

    /// Returns whether the listener was registered on the node.
    pub fn remove_listener(&mut self, id: NodeId, listener: ListenerId) -> Result<bool> {
        let node = self.live_mut(id)?;
        let before = node.listeners.len();
        node.listeners.retain(|(lid, _)| *lid != listener);
        let removed = node.listeners.len() != before;
        self.after_listener_removal(id)?;
        Ok(removed)
    }

    pub fn remove_all_listeners(&mut self, id: NodeId) -> Result<()> {
        self.live_mut(id)?.listeners.clear();
        self.after_listener_removal(id)
    }

    fn after_listener_removal(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.listeners.is_empty() && node.native_listening {
            node.native_listening = false;
            if let Some(tag) = node.native_tag {
                self.native.push(NativeOp::StopListening { tag });
            }
        }
        let node = self.node(id)?;
        if node.ref_count() == 0 && node.state == NodeState::Attached {
            self.detach(id)?;
        }
        Ok(())
    }

    fn call_listeners(&self, id: NodeId) -> Result<()> {
        let value = self.get_value(id)?;
        self.notify(id, &value)
    }

    /// Hand `value` to the node's listeners, then re-read each observed
    /// child and recurse. Native nodes stop the walk: the driver reports
    /// their descendants itself.
    fn notify(&self, id: NodeId, value: &NodeValue) -> Result<()> {
        let node = self.node(id)?;
        for (_, listener) in &node.listeners {
            listener(value);
        }
        if node.native {
            return Ok(());
        }
        for &child in &node.children {
            let observed = self.node(child)?;
            if observed.listeners.is_empty() && observed.children.is_empty() {
                continue;
            }
            let child_value = self.get_value(child)?;
            self.notify(child, &child_value)?;
        }
        Ok(())
    }

    /// Run the update hook of every props and tracking node downstream of
    /// `id`, without looking past them.
    fn flush(&mut self, id: NodeId) -> Result<()> {
        let mut updates: Vec<Rc<dyn Fn()>> = Vec::new();
        let mut tracking = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let node = self.node(current)?;
            match &node.kind {
                NodeKind::Props { update, .. } => updates.push(Rc::clone(update)),
                NodeKind::Tracking { .. } => tracking.push(current),
                _ => stack.extend(node.children.iter().rev()),
            }
        }

        for update in updates {
            update();
        }
        for id in tracking {
            self.update_tracking(id)?;
        }
        Ok(())
    }

    // ========================================================================
    // Value nodes
    // ========================================================================

    fn value_fields(&mut self, id: NodeId) -> Result<(&mut f64, &mut f64)> {
        match &mut self.live_mut(id)?.kind {
            NodeKind::Value { value, offset, .. } => Ok((value, offset)),
            _ => Err(Error::WrongNodeKind {
                id: id.index,
                expected: "value",
            }),
        }
    }

    fn native_tag_if_native(&mut self, id: NodeId) -> Result<Option<u32>> {
        if self.node(id)?.native {
            Ok(Some(self.native_tag(id)?))
        } else {
            Ok(None)
        }
    }

    /// Set a value directly, stopping any running animation.
    pub fn set_value(&mut self, id: NodeId, value: f64) -> Result<()> {
        self.expect_value(id)?;
        self.stop_running(id)?;
        let native = self.native_tag_if_native(id)?;
        if let Some(tag) = native {
            self.native.push(NativeOp::SetValue { tag, value });
        }
        self.update_value(id, value, native.is_none())
    }

    /// An offset added on top of the value, e.g. where a gesture started.
    pub fn set_offset(&mut self, id: NodeId, offset: f64) -> Result<()> {
        *self.value_fields(id)?.1 = offset;
        if let Some(tag) = self.native_tag_if_native(id)? {
            self.native.push(NativeOp::SetOffset { tag, offset });
        }
        Ok(())
    }

    /// Merge the offset into the value and reset the offset to zero.
    pub fn flatten_offset(&mut self, id: NodeId) -> Result<()> {
        let (value, offset) = self.value_fields(id)?;
        *value += std::mem::take(offset);
        if let Some(tag) = self.native_tag_if_native(id)? {
            self.native.push(NativeOp::FlattenOffset { tag });
        }
        Ok(())
    }

    /// Move the value into the offset and reset the value to zero.
    pub fn extract_offset(&mut self, id: NodeId) -> Result<()> {
        let (value, offset) = self.value_fields(id)?;
        *offset += std::mem::take(value);
        if let Some(tag) = self.native_tag_if_native(id)? {
            self.native.push(NativeOp::ExtractOffset { tag });
        }
        Ok(())
    }

    /// Stop any animation or tracking and return the current value.
    pub fn stop_animation(&mut self, id: NodeId) -> Result<f64> {
        self.expect_value(id)?;
        self.stop_tracking(id)?;
        self.stop_running(id)?;
        self.number(id)
    }

    /// Stop any animation and return to the value the node was created with.
    pub fn reset_animation(&mut self, id: NodeId) -> Result<f64> {
        self.stop_animation(id)?;
        let starting = match &mut self.node_mut(id)?.kind {
            NodeKind::Value {
                value, starting, ..
            } => {
                *value = *starting;
                *starting
            }
            _ => 0.0,
        };
        if let Some(tag) = self.native_tag_if_native(id)? {
            self.native.push(NativeOp::SetValue {
                tag,
                value: starting,
            });
        }
        self.number(id)
    }

    /// Start `animation` on a value node, replacing any running one. The
    /// animation begins on the next [`tick`](Self::tick).
    pub fn animate(
        &mut self,
        id: NodeId,
        animation: Box<dyn Animation>,
        callback: Option<EndCallback>,
    ) -> Result<()> {
        let previous = match &mut self.live_mut(id)?.kind {
            NodeKind::Value { animation: slot, .. } => slot.replace(RunningAnimation {
                animation,
                callback,
                started: false,
            }),
            _ => {
                return Err(Error::WrongNodeKind {
                    id: id.index,
                    expected: "value",
                });
            }
        };
        if let Some(callback) = previous.and_then(|p| p.callback) {
            callback(false);
        }
        Ok(())
    }

    fn stop_running(&mut self, id: NodeId) -> Result<()> {
        let previous = match &mut self.node_mut(id)?.kind {
            NodeKind::Value { animation, .. } => animation.take(),
            _ => None,
        };
        if let Some(callback) = previous.and_then(|p| p.callback) {
            callback(false);
        }
        Ok(())
    }

    fn stop_tracking(&mut self, id: NodeId) -> Result<()> {
        let tracking = match &mut self.node_mut(id)?.kind {
            NodeKind::Value { tracking, .. } => tracking.take(),
            _ => None,
        };
        if let Some(tracking) = tracking {
            self.dispose(tracking)?;
        }
        Ok(())
    }

    fn update_tracking(&mut self, id: NodeId) -> Result<()> {
        let (value, parent, factory, callback) = match &self.live(id)?.kind {
            NodeKind::Tracking {
                value,
                parent,
                factory,
                callback,
            } => (*value, *parent, Rc::clone(factory), callback.clone()),
            _ => return Ok(()),
        };
        let to_value = self.number(parent)?;
        self.animate(value, factory(to_value), callback)
    }

    fn update_value(&mut self, id: NodeId, next: f64, flush: bool) -> Result<()> {
        let (value, _) = self.value_fields(id)?;
        *value = next;
        if flush {
            self.flush(id)?;
        }
        self.call_listeners(id)
    }

    /// Advance every running animation to `now_ms`. Returns how many are
    /// still running afterwards.
    pub fn tick(&mut self, now_ms: f64) -> Result<usize> {
        let running: Vec<NodeId> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.node.as_ref().is_some_and(Node::is_animating))
            .map(|(index, slot)| NodeId {
                index: index as u32,
                generation: slot.generation,
            })
            .collect();

        for id in running {
            let Ok(node) = self.node_mut(id) else {
                continue;
            };
            let frame = match &mut node.kind {
                NodeKind::Value {
                    value,
                    animation: Some(running),
                    ..
                } => {
                    if !running.started {
                        running.animation.start(*value, now_ms);
                        running.started = true;
                    }
                    running.animation.step(now_ms)
                }
                _ => continue,
            };

            self.update_value(id, frame.value, true)?;

            if frame.finished {
                let done = match self.node_mut(id).map(|node| &mut node.kind) {
                    Ok(NodeKind::Value { animation, .. }) => animation.take(),
                    _ => None,
                };
                if let Some(callback) = done.and_then(|d| d.callback) {
                    callback(true);
                }
            }
        }

        Ok(self
            .slots
            .iter()
            .filter_map(|slot| slot.node.as_ref())
            .filter(|node| node.is_animating())
            .count())
    }

    // ========================================================================
    // Native driver
    // ========================================================================

    pub(crate) fn queue_native(&mut self, op: NativeOp) {
        self.native.push(op);
    }

    /// Drain queued driver commands.
    pub fn take_native_ops(&mut self) -> Vec<NativeOp> {
        self.native.take()
    }

    /// Driver tag of a native node, creating the driver-side node on first use.
    pub fn native_tag(&mut self, id: NodeId) -> Result<u32> {
        let node = self.live(id)?;
        if !node.native {
            return Err(Error::NotNative(id.index));
        }
        if let Some(tag) = node.native_tag {
            return Ok(tag);
        }

        let config = self.native_config(id)?;
        let tag = self.native.next_tag();
        self.node_mut(id)?.native_tag = Some(tag);
        self.tags.insert(tag, id);
        self.native.push(NativeOp::CreateNode { tag, config });
        Ok(tag)
    }

    fn native_config(&mut self, id: NodeId) -> Result<NativeNodeConfig> {
        enum Shape {
            Binary(fn([u32; 2]) -> NativeNodeConfig, NodeId, NodeId),
            Modulus(NodeId, f64),
            DiffClamp(NodeId, f64, f64),
            Transform(Vec<(String, TransformLeaf)>),
            Tracking(NodeId, NodeId),
            Props(Vec<(String, NodeId)>),
        }

        let shape = match &self.live(id)?.kind {
            NodeKind::Value { value, offset, .. } => {
                return Ok(NativeNodeConfig::Value {
                    value: *value,
                    offset: *offset,
                });
            }
            NodeKind::Interpolation { interpolator, .. } => {
                return Ok(NativeNodeConfig::Interpolation {
                    input_range: interpolator.input_range().to_vec(),
                    output_range: interpolator.output_range(),
                    extrapolate_left: interpolator.extrapolate_left(),
                    extrapolate_right: interpolator.extrapolate_right(),
                });
            }
            NodeKind::Addition(a, b) => {
                Shape::Binary(|input| NativeNodeConfig::Addition { input }, *a, *b)
            }
            NodeKind::Subtraction(a, b) => {
                Shape::Binary(|input| NativeNodeConfig::Subtraction { input }, *a, *b)
            }
            NodeKind::Multiplication(a, b) => {
                Shape::Binary(|input| NativeNodeConfig::Multiplication { input }, *a, *b)
            }
            NodeKind::Division { a, b, .. } => {
                Shape::Binary(|input| NativeNodeConfig::Division { input }, *a, *b)
            }
            NodeKind::Modulo { a, modulus } => Shape::Modulus(*a, *modulus),
            NodeKind::DiffClamp { a, min, max, .. } => Shape::DiffClamp(*a, *min, *max),
            NodeKind::Transform(entries) => Shape::Transform(entries.clone()),
            NodeKind::Tracking { value, parent, .. } => Shape::Tracking(*parent, *value),
            NodeKind::Props { spec, .. } => Shape::Props(
                spec.node_props()
                    .map(|(name, id)| (name.to_string(), id))
                    .chain(spec.style_nodes())
                    .collect(),
            ),
        };

        Ok(match shape {
            Shape::Binary(build, a, b) => build([self.native_tag(a)?, self.native_tag(b)?]),
            Shape::Modulus(a, modulus) => NativeNodeConfig::Modulus {
                input: self.native_tag(a)?,
                modulus,
            },
            Shape::DiffClamp(a, min, max) => NativeNodeConfig::DiffClamp {
                input: self.native_tag(a)?,
                min,
                max,
            },
            Shape::Transform(entries) => {
                let mut transforms = Vec::with_capacity(entries.len());
                for (property, leaf) in entries {
                    transforms.push(match leaf {
                        TransformLeaf::Node(node) => NativeTransform::Animated {
                            property,
                            node_tag: self.native_tag(node)?,
                        },
                        TransformLeaf::Static(value) => NativeTransform::Static { property, value },
                    });
                }
                NativeNodeConfig::Transform { transforms }
            }
            Shape::Tracking(parent, value) => NativeNodeConfig::Tracking {
                to_value: self.native_tag(parent)?,
                value: self.native_tag(value)?,
            },
            Shape::Props(entries) => {
                let mut props = Vec::with_capacity(entries.len());
                for (name, node) in entries {
                    props.push((name, self.native_tag(node)?));
                }
                NativeNodeConfig::Props { props }
            }
        })
    }

    /// Hand a node (and everything downstream of it) to the native driver.
    pub fn make_native(&mut self, id: NodeId) -> Result<()> {
        let node = self.live(id)?;
        let mut upstream = node.kind.operands();
        if let NodeKind::Tracking { value, .. } = node.kind {
            upstream.push(value);
        }
        for operand in upstream {
            self.make_native(operand)?;
        }

        let node = self.node_mut(id)?;
        if !node.native {
            node.native = true;
            let children = node.children.clone();
            let view = match node.kind {
                NodeKind::Props { view, .. } => view,
                _ => None,
            };
            let tag = self.native_tag(id)?;
            for child in children {
                self.make_native(child)?;
                let child_tag = self.native_tag(child)?;
                self.native.push(NativeOp::ConnectNodes {
                    parent: tag,
                    child: child_tag,
                });
            }
            if let Some(view) = view {
                self.native.push(NativeOp::ConnectToView { tag, view });
            }
        }

        let node = self.node_mut(id)?;
        if !node.listeners.is_empty() && !node.native_listening {
            node.native_listening = true;
            let tag = self.native_tag(id)?;
            self.native.push(NativeOp::StartListening { tag });
        }
        Ok(())
    }

    /// A value pushed back by the driver for a listened-to node.
    pub fn receive_native_value(&mut self, tag: u32, value: f64) -> Result<()> {
        let id = *self.tags.get(&tag).ok_or(Error::UnknownNode(tag))?;
        let is_value = matches!(self.live(id)?.kind, NodeKind::Value { .. });
        if is_value {
            self.update_value(id, value, false)
        } else {
            self.notify(id, &NodeValue::Number(value))
        }
    }

    /// Bind a props node to a host view.
    pub fn set_native_view(&mut self, id: NodeId, view: u32) -> Result<()> {
        let node = self.live_mut(id)?;
        match &mut node.kind {
            NodeKind::Props { view: current, .. } => {
                if *current == Some(view) {
                    return Ok(());
                }
                *current = Some(view);
            }
            _ => {
                return Err(Error::WrongNodeKind {
                    id: id.index,
                    expected: "props",
                });
            }
        }
        if node.native {
            let tag = self.native_tag(id)?;
            self.native.push(NativeOp::ConnectToView { tag, view });
        }
        Ok(())
    }

    /// Ask the driver to put a native props node's view back to its
    /// un-animated values. No-op for JS-driven nodes.
    pub fn restore_default_values(&mut self, id: NodeId) -> Result<()> {
        if let Some(tag) = self.native_tag_if_native(id)? {
            self.native.push(NativeOp::RestoreDefaultValues { tag });
        }
        Ok(())
    }
}
