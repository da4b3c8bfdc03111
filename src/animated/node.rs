//! Animated node types.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::animation::{Animation, EndCallback};
use super::interpolation::Interpolator;
use super::props::{PropsSpec, ReducedProps};
use crate::style::{TransformArg, TransformEntry};

/// Handle to a node in an [`AnimatedGraph`](super::AnimatedGraph).
///
/// Slots of disposed nodes are reused; the generation tells a stale handle
/// apart from the node that took its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub fn index(self) -> u32 {
        self.index
    }
}

/// Identifier returned by `add_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Callback invoked with a node's freshly computed value.
pub type Listener = Rc<dyn Fn(&NodeValue)>;

/// Builds the animation a tracking node issues toward the target's value.
pub type AnimationFactory = Rc<dyn Fn(f64) -> Box<dyn Animation>>;

/// The value of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Number(f64),
    String(String),
    Transform(Vec<TransformEntry>),
    Props(Box<ReducedProps>),
}

impl NodeValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            NodeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NodeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// An operand: an existing node or a constant that becomes a value node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Node(NodeId),
    Const(f64),
}

impl From<NodeId> for Operand {
    fn from(id: NodeId) -> Self {
        Operand::Node(id)
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Const(v)
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Const(v as f64)
    }
}

/// One entry of a transform node: a fixed argument or an animated one.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformLeaf {
    Static(TransformArg),
    Node(NodeId),
}

/// Attachment state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// No children, listeners or retains; holds no upstream links.
    Unattached,
    /// Registered as a child of every operand.
    Attached,
    /// Disposed; the node cannot be used again.
    Detached,
}

pub(crate) struct RunningAnimation {
    pub animation: Box<dyn Animation>,
    pub callback: Option<EndCallback>,
    pub started: bool,
}

/// The closed set of node kinds.
pub(crate) enum NodeKind {
    Value {
        value: f64,
        offset: f64,
        starting: f64,
        animation: Option<RunningAnimation>,
        tracking: Option<NodeId>,
    },
    Addition(NodeId, NodeId),
    Subtraction(NodeId, NodeId),
    Multiplication(NodeId, NodeId),
    Division {
        a: NodeId,
        b: NodeId,
        warned: Cell<bool>,
    },
    Modulo {
        a: NodeId,
        modulus: f64,
    },
    DiffClamp {
        a: NodeId,
        min: f64,
        max: f64,
        value: Cell<f64>,
        last_value: Cell<f64>,
    },
    Interpolation {
        parent: NodeId,
        interpolator: Interpolator,
    },
    Transform(Vec<(String, TransformLeaf)>),
    Tracking {
        value: NodeId,
        parent: NodeId,
        factory: AnimationFactory,
        callback: Option<EndCallback>,
    },
    Props {
        spec: PropsSpec,
        update: Rc<dyn Fn()>,
        view: Option<u32>,
        /// Transform nodes created for the spec; disposed with the props node.
        lowered: Vec<NodeId>,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Value { .. } => "value",
            NodeKind::Addition(..) => "addition",
            NodeKind::Subtraction(..) => "subtraction",
            NodeKind::Multiplication(..) => "multiplication",
            NodeKind::Division { .. } => "division",
            NodeKind::Modulo { .. } => "modulus",
            NodeKind::DiffClamp { .. } => "diffclamp",
            NodeKind::Interpolation { .. } => "interpolation",
            NodeKind::Transform(_) => "transform",
            NodeKind::Tracking { .. } => "tracking",
            NodeKind::Props { .. } => "props",
        }
    }

    /// Nodes this node reads from, i.e. the nodes it registers with as a child.
    pub fn operands(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Value { .. } => Vec::new(),
            NodeKind::Addition(a, b)
            | NodeKind::Subtraction(a, b)
            | NodeKind::Multiplication(a, b)
            | NodeKind::Division { a, b, .. } => vec![*a, *b],
            NodeKind::Modulo { a, .. } | NodeKind::DiffClamp { a, .. } => vec![*a],
            NodeKind::Interpolation { parent, .. } | NodeKind::Tracking { parent, .. } => {
                vec![*parent]
            }
            NodeKind::Transform(entries) => entries
                .iter()
                .filter_map(|(_, leaf)| match leaf {
                    TransformLeaf::Node(id) => Some(*id),
                    TransformLeaf::Static(_) => None,
                })
                .collect(),
            NodeKind::Props { spec, .. } => spec.nodes(),
        }
    }
}

pub(crate) struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    pub listeners: Vec<(ListenerId, Listener)>,
    pub retains: usize,
    pub state: NodeState,
    pub native: bool,
    pub native_tag: Option<u32>,
    pub native_listening: bool,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            listeners: Vec::new(),
            retains: 0,
            state: NodeState::Unattached,
            native: false,
            native_tag: None,
            native_listening: false,
        }
    }

    pub fn is_animating(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Value {
                animation: Some(_),
                ..
            }
        )
    }

    /// Children, listeners and explicit retains keeping the node attached.
    pub fn ref_count(&self) -> usize {
        self.children.len() + self.listeners.len() + self.retains
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind.name())
            .field("children", &self.children)
            .field("listeners", &self.listeners.len())
            .field("retains", &self.retains)
            .field("state", &self.state)
            .field("native", &self.native)
            .finish()
    }
}
