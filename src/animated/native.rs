//! Commands for an off-thread animation driver.
//!
//! Nodes marked native are mirrored into a driver by tag. Every graph change
//! that affects a native node is recorded as a [`NativeOp`]; the host drains
//! the queue with [`AnimatedGraph::take_native_ops`](super::AnimatedGraph::take_native_ops)
//! and forwards it to its driver.

use super::interpolation::{Extrapolate, OutputRange};
use crate::style::TransformArg;

/// Creation parameters for a native node, keyed by operand tags.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")
)]
pub enum NativeNodeConfig {
    Value {
        value: f64,
        offset: f64,
    },
    Addition {
        input: [u32; 2],
    },
    Subtraction {
        input: [u32; 2],
    },
    Multiplication {
        input: [u32; 2],
    },
    Division {
        input: [u32; 2],
    },
    Modulus {
        input: u32,
        modulus: f64,
    },
    #[cfg_attr(feature = "serde", serde(rename = "diffclamp"))]
    DiffClamp {
        input: u32,
        min: f64,
        max: f64,
    },
    Interpolation {
        input_range: Vec<f64>,
        output_range: OutputRange,
        extrapolate_left: Extrapolate,
        extrapolate_right: Extrapolate,
    },
    Transform {
        transforms: Vec<NativeTransform>,
    },
    Tracking {
        to_value: u32,
        value: u32,
    },
    Props {
        props: Vec<(String, u32)>,
    },
}

/// One entry of a native transform node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")
)]
pub enum NativeTransform {
    Animated { property: String, node_tag: u32 },
    Static { property: String, value: TransformArg },
}

/// Maps an event payload path onto a native value node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct EventMapping {
    pub native_event_path: Vec<String>,
    pub animated_value_tag: u32,
}

/// A driver command.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")
)]
pub enum NativeOp {
    CreateNode { tag: u32, config: NativeNodeConfig },
    ConnectNodes { parent: u32, child: u32 },
    DisconnectNodes { parent: u32, child: u32 },
    DropNode { tag: u32 },
    StartListening { tag: u32 },
    StopListening { tag: u32 },
    SetValue { tag: u32, value: f64 },
    SetOffset { tag: u32, offset: f64 },
    FlattenOffset { tag: u32 },
    ExtractOffset { tag: u32 },
    ConnectToView { tag: u32, view: u32 },
    DisconnectFromView { tag: u32, view: u32 },
    RestoreDefaultValues { tag: u32 },
    AddEventToView {
        view: u32,
        event: String,
        mapping: Vec<EventMapping>,
    },
    RemoveEventFromView { view: u32, event: String, tag: u32 },
}

/// Pending driver commands plus the tag allocator.
#[derive(Debug)]
pub(crate) struct NativeQueue {
    ops: Vec<NativeOp>,
    next_tag: u32,
}

impl Default for NativeQueue {
    fn default() -> Self {
        Self {
            ops: Vec::new(),
            next_tag: 1,
        }
    }
}

impl NativeQueue {
    pub fn next_tag(&mut self) -> u32 {
        let tag = self.next_tag;
        self.next_tag += 1;
        tag
    }

    pub fn push(&mut self, op: NativeOp) {
        log::trace!("native op: {op:?}");
        self.ops.push(op);
    }

    pub fn take(&mut self) -> Vec<NativeOp> {
        std::mem::take(&mut self.ops)
    }
}
