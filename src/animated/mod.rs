//! Animated value graph.
//!
//! This module contains:
//! - The node arena ([`AnimatedGraph`]) with arithmetic, interpolation,
//!   transform, tracking and props nodes
//! - Range interpolation with numeric, unit and color outputs
//! - Timing and spring animations driven by [`AnimatedGraph::tick`]
//! - Native-driver command recording ([`NativeOp`])
//! - The props reducer and component binding used by animated components
//!
//! ```
//! use strata::animated::{AnimatedGraph, Extrapolate, InterpolationConfig};
//!
//! let mut graph = AnimatedGraph::new();
//! let progress = graph.value(0.0);
//! let opacity = graph
//!     .interpolate(
//!         progress,
//!         InterpolationConfig::new(vec![0.0, 1.0], vec![0.0, 1.0]).extrapolate(Extrapolate::Clamp),
//!     )
//!     .unwrap();
//! graph.set_value(progress, 2.0).unwrap();
//! assert_eq!(graph.number(opacity).unwrap(), 1.0);
//! ```

pub mod animation;
pub mod easing;
mod graph;
pub mod interpolation;
pub mod native;
mod node;
pub mod props;

#[cfg(test)]
mod tests;

pub use animation::{
    Animation, EndCallback, Frame, SpringAnimation, SpringConfig, TimingAnimation, TimingConfig,
};
pub use easing::{CubicBezier, Easing};
pub use graph::AnimatedGraph;
pub use interpolation::{Extrapolate, InterpolationConfig, Interpolator, OutputRange};
pub use native::{EventMapping, NativeNodeConfig, NativeOp, NativeTransform};
pub use node::{
    AnimationFactory, Listener, ListenerId, NodeId, NodeState, NodeValue, Operand, TransformLeaf,
};
pub use props::{
    AnimatedEvent, AnimatedPropsBinding, AnimatedPropsSpec, AnimatedStyle, HostInstance,
    PropValue, ReducedProp, ReducedProps, StyleLayer, StyleLeaf,
};
