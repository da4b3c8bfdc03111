//! # strata
//!
//! Style compilation and animation primitives for DOM-backed UI components.
//!
//! ## Features
//!
//! - Compile declarative style objects into atomic, deduplicated CSS rules
//! - Resolve style arrays into class names plus a minimal inline remainder
//! - Mirror direction-sensitive properties for right-to-left layouts
//! - Drive animated values through a graph of derived nodes, with an
//!   optional native-driver command stream
//! - Defer work until in-progress interactions finish
//!
//! ## Quick Start
//!
//! ```
//! use strata::style::{StyleContext, StyleInput, StyleOptions};
//! use strata::style;
//!
//! let mut context = StyleContext::default();
//! let card = context.register(style! {
//!     "paddingHorizontal" => 8,
//!     "backgroundColor" => "#fff",
//! });
//!
//! let resolved = context.resolve(&StyleInput::from(card), &StyleOptions::default());
//! assert_eq!(resolved.classes().count(), 3);
//! assert!(context.sheet().get_text().contains("background-color:rgba(255,255,255,1.00)"));
//! ```
//!
//! ## Animated values
//!
//! The [`animated`] module holds an arena of nodes. Derived nodes recompute
//! from their operands whenever they are read, so a single
//! [`animated::AnimatedGraph::set_value`] is enough to move everything
//! downstream:
//!
//! ```
//! use strata::animated::AnimatedGraph;
//!
//! let mut graph = AnimatedGraph::new();
//! let x = graph.value(10.0);
//! let doubled = graph.multiply(x, 2.0).unwrap();
//! graph.set_value(x, 21.0).unwrap();
//! assert_eq!(graph.number(doubled).unwrap(), 42.0);
//! ```

pub mod animated;
pub mod error;
pub mod interaction;
pub mod style;
pub mod util;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{Error, Result};
pub use style::{Style, StyleValue};
