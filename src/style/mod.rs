//! Style engine: declarative style objects to atomic CSS.
//!
//! This module contains:
//! - Style objects and values ([`Style`], [`StyleValue`])
//! - The preprocessor that expands shorthands and serializes values
//! - The atomic/classic rule compiler and cascade groups
//! - The deduplicating rule sheet and its live-sheet seam
//! - Resolution of style inputs into class names and inline styles
//! - Per-root compilation contexts and the default [`StyleSheet`]

pub mod color;
pub mod compiler;
pub mod context;
pub mod options;
pub mod preprocess;
pub mod properties;
pub mod resolve;
pub mod sheet;
mod value;


/// Serialize a value as CSS text.
pub trait ToCss {
    /// Write this value as CSS to the buffer.
    fn to_css(&self, buf: &mut String);

    /// Convert to a CSS string (convenience method).
    fn to_css_string(&self) -> String {
        let mut buf = String::new();
        self.to_css(&mut buf);
        buf
    }
}

pub use color::{Color, parse_color};
pub use compiler::{CascadeOrder, CompiledStyle, CompiledValue, Compiler, Rule};
pub use context::{StyleContext, StyleRef, StyleSheet, compose, try_compose};
pub use options::{StyleOptions, WritingDirection};
pub use preprocess::{NormalizedStyle, create_transform_value, preprocess};
pub use resolve::{InlineStyle, ResolvedStyle, StyleInput, inline_style};
pub use sheet::{CssRuleTarget, DEFAULT_SHEET_ID, RuleSheet, SheetConfig, SheetSnapshot};
pub use value::{Style, StyleValue, TransformArg, TransformEntry};
