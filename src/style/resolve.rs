//! Style resolution: merging style inputs into a class list and inline style.

use std::collections::HashSet;

use indexmap::IndexMap;

use super::ToCss;
use super::compiler::CompiledStyle;
use super::context::StyleRef;
use super::options::StyleOptions;
use super::preprocess::{NormalizedStyle, preprocess, write_declaration};
use super::properties::{is_logical, localize_property, localize_value};
use super::value::Style;

/// A style argument: nothing, a raw object, a registered style, or a nested list.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StyleInput {
    #[default]
    None,
    Raw(Style),
    Compiled(StyleRef),
    List(Vec<StyleInput>),
}

impl StyleInput {
    pub fn list(items: impl IntoIterator<Item = StyleInput>) -> Self {
        StyleInput::List(items.into_iter().collect())
    }

    /// `false`, `null` and empty lists contribute nothing.
    pub fn is_none(&self) -> bool {
        match self {
            StyleInput::None => true,
            StyleInput::List(items) => items.iter().all(StyleInput::is_none),
            _ => false,
        }
    }

    /// Visit leaves depth-first, left to right, skipping empty entries.
    pub fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(&'a StyleInput)) {
        match self {
            StyleInput::None => {}
            StyleInput::List(items) => {
                for item in items {
                    item.for_each_leaf(f);
                }
            }
            leaf => f(leaf),
        }
    }
}

impl From<Style> for StyleInput {
    fn from(style: Style) -> Self {
        StyleInput::Raw(style)
    }
}

impl From<StyleRef> for StyleInput {
    fn from(handle: StyleRef) -> Self {
        StyleInput::Compiled(handle)
    }
}

impl<T: Into<StyleInput>> From<Vec<T>> for StyleInput {
    fn from(items: Vec<T>) -> Self {
        StyleInput::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<StyleInput>> From<Option<T>> for StyleInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(StyleInput::None, Into::into)
    }
}

/// Inline style in DOM form: physical property names and CSS values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InlineStyle {
    props: IndexMap<String, String>,
}

impl InlineStyle {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.props.get(property).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// The `style` attribute text.
    pub fn to_css_text(&self) -> String {
        self.to_css_string()
    }
}

impl ToCss for InlineStyle {
    fn to_css(&self, buf: &mut String) {
        for (property, value) in self.iter() {
            write_declaration(buf, property, value);
        }
    }
}

/// Result of resolving a style input for one element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedStyle {
    pub class_name: String,
    pub inline: Option<InlineStyle>,
}

impl ResolvedStyle {
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.class_name.split_whitespace()
    }
}

/// One flattened entry of a style input.
pub(crate) enum Layer<'a> {
    Compiled(&'a CompiledStyle),
    Raw(&'a Style),
}

/// Merge layers with last-write-wins per property key.
///
/// Layers are walked right to left and the first layer to mention a key
/// claims it; a null value claims the key without contributing anything.
/// Class names come out in left-to-right layer order, each layer's in key
/// order, so equal inputs give byte-identical output.
pub(crate) fn resolve_layers(layers: &[Layer<'_>], options: &StyleOptions) -> ResolvedStyle {
    let rtl = options.is_rtl();
    let mut claimed: HashSet<String> = HashSet::new();
    let mut class_groups: Vec<Vec<&str>> = Vec::with_capacity(layers.len());
    let mut inline: Vec<(String, String)> = Vec::new();

    for layer in layers.iter().rev() {
        match layer {
            Layer::Compiled(compiled) => {
                let mut classes = Vec::new();
                for (key, value) in compiled.iter() {
                    if claimed.insert(key.to_string())
                        && let Some(class) = value.class_for(rtl)
                    {
                        classes.push(class);
                    }
                }
                class_groups.push(classes);
            }
            Layer::Raw(style) => {
                let normalized = preprocess(style, options);
                for (key, value) in normalized.iter() {
                    if claimed.insert(key.to_string())
                        && let Some(value) = value
                    {
                        inline.push((key.to_string(), value.to_string()));
                    }
                }
            }
        }
    }

    let class_name = class_groups
        .iter()
        .rev()
        .flatten()
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    let inline = if inline.is_empty() {
        None
    } else {
        Some(localize_inline(inline, rtl))
    };

    ResolvedStyle { class_name, inline }
}

/// Convert merged inline declarations to physical DOM properties.
///
/// Logical properties are applied after physical ones so that `marginStart`
/// beats `marginLeft` the same way the logical cascade group does.
fn localize_inline(mut declarations: Vec<(String, String)>, rtl: bool) -> InlineStyle {
    declarations.sort_by(|a, b| a.0.cmp(&b.0));
    let (logical, physical): (Vec<_>, Vec<_>) =
        declarations.into_iter().partition(|(k, _)| is_logical(k));

    let mut out = InlineStyle::default();
    for (key, value) in physical.into_iter().chain(logical) {
        let property = localize_property(&key, rtl).to_string();
        let value = localize_value(&key, &value, rtl).into_owned();
        out.props.insert(property, value);
    }
    out
}

/// Merge a normalized style into DOM form without class output.
pub fn inline_style(style: &NormalizedStyle, options: &StyleOptions) -> InlineStyle {
    let declarations = style
        .iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v.to_string())))
        .collect();
    localize_inline(declarations, options.is_rtl())
}
