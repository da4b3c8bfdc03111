//! Style preprocessing.
//!
//! Turns a declarative [`Style`] into a [`NormalizedStyle`]: shorthands are
//! expanded into longhands, shadows and transforms are serialized into CSS
//! strings, numbers are coerced to pixels (except for unitless properties) and
//! colors are normalized. The result is direction-agnostic: logical
//! `*Start`/`*End` keys survive so that one normalized style can be shared by
//! LTR and RTL consumers.
//!
//! Preprocessing is lenient. Keys and values it cannot turn into CSS are
//! dropped with a single warning rather than failing the whole style.

use std::collections::HashSet;

use cssparser::{Parser, ParserInput, Token};
use indexmap::IndexMap;

use super::color::{normalize_color, parse_color_value};
use super::ToCss;
use super::options::StyleOptions;
use super::properties::{
    is_color_property, is_unitless, is_valid_property_name, prefixed_variants,
};
use super::value::{Style, StyleValue, TransformArg, TransformEntry};
use crate::util::{format_number, hyphenate, split_components, warn_once};

const SYSTEM_FONT_STACK: &str = "system-ui,-apple-system,\"Segoe UI\",Roboto,Helvetica,Arial,sans-serif,\"Apple Color Emoji\",\"Segoe UI Emoji\"";

/// A flat map of final property/value pairs.
///
/// Keys stay camelCase; values are CSS text. `None` marks a property that was
/// explicitly set to null, which still claims the key during resolution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedStyle {
    decls: IndexMap<String, Option<String>>,
}

impl NormalizedStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property: &str) -> Option<Option<&str>> {
        self.decls.get(property).map(|v| v.as_deref())
    }

    pub fn insert(&mut self, property: impl Into<String>, value: Option<String>) {
        self.decls.insert(property.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.decls.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Properties sorted by name, as the compiler consumes them.
    pub fn sorted(&self) -> Vec<(&str, Option<&str>)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Writes a declaration list (`margin-left:10px;...`), skipping nulls and
/// emitting vendor-prefixed duplicates before the standard property.
impl ToCss for NormalizedStyle {
    fn to_css(&self, buf: &mut String) {
        for (property, value) in self.iter() {
            if let Some(value) = value {
                write_declaration(buf, property, value);
            }
        }
    }
}

pub(crate) fn write_declaration(buf: &mut String, property: &str, value: &str) {
    for prefixed in prefixed_variants(property) {
        buf.push_str(&hyphenate(prefixed));
        buf.push(':');
        buf.push_str(value);
        buf.push(';');
    }
    buf.push_str(&hyphenate(property));
    buf.push(':');
    buf.push_str(value);
    buf.push(';');
}

/// Preprocess a style object.
///
/// Pure: the same input always yields the same output and nothing is
/// inserted anywhere.
pub fn preprocess(style: &Style, options: &StyleOptions) -> NormalizedStyle {
    let mut builder = Builder::default();
    let mut has_shadow = false;
    let mut has_text_shadow = false;

    for (key, value) in style.iter() {
        if !is_valid_property_name(key) {
            warn_once(&format!("property:{key}"), || {
                format!("Dropping unsupported style property \"{key}\"")
            });
            continue;
        }

        if let StyleValue::String(s) = value
            && s.contains("!important")
        {
            warn_once(&format!("important:{key}"), || {
                format!("Dropping \"{key}\": !important is not supported in style values")
            });
            continue;
        }

        match key {
            "shadowColor" | "shadowOffset" | "shadowOpacity" | "shadowRadius" => {
                has_shadow = true;
            }
            "textShadowColor" | "textShadowOffset" | "textShadowRadius" => {
                has_text_shadow = true;
            }
            "boxShadow" if has_shadow_props(style) && options.shadow => {
                // Merged with the shadow* props below.
            }
            _ => expand_property(&mut builder, key, value),
        }
    }

    if has_shadow && options.shadow {
        if let Some(shadow) = create_box_shadow(style) {
            let value = match style.get("boxShadow") {
                Some(StyleValue::String(existing)) => format!("{existing}, {shadow}"),
                _ => shadow,
            };
            builder.set_explicit("boxShadow", Some(value));
        }
    }

    if has_text_shadow && options.text_shadow {
        if let Some(shadow) = create_text_shadow(style) {
            builder.set_explicit("textShadow", Some(shadow));
        }
    }

    builder.finish()
}

fn has_shadow_props(style: &Style) -> bool {
    ["shadowColor", "shadowOffset", "shadowOpacity", "shadowRadius"]
        .iter()
        .any(|k| style.contains_key(k))
}

/// Accumulates declarations, letting explicit longhands beat expansions.
#[derive(Default)]
struct Builder {
    out: NormalizedStyle,
    explicit: HashSet<String>,
}

impl Builder {
    fn set_explicit(&mut self, property: &str, value: Option<String>) {
        self.explicit.insert(property.to_string());
        self.out.insert(property, value);
    }

    fn set_expanded(&mut self, property: &str, value: Option<String>) {
        if !self.explicit.contains(property) {
            self.out.insert(property, value);
        }
    }

    fn finish(self) -> NormalizedStyle {
        self.out
    }
}

// ============================================================================
// Shorthand expansion
// ============================================================================

enum Expansion {
    /// CSS box shorthand: one to four components.
    Box([&'static str; 4]),
    /// Both targets take the same value.
    Pair([&'static str; 2]),
    /// Two targets, optionally given as two components (`gap`).
    Split([&'static str; 2]),
    /// A plain rename.
    Alias(&'static str),
    /// `border` or a single `border<Side>` shorthand string.
    Border(&'static [Side]),
}

#[derive(Clone, Copy)]
enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    fn name(self) -> &'static str {
        match self {
            Side::Top => "Top",
            Side::Right => "Right",
            Side::Bottom => "Bottom",
            Side::Left => "Left",
        }
    }
}

const ALL_SIDES: &[Side] = &[Side::Top, Side::Right, Side::Bottom, Side::Left];

fn expansion_for(property: &str) -> Option<Expansion> {
    use Expansion::*;
    let expansion = match property {
        "margin" => Box(["marginTop", "marginRight", "marginBottom", "marginLeft"]),
        "padding" => Box(["paddingTop", "paddingRight", "paddingBottom", "paddingLeft"]),
        "inset" => Box(["top", "right", "bottom", "left"]),
        "borderWidth" => Box([
            "borderTopWidth",
            "borderRightWidth",
            "borderBottomWidth",
            "borderLeftWidth",
        ]),
        "borderColor" => Box([
            "borderTopColor",
            "borderRightColor",
            "borderBottomColor",
            "borderLeftColor",
        ]),
        "borderStyle" => Box([
            "borderTopStyle",
            "borderRightStyle",
            "borderBottomStyle",
            "borderLeftStyle",
        ]),
        "borderRadius" => Box([
            "borderTopLeftRadius",
            "borderTopRightRadius",
            "borderBottomRightRadius",
            "borderBottomLeftRadius",
        ]),

        "marginHorizontal" | "marginInline" => Pair(["marginLeft", "marginRight"]),
        "marginVertical" | "marginBlock" => Pair(["marginTop", "marginBottom"]),
        "paddingHorizontal" | "paddingInline" => Pair(["paddingLeft", "paddingRight"]),
        "paddingVertical" | "paddingBlock" => Pair(["paddingTop", "paddingBottom"]),
        "insetInline" => Pair(["left", "right"]),
        "insetBlock" => Pair(["top", "bottom"]),
        "borderInlineWidth" => Pair(["borderLeftWidth", "borderRightWidth"]),
        "borderInlineColor" => Pair(["borderLeftColor", "borderRightColor"]),
        "borderInlineStyle" => Pair(["borderLeftStyle", "borderRightStyle"]),
        "borderBlockWidth" => Pair(["borderTopWidth", "borderBottomWidth"]),
        "borderBlockColor" => Pair(["borderTopColor", "borderBottomColor"]),
        "borderBlockStyle" => Pair(["borderTopStyle", "borderBottomStyle"]),

        "gap" => Split(["rowGap", "columnGap"]),

        "marginBlockStart" => Alias("marginTop"),
        "marginBlockEnd" => Alias("marginBottom"),
        "paddingBlockStart" => Alias("paddingTop"),
        "paddingBlockEnd" => Alias("paddingBottom"),
        "insetBlockStart" => Alias("top"),
        "insetBlockEnd" => Alias("bottom"),
        "borderBlockStartWidth" => Alias("borderTopWidth"),
        "borderBlockEndWidth" => Alias("borderBottomWidth"),
        "borderBlockStartColor" => Alias("borderTopColor"),
        "borderBlockEndColor" => Alias("borderBottomColor"),
        "borderBlockStartStyle" => Alias("borderTopStyle"),
        "borderBlockEndStyle" => Alias("borderBottomStyle"),

        "marginInlineStart" => Alias("marginStart"),
        "marginInlineEnd" => Alias("marginEnd"),
        "paddingInlineStart" => Alias("paddingStart"),
        "paddingInlineEnd" => Alias("paddingEnd"),
        "insetInlineStart" => Alias("start"),
        "insetInlineEnd" => Alias("end"),
        "borderInlineStartWidth" => Alias("borderStartWidth"),
        "borderInlineEndWidth" => Alias("borderEndWidth"),
        "borderInlineStartColor" => Alias("borderStartColor"),
        "borderInlineEndColor" => Alias("borderEndColor"),
        "borderInlineStartStyle" => Alias("borderStartStyle"),
        "borderInlineEndStyle" => Alias("borderEndStyle"),

        "writingDirection" => Alias("direction"),

        "border" => Border(ALL_SIDES),
        "borderTop" => Border(&[Side::Top]),
        "borderRight" => Border(&[Side::Right]),
        "borderBottom" => Border(&[Side::Bottom]),
        "borderLeft" => Border(&[Side::Left]),
        _ => return None,
    };
    Some(expansion)
}

fn expand_property(builder: &mut Builder, key: &str, value: &StyleValue) {
    let Some(expansion) = expansion_for(key) else {
        if let Some(normalized) = normalize_value(key, value) {
            builder.set_explicit(key, normalized);
        }
        return;
    };

    match expansion {
        Expansion::Box(targets) => {
            let parts = match value {
                StyleValue::String(s) => split_components(s),
                _ => Vec::new(),
            };
            if parts.len() > 1 {
                let Some((top, right, bottom, left)) = expand_shorthand_4(parts) else {
                    warn_once(&format!("box:{key}"), || {
                        format!("Dropping \"{key}\": too many values")
                    });
                    return;
                };
                for (target, part) in targets.iter().zip([top, right, bottom, left]) {
                    let v = StyleValue::String(part.to_string());
                    if let Some(normalized) = normalize_value(target, &v) {
                        builder.set_expanded(target, normalized);
                    }
                }
            } else {
                for target in targets {
                    if let Some(normalized) = normalize_value(target, value) {
                        builder.set_expanded(target, normalized);
                    }
                }
            }
        }
        Expansion::Pair(targets) => {
            for target in targets {
                if let Some(normalized) = normalize_value(target, value) {
                    builder.set_expanded(target, normalized);
                }
            }
        }
        Expansion::Split([first, second]) => {
            let parts = match value {
                StyleValue::String(s) => split_components(s),
                _ => Vec::new(),
            };
            if parts.len() == 2 {
                for (target, part) in [(first, parts[0]), (second, parts[1])] {
                    let v = StyleValue::String(part.to_string());
                    if let Some(normalized) = normalize_value(target, &v) {
                        builder.set_expanded(target, normalized);
                    }
                }
            } else {
                for target in [first, second] {
                    if let Some(normalized) = normalize_value(target, value) {
                        builder.set_expanded(target, normalized);
                    }
                }
            }
        }
        Expansion::Alias(target) => {
            if let Some(normalized) = normalize_value(target, value) {
                builder.set_expanded(target, normalized);
            }
        }
        Expansion::Border(sides) => expand_border(builder, key, value, sides),
    }
}

/// Expand 1-4 values to (top, right, bottom, left) following CSS shorthand rules.
pub(crate) fn expand_shorthand_4<T: Copy>(values: Vec<T>) -> Option<(T, T, T, T)> {
    match values.len() {
        1 => {
            let v = values[0];
            Some((v, v, v, v))
        }
        2 => {
            let (tb, lr) = (values[0], values[1]);
            Some((tb, lr, tb, lr))
        }
        3 => {
            let (t, lr, b) = (values[0], values[1], values[2]);
            Some((t, lr, b, lr))
        }
        4 => Some((values[0], values[1], values[2], values[3])),
        _ => None,
    }
}

fn expand_border(builder: &mut Builder, key: &str, value: &StyleValue, sides: &[Side]) {
    let parsed = match value {
        StyleValue::Null => {
            for side in sides {
                for part in ["Width", "Style", "Color"] {
                    builder.set_expanded(&format!("border{}{}", side.name(), part), None);
                }
            }
            return;
        }
        StyleValue::Number(n) => Some((Some(px(*n)), None, None)),
        StyleValue::String(s) => parse_border_values(s),
        _ => None,
    };

    let Some((width, style, color)) = parsed else {
        warn_once(&format!("border:{key}"), || {
            format!("Dropping \"{key}\": unrecognized border value")
        });
        return;
    };

    for side in sides {
        let name = side.name();
        if let Some(w) = &width {
            builder.set_expanded(&format!("border{name}Width"), Some(w.clone()));
        }
        if let Some(s) = &style {
            builder.set_expanded(&format!("border{name}Style"), Some(s.clone()));
        }
        if let Some(c) = &color {
            builder.set_expanded(&format!("border{name}Color"), Some(c.clone()));
        }
    }
}

type BorderParts = (Option<String>, Option<String>, Option<String>);

/// Parse border values (width, style, color) in any order.
fn parse_border_values(value: &str) -> Option<BorderParts> {
    if value.trim() == "none" || value.trim() == "0" {
        return Some((Some("0px".to_string()), Some("none".to_string()), None));
    }

    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut width: Option<String> = None;
    let mut style: Option<String> = None;
    let mut color: Option<String> = None;

    for _ in 0..3 {
        if style.is_none()
            && let Ok(s) = parser.try_parse(|i| {
                let ident = i.expect_ident_cloned()?;
                if is_border_style(&ident) {
                    Ok(ident.to_string())
                } else {
                    Err(i.new_custom_error::<_, ()>(()))
                }
            })
        {
            style = Some(s);
            continue;
        }

        if color.is_none()
            && let Ok(c) = parser.try_parse(|i| {
                parse_color_value(i).ok_or_else(|| i.new_custom_error::<_, ()>(()))
            })
        {
            color = Some(c.to_css_rgba(1.0));
            continue;
        }

        if width.is_none()
            && let Ok(w) = parser.try_parse(|i| {
                parse_border_width(i).ok_or_else(|| i.new_custom_error::<_, ()>(()))
            })
        {
            width = Some(w);
            continue;
        }

        break;
    }

    if !parser.is_exhausted() || (width.is_none() && style.is_none() && color.is_none()) {
        return None;
    }
    Some((width, style, color))
}

fn parse_border_width(input: &mut Parser<'_, '_>) -> Option<String> {
    match input.next().ok()? {
        Token::Ident(ident) => match ident.as_ref() {
            "thin" | "medium" | "thick" => Some(ident.to_string()),
            _ => None,
        },
        Token::Dimension { value, unit, .. } => {
            Some(format!("{}{}", format_number(*value as f64), unit))
        }
        Token::Number { value, .. } => Some(px(*value as f64)),
        _ => None,
    }
}

fn is_border_style(ident: &str) -> bool {
    matches!(
        ident,
        "none"
            | "hidden"
            | "dotted"
            | "dashed"
            | "solid"
            | "double"
            | "groove"
            | "ridge"
            | "inset"
            | "outset"
    )
}

// ============================================================================
// Value normalization
// ============================================================================

fn px(n: f64) -> String {
    format!("{}px", format_number(n))
}

/// Normalize one value for `property`.
///
/// Returns `None` when the value is dropped, `Some(None)` for an explicit null.
fn normalize_value(property: &str, value: &StyleValue) -> Option<Option<String>> {
    let normalized = match value {
        StyleValue::Null => return Some(None),
        StyleValue::Number(n) => {
            if !n.is_finite() {
                warn_once(&format!("nonfinite:{property}"), || {
                    format!("Dropping \"{property}\": non-finite number")
                });
                return None;
            }
            if is_unitless(property) {
                format_number(*n)
            } else {
                px(*n)
            }
        }
        StyleValue::String(s) => {
            if is_color_property(property) {
                normalize_color(s, 1.0)
            } else if property == "fontFamily" && s == "System" {
                SYSTEM_FONT_STACK.to_string()
            } else {
                s.clone()
            }
        }
        StyleValue::Transform(entries) if property == "transform" => create_transform_value(entries),
        StyleValue::List(items) => {
            let separator = if property == "fontVariant" { " " } else { ", " };
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match normalize_value(property, item) {
                    Some(Some(part)) => parts.push(part),
                    _ => return None,
                }
            }
            parts.join(separator)
        }
        StyleValue::Keyframes(frames) if property == "animationKeyframes" => {
            keyframes_body(frames)
        }
        StyleValue::Transform(_) | StyleValue::Offset { .. } | StyleValue::Keyframes(_) => {
            warn_once(&format!("shape:{property}"), || {
                format!("Dropping \"{property}\": value shape is not valid for this property")
            });
            return None;
        }
    };
    Some(Some(normalized))
}

/// Serialize keyframes into the body of an `@keyframes` rule.
fn keyframes_body(frames: &IndexMap<String, Style>) -> String {
    let mut body = String::new();
    for (selector, frame) in frames {
        body.push_str(selector);
        body.push('{');
        preprocess(frame, &StyleOptions::default()).to_css(&mut body);
        body.push('}');
    }
    body
}

/// Serialize a transform list into a CSS `transform` value, preserving order.
pub fn create_transform_value(entries: &[TransformEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let name = entry.name.as_str();
            match &entry.value {
                TransformArg::Matrix(values) => format!(
                    "{}({})",
                    name,
                    values
                        .iter()
                        .map(|v| format_number(*v))
                        .collect::<Vec<_>>()
                        .join(",")
                ),
                TransformArg::Number(n) => {
                    let arg = if is_unitless(name) {
                        format_number(*n)
                    } else if name.starts_with("rotate") || name.starts_with("skew") {
                        format!("{}deg", format_number(*n))
                    } else {
                        px(*n)
                    };
                    format!("{name}({arg})")
                }
                TransformArg::String(s) => format!("{name}({s})"),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn offset_of(value: Option<&StyleValue>) -> (f64, f64) {
    match value {
        Some(StyleValue::Offset { width, height }) => (*width, *height),
        _ => (0.0, 0.0),
    }
}

fn create_box_shadow(style: &Style) -> Option<String> {
    let (width, height) = offset_of(style.get("shadowOffset"));
    let radius = style
        .get("shadowRadius")
        .and_then(StyleValue::as_number)
        .unwrap_or(0.0);
    let opacity = style
        .get("shadowOpacity")
        .and_then(StyleValue::as_number)
        .unwrap_or(1.0);
    let color = style
        .get("shadowColor")
        .and_then(StyleValue::as_str)
        .unwrap_or("black");

    let color = normalize_color(color, opacity);
    Some(format!("{} {} {} {}", px(width), px(height), px(radius), color))
}

fn create_text_shadow(style: &Style) -> Option<String> {
    let (width, height) = offset_of(style.get("textShadowOffset"));
    let radius = style
        .get("textShadowRadius")
        .and_then(StyleValue::as_number)
        .unwrap_or(0.0);
    let color = style.get("textShadowColor").and_then(StyleValue::as_str)?;

    if width == 0.0 && height == 0.0 && radius == 0.0 {
        return None;
    }
    let color = normalize_color(color, 1.0);
    Some(format!("{} {} {} {}", px(width), px(height), px(radius), color))
}
