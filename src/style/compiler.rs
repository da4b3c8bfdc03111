//! Atomic and classic CSS rule compilation.
//!
//! Atomic compilation turns every property/value pair of a [`NormalizedStyle`]
//! into one single-declaration rule whose class name is a content hash, so
//! identical declarations anywhere in the application share one rule.
//! Direction-sensitive declarations compile into a pair of rules (LTR and
//! RTL) and resolution picks one of them per element.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::ToCss;
use super::preprocess::{NormalizedStyle, write_declaration};
use super::properties::{
    is_logical, is_shorthand, localize_property, localize_value, logical_to_physical,
};
use crate::util::hash;

/// Insertion bucket of a rule. Later buckets win the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CascadeOrder {
    Reset,
    Classic,
    Shorthand,
    PhysicalLonghand,
    LogicalLonghand,
    Atomic,
}

impl CascadeOrder {
    /// Group number written into the stylesheet markers.
    pub fn group(self) -> u32 {
        match self {
            CascadeOrder::Reset => 0,
            CascadeOrder::Classic => 1,
            CascadeOrder::Shorthand => 20,
            CascadeOrder::PhysicalLonghand => 22,
            CascadeOrder::LogicalLonghand => 23,
            CascadeOrder::Atomic => 30,
        }
    }

    /// Bucket for an atomic declaration of `property`.
    pub fn for_property(property: &str) -> Self {
        if is_shorthand(property) {
            CascadeOrder::Shorthand
        } else if is_logical(property) {
            CascadeOrder::LogicalLonghand
        } else if is_physical_longhand(property) {
            CascadeOrder::PhysicalLonghand
        } else {
            CascadeOrder::Atomic
        }
    }
}

/// Longhands of shorthand families that also exist in logical form.
fn is_physical_longhand(property: &str) -> bool {
    matches!(property, "top" | "right" | "bottom" | "left")
        || ["margin", "padding", "border", "overflow", "overscrollBehavior"]
            .iter()
            .any(|family| property.starts_with(family) && property.len() > family.len())
}

/// A CSS rule: one identifier and the rule texts it contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: String,
    pub order: CascadeOrder,
    pub texts: Vec<String>,
}

/// What one property of a compiled style contributes at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledValue {
    /// Claims the property without adding a class.
    Null,
    Class(String),
    /// Direction-sensitive declaration: one class per writing direction.
    Localized { ltr: String, rtl: String },
}

impl CompiledValue {
    pub fn class_for(&self, rtl: bool) -> Option<&str> {
        match self {
            CompiledValue::Null => None,
            CompiledValue::Class(class) => Some(class),
            CompiledValue::Localized { ltr, rtl: r } => Some(if rtl { r } else { ltr }),
        }
    }
}

/// Compiled form of a style: property key to class contribution, sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompiledStyle {
    entries: IndexMap<String, CompiledValue>,
}

impl CompiledStyle {
    pub fn get(&self, property: &str) -> Option<&CompiledValue> {
        self.entries.get(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CompiledValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Class names applied under the given direction, in key order.
    pub fn class_names(&self, rtl: bool) -> Vec<&str> {
        self.entries
            .values()
            .filter_map(|value| value.class_for(rtl))
            .collect()
    }
}

/// Rule compiler with a per-declaration cache.
#[derive(Debug, Default)]
pub struct Compiler {
    cache: HashMap<(String, String), CompiledValue>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct declarations compiled so far.
    pub fn cached_declarations(&self) -> usize {
        self.cache.len()
    }

    /// Compile a normalized style into atomic rules.
    ///
    /// Returns the descriptor and the rules this compiler has not produced
    /// before; rules for cached declarations were returned by an earlier call.
    pub fn atomic(&mut self, style: &NormalizedStyle) -> (CompiledStyle, Vec<Rule>) {
        let mut compiled = CompiledStyle::default();
        let mut rules = Vec::new();

        for (property, value) in style.sorted() {
            let Some(value) = value else {
                compiled
                    .entries
                    .insert(property.to_string(), CompiledValue::Null);
                continue;
            };

            let key = (property.to_string(), value.to_string());
            let compiled_value = match self.cache.get(&key) {
                Some(hit) => hit.clone(),
                None => {
                    let (compiled_value, new_rules) = compile_declaration(property, value);
                    self.cache.insert(key, compiled_value.clone());
                    rules.extend(new_rules);
                    compiled_value
                }
            };
            compiled
                .entries
                .insert(property.to_string(), compiled_value);
        }

        log::debug!(
            "compiled {} declarations into {} new rules",
            compiled.len(),
            rules.len()
        );
        (compiled, rules)
    }

    /// Compile a style into one named, non-atomic rule.
    ///
    /// The class name is `<name>-<hash>` of the declaration block, so the same
    /// name with different contents never collides. Keyframes are emitted as
    /// separate rules.
    pub fn classic(
        &mut self,
        style: &NormalizedStyle,
        name: &str,
        order: CascadeOrder,
    ) -> (CompiledStyle, Vec<Rule>) {
        let mut declarations = NormalizedStyle::new();
        let mut texts = Vec::new();

        for (property, value) in style.sorted() {
            match (property, value) {
                ("animationKeyframes", Some(body)) => {
                    let (animation_name, keyframes) = keyframes_rule(body);
                    texts.push(keyframes);
                    declarations.insert("animationName", Some(animation_name));
                }
                (_, Some(value)) => declarations.insert(property, Some(value.to_string())),
                (_, None) => {}
            }
        }

        let block = declarations.to_css_string();
        let class = format!("{name}-{}", hash(&format!("{name}{block}")));
        texts.push(format!(".{class}{{{block}}}"));

        let mut compiled = CompiledStyle::default();
        compiled
            .entries
            .insert(format!("${class}"), CompiledValue::Class(class.clone()));
        let rule = Rule {
            id: class,
            order,
            texts,
        };
        (compiled, vec![rule])
    }
}

/// Content-addressed identifier of a declaration.
///
/// `emitted` differs from `source` for logical and mirrored declarations; it
/// is folded into the hash so those rules get their own classes.
pub fn identifier(source: &str, emitted: &str, value: &str) -> String {
    let key = if emitted == source {
        value.to_string()
    } else {
        format!("{emitted}{value}")
    };
    format!("r-{source}-{}", hash(&format!("{source}{key}")))
}

fn compile_declaration(property: &str, value: &str) -> (CompiledValue, Vec<Rule>) {
    let order = CascadeOrder::for_property(property);

    let ltr_property = logical_to_physical(property).unwrap_or(property);
    let rtl_property = localize_property(property, true);
    let ltr_value = localize_value(property, value, false);
    let rtl_value = localize_value(property, value, true);

    let ltr_id = identifier(property, ltr_property, &ltr_value);
    let ltr_rule = Rule {
        id: ltr_id.clone(),
        order,
        texts: rule_texts(&ltr_id, property, ltr_property, &ltr_value),
    };

    if rtl_property == ltr_property && rtl_value == ltr_value {
        return (CompiledValue::Class(ltr_id), vec![ltr_rule]);
    }

    let rtl_id = identifier(property, rtl_property, &rtl_value);
    let rtl_rule = Rule {
        id: rtl_id.clone(),
        order,
        texts: rule_texts(&rtl_id, property, rtl_property, &rtl_value),
    };

    (
        CompiledValue::Localized {
            ltr: ltr_id,
            rtl: rtl_id,
        },
        vec![ltr_rule, rtl_rule],
    )
}

fn block(property: &str, value: &str) -> String {
    let mut buf = String::from("{");
    write_declaration(&mut buf, property, value);
    buf.push('}');
    buf
}

fn rule_texts(id: &str, source: &str, property: &str, value: &str) -> Vec<String> {
    let selector = format!(".{id}");
    match source {
        "pointerEvents" => {
            let (own, children) = match value {
                "auto" => ("auto!important", None),
                "box-only" => ("auto!important", Some("none")),
                "none" => ("none!important", None),
                "box-none" => ("none!important", Some("auto")),
                other => (other, None),
            };
            let mut texts = vec![format!("{selector}{}", block("pointerEvents", own))];
            if let Some(children) = children {
                texts.push(format!("{selector}>*{}", block("pointerEvents", children)));
            }
            texts
        }
        "placeholderTextColor" => {
            vec![format!("{selector}::placeholder{}", block("color", value))]
        }
        "scrollbarWidth" if value == "none" => vec![
            format!("{selector}::-webkit-scrollbar{{display:none}}"),
            format!("{selector}{}", block("scrollbarWidth", value)),
        ],
        "animationKeyframes" => {
            let (name, keyframes) = keyframes_rule(value);
            vec![keyframes, format!("{selector}{}", block("animationName", &name))]
        }
        _ => vec![format!("{selector}{}", block(property, value))],
    }
}

/// Build an `@keyframes` rule from a serialized body, returning its name.
fn keyframes_rule(body: &str) -> (String, String) {
    let name = format!("r-{}", hash(body));
    let text = format!("@keyframes {name}{{{body}}}");
    (name, text)
}
