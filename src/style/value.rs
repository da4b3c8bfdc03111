//! Declarative style objects.
//!
//! A [`Style`] is the input side of the style engine: an insertion-ordered
//! map from React Native style keys (`marginLeft`, `shadowOffset`, ...) to
//! [`StyleValue`]s. Key order matters the same way object key order matters
//! for the declarative API: later keys of one object override earlier ones.

use indexmap::IndexMap;

use crate::util::format_number;

/// A single transform function, e.g. `{ rotate: "45deg" }`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformEntry {
    pub name: String,
    pub value: TransformArg,
}

impl TransformEntry {
    pub fn new(name: impl Into<String>, value: impl Into<TransformArg>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The argument of a transform function.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum TransformArg {
    Number(f64),
    String(String),
    Matrix(Vec<f64>),
}

impl From<f64> for TransformArg {
    fn from(v: f64) -> Self {
        TransformArg::Number(v)
    }
}

impl From<i32> for TransformArg {
    fn from(v: i32) -> Self {
        TransformArg::Number(v as f64)
    }
}

impl From<&str> for TransformArg {
    fn from(v: &str) -> Self {
        TransformArg::String(v.to_string())
    }
}

impl From<String> for TransformArg {
    fn from(v: String) -> Self {
        TransformArg::String(v)
    }
}

impl From<Vec<f64>> for TransformArg {
    fn from(v: Vec<f64>) -> Self {
        TransformArg::Matrix(v)
    }
}

/// A style value.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum StyleValue {
    /// Claims the property without emitting a value.
    #[default]
    Null,
    Number(f64),
    String(String),
    /// Ordered transform functions (order is significant).
    Transform(Vec<TransformEntry>),
    /// `shadowOffset` / `textShadowOffset`.
    Offset { width: f64, height: f64 },
    /// Multi-valued properties such as `fontVariant` or `transitionProperty`.
    List(Vec<StyleValue>),
    /// `animationKeyframes`: keyframe selector (`from`, `50%`) to frame style.
    Keyframes(IndexMap<String, Style>),
}

impl StyleValue {
    pub fn is_null(&self) -> bool {
        matches!(self, StyleValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            StyleValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StyleValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Plain textual form used for cache keys and debug output.
    pub fn to_key_string(&self) -> String {
        match self {
            StyleValue::Null => "null".to_string(),
            StyleValue::Number(n) => format_number(*n),
            StyleValue::String(s) => s.clone(),
            StyleValue::Transform(entries) => entries
                .iter()
                .map(|e| match &e.value {
                    TransformArg::Number(n) => format!("{}:{}", e.name, format_number(*n)),
                    TransformArg::String(s) => format!("{}:{}", e.name, s),
                    TransformArg::Matrix(m) => format!(
                        "{}:{}",
                        e.name,
                        m.iter().map(|v| format_number(*v)).collect::<Vec<_>>().join(",")
                    ),
                })
                .collect::<Vec<_>>()
                .join(";"),
            StyleValue::Offset { width, height } => {
                format!("{},{}", format_number(*width), format_number(*height))
            }
            StyleValue::List(items) => items
                .iter()
                .map(StyleValue::to_key_string)
                .collect::<Vec<_>>()
                .join(","),
            StyleValue::Keyframes(frames) => frames
                .iter()
                .map(|(selector, frame)| {
                    let body = frame
                        .iter()
                        .map(|(k, v)| format!("{k}:{}", v.to_key_string()))
                        .collect::<Vec<_>>()
                        .join(";");
                    format!("{selector}{{{body}}}")
                })
                .collect(),
        }
    }
}

impl From<f64> for StyleValue {
    fn from(v: f64) -> Self {
        StyleValue::Number(v)
    }
}

impl From<f32> for StyleValue {
    fn from(v: f32) -> Self {
        StyleValue::Number(v as f64)
    }
}

impl From<i32> for StyleValue {
    fn from(v: i32) -> Self {
        StyleValue::Number(v as f64)
    }
}

impl From<u32> for StyleValue {
    fn from(v: u32) -> Self {
        StyleValue::Number(v as f64)
    }
}

impl From<&str> for StyleValue {
    fn from(v: &str) -> Self {
        StyleValue::String(v.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(v: String) -> Self {
        StyleValue::String(v)
    }
}

impl From<Vec<TransformEntry>> for StyleValue {
    fn from(v: Vec<TransformEntry>) -> Self {
        StyleValue::Transform(v)
    }
}

impl<T: Into<StyleValue>> From<Option<T>> for StyleValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(StyleValue::Null)
    }
}

/// An insertion-ordered style object.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Style {
    props: IndexMap<String, StyleValue>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace a property, keeping its original position on replace.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<StyleValue>) {
        self.props.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.props.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.props.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<StyleValue> {
        self.props.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.props.keys().map(String::as_str)
    }

    /// Copy every property of `other` into this style (`Object.assign`).
    pub fn assign(&mut self, other: &Style) {
        for (k, v) in other.iter() {
            self.props.insert(k.to_string(), v.clone());
        }
    }
}

impl<K: Into<String>, V: Into<StyleValue>> FromIterator<(K, V)> for Style {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut style = Style::new();
        for (k, v) in iter {
            style.set(k, v);
        }
        style
    }
}

impl<'a> IntoIterator for &'a Style {
    type Item = (&'a String, &'a StyleValue);
    type IntoIter = indexmap::map::Iter<'a, String, StyleValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.props.iter()
    }
}

/// Build a [`Style`] literal.
///
/// ```
/// use strata::style;
///
/// let s = style! { "marginLeft" => 10, "color" => "red" };
/// assert_eq!(s.len(), 2);
/// ```
#[macro_export]
macro_rules! style {
    () => { $crate::Style::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut style = $crate::Style::new();
        $( style.set($key, $value); )+
        style
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_preserves_insertion_order() {
        let s = Style::new().with("b", 1).with("a", 2).with("c", 3);
        let keys: Vec<&str> = s.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_style_replace_keeps_position() {
        let mut s = Style::new().with("a", 1).with("b", 2);
        s.set("a", 5);
        let keys: Vec<&str> = s.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(s.get("a"), Some(&StyleValue::Number(5.0)));
    }

    #[test]
    fn test_option_into_null() {
        let v: StyleValue = None::<f64>.into();
        assert!(v.is_null());
    }

    #[test]
    fn test_key_string() {
        let t = StyleValue::Transform(vec![
            TransformEntry::new("rotate", "45deg"),
            TransformEntry::new("translateX", 10),
        ]);
        assert_eq!(t.to_key_string(), "rotate:45deg;translateX:10");
    }
}
