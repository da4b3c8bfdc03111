//! Piecewise-linear range mapping with numeric and string outputs.
//!
//! String output ranges are treated as templates: every number inside the
//! strings is interpolated independently and written back into the shape of
//! the first entry. Colors are normalized to `rgba(r, g, b, a)` first so that
//! `"red"` and `"#00f"` interpolate component-wise.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::easing::Easing;
use super::node::NodeValue;
use crate::error::{Error, Result};
use crate::style::parse_color;
use crate::util::format_number;

/// Behavior outside the input range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Extrapolate {
    /// Keep following the nearest segment.
    #[default]
    Extend,
    /// Pin to the nearest output bound.
    Clamp,
    /// Return the input unchanged.
    Identity,
}

impl Extrapolate {
    pub fn as_str(self) -> &'static str {
        match self {
            Extrapolate::Extend => "extend",
            Extrapolate::Clamp => "clamp",
            Extrapolate::Identity => "identity",
        }
    }
}

/// Output side of an interpolation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum OutputRange {
    Numbers(Vec<f64>),
    Strings(Vec<String>),
}

impl From<Vec<f64>> for OutputRange {
    fn from(v: Vec<f64>) -> Self {
        OutputRange::Numbers(v)
    }
}

impl From<Vec<&str>> for OutputRange {
    fn from(v: Vec<&str>) -> Self {
        OutputRange::Strings(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for OutputRange {
    fn from(v: Vec<String>) -> Self {
        OutputRange::Strings(v)
    }
}

/// Interpolation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationConfig {
    pub input_range: Vec<f64>,
    pub output_range: OutputRange,
    pub easing: Easing,
    pub extrapolate: Option<Extrapolate>,
    pub extrapolate_left: Option<Extrapolate>,
    pub extrapolate_right: Option<Extrapolate>,
}

impl InterpolationConfig {
    pub fn new(input_range: Vec<f64>, output_range: impl Into<OutputRange>) -> Self {
        Self {
            input_range,
            output_range: output_range.into(),
            easing: Easing::Linear,
            extrapolate: None,
            extrapolate_left: None,
            extrapolate_right: None,
        }
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Set both sides at once; a side-specific setting still wins.
    pub fn extrapolate(mut self, extrapolate: Extrapolate) -> Self {
        self.extrapolate = Some(extrapolate);
        self
    }

    pub fn extrapolate_left(mut self, extrapolate: Extrapolate) -> Self {
        self.extrapolate_left = Some(extrapolate);
        self
    }

    pub fn extrapolate_right(mut self, extrapolate: Extrapolate) -> Self {
        self.extrapolate_right = Some(extrapolate);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Output {
    Numbers(Vec<f64>),
    /// `strings` are the normalized outputs and the first one is the
    /// template; `columns[i]` holds the i-th number of every string.
    Pattern {
        strings: Vec<String>,
        columns: Vec<Vec<f64>>,
        round: bool,
    },
}

/// A validated interpolation, ready to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolator {
    input_range: Vec<f64>,
    output: Output,
    easing: Easing,
    left: Extrapolate,
    right: Extrapolate,
}

impl Interpolator {
    pub fn new(config: InterpolationConfig) -> Result<Self> {
        let left = config
            .extrapolate_left
            .or(config.extrapolate)
            .unwrap_or_default();
        let right = config
            .extrapolate_right
            .or(config.extrapolate)
            .unwrap_or_default();

        let output = match config.output_range {
            OutputRange::Numbers(range) => {
                check_infinite_range("outputRange", &range)?;
                Output::Numbers(range)
            }
            OutputRange::Strings(range) => pattern_output(range)?,
        };

        check_infinite_range("inputRange", &config.input_range)?;
        check_valid_input_range(&config.input_range)?;

        let output_len = match &output {
            Output::Numbers(range) => Some(range.len()),
            Output::Pattern { columns, .. } => columns.first().map(Vec::len),
        };
        if let Some(len) = output_len
            && len != config.input_range.len()
        {
            return Err(Error::InvalidRange(format!(
                "inputRange ({}) and outputRange ({}) must have the same length",
                config.input_range.len(),
                len
            )));
        }

        Ok(Self {
            input_range: config.input_range,
            output,
            easing: config.easing,
            left,
            right,
        })
    }

    pub fn input_range(&self) -> &[f64] {
        &self.input_range
    }

    /// Output range as validated; color strings are in normalized form.
    pub fn output_range(&self) -> OutputRange {
        match &self.output {
            Output::Numbers(range) => OutputRange::Numbers(range.clone()),
            Output::Pattern { strings, .. } => OutputRange::Strings(strings.clone()),
        }
    }

    pub fn extrapolate_left(&self) -> Extrapolate {
        self.left
    }

    pub fn extrapolate_right(&self) -> Extrapolate {
        self.right
    }

    pub fn apply(&self, input: f64) -> NodeValue {
        match &self.output {
            Output::Numbers(range) => NodeValue::Number(self.map(input, range)),
            Output::Pattern {
                strings,
                columns,
                round,
            } => {
                let template = strings.first().map_or("", String::as_str);
                let mut out = String::with_capacity(template.len());
                let mut last = 0;
                for (i, (start, end)) in number_spans(template).into_iter().enumerate() {
                    out.push_str(&template[last..start]);
                    let mut value = columns.get(i).map_or(0.0, |c| self.map(input, c));
                    if *round {
                        value = if i < 3 {
                            js_round(value)
                        } else {
                            js_round(value * 1000.0) / 1000.0
                        };
                    }
                    out.push_str(&format_number(value));
                    last = end;
                }
                out.push_str(&template[last..]);
                NodeValue::String(out)
            }
        }
    }

    fn map(&self, input: f64, output_range: &[f64]) -> f64 {
        let range = find_range(input, &self.input_range);
        interpolate(
            input,
            self.input_range[range],
            self.input_range[range + 1],
            output_range[range],
            output_range[range + 1],
            &self.easing,
            self.left,
            self.right,
        )
    }
}

/// Index of the segment containing `input`. A boundary value belongs to
/// the segment below it.
fn find_range(input: f64, input_range: &[f64]) -> usize {
    let mut i = 1;
    while i < input_range.len() - 1 {
        if input_range[i] >= input {
            break;
        }
        i += 1;
    }
    i - 1
}

#[allow(clippy::too_many_arguments)]
fn interpolate(
    input: f64,
    input_min: f64,
    input_max: f64,
    output_min: f64,
    output_max: f64,
    easing: &Easing,
    left: Extrapolate,
    right: Extrapolate,
) -> f64 {
    let mut result = input;

    if result < input_min {
        match left {
            Extrapolate::Identity => return result,
            Extrapolate::Clamp => result = input_min,
            Extrapolate::Extend => {}
        }
    }
    if result > input_max {
        match right {
            Extrapolate::Identity => return result,
            Extrapolate::Clamp => result = input_max,
            Extrapolate::Extend => {}
        }
    }

    if output_min == output_max {
        return output_min;
    }
    if input_min == input_max {
        return if input <= input_min {
            output_min
        } else {
            output_max
        };
    }

    if input_min == f64::NEG_INFINITY {
        result = -result;
    } else if input_max == f64::INFINITY {
        result -= input_min;
    } else {
        result = (result - input_min) / (input_max - input_min);
    }

    result = easing.apply(result);

    if output_min == f64::NEG_INFINITY {
        -result
    } else if output_max == f64::INFINITY {
        result + output_min
    } else {
        result * (output_max - output_min) + output_min
    }
}

fn check_infinite_range(name: &str, range: &[f64]) -> Result<()> {
    if range.len() < 2 {
        return Err(Error::InvalidRange(format!(
            "{name} must have at least 2 elements"
        )));
    }
    if range.len() == 2 && range[0] == f64::NEG_INFINITY && range[1] == f64::INFINITY {
        return Err(Error::InvalidRange(format!(
            "{name} cannot be ]-infinity;+infinity[ {range:?}"
        )));
    }
    Ok(())
}

fn check_valid_input_range(range: &[f64]) -> Result<()> {
    if range.windows(2).any(|pair| pair[1] < pair[0]) {
        return Err(Error::InvalidRange(format!(
            "inputRange must be monotonically non-decreasing {range:?}"
        )));
    }
    Ok(())
}

fn pattern_output(range: Vec<String>) -> Result<Output> {
    if range.len() < 2 {
        return Err(Error::InvalidRange("Bad output range".to_string()));
    }

    let range: Vec<String> = range.iter().map(|s| color_to_rgba(s)).collect();
    let shape = strip_numbers(&range[0]);
    for other in &range[1..] {
        if strip_numbers(other) != shape {
            return Err(Error::InvalidPattern {
                first: range[0].clone(),
                other: other.clone(),
            });
        }
    }

    let width = number_spans(&range[0]).len();
    let mut columns = vec![Vec::with_capacity(range.len()); width];
    for value in &range {
        let spans = number_spans(value);
        if spans.len() != width {
            return Err(Error::InvalidPattern {
                first: range[0].clone(),
                other: value.clone(),
            });
        }
        for (column, (start, end)) in columns.iter_mut().zip(spans) {
            column.push(value[start..end].parse::<f64>().unwrap_or(0.0));
        }
    }

    let round = range[0].starts_with("rgb");
    Ok(Output::Pattern {
        strings: range,
        columns,
        round,
    })
}

fn color_to_rgba(input: &str) -> String {
    match parse_color(input) {
        Some(color) => color.to_spaced_rgba(),
        None => input.to_string(),
    }
}

fn strip_numbers(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    for (start, end) in number_spans(value) {
        out.push_str(&value[last..start]);
        last = end;
    }
    out.push_str(&value[last..]);
    out
}

/// Numbers inside interpolated strings, exponent included.
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap());

/// Byte spans of every number in `value`, left to right.
fn number_spans(value: &str) -> Vec<(usize, usize)> {
    NUMBER_RE
        .find_iter(value)
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// `Math.round`: halves round toward positive infinity.
fn js_round(value: f64) -> f64 {
    (value + 0.5).floor()
}
