//! Color parsing and normalization.
//!
//! Colors are parsed with `cssparser` into an 8-bit RGBA [`Color`]. The style
//! engine normalizes color-valued properties into `rgba()` text, and the
//! interpolation engine normalizes string output ranges the same way before
//! extracting their numeric tokens.

use cssparser::{ParseError, Parser, ParserInput, Token};

use crate::util::format_number;

/// RGBA color (8 bits per channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// Create a new opaque color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a new color with alpha.
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Alpha as a fraction in `[0, 1]`.
    pub fn alpha(&self) -> f64 {
        self.a as f64 / 255.0
    }

    /// Style-engine form: `rgba(r,g,b,a)` with the alpha multiplied by
    /// `opacity` and fixed to two decimals.
    pub fn to_css_rgba(&self, opacity: f64) -> String {
        format!(
            "rgba({},{},{},{:.2})",
            self.r,
            self.g,
            self.b,
            self.alpha() * opacity
        )
    }

    /// Interpolation form: `rgba(r, g, b, a)` with a shortest-form alpha.
    pub fn to_spaced_rgba(&self) -> String {
        format!(
            "rgba({}, {}, {}, {})",
            self.r,
            self.g,
            self.b,
            format_number(self.alpha())
        )
    }
}

/// Parse a CSS color string.
///
/// Returns `None` for anything that is not a concrete color, including
/// `currentcolor`, CSS-wide keywords and `var()` references.
pub fn parse_color(value: &str) -> Option<Color> {
    let mut input = ParserInput::new(value.trim());
    let mut parser = Parser::new(&mut input);
    let color = parse_color_value(&mut parser)?;
    parser.expect_exhausted().ok()?;
    Some(color)
}

/// Normalize a color-valued style string to `rgba(r,g,b,a)`.
///
/// Unparseable values (keywords, `var()`) are returned unchanged.
pub fn normalize_color(value: &str, opacity: f64) -> String {
    match parse_color(value) {
        Some(color) => color.to_css_rgba(opacity),
        None => value.to_string(),
    }
}

pub(crate) fn parse_color_value(input: &mut Parser<'_, '_>) -> Option<Color> {
    if let Ok(ident) = input.try_parse(|i| i.expect_ident_cloned()) {
        return named_color(&ident.to_ascii_lowercase());
    }

    // cssparser yields IDHash for `#abc` and Hash for `#123`; check the token
    // type inside try_parse so the position resets on the wrong variant.
    if let Ok(hash) = input.try_parse(|i| -> Result<_, ParseError<'_, ()>> {
        match i.next()? {
            Token::IDHash(h) | Token::Hash(h) => Ok(h.clone()),
            _ => Err(i.new_custom_error(())),
        }
    }) {
        return parse_hex_color(hash.as_ref());
    }

    if let Ok(color) = input.try_parse(parse_rgb_function) {
        return Some(color);
    }

    if let Ok(color) = input.try_parse(parse_hsl_function) {
        return Some(color);
    }

    None
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color::rgba(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

/// `rgb()`/`rgba()` with comma or space separated channels and optional alpha.
fn parse_rgb_function<'i, 't>(input: &mut Parser<'i, 't>) -> Result<Color, ParseError<'i, ()>> {
    let name = input.expect_function()?.clone();
    if !name.eq_ignore_ascii_case("rgb") && !name.eq_ignore_ascii_case("rgba") {
        return Err(input.new_custom_error(()));
    }
    input.parse_nested_block(|input| {
        let r = parse_rgb_component(input)?;
        let commas = input.try_parse(|i| i.expect_comma()).is_ok();
        let g = parse_rgb_component(input)?;
        if commas {
            input.expect_comma()?;
        }
        let b = parse_rgb_component(input)?;
        let a = parse_optional_alpha(input, commas)?;
        Ok(Color::rgba(r, g, b, a))
    })
}

fn parse_hsl_function<'i, 't>(input: &mut Parser<'i, 't>) -> Result<Color, ParseError<'i, ()>> {
    let name = input.expect_function()?.clone();
    if !name.eq_ignore_ascii_case("hsl") && !name.eq_ignore_ascii_case("hsla") {
        return Err(input.new_custom_error(()));
    }
    input.parse_nested_block(|input| {
        let location = input.current_source_location();
        let hue = match input.next()? {
            Token::Number { value, .. } => *value as f64,
            Token::Dimension { value, unit, .. } if unit.eq_ignore_ascii_case("deg") => {
                *value as f64
            }
            _ => return Err(location.new_custom_error(())),
        };
        let commas = input.try_parse(|i| i.expect_comma()).is_ok();
        let saturation = input.expect_percentage()? as f64;
        if commas {
            input.expect_comma()?;
        }
        let lightness = input.expect_percentage()? as f64;
        let a = parse_optional_alpha(input, commas)?;
        let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
        Ok(Color::rgba(r, g, b, a))
    })
}

fn parse_rgb_component<'i, 't>(input: &mut Parser<'i, 't>) -> Result<u8, ParseError<'i, ()>> {
    let location = input.current_source_location();
    match input.next()? {
        Token::Number { value, .. } => Ok(value.round().clamp(0.0, 255.0) as u8),
        Token::Percentage { unit_value, .. } => {
            Ok((unit_value * 255.0).round().clamp(0.0, 255.0) as u8)
        }
        _ => Err(location.new_custom_error(())),
    }
}

fn parse_optional_alpha<'i, 't>(
    input: &mut Parser<'i, 't>,
    commas: bool,
) -> Result<u8, ParseError<'i, ()>> {
    if input.is_exhausted() {
        return Ok(255);
    }
    if commas {
        input.expect_comma()?;
    } else {
        input.expect_delim('/')?;
    }
    let location = input.current_source_location();
    let alpha = match input.next()? {
        Token::Number { value, .. } => *value,
        Token::Percentage { unit_value, .. } => *unit_value,
        _ => return Err(location.new_custom_error(())),
    };
    Ok((alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let h = (((hue % 360.0) + 360.0) % 360.0) / 360.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    let channel = |mut t: f64| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };

    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name {
        "transparent" => Color::TRANSPARENT,
        "black" => Color::BLACK,
        "white" => Color::WHITE,
        "red" => Color::rgb(255, 0, 0),
        "green" => Color::rgb(0, 128, 0),
        "lime" => Color::rgb(0, 255, 0),
        "blue" => Color::rgb(0, 0, 255),
        "yellow" => Color::rgb(255, 255, 0),
        "cyan" | "aqua" => Color::rgb(0, 255, 255),
        "magenta" | "fuchsia" => Color::rgb(255, 0, 255),
        "gray" | "grey" => Color::rgb(128, 128, 128),
        "silver" => Color::rgb(192, 192, 192),
        "maroon" => Color::rgb(128, 0, 0),
        "olive" => Color::rgb(128, 128, 0),
        "purple" => Color::rgb(128, 0, 128),
        "teal" => Color::rgb(0, 128, 128),
        "navy" => Color::rgb(0, 0, 128),
        "orange" => Color::rgb(255, 165, 0),
        "pink" => Color::rgb(255, 192, 203),
        "brown" => Color::rgb(165, 42, 42),
        "gold" => Color::rgb(255, 215, 0),
        "indigo" => Color::rgb(75, 0, 130),
        "violet" => Color::rgb(238, 130, 238),
        "coral" => Color::rgb(255, 127, 80),
        "salmon" => Color::rgb(250, 128, 114),
        "tomato" => Color::rgb(255, 99, 71),
        "crimson" => Color::rgb(220, 20, 60),
        "khaki" => Color::rgb(240, 230, 140),
        "beige" => Color::rgb(245, 245, 220),
        "ivory" => Color::rgb(255, 255, 240),
        "lavender" => Color::rgb(230, 230, 250),
        "turquoise" => Color::rgb(64, 224, 208),
        "tan" => Color::rgb(210, 180, 140),
        "skyblue" => Color::rgb(135, 206, 235),
        "steelblue" => Color::rgb(70, 130, 180),
        "royalblue" => Color::rgb(65, 105, 225),
        "dodgerblue" => Color::rgb(30, 144, 255),
        "darkgray" | "darkgrey" => Color::rgb(169, 169, 169),
        "lightgray" | "lightgrey" => Color::rgb(211, 211, 211),
        "dimgray" | "dimgrey" => Color::rgb(105, 105, 105),
        "whitesmoke" => Color::rgb(245, 245, 245),
        "gainsboro" => Color::rgb(220, 220, 220),
        "darkred" => Color::rgb(139, 0, 0),
        "darkgreen" => Color::rgb(0, 100, 0),
        "darkblue" => Color::rgb(0, 0, 139),
        "lightblue" => Color::rgb(173, 216, 230),
        "lightgreen" => Color::rgb(144, 238, 144),
        "rebeccapurple" => Color::rgb(102, 51, 153),
        _ => return None,
    };
    Some(color)
}
