//! Property tables for the style engine.
//!
//! These are explicit enumerations rather than heuristics: which properties
//! take bare numbers, which carry colors, and how direction-sensitive
//! properties map between logical and physical sides.

use std::borrow::Cow;

use crate::util::hyphenate;

/// Properties whose numeric values are emitted without a `px` unit.
pub fn is_unitless(property: &str) -> bool {
    matches!(
        property,
        "animationIterationCount"
            | "aspectRatio"
            | "borderImageOutset"
            | "borderImageSlice"
            | "borderImageWidth"
            | "boxFlex"
            | "boxFlexGroup"
            | "boxOrdinalGroup"
            | "columnCount"
            | "flex"
            | "flexGrow"
            | "flexOrder"
            | "flexPositive"
            | "flexShrink"
            | "flexNegative"
            | "fontWeight"
            | "gridRow"
            | "gridRowEnd"
            | "gridRowGap"
            | "gridRowStart"
            | "gridColumn"
            | "gridColumnEnd"
            | "gridColumnGap"
            | "gridColumnStart"
            | "lineClamp"
            | "lineHeight"
            | "opacity"
            | "order"
            | "orphans"
            | "tabSize"
            | "widows"
            | "zIndex"
            | "zoom"
            | "fillOpacity"
            | "floodOpacity"
            | "stopOpacity"
            | "strokeDasharray"
            | "strokeDashoffset"
            | "strokeMiterlimit"
            | "strokeOpacity"
            | "strokeWidth"
            | "scale"
            | "scaleX"
            | "scaleY"
            | "scaleZ"
            | "shadowOpacity"
    )
}

/// Properties whose string values are normalized as colors.
pub fn is_color_property(property: &str) -> bool {
    matches!(
        property,
        "backgroundColor"
            | "borderColor"
            | "borderTopColor"
            | "borderRightColor"
            | "borderBottomColor"
            | "borderLeftColor"
            | "borderStartColor"
            | "borderEndColor"
            | "caretColor"
            | "color"
            | "outlineColor"
            | "placeholderTextColor"
            | "shadowColor"
            | "textDecorationColor"
            | "textShadowColor"
    )
}

/// Logical (`*Start`/`*End`) property to its physical LTR counterpart.
pub fn logical_to_physical(property: &str) -> Option<&'static str> {
    let physical = match property {
        "start" => "left",
        "end" => "right",
        "marginStart" => "marginLeft",
        "marginEnd" => "marginRight",
        "paddingStart" => "paddingLeft",
        "paddingEnd" => "paddingRight",
        "borderStartColor" => "borderLeftColor",
        "borderEndColor" => "borderRightColor",
        "borderStartStyle" => "borderLeftStyle",
        "borderEndStyle" => "borderRightStyle",
        "borderStartWidth" => "borderLeftWidth",
        "borderEndWidth" => "borderRightWidth",
        "borderTopStartRadius" | "borderStartStartRadius" => "borderTopLeftRadius",
        "borderTopEndRadius" | "borderStartEndRadius" => "borderTopRightRadius",
        "borderBottomStartRadius" | "borderEndStartRadius" => "borderBottomLeftRadius",
        "borderBottomEndRadius" | "borderEndEndRadius" => "borderBottomRightRadius",
        _ => return None,
    };
    Some(physical)
}

/// Physical left/right property to its horizontally mirrored counterpart.
pub fn mirror_property(property: &str) -> Option<&'static str> {
    let mirrored = match property {
        "left" => "right",
        "right" => "left",
        "marginLeft" => "marginRight",
        "marginRight" => "marginLeft",
        "paddingLeft" => "paddingRight",
        "paddingRight" => "paddingLeft",
        "borderLeftColor" => "borderRightColor",
        "borderRightColor" => "borderLeftColor",
        "borderLeftStyle" => "borderRightStyle",
        "borderRightStyle" => "borderLeftStyle",
        "borderLeftWidth" => "borderRightWidth",
        "borderRightWidth" => "borderLeftWidth",
        "borderTopLeftRadius" => "borderTopRightRadius",
        "borderTopRightRadius" => "borderTopLeftRadius",
        "borderBottomLeftRadius" => "borderBottomRightRadius",
        "borderBottomRightRadius" => "borderBottomLeftRadius",
        _ => return None,
    };
    Some(mirrored)
}

/// Physical property for `property` under the given direction.
///
/// Logical properties map to their LTR side and are then mirrored under RTL,
/// as are physical left/right properties. Anything else is returned as is.
pub fn localize_property(property: &str, rtl: bool) -> &str {
    let ltr = logical_to_physical(property).unwrap_or(property);
    if rtl {
        mirror_property(ltr).unwrap_or(ltr)
    } else {
        ltr
    }
}

/// Whether the property's name depends on writing direction.
pub fn is_direction_sensitive(property: &str) -> bool {
    logical_to_physical(property).is_some() || mirror_property(property).is_some()
}

/// Whether `property` is a logical (`*Start`/`*End`) property.
pub fn is_logical(property: &str) -> bool {
    logical_to_physical(property).is_some()
}

/// Properties whose keyword values (`left`, `right`, `start`, `end`) depend
/// on writing direction.
pub fn has_directional_values(property: &str) -> bool {
    matches!(property, "textAlign" | "float" | "clear")
}

/// Resolve a directional keyword for the given direction.
///
/// Returns `None` when the value is not one of the directional keywords.
pub fn localize_keyword(value: &str, rtl: bool) -> Option<&'static str> {
    let ltr_left = match value {
        "left" | "start" => true,
        "right" | "end" => false,
        _ => return None,
    };
    Some(if ltr_left != rtl { "left" } else { "right" })
}

/// Properties that remain shorthands after preprocessing.
pub fn is_shorthand(property: &str) -> bool {
    matches!(
        property,
        "animation"
            | "background"
            | "borderBlock"
            | "borderInline"
            | "display"
            | "flex"
            | "flexFlow"
            | "font"
            | "grid"
            | "gridArea"
            | "listStyle"
            | "outline"
            | "overflow"
            | "overscrollBehavior"
            | "placeContent"
            | "placeItems"
            | "placeSelf"
            | "textDecoration"
            | "transition"
    )
}

/// Vendor-prefixed duplicates emitted alongside some properties.
pub fn prefixed_variants(property: &str) -> &'static [&'static str] {
    match property {
        "appearance" => &["WebkitAppearance", "MozAppearance"],
        "backdropFilter" => &["WebkitBackdropFilter"],
        "userSelect" => &["WebkitUserSelect", "MozUserSelect"],
        "textDecorationLine" => &["WebkitTextDecorationLine"],
        _ => &[],
    }
}

/// Whether a property name is something the engine can emit.
///
/// Accepts camelCase identifiers and `--custom` properties.
pub fn is_valid_property_name(property: &str) -> bool {
    if let Some(rest) = property.strip_prefix("--") {
        return !rest.is_empty()
            && rest
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    }
    let mut chars = property.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// Localize a value whose meaning depends on writing direction.
///
/// Handles directional keywords (`textAlign`, `float`, `clear`), `translateX`
/// inside `transform` (negated under RTL) and property names listed in
/// `transitionProperty`, which are always emitted hyphenated.
pub fn localize_value<'a>(property: &str, value: &'a str, rtl: bool) -> Cow<'a, str> {
    match property {
        p if has_directional_values(p) => match localize_keyword(value, rtl) {
            Some(keyword) if keyword != value => Cow::Owned(keyword.to_string()),
            _ => Cow::Borrowed(value),
        },
        "transform" if rtl && value.contains("translateX(") => {
            Cow::Owned(negate_translate_x(value))
        }
        "transitionProperty" => Cow::Owned(
            value
                .split(',')
                .map(|name| {
                    let name = name.trim();
                    let camel = camelize(name);
                    hyphenate(localize_property(&camel, rtl))
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => Cow::Borrowed(value),
    }
}

fn camelize(name: &str) -> String {
    if name.starts_with("--") || !name.contains('-') {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for ch in name.trim_start_matches('-').chars() {
        if ch == '-' {
            upper = true;
        } else if upper {
            out.push(ch.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn negate_translate_x(value: &str) -> String {
    const NEEDLE: &str = "translateX(";
    let mut out = String::with_capacity(value.len() + 4);
    let mut rest = value;

    while let Some(pos) = rest.find(NEEDLE) {
        let arg_start = pos + NEEDLE.len();
        out.push_str(&rest[..arg_start]);

        let mut depth = 1usize;
        let mut arg_end = rest.len();
        for (i, ch) in rest[arg_start..].char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        arg_end = arg_start + i;
                        break;
                    }
                }
                _ => {}
            }
        }

        let arg = rest[arg_start..arg_end].trim();
        if let Some(positive) = arg.strip_prefix('-') {
            out.push_str(positive);
        } else if arg.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            if arg.trim_start_matches(['0', '.']).starts_with(|c: char| c.is_ascii_digit()) {
                out.push('-');
            }
            out.push_str(arg);
        } else {
            out.push_str(&format!("calc(-1 * {arg})"));
        }
        rest = &rest[arg_end..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localize_property() {
        assert_eq!(localize_property("marginStart", false), "marginLeft");
        assert_eq!(localize_property("marginStart", true), "marginRight");
        assert_eq!(localize_property("marginLeft", true), "marginRight");
        assert_eq!(localize_property("marginLeft", false), "marginLeft");
        assert_eq!(localize_property("marginTop", true), "marginTop");
        assert_eq!(
            localize_property("borderTopEndRadius", true),
            "borderTopLeftRadius"
        );
    }

    #[test]
    fn test_localize_keyword() {
        assert_eq!(localize_keyword("start", false), Some("left"));
        assert_eq!(localize_keyword("start", true), Some("right"));
        assert_eq!(localize_keyword("left", true), Some("right"));
        assert_eq!(localize_keyword("end", true), Some("left"));
        assert_eq!(localize_keyword("center", true), None);
    }

    #[test]
    fn test_mirror_is_involution() {
        for prop in ["left", "marginLeft", "borderTopRightRadius", "paddingRight"] {
            let mirrored = mirror_property(prop).unwrap();
            assert_eq!(mirror_property(mirrored), Some(prop));
        }
    }

    #[test]
    fn test_valid_property_names() {
        assert!(is_valid_property_name("marginLeft"));
        assert!(is_valid_property_name("--brand-color"));
        assert!(!is_valid_property_name("margin-left"));
        assert!(!is_valid_property_name("1abc"));
        assert!(!is_valid_property_name("--"));
        assert!(!is_valid_property_name(""));
    }

    #[test]
    fn test_localize_value() {
        assert_eq!(localize_value("textAlign", "start", true), "right");
        assert_eq!(localize_value("textAlign", "center", true), "center");
        assert_eq!(localize_value("float", "left", false), "left");
        assert_eq!(
            localize_value("transform", "translateX(10px) rotate(5deg)", true),
            "translateX(-10px) rotate(5deg)"
        );
        assert_eq!(
            localize_value("transform", "translateX(-4px)", true),
            "translateX(4px)"
        );
        assert_eq!(localize_value("transform", "translateX(0px)", true), "translateX(0px)");
        assert_eq!(
            localize_value("transform", "translateX(var(--x))", true),
            "translateX(calc(-1 * var(--x)))"
        );
        assert_eq!(
            localize_value("transform", "translateX(10px)", false),
            "translateX(10px)"
        );
    }

    #[test]
    fn test_localize_transition_property() {
        assert_eq!(
            localize_value("transitionProperty", "marginLeft, opacity", true),
            "margin-right,opacity"
        );
        assert_eq!(
            localize_value("transitionProperty", "padding-start", false),
            "padding-left"
        );
    }
}
