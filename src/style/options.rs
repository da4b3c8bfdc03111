//! Style engine configuration.

/// Logical text/layout direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WritingDirection {
    #[default]
    Ltr,
    Rtl,
    /// Treated as LTR by the style engine; the browser decides per element.
    Auto,
}

impl WritingDirection {
    pub fn is_rtl(self) -> bool {
        self == WritingDirection::Rtl
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WritingDirection::Ltr => "ltr",
            WritingDirection::Rtl => "rtl",
            WritingDirection::Auto => "auto",
        }
    }

    /// Writing direction for a BCP 47 locale code (`ar-EG`, `he`, `en_US`).
    ///
    /// An explicit script subtag decides; otherwise the primary language does.
    pub fn from_locale(locale: &str) -> Self {
        let mut subtags = locale.split(['-', '_']);
        let language = subtags.next().unwrap_or_default().to_ascii_lowercase();

        for subtag in subtags {
            if subtag.len() == 4 && subtag.chars().all(|c| c.is_ascii_alphabetic()) {
                return if is_rtl_script(subtag) {
                    WritingDirection::Rtl
                } else {
                    WritingDirection::Ltr
                };
            }
        }

        if is_rtl_language(&language) {
            WritingDirection::Rtl
        } else {
            WritingDirection::Ltr
        }
    }
}

fn is_rtl_script(script: &str) -> bool {
    matches!(
        script.to_ascii_lowercase().as_str(),
        "arab" | "syrc" | "samr" | "mand" | "thaa" | "mend" | "nkoo" | "adlm" | "rohg" | "hebr"
    )
}

fn is_rtl_language(language: &str) -> bool {
    matches!(
        language,
        "ae" | "ar"
            | "arc"
            | "bcc"
            | "bqi"
            | "ckb"
            | "dv"
            | "fa"
            | "far"
            | "glk"
            | "he"
            | "iw"
            | "khw"
            | "ks"
            | "ku"
            | "mzn"
            | "nqo"
            | "pnb"
            | "ps"
            | "sd"
            | "ug"
            | "ur"
            | "yi"
    )
}

/// Options for preprocessing and resolving styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct StyleOptions {
    pub writing_direction: WritingDirection,
    /// Convert `shadow*` properties into `boxShadow`.
    pub shadow: bool,
    /// Convert `textShadow*` properties into `textShadow`.
    pub text_shadow: bool,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            writing_direction: WritingDirection::Ltr,
            shadow: true,
            text_shadow: true,
        }
    }
}

impl StyleOptions {
    pub fn rtl() -> Self {
        Self {
            writing_direction: WritingDirection::Rtl,
            ..Self::default()
        }
    }

    pub fn with_direction(mut self, direction: WritingDirection) -> Self {
        self.writing_direction = direction;
        self
    }

    pub fn is_rtl(&self) -> bool {
        self.writing_direction.is_rtl()
    }
}
