//! Configuration for paragraph extraction and write-back.
//!
//! Options can be built in code with the `with_*` methods or loaded from a
//! YAML document with [`ExtractionOptions::from_yaml_str`].
//!
//! # Examples
//!
//! ```rust
//! use weft::ExtractionOptions;
//!
//! let options = ExtractionOptions::new()
//!     .with_translate_hidden_text(true)
//!     .with_excluded_style("Code");
//! assert!(options.translate_hidden_text);
//! ```

use crate::error::{Result, WeftError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A font substitution applied on write-back.
///
/// Locales and the source font are case-insensitive regular expressions
/// matched against the whole value. An empty pattern matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontMapping {
    pub source_locale: String,
    pub target_locale: String,
    pub source_font: String,
    pub target_font: String,
}

impl FontMapping {
    pub fn new(
        source_locale: impl Into<String>,
        target_locale: impl Into<String>,
        source_font: impl Into<String>,
        target_font: impl Into<String>,
    ) -> Self {
        Self {
            source_locale: source_locale.into(),
            target_locale: target_locale.into(),
            source_font: source_font.into(),
            target_font: target_font.into(),
        }
    }
}

/// Extraction options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionOptions {
    /// Whether runs hidden with `vanish` are translatable
    pub translate_hidden_text: bool,
    /// Whether comment parts are processed
    pub translate_comments: bool,
    /// Whether tracked changes are accepted rather than rejected with an error
    pub accept_revisions: bool,
    /// Style ids or names matched for exclusion
    pub excluded_styles: BTreeSet<String>,
    /// When `false`, only runs in `excluded_styles` are translatable
    pub style_exclude_mode: bool,
    /// Font colours (`RRGGBB`) whose runs are not translatable
    pub excluded_colors: BTreeSet<String>,
    /// Highlight colours matched for exclusion
    pub highlight_colors: BTreeSet<String>,
    /// When `false`, only runs highlighted in `highlight_colors` are translatable
    pub highlight_exclude_mode: bool,
    /// Extract `w:tab` as `\t` instead of a placeholder
    pub tab_as_character: bool,
    /// Extract `w:br`/`w:cr` line breaks as characters instead of placeholders
    pub line_separator_as_character: bool,
    /// Character used for extracted line breaks
    pub line_separator_replacement: char,
    /// Extract `w:noBreakHyphen` as a plain hyphen
    pub replace_no_break_hyphen: bool,
    /// Drop `w:softHyphen` from extracted content
    pub ignore_soft_hyphen: bool,
    /// Drop spacing, kerning, width and language run properties before comparing runs
    pub aggressive_cleanup: bool,
    /// Complex field instruction keywords whose result is translatable inline
    pub complex_field_keywords: BTreeSet<String>,
    /// Extract drawing names and VML text paths
    pub translate_graphic_metadata: bool,
    /// Minimise run properties against the style hierarchy before merging
    pub optimise_styles: bool,
    /// Font substitutions applied on write-back
    pub font_mappings: Vec<FontMapping>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            translate_hidden_text: false,
            translate_comments: true,
            accept_revisions: true,
            excluded_styles: BTreeSet::new(),
            style_exclude_mode: true,
            excluded_colors: BTreeSet::new(),
            highlight_colors: BTreeSet::new(),
            highlight_exclude_mode: true,
            tab_as_character: false,
            line_separator_as_character: false,
            line_separator_replacement: '\n',
            replace_no_break_hyphen: false,
            ignore_soft_hyphen: false,
            aggressive_cleanup: false,
            complex_field_keywords: BTreeSet::from(["HYPERLINK".to_string()]),
            translate_graphic_metadata: true,
            optimise_styles: true,
            font_mappings: Vec::new(),
        }
    }
}

impl ExtractionOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads options from YAML. Missing keys keep their defaults.
    ///
    /// ```rust
    /// use weft::ExtractionOptions;
    ///
    /// let options = ExtractionOptions::from_yaml_str("tab_as_character: true\n").unwrap();
    /// assert!(options.tab_as_character);
    /// assert!(options.accept_revisions);
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml).map_err(|e| WeftError::Config(e.to_string()))
    }

    /// Serialises the options to YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_saphyr::to_string(self).map_err(|e| WeftError::Config(e.to_string()))
    }

    #[inline]
    pub fn with_translate_hidden_text(mut self, translate: bool) -> Self {
        self.translate_hidden_text = translate;
        self
    }

    #[inline]
    pub fn with_translate_comments(mut self, translate: bool) -> Self {
        self.translate_comments = translate;
        self
    }

    #[inline]
    pub fn with_accept_revisions(mut self, accept: bool) -> Self {
        self.accept_revisions = accept;
        self
    }

    /// Add a style id or name to the exclusion set.
    #[inline]
    pub fn with_excluded_style(mut self, style: impl Into<String>) -> Self {
        self.excluded_styles.insert(style.into());
        self
    }

    /// Set whether the style set lists excluded (`true`) or included (`false`) styles.
    #[inline]
    pub fn with_style_exclude_mode(mut self, exclude: bool) -> Self {
        self.style_exclude_mode = exclude;
        self
    }

    #[inline]
    pub fn with_excluded_color(mut self, color: impl Into<String>) -> Self {
        self.excluded_colors.insert(color.into());
        self
    }

    #[inline]
    pub fn with_highlight_color(mut self, color: impl Into<String>) -> Self {
        self.highlight_colors.insert(color.into());
        self
    }

    #[inline]
    pub fn with_highlight_exclude_mode(mut self, exclude: bool) -> Self {
        self.highlight_exclude_mode = exclude;
        self
    }

    #[inline]
    pub fn with_tab_as_character(mut self, enabled: bool) -> Self {
        self.tab_as_character = enabled;
        self
    }

    #[inline]
    pub fn with_line_separator_as_character(mut self, enabled: bool) -> Self {
        self.line_separator_as_character = enabled;
        self
    }

    #[inline]
    pub fn with_line_separator_replacement(mut self, replacement: char) -> Self {
        self.line_separator_replacement = replacement;
        self
    }

    #[inline]
    pub fn with_replace_no_break_hyphen(mut self, enabled: bool) -> Self {
        self.replace_no_break_hyphen = enabled;
        self
    }

    #[inline]
    pub fn with_ignore_soft_hyphen(mut self, enabled: bool) -> Self {
        self.ignore_soft_hyphen = enabled;
        self
    }

    #[inline]
    pub fn with_aggressive_cleanup(mut self, enabled: bool) -> Self {
        self.aggressive_cleanup = enabled;
        self
    }

    /// Add a complex field keyword (matched case-insensitively).
    #[inline]
    pub fn with_complex_field_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.complex_field_keywords.insert(keyword.into().to_ascii_uppercase());
        self
    }

    /// Replace the complex field keyword whitelist.
    pub fn with_complex_field_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.complex_field_keywords = keywords
            .into_iter()
            .map(|k| k.into().to_ascii_uppercase())
            .collect();
        self
    }

    #[inline]
    pub fn with_translate_graphic_metadata(mut self, enabled: bool) -> Self {
        self.translate_graphic_metadata = enabled;
        self
    }

    #[inline]
    pub fn with_optimise_styles(mut self, enabled: bool) -> Self {
        self.optimise_styles = enabled;
        self
    }

    #[inline]
    pub fn with_font_mapping(mut self, mapping: FontMapping) -> Self {
        self.font_mappings.push(mapping);
        self
    }

    /// Whether a run or paragraph in `style` (matched by id or display name) is excluded.
    pub fn is_style_excluded(&self, style_id: &str, style_name: Option<&str>) -> bool {
        let listed = self.excluded_styles.contains(style_id)
            || style_name.is_some_and(|name| self.excluded_styles.contains(name));
        listed == self.style_exclude_mode
    }

    /// Whether a run highlighted with `color` (or unhighlighted when `None`) is excluded.
    pub fn is_highlight_excluded(&self, color: Option<&str>) -> bool {
        if self.highlight_colors.is_empty() {
            return false;
        }
        let listed = color.is_some_and(|c| self.highlight_colors.contains(c));
        listed == self.highlight_exclude_mode
    }

    /// Whether a run with font colour `color` is excluded.
    pub fn is_color_excluded(&self, color: &str) -> bool {
        self.excluded_colors.contains(color)
            || self
                .excluded_colors
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(color))
    }

    /// Whether the instruction keyword is in the complex field whitelist.
    pub fn is_translatable_field(&self, keyword: &str) -> bool {
        self.complex_field_keywords
            .iter()
            .any(|k| k.eq_ignore_ascii_case(keyword))
    }
}
