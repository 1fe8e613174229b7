//! Font substitution for regenerated runs.

use crate::error::Result;
use crate::options::FontMapping;
use crate::styles::RunProperties;
use regex::{Regex, RegexBuilder};

/// Attributes naming a font, by property element.
fn font_attributes(property: &str) -> &'static [&'static str] {
    match property {
        "rFonts" => &["ascii", "hAnsi", "eastAsia", "cs"],
        "latin" | "ea" | "cs" | "sym" => &["typeface"],
        _ => &[],
    }
}

fn whole_value_pattern(pattern: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    let regex = RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(true)
        .build()?;
    Ok(Some(regex))
}

fn matches(pattern: &Option<Regex>, value: &str) -> bool {
    pattern.as_ref().is_none_or(|regex| regex.is_match(value))
}

#[derive(Debug, Clone)]
struct FontRule {
    source_font: Option<Regex>,
    target_font: String,
}

/// The font mappings that apply to one source and target locale pair, in
/// configuration order.
#[derive(Debug, Clone, Default)]
pub struct ApplicableFontMappings {
    rules: Vec<FontRule>,
}

impl ApplicableFontMappings {
    pub fn new(mappings: &[FontMapping], source_locale: &str, target_locale: &str) -> Result<Self> {
        let mut rules = Vec::new();
        for mapping in mappings {
            if !matches(&whole_value_pattern(&mapping.source_locale)?, source_locale)
                || !matches(&whole_value_pattern(&mapping.target_locale)?, target_locale)
            {
                continue;
            }
            rules.push(FontRule {
                source_font: whole_value_pattern(&mapping.source_font)?,
                target_font: mapping.target_font.clone(),
            });
        }
        if !rules.is_empty() {
            log::debug!("{} font mappings apply to {source_locale} -> {target_locale}", rules.len());
        }
        Ok(Self { rules })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Replacement for `font`, from the first matching rule.
    pub fn target_font(&self, font: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| matches(&rule.source_font, font))
            .map(|rule| rule.target_font.as_str())
    }

    /// Rewrites the font references of run properties. Returns whether anything changed.
    pub fn apply(&self, properties: &mut RunProperties) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let mut changed = false;
        for property in properties.properties_mut() {
            let attributes = font_attributes(property.local_name());
            if attributes.is_empty() {
                continue;
            }
            changed |= property.rewrite_attributes(|local, value| {
                if attributes.contains(&local) {
                    self.target_font(value).map(str::to_string)
                } else {
                    None
                }
            });
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::{PropertySet, Provenance};
    use crate::xml::{read_events, write_events};

    fn rpr(xml: &str) -> RunProperties {
        PropertySet::from_events(&read_events(xml.as_bytes()).unwrap(), Provenance::Direct)
    }

    fn xml_of(properties: &RunProperties) -> String {
        String::from_utf8(write_events(&properties.events()).unwrap()).unwrap()
    }

    #[test]
    fn test_rules_filtered_by_locale() {
        let mappings = [
            FontMapping::new("en.*", "ja.*", "Arial|Helvetica", "MS Mincho"),
            FontMapping::new("en.*", "zh-CN", "Arial", "SimSun"),
            FontMapping::new("", "", "Times.*", "Noto Serif"),
        ];
        let japanese = ApplicableFontMappings::new(&mappings, "en-US", "ja-JP").unwrap();
        assert_eq!(japanese.target_font("arial"), Some("MS Mincho"));
        assert_eq!(japanese.target_font("Times New Roman"), Some("Noto Serif"));
        assert_eq!(japanese.target_font("Calibri"), None);

        let chinese = ApplicableFontMappings::new(&mappings, "en-GB", "zh-cn").unwrap();
        assert_eq!(chinese.target_font("Arial"), Some("SimSun"));
        assert_eq!(chinese.target_font("Helvetica"), None);
    }

    #[test]
    fn test_apply_to_word_and_drawingml() {
        let mappings = [FontMapping::new("en", "ja", "Arial", "Meiryo")];
        let fonts = ApplicableFontMappings::new(&mappings, "en", "ja").unwrap();

        let mut word = rpr(r#"<w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial" w:asciiTheme="minorHAnsi"/><w:b/></w:rPr>"#);
        assert!(fonts.apply(&mut word));
        assert_eq!(
            xml_of(&word),
            r#"<w:rPr><w:rFonts w:ascii="Meiryo" w:hAnsi="Meiryo" w:asciiTheme="minorHAnsi"/><w:b/></w:rPr>"#
        );

        let mut drawing = rpr(r#"<a:rPr lang="en-US"><a:latin typeface="Arial"/><a:cs typeface="Arial"/></a:rPr>"#);
        assert!(fonts.apply(&mut drawing));
        assert_eq!(
            xml_of(&drawing),
            r#"<a:rPr lang="en-US"><a:latin typeface="Meiryo"/><a:cs typeface="Meiryo"/></a:rPr>"#
        );
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let mappings = [FontMapping::new("(", "", "", "x")];
        assert!(ApplicableFontMappings::new(&mappings, "en", "fr").is_err());
    }
}
