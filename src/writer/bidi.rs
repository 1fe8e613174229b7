//! Text direction of regenerated WordprocessingML content.

use crate::styles::{BlockProperties, Property, RunProperties};
use crate::xml::{prefix_part, qualify};
use phf::phf_set;
use unicode_bidi::{BidiClass, bidi_class};

/// Languages written right to left.
static RTL_LANGUAGES: phf::Set<&'static str> = phf_set! {
    "ar", "arc", "ckb", "dv", "fa", "he", "iw", "ks", "ps", "sd", "syr", "ug", "ur", "yi",
};

/// `w:rPr` children that follow `w:rtl`.
const AFTER_RTL: [&str; 7] = ["cs", "em", "lang", "eastAsianLayout", "specVanish", "oMath", "rPrChange"];

/// `w:pPr` children that follow `w:bidi`.
const AFTER_BIDI: [&str; 17] = [
    "adjustRightInd",
    "snapToGrid",
    "spacing",
    "ind",
    "contextualSpacing",
    "mirrorIndents",
    "suppressOverlap",
    "jc",
    "textDirection",
    "textAlignment",
    "textboxTightWrap",
    "outlineLvl",
    "divId",
    "cnfStyle",
    "rPr",
    "sectPr",
    "pPrChange",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

impl Direction {
    /// Direction of a BCP 47 locale such as `ar-EG` or `he`.
    pub fn of_locale(locale: &str) -> Self {
        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if RTL_LANGUAGES.contains(language.as_str()) {
            Direction::RightToLeft
        } else {
            Direction::LeftToRight
        }
    }
}

/// Whether `text` has a strong right-to-left character.
pub fn has_strong_rtl(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(bidi_class(c), BidiClass::R | BidiClass::AL))
}

fn is_word(properties: &RunProperties) -> bool {
    prefix_part(properties.element_name()) == "w"
}

/// Sets or clears `w:rtl` on the properties of a run holding `text`.
pub fn adjust_run(properties: &mut RunProperties, direction: Direction, text: &str) {
    if !is_word(properties) {
        return;
    }
    match direction {
        Direction::RightToLeft if has_strong_rtl(text) => {
            if !properties.is_on("rtl") {
                properties.remove("rtl");
                let name = qualify(prefix_part(properties.element_name()), "rtl");
                properties.insert_before_any(Property::toggle_element(&name), &AFTER_RTL);
            }
        },
        Direction::RightToLeft => {},
        Direction::LeftToRight => {
            if properties.remove("rtl") {
                properties.omit_if_empty();
            }
        },
    }
}

/// Sets or clears `w:bidi` on paragraph properties whose text is `text`.
pub fn adjust_paragraph(properties: &mut BlockProperties, direction: Direction, text: &str) {
    if !is_word(properties) {
        return;
    }
    match direction {
        Direction::RightToLeft if has_strong_rtl(text) => {
            if !properties.is_on("bidi") {
                properties.remove("bidi");
                let name = qualify(prefix_part(properties.element_name()), "bidi");
                properties.insert_before_any(Property::toggle_element(&name), &AFTER_BIDI);
            }
        },
        Direction::RightToLeft => {},
        Direction::LeftToRight => {
            if properties.remove("bidi") {
                properties.omit_if_empty();
            }
        },
    }
}
