//! Language packs: per-category sentence templates, position phrases, and
//! label translations for the supported narration languages.
//!
//! English and Hindi ship built in; additional packs can be registered at
//! runtime. Composing in a language with no pack falls back to the default
//! language — degraded narration beats silence.

use crate::observation::{Category, ObservationKind, ScoredObservation};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Narration language. Open-ended: any code can be requested, but only
/// languages with a registered pack can actually compose.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    En,
    Hi,
    Other(String),
}

impl Language {
    pub fn code(&self) -> &str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "en" => Language::En,
            "hi" => Language::Hi,
            other => Language::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CodeVisitor;

        impl Visitor<'_> for CodeVisitor {
            type Value = Language;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a language code string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Language, E> {
                Ok(Language::from_code(value))
            }
        }

        deserializer.deserialize_str(CodeVisitor)
    }
}

/// Horizontal third of the frame the box centroid falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Left,
    Ahead,
    Right,
}

impl Position {
    pub fn of(center_x: f32) -> Self {
        if center_x < 1.0 / 3.0 {
            Position::Left
        } else if center_x > 2.0 / 3.0 {
            Position::Right
        } else {
            Position::Ahead
        }
    }
}

/// Sentence templates and vocabulary for one language.
///
/// Templates use `{label}` and `{pos}` placeholders; the label translation
/// table maps lowercased detector classes, unknown labels pass through.
#[derive(Debug, Clone)]
pub struct LanguagePack {
    /// Hazard sentence, e.g. "Caution, {label} {pos}".
    pub hazard: String,
    /// Person, signage object, and generic object sentence.
    pub object: String,
    /// Recognized text classified as signage.
    pub sign_text: String,
    /// Plain recognized text.
    pub plain_text: String,
    pub ahead: String,
    pub left: String,
    pub right: String,
    pub labels: HashMap<String, String>,
}

impl LanguagePack {
    pub fn english() -> Self {
        Self {
            hazard: "Caution, {label} {pos}".to_string(),
            object: "{label} {pos}".to_string(),
            sign_text: "Sign {pos} reads {label}".to_string(),
            plain_text: "Text {pos} reads {label}".to_string(),
            ahead: "ahead".to_string(),
            left: "to your left".to_string(),
            right: "to your right".to_string(),
            labels: [("car", "vehicle")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn hindi() -> Self {
        Self {
            hazard: "सावधान, {label} {pos}".to_string(),
            object: "{label} {pos}".to_string(),
            sign_text: "{pos} साइन पर लिखा है: {label}".to_string(),
            plain_text: "{pos} टेक्स्ट पर लिखा है: {label}".to_string(),
            ahead: "सामने".to_string(),
            left: "आपकी बाईं ओर".to_string(),
            right: "आपकी दाईं ओर".to_string(),
            labels: [
                ("stairs", "सीढ़ियाँ"),
                ("door", "दरवाज़ा"),
                ("person", "व्यक्ति"),
                ("car", "गाड़ी"),
                ("truck", "ट्रक"),
                ("bus", "बस"),
                ("bicycle", "साइकिल"),
                ("motorcycle", "मोटरसाइकिल"),
                ("chair", "कुर्सी"),
                ("couch", "सोफा"),
                ("bench", "बेंच"),
                ("stop sign", "स्टॉप साइन"),
                ("traffic light", "ट्रैफ़िक लाइट"),
                ("bottle", "बोतल"),
                ("cup", "कप"),
                ("knife", "चाकू"),
                ("cell phone", "मोबाइल फोन"),
                ("laptop", "लैपटॉप"),
                ("dog", "कुत्ता"),
                ("cat", "बिल्ली"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        }
    }

    fn translate<'a>(&'a self, label: &'a str) -> &'a str {
        self.labels
            .get(&label.to_lowercase())
            .map(String::as_str)
            .unwrap_or(label)
    }

    fn position_phrase(&self, position: Position) -> &str {
        match position {
            Position::Left => &self.left,
            Position::Ahead => &self.ahead,
            Position::Right => &self.right,
        }
    }

    /// Render one scored observation into a sentence.
    pub fn render(&self, scored: &ScoredObservation) -> String {
        let template = match (scored.category, scored.kind()) {
            (Category::Hazard, _) => &self.hazard,
            (Category::Signage, ObservationKind::Text) => &self.sign_text,
            (Category::Text, _) => &self.plain_text,
            _ => &self.object,
        };
        let position = Position::of(scored.bbox().center_x());
        let sentence = template
            .replace("{label}", self.translate(scored.label()))
            .replace("{pos}", self.position_phrase(position));
        capitalize(&sentence)
    }
}

fn capitalize(sentence: &str) -> String {
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// The set of registered language packs plus the fallback default.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    packs: HashMap<Language, LanguagePack>,
    default_language: Language,
}

impl TemplateSet {
    /// English and Hindi, defaulting to English.
    pub fn builtin() -> Self {
        let mut packs = HashMap::new();
        packs.insert(Language::En, LanguagePack::english());
        packs.insert(Language::Hi, LanguagePack::hindi());
        Self {
            packs,
            default_language: Language::En,
        }
    }

    pub fn register(&mut self, language: Language, pack: LanguagePack) {
        self.packs.insert(language, pack);
    }

    pub fn supports(&self, language: &Language) -> bool {
        self.packs.contains_key(language)
    }

    pub fn default_language(&self) -> &Language {
        &self.default_language
    }

    /// Resolve a requested language to a composable one.
    ///
    /// Returns the language to use and whether this was a fallback.
    pub fn resolve(&self, requested: &Language) -> (Language, bool) {
        if self.supports(requested) {
            (requested.clone(), false)
        } else {
            (self.default_language.clone(), true)
        }
    }

    /// Pack for a language known to be supported.
    pub fn pack(&self, language: &Language) -> &LanguagePack {
        self.packs
            .get(language)
            .unwrap_or_else(|| &self.packs[&self.default_language])
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}
