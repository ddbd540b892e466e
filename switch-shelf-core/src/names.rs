//! Per-language display names with a fallback rule.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Languages of the control data name table, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    AmericanEnglish,
    BritishEnglish,
    Japanese,
    French,
    German,
    LatinAmericanSpanish,
    Spanish,
    Italian,
    Dutch,
    CanadianFrench,
    Portuguese,
    Russian,
    Korean,
    TraditionalChinese,
    SimplifiedChinese,
    BrazilianPortuguese,
}

impl Language {
    /// All languages in name table order.
    pub const ALL: [Language; 16] = [
        Language::AmericanEnglish,
        Language::BritishEnglish,
        Language::Japanese,
        Language::French,
        Language::German,
        Language::LatinAmericanSpanish,
        Language::Spanish,
        Language::Italian,
        Language::Dutch,
        Language::CanadianFrench,
        Language::Portuguese,
        Language::Russian,
        Language::Korean,
        Language::TraditionalChinese,
        Language::SimplifiedChinese,
        Language::BrazilianPortuguese,
    ];

    /// Language stored at `index` of the name table.
    pub fn from_index(index: usize) -> Option<Language> {
        Self::ALL.get(index).copied()
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::AmericanEnglish => "en-US",
            Language::BritishEnglish => "en-GB",
            Language::Japanese => "ja",
            Language::French => "fr",
            Language::German => "de",
            Language::LatinAmericanSpanish => "es-419",
            Language::Spanish => "es",
            Language::Italian => "it",
            Language::Dutch => "nl",
            Language::CanadianFrench => "fr-CA",
            Language::Portuguese => "pt",
            Language::Russian => "ru",
            Language::Korean => "ko",
            Language::TraditionalChinese => "zh-TW",
            Language::SimplifiedChinese => "zh-CN",
            Language::BrazilianPortuguese => "pt-BR",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Display names keyed by language.
///
/// Lookup prefers the requested language and otherwise falls back to the
/// first populated entry in name table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayNames(BTreeMap<Language, String>);

impl DisplayNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a name. Blank names are ignored.
    pub fn insert(&mut self, language: Language, name: impl Into<String>) {
        let name = name.into();
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            self.0.insert(language, trimmed.to_string());
        }
    }

    pub fn with(mut self, language: Language, name: impl Into<String>) -> Self {
        self.insert(language, name);
        self
    }

    pub fn get(&self, language: Language) -> Option<&str> {
        self.0.get(&language).map(String::as_str)
    }

    /// Name in `preferred`, else the first populated language.
    pub fn resolve(&self, preferred: Language) -> Option<&str> {
        self.get(preferred)
            .or_else(|| self.0.values().next().map(String::as_str))
    }

    /// Name with the default English preference.
    pub fn primary(&self) -> Option<&str> {
        self.resolve(Language::AmericanEnglish)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &str)> {
        self.0.iter().map(|(l, n)| (*l, n.as_str()))
    }
}
