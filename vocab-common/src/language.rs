//! Supported languages, CEFR levels and translation table resolution
//!
//! Vocabulary lives in one table per language and links live in one table
//! per language pair. Both are addressed through the closed [`Language`]
//! enum so a table name can never be built from arbitrary input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Language with its own vocabulary table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    En,
    Pl,
    Ru,
    Uk,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::De,
        Language::En,
        Language::Pl,
        Language::Ru,
        Language::Uk,
    ];

    /// ISO 639-1 code
    pub fn code(self) -> &'static str {
        match self {
            Language::De => "de",
            Language::En => "en",
            Language::Pl => "pl",
            Language::Ru => "ru",
            Language::Uk => "uk",
        }
    }

    /// English name, used in generation instructions
    pub fn name(self) -> &'static str {
        match self {
            Language::De => "German",
            Language::En => "English",
            Language::Pl => "Polish",
            Language::Ru => "Russian",
            Language::Uk => "Ukrainian",
        }
    }

    /// Lowercase alphabet used by alphabetical seeding
    pub fn alphabet(self) -> &'static [char] {
        match self {
            Language::De => &[
                'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p',
                'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ü', 'ß',
            ],
            Language::En => &[
                'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p',
                'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
            ],
            Language::Pl => &[
                'a', 'ą', 'b', 'c', 'ć', 'd', 'e', 'ę', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'ł',
                'm', 'n', 'ń', 'o', 'ó', 'p', 'r', 's', 'ś', 't', 'u', 'w', 'y', 'z', 'ź', 'ż',
            ],
            Language::Ru => &[
                'а', 'б', 'в', 'г', 'д', 'е', 'ё', 'ж', 'з', 'и', 'й', 'к', 'л', 'м', 'н', 'о',
                'п', 'р', 'с', 'т', 'у', 'ф', 'х', 'ц', 'ч', 'ш', 'щ', 'ъ', 'ы', 'ь', 'э', 'ю',
                'я',
            ],
            Language::Uk => &[
                'а', 'б', 'в', 'г', 'ґ', 'д', 'е', 'є', 'ж', 'з', 'и', 'і', 'ї', 'й', 'к', 'л',
                'м', 'н', 'о', 'п', 'р', 'с', 'т', 'у', 'ф', 'х', 'ц', 'ч', 'ш', 'щ', 'ь', 'ю',
                'я',
            ],
        }
    }

    /// Grammatical categories accepted in this language's `type` column
    pub fn word_types(self) -> &'static [&'static str] {
        match self {
            Language::En => &[
                "noun",
                "verb",
                "adjective",
                "adverb",
                "pronoun",
                "preposition",
                "conjunction",
                "interjection",
                "determiner",
                "phrase",
            ],
            Language::De => &[
                "noun",
                "verb",
                "adjective",
                "adverb",
                "pronoun",
                "preposition",
                "conjunction",
                "interjection",
                "article",
                "particle",
                "numeral",
                "phrase",
            ],
            Language::Pl | Language::Ru | Language::Uk => &[
                "noun",
                "verb",
                "adjective",
                "adverb",
                "pronoun",
                "preposition",
                "conjunction",
                "interjection",
                "particle",
                "numeral",
                "phrase",
            ],
        }
    }

    pub fn accepts_word_type(self, word_type: &str) -> bool {
        self.word_types().contains(&word_type)
    }

    /// Vocabulary table for this language
    pub fn vocabulary_table(self) -> &'static str {
        match self {
            Language::De => "words_de",
            Language::En => "words_en",
            Language::Pl => "words_pl",
            Language::Ru => "words_ru",
            Language::Uk => "words_uk",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedLanguage(s.to_string()))
    }
}

/// CEFR difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl Level {
    pub const ALL: [Level; 6] = [Level::A1, Level::A2, Level::B1, Level::B2, Level::C1, Level::C2];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::A1 => "A1",
            Level::A2 => "A2",
            Level::B1 => "B1",
            Level::B2 => "B2",
            Level::C1 => "C1",
            Level::C2 => "C2",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown CEFR level: {}", s)))
    }
}

/// Unordered pair of distinct languages, stored in code order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LanguagePair {
    first: Language,
    second: Language,
}

impl LanguagePair {
    pub fn new(a: Language, b: Language) -> Result<Self> {
        if a == b {
            return Err(Error::InvalidInput(format!(
                "Language pair needs two different languages, got {} twice",
                a
            )));
        }
        let (first, second) = if a.code() < b.code() { (a, b) } else { (b, a) };
        Ok(Self { first, second })
    }

    /// Lexicographically first code; owns the `word_id1` column
    pub fn first(&self) -> Language {
        self.first
    }

    /// Lexicographically second code; owns the `word_id2` column
    pub fn second(&self) -> Language {
        self.second
    }

    /// Lookup key: sorted codes joined with `_`
    pub fn key(&self) -> String {
        format!("{}_{}", self.first.code(), self.second.code())
    }

    pub fn contains(&self, lang: Language) -> bool {
        self.first == lang || self.second == lang
    }

    /// All pairs of supported languages
    pub fn all() -> Vec<LanguagePair> {
        let mut pairs = Vec::new();
        for (i, a) in Language::ALL.iter().enumerate() {
            for b in &Language::ALL[i + 1..] {
                pairs.push(LanguagePair { first: *a, second: *b });
            }
        }
        pairs
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Column of a link table that references a given language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkColumn {
    WordId1,
    WordId2,
}

impl LinkColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkColumn::WordId1 => "word_id1",
            LinkColumn::WordId2 => "word_id2",
        }
    }
}

/// Typed handle to a registered translation link table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationTable {
    pair: LanguagePair,
    name: String,
}

impl TranslationTable {
    fn new(pair: LanguagePair) -> Self {
        Self {
            name: format!("translations_{}", pair.key()),
            pair,
        }
    }

    pub fn pair(&self) -> LanguagePair {
        self.pair
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column holding ids of `lang`'s words
    pub fn column_for(&self, lang: Language) -> Result<LinkColumn> {
        if lang == self.pair.first {
            Ok(LinkColumn::WordId1)
        } else if lang == self.pair.second {
            Ok(LinkColumn::WordId2)
        } else {
            Err(Error::InvalidInput(format!(
                "Language {} is not part of table {}",
                lang, self.name
            )))
        }
    }
}

/// Set of language pairs that have a translation table
#[derive(Debug, Clone)]
pub struct TableRegistry {
    pairs: BTreeSet<LanguagePair>,
}

impl TableRegistry {
    /// Registry with a link table for every supported pair
    pub fn all_pairs() -> Self {
        Self {
            pairs: LanguagePair::all().into_iter().collect(),
        }
    }

    pub fn with_pairs(pairs: impl IntoIterator<Item = LanguagePair>) -> Self {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    /// Resolve the link table for two languages, in either order
    pub fn translation_table(&self, a: Language, b: Language) -> Result<TranslationTable> {
        let pair = LanguagePair::new(a, b)?;
        if self.pairs.contains(&pair) {
            Ok(TranslationTable::new(pair))
        } else {
            Err(Error::UnsupportedLanguagePair(
                pair.first().code().to_string(),
                pair.second().code().to_string(),
            ))
        }
    }

    /// Every registered table that references `lang`
    pub fn tables_for(&self, lang: Language) -> Vec<TranslationTable> {
        self.pairs
            .iter()
            .filter(|pair| pair.contains(lang))
            .map(|pair| TranslationTable::new(*pair))
            .collect()
    }

    pub fn tables(&self) -> Vec<TranslationTable> {
        self.pairs.iter().map(|pair| TranslationTable::new(*pair)).collect()
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::all_pairs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_sorted() {
        let pair = LanguagePair::new(Language::Ru, Language::Pl).unwrap();
        assert_eq!(pair.key(), "pl_ru");
        assert_eq!(pair.first(), Language::Pl);
        assert_eq!(pair, LanguagePair::new(Language::Pl, Language::Ru).unwrap());
    }

    #[test]
    fn test_pair_rejects_same_language() {
        assert!(LanguagePair::new(Language::En, Language::En).is_err());
    }

    #[test]
    fn test_all_pairs_count() {
        assert_eq!(LanguagePair::all().len(), 10);
    }

    #[test]
    fn test_registry_resolves_either_order() {
        let registry = TableRegistry::all_pairs();
        let table = registry.translation_table(Language::Ru, Language::En).unwrap();
        assert_eq!(table.name(), "translations_en_ru");
        assert_eq!(table.column_for(Language::En).unwrap(), LinkColumn::WordId1);
        assert_eq!(table.column_for(Language::Ru).unwrap(), LinkColumn::WordId2);
        assert!(table.column_for(Language::Pl).is_err());
    }

    #[test]
    fn test_registry_unknown_pair() {
        let registry =
            TableRegistry::with_pairs([LanguagePair::new(Language::Pl, Language::Ru).unwrap()]);
        let err = registry.translation_table(Language::En, Language::De).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguagePair(a, b) if a == "de" && b == "en"));
        assert_eq!(registry.tables_for(Language::En).len(), 0);
        assert_eq!(registry.tables_for(Language::Ru).len(), 1);
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("PL".parse::<Language>().unwrap(), Language::Pl);
        assert!(matches!("xx".parse::<Language>(), Err(Error::UnsupportedLanguage(_))));
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("b2".parse::<Level>().unwrap(), Level::B2);
        assert!("D1".parse::<Level>().is_err());
    }

    #[test]
    fn test_word_types_per_language() {
        assert!(Language::De.accepts_word_type("article"));
        assert!(!Language::En.accepts_word_type("article"));
        assert!(Language::Ru.accepts_word_type("particle"));
    }

    #[test]
    fn test_alphabets_are_lowercase_and_unique() {
        for lang in Language::ALL {
            let letters = lang.alphabet();
            let unique: BTreeSet<_> = letters.iter().collect();
            assert_eq!(unique.len(), letters.len(), "{} alphabet has duplicates", lang);
            assert!(letters.iter().all(|c| !c.is_uppercase()));
        }
    }
}
