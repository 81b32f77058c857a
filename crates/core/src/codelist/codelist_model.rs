//! Codelist domain models.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::language::Language;

/// Identity of one coded value: `(domain, code, qualifier)`.
///
/// The domain is a plain namespace string such as `POHLAVI` or `CIS_BANK`.
/// Two keys are equal only when all three fields are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeKey {
    pub domain: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

impl CodeKey {
    pub fn new(domain: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            code: code.into(),
            qualifier: None,
        }
    }

    pub fn qualified(
        domain: impl Into<String>,
        code: impl Into<String>,
        qualifier: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            code: code.into(),
            qualifier: Some(qualifier.into()),
        }
    }
}

impl fmt::Display for CodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}:{}@{}", self.domain, self.code, qualifier),
            None => write!(f, "{}:{}", self.domain, self.code),
        }
    }
}

/// One stored codelist entry with its translations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodelistEntry {
    pub key: CodeKey,
    pub meaning_cs: Option<String>,
    pub meaning_en: Option<String>,
    pub abbreviation: Option<String>,
}

impl CodelistEntry {
    /// Display string for a language.
    ///
    /// Falls back to the default-language meaning when the preferred one is
    /// null, then to the abbreviation, then to the raw code.
    pub fn meaning(&self, language: Language) -> String {
        let preferred = match language {
            Language::Cs => self.meaning_cs.as_deref(),
            Language::En => self.meaning_en.as_deref(),
        };

        preferred
            .or(self.meaning_cs.as_deref())
            .or(self.abbreviation.as_deref())
            .unwrap_or(&self.key.code)
            .to_string()
    }
}

/// Localized meanings for a batch of keys, complete for every key requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMeanings {
    meanings: HashMap<CodeKey, String>,
}

impl ResolvedMeanings {
    pub fn new(meanings: HashMap<CodeKey, String>) -> Self {
        Self { meanings }
    }

    pub fn get(&self, key: &CodeKey) -> Option<&str> {
        self.meanings.get(key).map(String::as_str)
    }

    /// Meaning for a key that must have been resolved.
    pub fn require(&self, key: &CodeKey) -> Result<String> {
        self.get(key)
            .map(str::to_string)
            .ok_or_else(|| Error::MissingCodelistEntries([key.clone()].into_iter().collect()))
    }

    /// Resolve an optional code in `domain`.
    pub fn lookup(&self, domain: &str, code: Option<&str>) -> Result<Option<String>> {
        match code {
            Some(code) => self.require(&CodeKey::new(domain, code)).map(Some),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.meanings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meanings.is_empty()
    }

    pub fn into_inner(self) -> HashMap<CodeKey, String> {
        self.meanings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(cs: Option<&str>, en: Option<&str>, abbreviation: Option<&str>) -> CodelistEntry {
        CodelistEntry {
            key: CodeKey::new("TITUL_PRED", "Ing"),
            meaning_cs: cs.map(str::to_string),
            meaning_en: en.map(str::to_string),
            abbreviation: abbreviation.map(str::to_string),
        }
    }

    #[test]
    fn test_meaning_prefers_requested_language() {
        let e = entry(Some("inženýr"), Some("Engineer"), Some("Ing."));
        assert_eq!(e.meaning(Language::En), "Engineer");
        assert_eq!(e.meaning(Language::Cs), "inženýr");
    }

    #[test]
    fn test_meaning_fallback_chain() {
        assert_eq!(entry(Some("inženýr"), None, None).meaning(Language::En), "inženýr");
        assert_eq!(entry(None, None, Some("Ing.")).meaning(Language::En), "Ing.");
        assert_eq!(entry(None, None, None).meaning(Language::En), "Ing");
    }

    #[test]
    fn test_qualifier_is_part_of_identity() {
        let plain = CodeKey::new("KVANT_OBCAN", "1");
        let qualified = CodeKey::qualified("KVANT_OBCAN", "1", "STAG");
        assert_ne!(plain, qualified);
        assert_eq!(qualified.to_string(), "KVANT_OBCAN:1@STAG");
    }

    #[test]
    fn test_lookup_reports_unresolved_key() {
        let meanings = ResolvedMeanings::default();
        assert_eq!(meanings.lookup("POHLAVI", None), Ok(None));

        let err = meanings.lookup("POHLAVI", Some("M")).unwrap_err();
        assert_eq!(err.to_string(), "Missing codelist entries: POHLAVI:M");
    }
}
