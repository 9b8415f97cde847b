//! Deciding whether a WHOIS response describes an unregistered domain.
//!
//! Registries phrase "no such domain" in dozens of ways and several
//! languages, so the check is an ordered list of case-insensitive patterns
//! behind a trait that embedders can replace.

use crate::error::DomainLookupError;
use regex::{Regex, RegexBuilder};

/// Classifies WHOIS response text.
pub trait AvailabilityClassifier: Send + Sync {
    /// Whether `text` says the queried domain is not registered.
    fn looks_unregistered(&self, text: &str) -> bool;

    /// Whether `text` looks like a record for a registered domain.
    fn looks_registered(&self, text: &str) -> bool {
        !text.trim().is_empty() && !self.looks_unregistered(text)
    }
}

/// Phrases that mean "not registered", in match order.
const DEFAULT_PHRASES: &[&str] = &[
    // English
    r"\bno match(es)? for\b",
    r"^\s*no match\b",
    r"\bno data found\b",
    r"\bno entries found\b",
    r"\bno matching (record|entry|entries)\b",
    r"\bdomain (name )?not found\b",
    r"\bnot found\b",
    r"\bno object found\b",
    r"\b(the queried )?object does not exist\b",
    r"\bno such domain\b",
    r"\bdomain status:\s*no object found\b",
    r"\bstatus:\s*(available|free)\b",
    r"\bno information available\b",
    r"\bhas not been registered\b",
    r"\bis not registered\b",
    r"\bis available for (registration|purchase)\b",
    r"\bdomain (is )?available\b",
    // French
    r"\baucune correspondance\b",
    r"\bn'est pas enregistr[ée]\b",
    // German
    r"\bnicht registriert\b",
    r"\bkeine daten gefunden\b",
    // Spanish
    r"\bno se (ha )?encontr[óo]\b",
    r"\bdominio no registrado\b",
    r"\bel dominio no existe\b",
    // Portuguese
    r"não encontrad[oa]",
    r"\bnenhum resultado\b",
    r"não (está )?registrado",
    // Italian
    r"\bnon trovato\b",
    r"\bnessun risultato\b",
    // Dutch
    r"\bis free\b",
    r"\bniet geregistreerd\b",
];

/// Pattern-list classifier with English, French, German, Spanish,
/// Portuguese, Italian and Dutch phrases.
#[derive(Debug, Clone)]
pub struct PhraseClassifier {
    patterns: Vec<Regex>,
}

impl PhraseClassifier {
    /// Classifier with the built-in phrase list.
    pub fn new() -> Self {
        let patterns = DEFAULT_PHRASES
            .iter()
            .filter_map(|p| compile(p).ok())
            .collect();
        Self { patterns }
    }

    /// Classifier with no phrases at all.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Append a phrase pattern, checked after the existing ones.
    pub fn with_phrase(mut self, pattern: &str) -> Result<Self, DomainLookupError> {
        self.patterns.push(compile(pattern)?);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile(pattern: &str) -> Result<Regex, DomainLookupError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .map_err(DomainLookupError::from)
}

impl Default for PhraseClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl AvailabilityClassifier for PhraseClassifier {
    fn looks_unregistered(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_default_phrases_compile() {
        assert_eq!(PhraseClassifier::new().len(), DEFAULT_PHRASES.len());
    }

    #[test]
    fn test_english_negative_answers() {
        let classifier = PhraseClassifier::new();
        assert!(classifier.looks_unregistered("No match for domain.com"));
        assert!(classifier.looks_unregistered("No match for \"FREE-DOMAIN.COM\".\r\n>>> Last update"));
        assert!(classifier.looks_unregistered("NOT FOUND"));
        assert!(classifier.looks_unregistered("%% No entries found in the AFNIC Database."));
        assert!(classifier.looks_unregistered("The queried object does not exist: "));
        assert!(classifier.looks_unregistered("Domain: example.it\nStatus:             AVAILABLE"));
    }

    #[test]
    fn test_other_languages() {
        let classifier = PhraseClassifier::new();
        assert!(classifier.looks_unregistered("Domain: beispiel.de\nStatus: free"));
        assert!(classifier.looks_unregistered("voorbeeld.nl is free"));
        assert!(classifier.looks_unregistered("% Nenhum resultado encontrado"));
        assert!(classifier.looks_unregistered("El dominio no existe"));
    }

    #[test]
    fn test_registered_record() {
        let classifier = PhraseClassifier::new();
        let text = "Domain Name: EXAMPLE.COM\nRegistrar: Example Registrar\nCreation Date: 1995-08-14T04:00:00Z\n";
        assert!(!classifier.looks_unregistered(text));
        assert!(classifier.looks_registered(text));
        assert!(!classifier.looks_registered("   "));
    }

    #[test]
    fn test_custom_phrase() {
        let classifier = PhraseClassifier::empty()
            .with_phrase(r"^libre$")
            .unwrap();
        assert!(classifier.looks_unregistered("LIBRE"));
        assert!(!classifier.looks_unregistered("No match for x.com"));
        assert!(PhraseClassifier::empty().with_phrase("(unclosed").is_err());
    }
}
