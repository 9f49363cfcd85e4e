//! Token-sequence pattern matching over the word stream.
//!
//! A pattern is a sequence of units matched against consecutive words.
//! Units are literals, compiled regular expressions, a single-token
//! wildcard (`*`) or a bounded gap (`*:N`, zero to N tokens). Matching
//! backtracks over gap widths, takes the first match per start position
//! and continues non-overlapping after each match.

use regex::Regex;

use crate::document::Document;
use crate::element::NodeId;
use crate::error::{FoliaError, Result};
use crate::properties::annotation_element;
use crate::text::TextParameters;
use crate::types::AnnotationType;

/// One unit of a pattern.
#[derive(Debug, Clone)]
pub enum PatternUnit {
    Literal(String),
    Regex(Regex),
    /// Exactly one arbitrary token (`*`).
    Wildcard,
    /// Zero to `max` arbitrary tokens (`*:N`).
    Gap { max: usize },
}

/// Matching options.
#[derive(Debug, Clone)]
pub struct PatternOptions {
    pub case_sensitive: bool,
    /// Width bound for gap units written without an explicit count.
    pub max_gap_size: usize,
    /// Match against this annotation's class instead of the word text.
    pub annotation: Option<(AnnotationType, Option<String>)>,
    /// Text class matched against when no annotation is configured.
    pub text_class: String,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            max_gap_size: 10,
            annotation: None,
            text_class: "current".to_string(),
        }
    }
}

/// A compiled token-sequence pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    units: Vec<PatternUnit>,
    options: PatternOptions,
}

impl Pattern {
    /// Compile a pattern from unit syntax.
    ///
    /// `regexp('...')` compiles the inner expression (anchored, and
    /// case-insensitive unless the options say otherwise); `*` is a
    /// single-token wildcard; `*:N` a gap of at most N tokens.
    pub fn new(units: &[&str], options: PatternOptions) -> Result<Self> {
        let mut compiled = Vec::with_capacity(units.len());
        for unit in units {
            compiled.push(Self::parse_unit(unit, &options)?);
        }
        if compiled.is_empty() {
            return Err(FoliaError::Args("empty pattern".to_string()));
        }
        Ok(Self {
            units: compiled,
            options,
        })
    }

    fn parse_unit(unit: &str, options: &PatternOptions) -> Result<PatternUnit> {
        if unit == "*" {
            return Ok(PatternUnit::Wildcard);
        }
        if let Some(rest) = unit.strip_prefix("*:") {
            let max = if rest.is_empty() {
                options.max_gap_size
            } else {
                rest.parse::<usize>().map_err(|_| {
                    FoliaError::Args(format!("invalid gap width in pattern unit '{unit}'"))
                })?
            };
            return Ok(PatternUnit::Gap { max });
        }
        if let Some(inner) = unit
            .strip_prefix("regexp('")
            .and_then(|r| r.strip_suffix("')"))
        {
            let expr = if options.case_sensitive {
                format!("^(?:{inner})$")
            } else {
                format!("(?i)^(?:{inner})$")
            };
            let re = Regex::new(&expr)
                .map_err(|e| FoliaError::Args(format!("invalid pattern regexp: {e}")))?;
            return Ok(PatternUnit::Regex(re));
        }
        Ok(PatternUnit::Literal(unit.to_string()))
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether the matched window width can vary (any gap unit present).
    #[must_use]
    pub fn variable_size(&self) -> bool {
        self.units
            .iter()
            .any(|u| matches!(u, PatternUnit::Gap { .. }))
    }

    /// Positions of wildcard and gap units.
    #[must_use]
    pub fn variable_wildcards(&self) -> Vec<usize> {
        self.units
            .iter()
            .enumerate()
            .filter(|(_, u)| matches!(u, PatternUnit::Wildcard | PatternUnit::Gap { .. }))
            .map(|(i, _)| i)
            .collect()
    }

    /// Fix every gap to a single-token wildcard, making the window width
    /// constant.
    pub fn unset_wild(&mut self) {
        for unit in &mut self.units {
            if matches!(unit, PatternUnit::Gap { .. }) {
                *unit = PatternUnit::Wildcard;
            }
        }
    }

    /// Prepend wildcards until the pattern has `len` units.
    fn left_pad(&self, len: usize) -> Pattern {
        let mut units = vec![PatternUnit::Wildcard; len.saturating_sub(self.units.len())];
        units.extend(self.units.iter().cloned());
        Pattern {
            units,
            options: self.options.clone(),
        }
    }

    fn unit_matches(&self, unit: &PatternUnit, token: &str) -> bool {
        match unit {
            PatternUnit::Wildcard | PatternUnit::Gap { .. } => true,
            PatternUnit::Literal(lit) => {
                if self.options.case_sensitive {
                    token == lit
                } else {
                    token.to_lowercase() == lit.to_lowercase()
                }
            }
            PatternUnit::Regex(re) => re.is_match(token),
        }
    }

    /// Match against `tokens` starting at position 0; smallest gap widths
    /// first. Returns the number of tokens consumed.
    fn match_prefix(&self, tokens: &[Option<String>]) -> Option<usize> {
        self.match_units(&self.units, tokens)
    }

    fn match_units(&self, units: &[PatternUnit], tokens: &[Option<String>]) -> Option<usize> {
        let Some((first, rest)) = units.split_first() else {
            return Some(0);
        };
        if let PatternUnit::Gap { max } = first {
            for width in 0..=*max {
                if width > tokens.len() {
                    break;
                }
                if let Some(consumed) = self.match_units(rest, &tokens[width..]) {
                    return Some(width + consumed);
                }
            }
            return None;
        }
        let token = tokens.first()?.as_deref()?;
        if self.unit_matches(first, token) {
            self.match_units(rest, &tokens[1..])
                .map(|consumed| consumed + 1)
        } else {
            None
        }
    }

    /// Whether the pattern consumes `tokens` exactly.
    fn matches_exactly(&self, tokens: &[Option<String>]) -> bool {
        self.matches_len(&self.units, tokens)
    }

    fn matches_len(&self, units: &[PatternUnit], tokens: &[Option<String>]) -> bool {
        let Some((first, rest)) = units.split_first() else {
            return tokens.is_empty();
        };
        if let PatternUnit::Gap { max } = first {
            return (0..=*max)
                .take_while(|w| *w <= tokens.len())
                .any(|w| self.matches_len(rest, &tokens[w..]));
        }
        let Some(Some(token)) = tokens.first() else {
            return false;
        };
        self.unit_matches(first, token) && self.matches_len(rest, &tokens[1..])
    }
}

impl Document {
    /// The string a word contributes to pattern matching, per the options.
    fn match_token(&self, word: NodeId, options: &PatternOptions) -> Option<String> {
        match &options.annotation {
            None => {
                let params = TextParameters::default().with_class(options.text_class.clone());
                self.text(word, &params).ok()
            }
            Some((at, set)) => {
                let kind = annotation_element(*at)?;
                self.children(word)
                    .iter()
                    .copied()
                    .find(|c| {
                        self.kind(*c) == kind
                            && (set.is_none() || self.node(*c).attrs.set == *set)
                    })
                    .and_then(|a| self.node(a).attrs.class.clone())
            }
        }
    }

    /// All non-overlapping pattern matches over the document's words.
    ///
    /// Each match is the full covered word window, gap tokens included.
    #[must_use]
    pub fn find_words(&self, pattern: &Pattern) -> Vec<Vec<NodeId>> {
        let words = self.words();
        let tokens: Vec<Option<String>> = words
            .iter()
            .map(|w| self.match_token(*w, &pattern.options))
            .collect();
        let mut matches = Vec::new();
        let mut start = 0;
        while start < words.len() {
            match pattern.match_prefix(&tokens[start..]) {
                Some(consumed) if consumed > 0 => {
                    matches.push(words[start..start + consumed].to_vec());
                    start += consumed;
                }
                _ => start += 1,
            }
        }
        matches
    }

    /// Match several patterns simultaneously: a window counts only when
    /// every pattern covers exactly the same words. Shorter patterns are
    /// left-padded with wildcards.
    #[must_use]
    pub fn find_words_multi(&self, patterns: &[Pattern]) -> Vec<Vec<NodeId>> {
        if patterns.is_empty() {
            return Vec::new();
        }
        let longest = patterns.iter().map(Pattern::len).max().unwrap_or(0);
        let padded: Vec<Pattern> = patterns.iter().map(|p| p.left_pad(longest)).collect();
        let token_sets: Vec<Vec<Option<String>>> = padded
            .iter()
            .map(|p| {
                self.words()
                    .iter()
                    .map(|w| self.match_token(*w, &p.options))
                    .collect()
            })
            .collect();
        let words = self.words();
        let mut matches = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let window = padded[0].match_prefix(&token_sets[0][start..]);
            let Some(consumed) = window.filter(|c| *c > 0) else {
                start += 1;
                continue;
            };
            let all_agree = padded.iter().zip(&token_sets).skip(1).all(|(p, toks)| {
                p.matches_exactly(&toks[start..start + consumed])
            });
            if all_agree {
                matches.push(words[start..start + consumed].to_vec());
                start += consumed;
            } else {
                start += 1;
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DeclareArgs;
    use crate::element::ElementArgs;
    use crate::types::ElementType;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        let mut d = Document::new("example").expect("doc");
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        for token in ["De", "site", "staat", "online", "."] {
            d.add_word(s, ElementArgs::new().with_text(token)).expect("word");
        }
        d
    }

    #[test]
    fn test_literal_with_wildcard() {
        let d = sample();
        let p = Pattern::new(&["site", "*"], PatternOptions::default()).expect("pattern");
        let hits = d.find_words(&p);
        assert_eq!(hits.len(), 1);
        let texts: Vec<String> = hits[0].iter().map(|w| d.str(*w).expect("text")).collect();
        assert_eq!(texts, vec!["site", "staat"]);
        // the match starts at word position 1
        assert_eq!(hits[0][0], d.words()[1]);
    }

    #[test]
    fn test_case_folding() {
        let d = sample();
        let p = Pattern::new(&["DE", "Site"], PatternOptions::default()).expect("pattern");
        assert_eq!(d.find_words(&p).len(), 1);
        let strict = Pattern::new(
            &["DE", "Site"],
            PatternOptions {
                case_sensitive: true,
                ..Default::default()
            },
        )
        .expect("pattern");
        assert!(d.find_words(&strict).is_empty());
    }

    #[test]
    fn test_regexp_unit() {
        let d = sample();
        let p = Pattern::new(&["regexp('sta+t')"], PatternOptions::default()).expect("pattern");
        let hits = d.find_words(&p);
        assert_eq!(hits.len(), 1);
        assert_eq!(d.str(hits[0][0]).ok().as_deref(), Some("staat"));
    }

    #[test]
    fn test_gap_spans_whole_sentence() {
        let d = sample();
        let p = Pattern::new(&["De", "*:3", "."], PatternOptions::default()).expect("pattern");
        let hits = d.find_words(&p);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].len(), 5);
        assert!(p.variable_size());
        assert_eq!(p.variable_wildcards(), vec![1]);
    }

    #[test]
    fn test_gap_prefers_smallest_width() {
        let mut d = Document::new("example").expect("doc");
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        for token in ["a", "x", "a", "b"] {
            d.add_word(s, ElementArgs::new().with_text(token)).expect("word");
        }
        let p = Pattern::new(&["a", "*:5", "b"], PatternOptions::default()).expect("pattern");
        let hits = d.find_words(&p);
        // one non-overlapping match from the first "a"
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].len(), 4);
    }

    #[test]
    fn test_unset_wild_fixes_window() {
        let d = sample();
        let mut p = Pattern::new(&["De", "*:3", "."], PatternOptions::default()).expect("pattern");
        p.unset_wild();
        assert!(!p.variable_size());
        // fixed three-token window no longer reaches the final period
        assert!(d.find_words(&p).is_empty());
    }

    #[test]
    fn test_annotation_matching() {
        let mut d = sample();
        d.declare(AnnotationType::Pos, "cgn", DeclareArgs::default())
            .expect("declare");
        let classes = ["LID", "N", "WW", "BW", "LET"];
        let words = d.words();
        for (w, class) in words.iter().zip(classes) {
            d.append_element(
                *w,
                ElementType::PosAnnotation,
                ElementArgs::new().with_class(class).with_set("cgn"),
            )
            .expect("pos");
        }
        let p = Pattern::new(
            &["N", "WW"],
            PatternOptions {
                case_sensitive: true,
                annotation: Some((AnnotationType::Pos, Some("cgn".to_string()))),
                ..Default::default()
            },
        )
        .expect("pattern");
        let hits = d.find_words(&p);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0], vec![words[1], words[2]]);
    }

    #[test]
    fn test_multi_pattern_intersection() {
        let mut d = sample();
        d.declare(AnnotationType::Pos, "cgn", DeclareArgs::default())
            .expect("declare");
        let classes = ["LID", "N", "WW", "BW", "LET"];
        let words = d.words();
        for (w, class) in words.iter().zip(classes) {
            d.append_element(
                *w,
                ElementType::PosAnnotation,
                ElementArgs::new().with_class(class).with_set("cgn"),
            )
            .expect("pos");
        }
        let by_text = Pattern::new(&["site", "staat"], PatternOptions::default()).expect("p");
        let by_pos = Pattern::new(
            &["N", "WW"],
            PatternOptions {
                case_sensitive: true,
                annotation: Some((AnnotationType::Pos, Some("cgn".to_string()))),
                ..Default::default()
            },
        )
        .expect("p");
        let hits = d.find_words_multi(&[by_text, by_pos]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0], vec![words[1], words[2]]);

        // disagreeing patterns produce nothing
        let wrong_pos = Pattern::new(
            &["N", "BW"],
            PatternOptions {
                case_sensitive: true,
                annotation: Some((AnnotationType::Pos, Some("cgn".to_string()))),
                ..Default::default()
            },
        )
        .expect("p");
        let by_text = Pattern::new(&["site", "staat"], PatternOptions::default()).expect("p");
        assert!(d.find_words_multi(&[by_text, wrong_pos]).is_empty());
    }

    #[test]
    fn test_invalid_units_rejected() {
        assert!(Pattern::new(&[], PatternOptions::default()).is_err());
        assert!(Pattern::new(&["*:x"], PatternOptions::default()).is_err());
        assert!(Pattern::new(&["regexp('(')"], PatternOptions::default()).is_err());
    }
}
