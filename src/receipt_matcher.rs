//! # Ingredient Matcher Module
//!
//! Scans receipt text against the ingredient lexicon and emits scored
//! candidate matches.
//!
//! ## Scoring
//!
//! Every lexicon term found (case-insensitively) inside a line starts at the
//! base confidence and is then adjusted:
//!
//! - whole-word occurrence: bonus
//! - no price on the line: bonus
//! - each non-food vocabulary word on the line: penalty
//! - vegetable, fruit, protein or dairy term: bonus
//!
//! The result is clamped to `[0, 1]` and discarded at or below the acceptance
//! threshold. All weights come from [`ScoringConfig`].
//!
//! ## Extra extraction paths
//!
//! - explicit "Ingredients:" lists, where items are accepted even without a
//!   lexicon hit
//! - price-anchored line items (`<words> $<amount>`) and "Item:"/"Product:"
//!   lines, promoted only when the captured name holds a lexicon term

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::lexicon::{self, Category, LexiconEntry};
use crate::line_classifier::{classify_line, LineTag};
use crate::scoring_config::ScoringConfig;

lazy_static! {
    /// Currency amounts: "$2.99", "2.99", "$5"
    pub(crate) static ref PRICE_PATTERN: Regex =
        Regex::new(r"\$?\d+\.\d{2}|\$\d+").expect("Price pattern should be valid");
    static ref INGREDIENTS_HEADER: Regex =
        Regex::new(r"(?i)\bingredients\s*:").expect("Ingredients header pattern should be valid");
    static ref LIST_DELIMITERS: Regex =
        Regex::new(r"[,;•·▪◦‣*]").expect("List delimiter pattern should be valid");
    static ref LEADING_ORDINAL: Regex =
        Regex::new(r"^\d+\s*[.)]?\s*").expect("Ordinal pattern should be valid");
    static ref PARENTHETICAL: Regex =
        Regex::new(r"\([^)]*\)").expect("Parenthetical pattern should be valid");
    static ref PRICED_LINE_ITEM: Regex =
        Regex::new(r"^\s*(?P<name>[A-Za-z][^$]*?)\s*\$\d+(?:\.\d{2})?")
            .expect("Line item pattern should be valid");
    static ref PREFIXED_ITEM: Regex =
        Regex::new(r"(?i)^\s*(?:item|product)\s*:\s*(?P<name>.+)$")
            .expect("Prefixed item pattern should be valid");
}

/// Which extraction path produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchOrigin {
    /// Lexicon hit on a content line
    Line,
    /// Item of an explicit "Ingredients:" list
    ExplicitList,
    /// Priced line item or "Item:"/"Product:" line
    LineItem,
}

/// A scored candidate ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientMatch {
    /// Ingredient name (lexicon term, or the list item as written)
    pub name: String,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
    /// Source line the match was found on
    pub context: String,
    /// Zero-based index of that line in the receipt
    #[serde(default)]
    pub line: usize,
    /// Lexicon category; `None` for explicit-list items outside the lexicon
    pub category: Option<Category>,
    pub origin: MatchOrigin,
}

/// Breakdown of the confidence computed for one term on one line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermScore {
    /// Final clamped confidence
    pub confidence: f32,
    /// At least one occurrence stands as a whole word
    pub whole_word: bool,
    /// The line carries a price
    pub price_on_line: bool,
    /// Number of non-food vocabulary words on the line
    pub non_food_words: usize,
    /// The term's category earned the category bonus
    pub category_bonus: bool,
}

/// Lexicon term found in a line, with every occurrence as a byte range of
/// the lowercased line
#[derive(Debug, Clone)]
struct TermHit {
    entry: LexiconEntry,
    spans: Vec<(usize, usize)>,
}

/// Check whether a line carries a price ("$2.99", "2.99", "$5")
pub fn has_price(line: &str) -> bool {
    PRICE_PATTERN.is_match(line)
}

/// Lexicon-driven ingredient matcher
pub struct IngredientMatcher {
    config: ScoringConfig,
}

impl IngredientMatcher {
    /// Create a matcher with the default scoring weights
    pub fn new() -> Self {
        Self::with_config(ScoringConfig::default())
    }

    /// Create a matcher with custom scoring weights
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_ingredients::receipt_matcher::IngredientMatcher;
    /// use receipt_ingredients::scoring_config::ScoringConfig;
    ///
    /// let matcher = IngredientMatcher::with_config(ScoringConfig {
    ///     prefer_longest_terms: false,
    ///     ..Default::default()
    /// });
    /// assert!(!matcher.config().prefer_longest_terms);
    /// ```
    pub fn with_config(config: ScoringConfig) -> Self {
        debug!(
            "Creating IngredientMatcher: threshold={}, prefer_longest_terms={}",
            config.acceptance_threshold, config.prefer_longest_terms
        );
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a lexicon term against a line
    ///
    /// Returns `None` when `term` is not a lexicon term or does not occur in
    /// the line. The score is returned even when it falls below the
    /// acceptance threshold.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_ingredients::receipt_matcher::IngredientMatcher;
    ///
    /// let matcher = IngredientMatcher::new();
    /// let score = matcher.score_term("spinach", "Organic Spinach - 1 bag - $2.99").unwrap();
    ///
    /// assert!(score.whole_word);
    /// assert!(score.price_on_line);
    /// assert!(score.confidence >= 0.8);
    /// ```
    pub fn score_term(&self, term: &str, line: &str) -> Option<TermScore> {
        let entry = lexicon::find_entry(term)?;
        let lower = line.to_lowercase();
        let spans = occurrences(&lower, entry.term);
        if spans.is_empty() {
            return None;
        }
        Some(self.score_spans(&entry, &spans, &lower))
    }

    /// Find and score every lexicon term on a single content line
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_ingredients::receipt_matcher::IngredientMatcher;
    /// use receipt_ingredients::lexicon::Category;
    ///
    /// let matcher = IngredientMatcher::new();
    /// let matches = matcher.match_line("Organic Spinach - 1 bag - $2.99");
    ///
    /// assert_eq!(matches.len(), 1);
    /// assert_eq!(matches[0].name, "spinach");
    /// assert_eq!(matches[0].category, Some(Category::Vegetable));
    /// ```
    pub fn match_line(&self, line: &str) -> Vec<IngredientMatch> {
        self.match_line_at(0, line)
    }

    /// Like [`match_line`](Self::match_line), tagging matches with the
    /// index of `line` in the receipt
    pub fn match_line_at(&self, index: usize, line: &str) -> Vec<IngredientMatch> {
        let lower = line.to_lowercase();
        self.find_hits(&lower)
            .into_iter()
            .filter_map(|hit| {
                let score = self.score_spans(&hit.entry, &hit.spans, &lower);
                self.accept(hit.entry, score, line, index, MatchOrigin::Line)
            })
            .collect()
    }

    /// Extract items of explicit "Ingredients:" lists from the whole text
    ///
    /// The list runs from the header to the first blank line, priced line,
    /// non-content line or repeated header. Items are split on commas,
    /// semicolons, bullets and newlines; leading ordinals and parenthetical
    /// asides are removed. Items equal to a lexicon term keep their line
    /// score (or the explicit-list confidence when that score would be
    /// discarded); other items are accepted as written at the explicit-list
    /// confidence.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_ingredients::receipt_matcher::IngredientMatcher;
    ///
    /// let matcher = IngredientMatcher::new();
    /// let matches = matcher.explicit_list_matches("Ingredients: Flour, Sugar, Salt");
    /// let names: Vec<&str> = matches.iter().map(|m| m.name.as_str()).collect();
    ///
    /// assert_eq!(names, vec!["Flour", "Sugar", "Salt"]);
    /// ```
    pub fn explicit_list_matches(&self, text: &str) -> Vec<IngredientMatch> {
        let mut matches = Vec::new();

        for header in INGREDIENTS_HEADER.find_iter(text) {
            trace!("Found ingredient list header at byte {}", header.start());
            let header_line = text[..header.start()].matches('\n').count();
            let mut offset = header.end();

            for (index, segment) in text[header.end()..].split('\n').enumerate() {
                let segment_start = offset;
                offset += segment.len() + 1;

                if index > 0 && !continues_list(segment) {
                    break;
                }

                let context = enclosing_line(text, segment_start);
                let segment = PARENTHETICAL.replace_all(segment, " ");
                for raw_item in LIST_DELIMITERS.split(&segment) {
                    let Some(item) = self.clean_list_item(raw_item) else {
                        continue;
                    };
                    let list_match = self.list_item_match(item, context, header_line + index);
                    debug!(
                        "Explicit list item '{}' accepted with confidence {:.2}",
                        list_match.name, list_match.confidence
                    );
                    matches.push(list_match);
                }
            }
        }

        matches
    }

    /// Promote price-anchored line items and "Item:"/"Product:" lines
    ///
    /// Only lexicon terms inside the captured item name are promoted, so a
    /// priced non-food item ("Paper Towels $5.99") yields nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_ingredients::receipt_matcher::IngredientMatcher;
    ///
    /// let matcher = IngredientMatcher::new();
    ///
    /// let matches = matcher.line_item_matches("Item: Bananas $1.20\nPaper Towels $5.99");
    /// assert_eq!(matches.len(), 1);
    /// assert_eq!(matches[0].name, "bananas");
    /// ```
    pub fn line_item_matches(&self, text: &str) -> Vec<IngredientMatch> {
        let mut matches = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let item_name = if let Some(captures) = PREFIXED_ITEM.captures(line) {
                PRICE_PATTERN.replace_all(&captures["name"], " ").into_owned()
            } else if classify_line(line).tag != LineTag::Noise {
                match PRICED_LINE_ITEM.captures(line) {
                    Some(captures) => captures["name"].to_string(),
                    None => continue,
                }
            } else {
                continue;
            };

            trace!("Line item name '{}' captured from '{}'", item_name, line);

            let lower_line = line.to_lowercase();
            for hit in self.find_hits(&item_name.to_lowercase()) {
                let spans = occurrences(&lower_line, hit.entry.term);
                let score = self.score_spans(&hit.entry, &spans, &lower_line);
                if let Some(line_item) =
                    self.accept(hit.entry, score, line, index, MatchOrigin::LineItem)
                {
                    matches.push(line_item);
                }
            }
        }

        matches
    }

    /// Every lexicon term occurring in a lowercased line, minus the terms
    /// swallowed by longer ones when `prefer_longest_terms` is set
    fn find_hits(&self, lower: &str) -> Vec<TermHit> {
        let hits: Vec<TermHit> = lexicon::entries()
            .iter()
            .filter_map(|entry| {
                let spans = occurrences(lower, entry.term);
                (!spans.is_empty()).then_some(TermHit {
                    entry: *entry,
                    spans,
                })
            })
            .collect();

        if self.config.prefer_longest_terms {
            suppress_contained_hits(hits)
        } else {
            hits
        }
    }

    fn score_spans(&self, entry: &LexiconEntry, spans: &[(usize, usize)], lower: &str) -> TermScore {
        let whole_word = spans
            .iter()
            .any(|&(start, end)| is_whole_word(lower, start, end));
        let price_on_line = has_price(lower);
        let non_food_words = lexicon::count_non_food_words(lower);
        let category_bonus = entry.category.is_unambiguous();

        let mut confidence = self.config.base_confidence;
        if whole_word {
            confidence += self.config.whole_word_bonus;
        }
        if !price_on_line {
            confidence += self.config.no_price_bonus;
        }
        confidence -= non_food_words as f32 * self.config.non_food_penalty;
        if category_bonus {
            confidence += self.config.category_bonus;
        }

        TermScore {
            confidence: round_confidence(confidence.clamp(0.0, 1.0)),
            whole_word,
            price_on_line,
            non_food_words,
            category_bonus,
        }
    }

    fn accept(
        &self,
        entry: LexiconEntry,
        score: TermScore,
        line: &str,
        line_index: usize,
        origin: MatchOrigin,
    ) -> Option<IngredientMatch> {
        if score.confidence <= self.config.acceptance_threshold {
            trace!(
                "Discarded '{}' on '{}' with confidence {:.2}",
                entry.term,
                line,
                score.confidence
            );
            return None;
        }

        debug!(
            "Matched '{}' ({}) on '{}': {:?}",
            entry.term, entry.category, line, score
        );
        Some(IngredientMatch {
            name: entry.term.to_string(),
            confidence: score.confidence,
            context: line.trim().to_string(),
            line: line_index,
            category: Some(entry.category),
            origin,
        })
    }

    /// Strip bullets, ordinals and punctuation from a raw list item and
    /// reject anything that does not look like an ingredient name
    fn clean_list_item(&self, raw_item: &str) -> Option<String> {
        let trimmed = raw_item
            .trim()
            .trim_start_matches(|c: char| c == '-' || c.is_whitespace());
        let without_ordinal = LEADING_ORDINAL.replace(trimmed, "");
        let item = without_ordinal
            .trim()
            .trim_end_matches(|c: char| matches!(c, '.' | ':' | '-'))
            .split_whitespace()
            .collect::<Vec<&str>>()
            .join(" ");

        let length = item.chars().count();
        if length < self.config.min_list_item_chars || length > self.config.max_list_item_chars {
            trace!("Rejected list item '{}' (length {})", item, length);
            return None;
        }
        if !item.chars().any(char::is_alphabetic) || has_price(&item) {
            trace!("Rejected list item '{}' (not a name)", item);
            return None;
        }
        if !classify_line(&item).is_content() {
            trace!("Rejected list item '{}' (receipt noise)", item);
            return None;
        }

        Some(item)
    }

    fn list_item_match(&self, item: String, context: &str, line_index: usize) -> IngredientMatch {
        let Some(entry) = lexicon::find_entry(&item) else {
            return IngredientMatch {
                name: item,
                confidence: self.config.explicit_list_confidence,
                context: context.trim().to_string(),
                line: line_index,
                category: None,
                origin: MatchOrigin::ExplicitList,
            };
        };

        let lower_context = context.to_lowercase();
        let mut spans = occurrences(&lower_context, entry.term);
        let scored_line = if spans.is_empty() {
            let lower_item = item.to_lowercase();
            spans = occurrences(&lower_item, entry.term);
            lower_item
        } else {
            lower_context
        };

        let score = self.score_spans(&entry, &spans, &scored_line);
        let confidence = if score.confidence > self.config.acceptance_threshold {
            score.confidence
        } else {
            self.config.explicit_list_confidence
        };

        IngredientMatch {
            name: item,
            confidence,
            context: context.trim().to_string(),
            line: line_index,
            category: Some(entry.category),
            origin: MatchOrigin::ExplicitList,
        }
    }
}

impl Default for IngredientMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte ranges of every non-overlapping occurrence of `term` in `lower`
fn occurrences(lower: &str, term: &str) -> Vec<(usize, usize)> {
    lower
        .match_indices(term)
        .map(|(start, found)| (start, start + found.len()))
        .collect()
}

/// Round a confidence to hundredths so equal weight sums compare equal
fn round_confidence(confidence: f32) -> f32 {
    (confidence * 100.0).round() / 100.0
}

/// An occurrence is a whole word when it is not glued to letters or digits
/// on either side
///
/// Any non-alphanumeric neighbour is a boundary, not only whitespace and
/// line ends, so punctuation such as the comma in "Milk, 2%" or the
/// parentheses in "(spinach)" still leaves a whole word.
fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Drop hits whose every occurrence lies inside an occurrence of a longer hit
fn suppress_contained_hits(hits: Vec<TermHit>) -> Vec<TermHit> {
    let keep: Vec<bool> = hits
        .iter()
        .map(|hit| {
            hit.spans.iter().any(|&(start, end)| {
                !hits.iter().any(|other| {
                    other.entry.term.len() > hit.entry.term.len()
                        && other
                            .spans
                            .iter()
                            .any(|&(other_start, other_end)| other_start <= start && end <= other_end)
                })
            })
        })
        .collect();

    hits.into_iter()
        .zip(keep)
        .filter_map(|(hit, keep)| {
            if !keep {
                trace!("Suppressed '{}' inside a longer term", hit.entry.term);
            }
            keep.then_some(hit)
        })
        .collect()
}

/// A line after the header continues the list unless it is blank, priced,
/// receipt noise or a new list header
fn continues_list(segment: &str) -> bool {
    let trimmed = segment.trim();
    !trimmed.is_empty()
        && !has_price(trimmed)
        && classify_line(trimmed).is_content()
        && !INGREDIENTS_HEADER.is_match(trimmed)
}

/// The full line of `text` containing byte offset `position`
fn enclosing_line(text: &str, position: usize) -> &str {
    let start = text[..position].rfind('\n').map_or(0, |i| i + 1);
    let end = text[position..]
        .find('\n')
        .map_or(text.len(), |i| position + i);
    text[start..end].trim_end_matches('\r')
}
