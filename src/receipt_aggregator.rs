//! # Receipt Aggregator Module
//!
//! Turns the ordered lines of one receipt into a single [`ReceiptAnalysis`]:
//! store identity lines, every price and date in the text, the presumed
//! receipt total, and the deduplicated ingredient matches with an overall
//! confidence.

use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::line_classifier::{classify_line, LineTag};
use crate::ocr_acquisition::OcrProvenance;
use crate::receipt_matcher::{IngredientMatch, IngredientMatcher, PRICE_PATTERN};
use crate::scoring_config::ScoringConfig;

lazy_static! {
    static ref DATE_PATTERN: Regex =
        Regex::new(r"\b\d{1,2}/\d{1,2}/\d{2,4}\b").expect("Date pattern should be valid");
}

/// Result of analyzing one receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptAnalysis {
    /// Deduplicated matches, highest confidence first
    pub ingredients: Vec<IngredientMatch>,
    /// Lines identifying the retailer, verbatim
    pub store_info: Vec<String>,
    /// Every price in the text, as written
    pub prices: Vec<String>,
    /// Every date in the text, as written
    pub dates: Vec<String>,
    /// Largest price, formatted as `$<amount>`
    pub total_amount: Option<String>,
    /// Overall confidence in `[0, 1]`, exactly 0 without ingredients
    pub confidence: f32,
    /// OCR text the analysis was computed from
    pub raw_text: String,
    /// How the text was obtained; `None` when text was analyzed directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrProvenance>,
}

impl ReceiptAnalysis {
    /// Whether no ingredient survived scoring
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }
}

/// Builds a [`ReceiptAnalysis`] from receipt text
pub struct ReceiptAggregator {
    matcher: IngredientMatcher,
}

impl ReceiptAggregator {
    pub fn new() -> Self {
        Self::with_config(ScoringConfig::default())
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        Self {
            matcher: IngredientMatcher::with_config(config),
        }
    }

    pub fn matcher(&self) -> &IngredientMatcher {
        &self.matcher
    }

    /// Analyze plain receipt text, one line per newline
    ///
    /// # Examples
    ///
    /// ```rust
    /// use receipt_ingredients::receipt_aggregator::ReceiptAggregator;
    ///
    /// let aggregator = ReceiptAggregator::new();
    /// let analysis = aggregator.analyze_text("Organic Spinach - 1 bag - $2.99\nSubtotal: $36.44");
    ///
    /// assert_eq!(analysis.ingredients[0].name, "spinach");
    /// assert_eq!(analysis.prices, vec!["$2.99", "$36.44"]);
    /// assert_eq!(analysis.total_amount.as_deref(), Some("$36.44"));
    /// ```
    pub fn analyze_text(&self, text: &str) -> ReceiptAnalysis {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        self.aggregate(text, &lines)
    }

    /// Analyze receipt text given as raw text plus its ordered lines
    ///
    /// Prices, dates, explicit ingredient lists and line items are scanned
    /// over the whole raw text; classification and per-line matching run on
    /// `lines`, which may come from structured OCR blocks.
    ///
    /// Ingredients are ordered by confidence, highest first; equal
    /// confidences keep the order of their source lines.
    pub fn aggregate(&self, raw_text: &str, lines: &[String]) -> ReceiptAnalysis {
        let prices: Vec<String> = PRICE_PATTERN
            .find_iter(raw_text)
            .map(|m| m.as_str().to_string())
            .collect();
        let dates: Vec<String> = DATE_PATTERN
            .find_iter(raw_text)
            .map(|m| m.as_str().to_string())
            .collect();
        let total_amount = largest_price(&prices);

        // Explicit-list matches come first so their spelling wins ties on a line
        let mut matches = self.matcher.explicit_list_matches(raw_text);
        matches.extend(self.matcher.line_item_matches(raw_text));

        let mut store_info = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match classify_line(trimmed).tag {
                LineTag::StoreInfo => store_info.push(trimmed.to_string()),
                LineTag::Content => matches.extend(self.matcher.match_line_at(index, trimmed)),
                LineTag::Noise => {}
            }
        }

        debug!("Collected {} candidate matches before deduplication", matches.len());

        matches.sort_by_key(|m| m.line);
        let mut ingredients = deduplicate_matches(matches);
        ingredients.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.line.cmp(&b.line))
        });

        let confidence = self.overall_confidence(&ingredients, raw_text);

        info!(
            "Receipt analyzed: {} ingredients, {} store lines, {} prices, confidence {:.2}",
            ingredients.len(),
            store_info.len(),
            prices.len(),
            confidence
        );

        ReceiptAnalysis {
            ingredients,
            store_info,
            prices,
            dates,
            total_amount,
            confidence,
            raw_text: raw_text.to_string(),
            ocr: None,
        }
    }

    /// Mean match confidence plus richness bonuses, clamped to `[0, 1]`
    fn overall_confidence(&self, ingredients: &[IngredientMatch], raw_text: &str) -> f32 {
        if ingredients.is_empty() {
            return 0.0;
        }

        let aggregate = &self.matcher.config().aggregate;
        let count = ingredients.len();
        let mut confidence =
            ingredients.iter().map(|m| m.confidence).sum::<f32>() / count as f32;

        if raw_text.chars().count() > aggregate.long_text_chars
            && count > aggregate.rich_match_count
        {
            confidence += aggregate.richness_bonus;
        }
        if count > aggregate.very_rich_match_count {
            confidence += aggregate.richness_bonus;
        }

        confidence.clamp(0.0, 1.0)
    }
}

impl Default for ReceiptAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep the highest-confidence match per case-insensitive name
///
/// Each surviving match stays at the position where its name was first seen;
/// on equal confidence the earlier match wins. Applying this twice gives the
/// same result as applying it once.
pub fn deduplicate_matches(matches: Vec<IngredientMatch>) -> Vec<IngredientMatch> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<IngredientMatch> = Vec::with_capacity(matches.len());

    for candidate in matches {
        let key = candidate.name.to_lowercase();
        match positions.get(&key) {
            Some(&index) => {
                if candidate.confidence > kept[index].confidence {
                    kept[index] = candidate;
                }
            }
            None => {
                positions.insert(key, kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}

/// Numerically largest price, formatted with two decimals
fn largest_price(prices: &[String]) -> Option<String> {
    prices
        .iter()
        .filter_map(|price| price.trim_start_matches('$').parse::<f64>().ok())
        .max_by(|a, b| a.total_cmp(b))
        .map(|amount| format!("${:.2}", amount))
}
