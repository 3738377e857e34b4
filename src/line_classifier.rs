//! # Line Classifier Module
//!
//! Decides whether a single line of receipt text is structural noise (totals,
//! dates, payment details, receipt boilerplate), store identity, or candidate
//! content worth scanning for ingredients.
//!
//! Classification is a pure function of the line text.

use lazy_static::lazy_static;
use log::trace;
use regex::Regex;
use serde::Serialize;

/// Tag assigned to a receipt line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineTag {
    /// Candidate content, scanned for ingredients
    Content,
    /// Retailer identity (store name, market, chain)
    StoreInfo,
    /// Structural noise (totals, dates, payment, boilerplate)
    Noise,
}

/// Why a line received its tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationReason {
    /// Line starts with a receipt keyword such as "total" or "sku"
    NoiseKeyword(&'static str),
    /// Line starts with a date token (D/M/Y)
    LeadingDate,
    /// Line starts with a time token (H:MM)
    LeadingTime,
    /// Line mentions retailer vocabulary
    RetailerVocabulary(&'static str),
    /// Nothing matched
    Content,
}

/// Result of classifying one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub tag: LineTag,
    pub reason: ClassificationReason,
}

impl Classification {
    fn new(tag: LineTag, reason: ClassificationReason) -> Self {
        Self { tag, reason }
    }

    pub fn is_content(&self) -> bool {
        self.tag == LineTag::Content
    }
}

/// Keywords that mark a line as noise when they open it
const NOISE_PREFIXES: &[&str] = &[
    "subtotal",
    "total",
    "tax",
    "discount",
    "coupon",
    "sale",
    "receipt",
    "invoice",
    "thank you",
    "visit us",
    "store hours",
    "phone",
    "website",
    "email",
    "qty",
    "item",
    "sku",
    "upc",
    "barcode",
];

/// Retailer and market vocabulary, matched anywhere in the line
const RETAILER_VOCABULARY: &[&str] = &[
    "supermarket",
    "store",
    "market",
    "grocery",
    "groceries",
    "walmart",
    "target",
    "kroger",
    "safeway",
    "costco",
    "whole foods",
    "trader joe",
    "aldi",
    "publix",
    "wegmans",
    "albertsons",
    "meijer",
    "food lion",
    "shoprite",
    "sprouts",
    "lidl",
    "tesco",
    "sainsbury",
    "carrefour",
];

lazy_static! {
    static ref LEADING_DATE: Regex =
        Regex::new(r"^\d{1,2}/\d{1,2}/\d{2,4}").expect("Leading date pattern should be valid");
    static ref LEADING_TIME: Regex =
        Regex::new(r"^\d{1,2}:\d{2}").expect("Leading time pattern should be valid");
}

/// Classify a single line of receipt text
///
/// Noise rules are checked first; retailer vocabulary only applies to lines
/// that are not already noise.
///
/// # Examples
///
/// ```rust
/// use receipt_ingredients::line_classifier::{classify_line, LineTag};
///
/// assert_eq!(classify_line("Subtotal: $36.44").tag, LineTag::Noise);
/// assert_eq!(classify_line("FRESH FOODS MARKET").tag, LineTag::StoreInfo);
/// assert_eq!(classify_line("Organic Spinach - 1 bag - $2.99").tag, LineTag::Content);
/// ```
pub fn classify_line(line: &str) -> Classification {
    let lower = line.trim_start().to_lowercase();

    let classification = if let Some(keyword) = leading_noise_keyword(&lower) {
        Classification::new(LineTag::Noise, ClassificationReason::NoiseKeyword(keyword))
    } else if LEADING_DATE.is_match(&lower) {
        Classification::new(LineTag::Noise, ClassificationReason::LeadingDate)
    } else if LEADING_TIME.is_match(&lower) {
        Classification::new(LineTag::Noise, ClassificationReason::LeadingTime)
    } else if let Some(vocabulary) = RETAILER_VOCABULARY
        .iter()
        .copied()
        .find(|vocabulary| lower.contains(vocabulary))
    {
        Classification::new(
            LineTag::StoreInfo,
            ClassificationReason::RetailerVocabulary(vocabulary),
        )
    } else {
        Classification::new(LineTag::Content, ClassificationReason::Content)
    };

    trace!("Classified line '{}' as {:?}", line, classification);
    classification
}

/// Find the noise keyword opening the line, if any.
///
/// The keyword must end at a word boundary ("Total:", "TAX 8%") but may take a
/// plural "s" ("Items sold"). Words that merely start with a keyword
/// ("Salem apples", "Totally fresh kale") are content.
fn leading_noise_keyword(lower: &str) -> Option<&'static str> {
    NOISE_PREFIXES.iter().copied().find(|keyword| {
        lower.strip_prefix(keyword).is_some_and(|rest| {
            let rest = rest.strip_prefix('s').unwrap_or(rest);
            !rest.starts_with(|c: char| c.is_alphanumeric())
        })
    })
}
