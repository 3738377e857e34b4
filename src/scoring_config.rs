//! # Scoring Configuration Module
//!
//! Weights and thresholds used by the ingredient matcher and the receipt
//! aggregator. They live in one structure so a caller can tune or sweep them
//! without touching the matching logic.

// Constants for ingredient scoring
pub const BASE_CONFIDENCE: f32 = 0.5;
pub const WHOLE_WORD_BONUS: f32 = 0.3;
pub const NO_PRICE_BONUS: f32 = 0.2;
pub const NON_FOOD_PENALTY: f32 = 0.1;
pub const CATEGORY_BONUS: f32 = 0.1;
pub const ACCEPTANCE_THRESHOLD: f32 = 0.3;
pub const EXPLICIT_LIST_CONFIDENCE: f32 = 0.6;
pub const MIN_LIST_ITEM_CHARS: usize = 3;
pub const MAX_LIST_ITEM_CHARS: usize = 60;

// Constants for whole-receipt confidence
pub const LONG_TEXT_CHARS: usize = 100;
pub const RICH_MATCH_COUNT: usize = 3;
pub const VERY_RICH_MATCH_COUNT: usize = 10;
pub const RICHNESS_BONUS: f32 = 0.1;

/// Weights for scoring a single lexicon hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Starting confidence of every lexicon hit
    pub base_confidence: f32,
    /// Added when the term stands as a whole word
    pub whole_word_bonus: f32,
    /// Added when the line carries no price
    pub no_price_bonus: f32,
    /// Subtracted per non-food vocabulary word on the line
    pub non_food_penalty: f32,
    /// Added for vegetable, fruit, protein and dairy terms
    pub category_bonus: f32,
    /// Matches at or below this confidence are discarded
    pub acceptance_threshold: f32,
    /// Confidence of an explicit-list item that is not a lexicon term
    pub explicit_list_confidence: f32,
    /// Explicit-list items need at least this many characters
    pub min_list_item_chars: usize,
    /// Explicit-list items longer than this are treated as prose, not ingredients
    pub max_list_item_chars: usize,
    /// Drop a term whose every occurrence sits inside a longer matched term
    /// on the same line ("oil" inside "olive oil")
    pub prefer_longest_terms: bool,
    /// Whole-receipt scoring
    pub aggregate: AggregateConfig,
}

/// Bonuses applied to the whole-receipt confidence
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateConfig {
    /// Raw text must be longer than this for the richness bonus
    pub long_text_chars: usize,
    /// More kept matches than this earn the first bonus
    pub rich_match_count: usize,
    /// More kept matches than this earn the second bonus
    pub very_rich_match_count: usize,
    /// Size of each bonus
    pub richness_bonus: f32,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            long_text_chars: LONG_TEXT_CHARS,
            rich_match_count: RICH_MATCH_COUNT,
            very_rich_match_count: VERY_RICH_MATCH_COUNT,
            richness_bonus: RICHNESS_BONUS,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_confidence: BASE_CONFIDENCE,
            whole_word_bonus: WHOLE_WORD_BONUS,
            no_price_bonus: NO_PRICE_BONUS,
            non_food_penalty: NON_FOOD_PENALTY,
            category_bonus: CATEGORY_BONUS,
            acceptance_threshold: ACCEPTANCE_THRESHOLD,
            explicit_list_confidence: EXPLICIT_LIST_CONFIDENCE,
            min_list_item_chars: MIN_LIST_ITEM_CHARS,
            max_list_item_chars: MAX_LIST_ITEM_CHARS,
            prefer_longest_terms: true,
            aggregate: AggregateConfig::default(),
        }
    }
}
