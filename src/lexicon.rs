//! # Ingredient Lexicon Module
//!
//! Static, process-wide vocabulary used by the receipt scorer:
//!
//! - the ingredient lexicon (category → ordered list of known food terms,
//!   multi-word terms allowed)
//! - the non-food vocabulary (store names, payment brands, date words and
//!   generic receipt words) that lowers the confidence of a line
//!
//! All tables are built once on first use and never mutated afterwards, so
//! they can be shared by concurrent pipeline invocations without locking.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Food category of a lexicon term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Protein,
    Dairy,
    Vegetable,
    Fruit,
    Grain,
    Spice,
    Condiment,
    Beverage,
}

impl Category {
    /// All categories in lexicon order
    pub const ALL: [Category; 8] = [
        Category::Protein,
        Category::Dairy,
        Category::Vegetable,
        Category::Fruit,
        Category::Grain,
        Category::Spice,
        Category::Condiment,
        Category::Beverage,
    ];

    /// Lowercase name used in logs and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Protein => "protein",
            Category::Dairy => "dairy",
            Category::Vegetable => "vegetable",
            Category::Fruit => "fruit",
            Category::Grain => "grain",
            Category::Spice => "spice",
            Category::Condiment => "condiment",
            Category::Beverage => "beverage",
        }
    }

    /// Categories whose terms rarely collide with non-food receipt vocabulary.
    ///
    /// Spices, condiments and beverages overlap with brand and store wording
    /// far more often, so they do not earn the category bonus.
    pub fn is_unambiguous(&self) -> bool {
        matches!(
            self,
            Category::Vegetable | Category::Fruit | Category::Protein | Category::Dairy
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single known food term and its category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexiconEntry {
    /// Lowercase term, possibly multi-word (e.g. "olive oil")
    pub term: &'static str,
    pub category: Category,
}

// Terms are lowercase. No bare "oil" or "ham": they match inside "foil" and "shampoo".
const LEXICON_DATA: &[(Category, &[&str])] = &[
    (
        Category::Protein,
        &[
            "chicken",
            "chicken breast",
            "chicken thighs",
            "ground beef",
            "beef",
            "steak",
            "pork",
            "pork chops",
            "bacon",
            "sausage",
            "turkey",
            "lamb",
            "salmon",
            "tuna",
            "shrimp",
            "tilapia",
            "eggs",
            "egg",
            "tofu",
            "lentils",
            "chickpeas",
            "black beans",
        ],
    ),
    (
        Category::Dairy,
        &[
            "milk",
            "whole milk",
            "butter",
            "cheese",
            "cheddar",
            "mozzarella",
            "parmesan",
            "cream cheese",
            "cottage cheese",
            "yogurt",
            "greek yogurt",
            "sour cream",
            "heavy cream",
            "cream",
            "half and half",
            "ice cream",
        ],
    ),
    (
        Category::Vegetable,
        &[
            "spinach",
            "lettuce",
            "romaine",
            "tomato",
            "tomatoes",
            "onion",
            "onions",
            "garlic",
            "carrot",
            "carrots",
            "potato",
            "potatoes",
            "sweet potato",
            "broccoli",
            "cauliflower",
            "celery",
            "cucumber",
            "bell pepper",
            "zucchini",
            "mushroom",
            "mushrooms",
            "kale",
            "cabbage",
            "peas",
            "corn",
            "green beans",
            "asparagus",
            "eggplant",
            "avocado",
            "squash",
        ],
    ),
    (
        Category::Fruit,
        &[
            "apple",
            "apples",
            "banana",
            "bananas",
            "orange",
            "oranges",
            "lemon",
            "lemons",
            "lime",
            "limes",
            "strawberries",
            "blueberries",
            "raspberries",
            "grapes",
            "grapefruit",
            "mango",
            "pineapple",
            "watermelon",
            "pear",
            "peach",
            "cherries",
            "kiwi",
        ],
    ),
    (
        Category::Grain,
        &[
            "rice",
            "brown rice",
            "bread",
            "flour",
            "pasta",
            "spaghetti",
            "noodles",
            "oats",
            "oatmeal",
            "cereal",
            "tortilla",
            "tortillas",
            "quinoa",
            "bagel",
            "bagels",
            "crackers",
            "couscous",
        ],
    ),
    (
        Category::Spice,
        &[
            "salt",
            "pepper",
            "black pepper",
            "cinnamon",
            "paprika",
            "cumin",
            "oregano",
            "basil",
            "thyme",
            "rosemary",
            "nutmeg",
            "chili powder",
            "garlic powder",
            "ginger",
            "turmeric",
            "vanilla",
        ],
    ),
    (
        Category::Condiment,
        &[
            "sugar",
            "brown sugar",
            "honey",
            "maple syrup",
            "ketchup",
            "mustard",
            "mayonnaise",
            "soy sauce",
            "hot sauce",
            "barbecue sauce",
            "salsa",
            "vinegar",
            "olive oil",
            "vegetable oil",
            "canola oil",
            "peanut butter",
            "jam",
        ],
    ),
    (
        Category::Beverage,
        &[
            "coffee",
            "tea",
            "green tea",
            "juice",
            "orange juice",
            "apple juice",
            "water",
            "sparkling water",
            "soda",
            "lemonade",
            "beer",
            "wine",
            "kombucha",
        ],
    ),
];

const NON_FOOD_DATA: &[&str] = &[
    // Store names
    "walmart", "target", "kroger", "safeway", "costco", "aldi", "publix", "wegmans",
    "albertsons", "meijer", "lidl", "tesco", "store", "market", "supermarket",
    // Payment
    "visa", "mastercard", "amex", "discover", "debit", "credit", "cash", "card",
    "change", "tender", "approved", "auth",
    // Date words
    "date", "time", "am", "pm", "jan", "feb", "mar", "apr", "jun", "jul", "aug",
    "sep", "sept", "oct", "nov", "dec", "january", "february", "march", "april",
    "june", "july", "august", "september", "october", "november", "december",
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    // Generic receipt words
    "receipt", "invoice", "total", "subtotal", "tax", "qty", "item", "items",
    "price", "savings", "saved", "member", "rewards", "balance", "cashier",
    "register", "transaction", "coupon", "discount", "sale", "ref", "customer",
];

lazy_static! {
    static ref LEXICON: Vec<LexiconEntry> = LEXICON_DATA
        .iter()
        .flat_map(|(category, terms)| {
            terms.iter().map(move |term| LexiconEntry {
                term: *term,
                category: *category,
            })
        })
        .collect();
    static ref TERM_INDEX: HashMap<&'static str, LexiconEntry> =
        LEXICON.iter().map(|entry| (entry.term, *entry)).collect();
    static ref NON_FOOD_WORDS: HashSet<&'static str> = NON_FOOD_DATA.iter().copied().collect();
}

/// All lexicon entries, grouped by category in lexicon order
pub fn entries() -> &'static [LexiconEntry] {
    &LEXICON
}

/// Every lexicon term, in lexicon order
pub fn terms() -> impl Iterator<Item = &'static str> {
    LEXICON.iter().map(|entry| entry.term)
}

/// Terms of a single category, in lexicon order
pub fn terms_for(category: Category) -> &'static [&'static str] {
    LEXICON_DATA
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, terms)| *terms)
        .unwrap_or(&[])
}

/// Find the lexicon entry equal to `term` (case-insensitive, surrounding whitespace ignored)
pub fn find_entry(term: &str) -> Option<LexiconEntry> {
    let normalized = term.trim().to_lowercase();
    TERM_INDEX.get(normalized.as_str()).copied()
}

/// Look up the category of a term
pub fn lookup(term: &str) -> Option<Category> {
    find_entry(term).map(|entry| entry.category)
}

/// Check whether a single lowercase word belongs to the non-food vocabulary
pub fn is_non_food_word(word: &str) -> bool {
    NON_FOOD_WORDS.contains(word)
}

/// Count non-food vocabulary words in a line.
///
/// The line is split on every non-alphanumeric character, so "VISA****1234"
/// and "Total:" both count.
pub fn count_non_food_words(line: &str) -> usize {
    line.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty() && is_non_food_word(word))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_are_unique_and_lowercase() {
        let mut seen = HashSet::new();
        for entry in entries() {
            assert_eq!(entry.term, entry.term.to_lowercase(), "term not lowercase");
            assert!(seen.insert(entry.term), "duplicate term: {}", entry.term);
        }
    }

    #[test]
    fn test_every_category_has_terms() {
        for category in Category::ALL {
            assert!(!terms_for(category).is_empty(), "no terms for {category}");
        }

        let total: usize = Category::ALL.iter().map(|c| terms_for(*c).len()).sum();
        assert_eq!(terms().count(), total);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("Spinach"), Some(Category::Vegetable));
        assert_eq!(lookup("  olive oil "), Some(Category::Condiment));
        assert_eq!(lookup("Flour"), Some(Category::Grain));
        assert_eq!(lookup("Salt"), Some(Category::Spice));
        assert_eq!(lookup("dish soap"), None);

        let entry = find_entry("Olive Oil").unwrap();
        assert_eq!(entry.term, "olive oil");
    }

    #[test]
    fn test_unambiguous_categories() {
        assert!(Category::Vegetable.is_unambiguous());
        assert!(Category::Dairy.is_unambiguous());
        assert!(!Category::Spice.is_unambiguous());
        assert!(!Category::Beverage.is_unambiguous());
    }

    #[test]
    fn test_count_non_food_words() {
        assert_eq!(count_non_food_words("Organic Spinach - 1 bag - $2.99"), 0);
        assert_eq!(count_non_food_words("VISA DEBIT card"), 3);
        assert_eq!(count_non_food_words("Total: tax included"), 2);
        // Substrings do not count, only whole tokens
        assert_eq!(count_non_food_words("Targeted savings"), 1);
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&Category::Vegetable).unwrap();
        assert_eq!(json, "\"vegetable\"");
    }
}
