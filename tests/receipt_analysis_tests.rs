#[cfg(test)]
mod tests {
    use receipt_ingredients::lexicon::Category;
    use receipt_ingredients::line_classifier::{classify_line, LineTag};
    use receipt_ingredients::receipt_aggregator::{deduplicate_matches, ReceiptAggregator, ReceiptAnalysis};
    use receipt_ingredients::receipt_matcher::MatchOrigin;
    use receipt_ingredients::sample_receipts::{DETERMINISTIC_STUB_TEXT, FIXED_SAMPLE_TEXT};
    use receipt_ingredients::scoring_config::ScoringConfig;

    fn create_aggregator() -> ReceiptAggregator {
        ReceiptAggregator::new()
    }

    fn names(analysis: &ReceiptAnalysis) -> Vec<&str> {
        analysis.ingredients.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_priced_vegetable_line() {
        let analysis = create_aggregator().analyze_text("Organic Spinach - 1 bag - $2.99");

        assert_eq!(names(&analysis), vec!["spinach"]);
        let spinach = &analysis.ingredients[0];
        assert_eq!(spinach.category, Some(Category::Vegetable));
        assert!(spinach.confidence >= 0.8);
        assert!(analysis.prices.contains(&"$2.99".to_string()));
    }

    #[test]
    fn test_subtotal_line() {
        assert_eq!(classify_line("Subtotal: $36.44").tag, LineTag::Noise);

        let analysis = create_aggregator().analyze_text("Subtotal: $36.44");
        assert!(analysis.ingredients.is_empty());
        assert_eq!(analysis.prices, vec!["$36.44"]);
    }

    #[test]
    fn test_explicit_ingredient_list() {
        let text = "HILLSIDE MARKET\nIngredients: Flour, Sugar, Salt\nThank you!";
        let analysis = create_aggregator().analyze_text(text);

        assert_eq!(names(&analysis), vec!["Flour", "Sugar", "Salt"]);
        for ingredient in &analysis.ingredients {
            assert_eq!(ingredient.origin, MatchOrigin::ExplicitList);
        }
    }

    #[test]
    fn test_store_header_only_receipt() {
        let text = "FRESH FOODS MARKET\n123 Main Street\nSpringfield, IL 62701\n\
                    12/15/2023 14:32\nThank you for shopping!";
        let analysis = create_aggregator().analyze_text(text);

        assert!(analysis.ingredients.is_empty());
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.store_info, vec!["FRESH FOODS MARKET"]);
        assert_eq!(analysis.dates, vec!["12/15/2023"]);
        assert_eq!(analysis.total_amount, None);
    }

    #[test]
    fn test_stub_receipt() {
        let analysis = create_aggregator().analyze_text(DETERMINISTIC_STUB_TEXT);

        assert_eq!(analysis.total_amount.as_deref(), Some("$42.13"));
        assert_eq!(analysis.dates, vec!["12/15/2023"]);
        assert_eq!(analysis.store_info, vec!["FRESH FOODS MARKET"]);

        let found = names(&analysis);
        for expected in [
            "spinach",
            "bananas",
            "chicken breast",
            "whole milk",
            "eggs",
            "cheddar",
            "cheese",
            "tomatoes",
            "onion",
            "rice",
            "olive oil",
        ] {
            assert!(found.contains(&expected), "missing {expected}: {found:?}");
        }
        assert_eq!(found.len(), 11);

        // Shorter terms inside longer ones are suppressed
        assert!(!found.contains(&"chicken"));
        assert!(!found.contains(&"milk"));
        assert!(!found.contains(&"egg"));

        assert!((analysis.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fixed_sample_receipt() {
        let analysis = create_aggregator().analyze_text(FIXED_SAMPLE_TEXT);

        assert_eq!(
            names(&analysis),
            vec!["carrots", "ground beef", "greek yogurt", "apples", "bread", "coffee"]
        );
        assert_eq!(analysis.total_amount.as_deref(), Some("$28.12"));
        assert_eq!(analysis.store_info, vec!["GREEN VALLEY GROCERY"]);

        // mean of 4 x 0.9 and 2 x 0.8, plus the long-text bonus
        let expected = (4.0 * 0.9 + 2.0 * 0.8) / 6.0 + 0.1;
        assert!((analysis.confidence - expected).abs() < 1e-3);
    }

    #[test]
    fn test_ingredients_sorted_descending() {
        let analysis = create_aggregator().analyze_text(DETERMINISTIC_STUB_TEXT);
        for pair in analysis.ingredients.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    /// Test ties built from different weight sums still follow the receipt
    #[test]
    fn test_tied_scores_follow_receipt_order() {
        let analysis = create_aggregator().analyze_text("Sea Salt card\nOrganic Spinach $2.99");

        assert_eq!(names(&analysis), vec!["salt", "spinach"]);
        assert_eq!(analysis.ingredients[0].confidence, analysis.ingredients[1].confidence);
        assert_eq!(analysis.ingredients[0].line, 0);
        assert_eq!(analysis.ingredients[1].line, 1);
    }

    #[test]
    fn test_deduplication_is_idempotent() {
        let analysis = create_aggregator().analyze_text(DETERMINISTIC_STUB_TEXT);
        let again = deduplicate_matches(analysis.ingredients.clone());
        assert_eq!(again, analysis.ingredients);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let aggregator = create_aggregator();
        let first = aggregator.analyze_text(FIXED_SAMPLE_TEXT);
        let second = aggregator.analyze_text(FIXED_SAMPLE_TEXT);
        assert_eq!(first, second);
    }

    #[test]
    fn test_overlapping_terms_policy() {
        let line = "Chicken Breast 1.5 lb $8.97";

        let preferred = create_aggregator().analyze_text(line);
        assert_eq!(names(&preferred), vec!["chicken breast"]);

        let independent = ReceiptAggregator::with_config(ScoringConfig {
            prefer_longest_terms: false,
            ..Default::default()
        })
        .analyze_text(line);
        let found = names(&independent);
        assert!(found.contains(&"chicken breast"));
        assert!(found.contains(&"chicken"));
    }

    #[test]
    fn test_threshold_sweep() {
        for threshold in [0.0, 0.3, 0.5, 0.85, 0.95] {
            let aggregator = ReceiptAggregator::with_config(ScoringConfig {
                acceptance_threshold: threshold,
                ..Default::default()
            });
            let analysis = aggregator.analyze_text(DETERMINISTIC_STUB_TEXT);
            for ingredient in &analysis.ingredients {
                assert!(
                    ingredient.confidence > threshold || ingredient.origin == MatchOrigin::ExplicitList,
                    "{} kept at {} with threshold {}",
                    ingredient.name,
                    ingredient.confidence,
                    threshold
                );
            }
        }
    }

    #[test]
    fn test_non_food_priced_items_are_ignored() {
        let text = "Paper Towels $5.99\nDish Soap $3.49\nItem: Bananas $1.20";
        let analysis = create_aggregator().analyze_text(text);
        assert_eq!(names(&analysis), vec!["bananas"]);
        assert_eq!(analysis.ingredients[0].origin, MatchOrigin::LineItem);
    }
}
