//! Canned receipt texts used when no OCR backend is consulted.

/// Canonical receipt returned by the `deterministic-stub` method
pub const DETERMINISTIC_STUB_TEXT: &str = "FRESH FOODS MARKET
123 Main Street
Springfield, IL 62701
12/15/2023 14:32
Organic Spinach - 1 bag - $2.99
Bananas 2 lb $1.18
Chicken Breast 1.5 lb $8.97
Whole Milk 1 gal $3.49
Large Eggs 12 ct $4.29
Cheddar Cheese $5.99
Roma Tomatoes $2.45
Yellow Onion $1.29
Jasmine Rice 2 lb $3.99
Olive Oil 500ml $7.49
Subtotal: $42.13
Tax: $0.00
Total: $42.13
VISA **** 1234
Thank you for shopping!";

/// Receipt returned by the `fixed-sample` method and by every fallback hop
pub const FIXED_SAMPLE_TEXT: &str = "GREEN VALLEY GROCERY
Receipt #00481
03/02/2024 09:15
Carrots 1 lb $0.99
Ground Beef $6.49
Greek Yogurt $4.99
Apples 3 lb $3.87
Bread $2.79
Coffee $8.99
Subtotal: $28.12
Tax: $0.00
Total: $28.12
Thank you for shopping with us.";
