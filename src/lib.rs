//! # Receipt Ingredients
//!
//! Turns the OCR text of a photographed grocery receipt into a scored,
//! deduplicated list of food ingredients, then reconciles the user-edited
//! selection into the set handed to the inventory.
//!
//! Data flow: image → [`ocr_acquisition`] → [`line_classifier`] →
//! [`receipt_matcher`] → [`receipt_aggregator`] → [`confirmation`] →
//! [`inventory`]. [`pipeline`] wires the first four together.

pub mod cloud_vision;
pub mod confirmation;
pub mod inventory;
pub mod lexicon;
pub mod line_classifier;
pub mod ocr;
pub mod ocr_acquisition;
pub mod ocr_config;
pub mod ocr_errors;
pub mod pipeline;
pub mod receipt_aggregator;
pub mod receipt_matcher;
pub mod sample_receipts;
pub mod scoring_config;
