// src/analyze/mod.rs
//! Classification: AI adapter, keyword tier rules, language heuristic and
//! the classifier that combines them.

pub mod ai_adapter;
pub mod classifier;
pub mod language;
pub mod rules;

// Re-export convenient types.
pub use crate::analyze::ai_adapter::{AiAnalysis, AiService, DynAi, TrendAnalysis, TrendInput};
pub use crate::analyze::classifier::Classifier;
pub use crate::analyze::rules::{HotReloadTiers, KeywordTiers};
