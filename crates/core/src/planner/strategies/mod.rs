//! 内置评分引擎
//!
//! - `heuristic` - 启发式加分引擎（v1）
//! - `feature_vector` - 特征向量引擎（v2）

mod feature_vector;
mod heuristic;

pub use feature_vector::{extract_feature_vector, feature_weights, FeatureVector, FeatureVectorEngine, FeatureWeights};
pub use heuristic::{base_score, external_signal_boost, role_score, HeuristicEngine};
