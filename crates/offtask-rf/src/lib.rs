//! Random Forest classification: train and predict.
//!
//! Provides a hand-rolled Random Forest classifier with CART decision trees,
//! Gini/Entropy split criteria, per-sample weights (used for class
//! balancing), parallel training via rayon, and mean-decrease-in-impurity
//! feature importance.

mod config;
mod error;
mod forest;
mod importance;
mod node;
mod predict;
mod result;
mod split;
mod tree;

pub use config::{MaxFeatures, RandomForestConfig};
pub use error::RfError;
pub use forest::RandomForest;
pub use importance::{RankedFeature, aggregate_importances};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use result::{RandomForestResult, TrainingSummary};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
