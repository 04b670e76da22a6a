//! Feature Engineering Engine
//!
//! Aggregates spectral channel groups and builds ratio features on top of the
//! cleaned dataset, fixing the final feature order used for training.

mod error;
mod features;
mod groups;
mod statistics;

pub use error::FeatureError;
pub use features::{
    DerivedFeature, EngineeredDataset, EngineeringConfig, FeatureEngineer, RATIO_EPSILON,
};
pub use groups::{Channel, ChannelGroup, ChannelLayout};
pub use statistics::StatisticalFeatures;
