//! Model Training and Selection
//!
//! Fits a roster of seeded candidate classifiers on one stratified partition,
//! cross-validates them, keeps the most accurate and packages it with its
//! scaler, label encoder and metadata as a `ModelBundle`.

mod boosting;
mod bundle;
mod encoder;
mod error;
mod forest;
mod linear;
mod metrics;
mod model;
mod pipeline;
mod selector;
mod split;
mod tree;

pub use boosting::{BoostingParams, GradientBoosting};
pub use bundle::{rank_importances, FeatureImportance, ModelBundle, ModelMetadata};
pub use encoder::LabelEncoder;
pub use error::TrainingError;
pub use forest::{ClassWeight, Forest, ForestParams, MaxFeatures};
pub use linear::{LinearParams, LogisticRegression};
pub use metrics::{accuracy, ClassReport, ConfusionMatrix};
pub use model::{argmax, CandidateSpec, Classifier};
pub use pipeline::{PipelineConfig, PipelineError, PipelineStage, TrainingPipeline, TrainingRun};
pub use selector::{CandidateEvaluation, ModelTrainer, TrainingConfig, TrainingOutcome};
pub use split::{stratified_split, Split, StratifiedKFold};
pub use tree::{DecisionTree, Splitter, TreeNode, TreeParams};
