//! Classifier Families and Candidate Strategies

use crate::boosting::{BoostingParams, GradientBoosting};
use crate::error::TrainingError;
use crate::forest::{Forest, ForestParams};
use crate::linear::{LinearParams, LogisticRegression};
use crate::tree::Splitter;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Index of the first largest value (0 for empty input)
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// A trained classifier of one of the supported families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Classifier {
    RandomForest(Forest),
    ExtraTrees(Forest),
    GradientBoosting(GradientBoosting),
    LogisticRegression(LogisticRegression),
}

impl Classifier {
    /// Family name, as reported in metadata
    pub fn family(&self) -> &'static str {
        match self {
            Classifier::RandomForest(_) => "RandomForest",
            Classifier::ExtraTrees(_) => "ExtraTrees",
            Classifier::GradientBoosting(_) => "GradientBoosting",
            Classifier::LogisticRegression(_) => "LogisticRegression",
        }
    }

    /// Input dimension
    pub fn n_features(&self) -> usize {
        match self {
            Classifier::RandomForest(m) | Classifier::ExtraTrees(m) => m.n_features(),
            Classifier::GradientBoosting(m) => m.n_features(),
            Classifier::LogisticRegression(m) => m.n_features(),
        }
    }

    /// Output class count
    pub fn n_classes(&self) -> usize {
        match self {
            Classifier::RandomForest(m) | Classifier::ExtraTrees(m) => m.n_classes(),
            Classifier::GradientBoosting(m) => m.n_classes(),
            Classifier::LogisticRegression(m) => m.n_classes(),
        }
    }

    fn proba_unchecked(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        match self {
            Classifier::RandomForest(m) | Classifier::ExtraTrees(m) => m.predict_proba_row(row),
            Classifier::GradientBoosting(m) => m.predict_proba_row(row),
            Classifier::LogisticRegression(m) => m.predict_proba_row(row),
        }
    }

    /// Class probabilities for one scaled feature vector
    pub fn predict_proba_row(&self, row: &[f64]) -> Result<Vec<f64>, TrainingError> {
        if row.len() != self.n_features() {
            return Err(TrainingError::DimensionMismatch {
                expected: self.n_features(),
                actual: row.len(),
            });
        }
        Ok(self.proba_unchecked(ArrayView1::from(row)))
    }

    /// Class probabilities for every row
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, TrainingError> {
        if x.ncols() != self.n_features() {
            return Err(TrainingError::DimensionMismatch {
                expected: self.n_features(),
                actual: x.ncols(),
            });
        }
        let mut proba = Array2::zeros((x.nrows(), self.n_classes()));
        for (i, row) in x.rows().into_iter().enumerate() {
            for (k, p) in self.proba_unchecked(row).into_iter().enumerate() {
                proba[[i, k]] = p;
            }
        }
        Ok(proba)
    }

    /// Most probable class per row
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>, TrainingError> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| argmax(&row.to_vec()))
            .collect())
    }

    /// Global feature importances, summing to 1 unless the model is constant
    pub fn feature_importances(&self) -> Vec<f64> {
        match self {
            Classifier::RandomForest(m) | Classifier::ExtraTrees(m) => {
                m.feature_importances().to_vec()
            }
            Classifier::GradientBoosting(m) => m.feature_importances(),
            Classifier::LogisticRegression(m) => m.feature_importances(),
        }
    }

    /// Check internal indices of a classifier read from disk, so prediction
    /// never indexes out of range
    pub fn check_structure(&self) -> Result<(), TrainingError> {
        let checked = match self {
            Classifier::RandomForest(m) | Classifier::ExtraTrees(m) => m.check_structure(),
            Classifier::GradientBoosting(m) => m.check_structure(),
            Classifier::LogisticRegression(m) => m.check_structure(),
        };
        checked.map_err(|reason| {
            TrainingError::InconsistentBundle(format!("{} model: {}", self.family(), reason))
        })
    }

    /// Out-of-bag accuracy, for bagged families
    pub fn oob_score(&self) -> Option<f64> {
        match self {
            Classifier::RandomForest(m) | Classifier::ExtraTrees(m) => m.oob_score(),
            _ => None,
        }
    }
}

/// A named training strategy in the candidate roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum CandidateSpec {
    RandomForest(ForestParams),
    ExtraTrees(ForestParams),
    GradientBoosting(BoostingParams),
    LogisticRegression(LinearParams),
}

impl CandidateSpec {
    /// Every family with its default hyperparameters
    pub fn default_roster() -> Vec<CandidateSpec> {
        vec![
            CandidateSpec::RandomForest(ForestParams::random_forest()),
            CandidateSpec::ExtraTrees(ForestParams::extra_trees()),
            CandidateSpec::GradientBoosting(BoostingParams::default()),
            CandidateSpec::LogisticRegression(LinearParams::default()),
        ]
    }

    /// Family name of the model this strategy produces
    pub fn name(&self) -> &'static str {
        match self {
            CandidateSpec::RandomForest(_) => "RandomForest",
            CandidateSpec::ExtraTrees(_) => "ExtraTrees",
            CandidateSpec::GradientBoosting(_) => "GradientBoosting",
            CandidateSpec::LogisticRegression(_) => "LogisticRegression",
        }
    }

    /// Hyperparameters as a JSON object
    pub fn hyperparameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Fit on scaled features
    pub fn fit(
        &self,
        x: ArrayView2<'_, f64>,
        y: &[usize],
        n_classes: usize,
        seed: u64,
    ) -> Result<Classifier, TrainingError> {
        Ok(match self {
            CandidateSpec::RandomForest(params) => Classifier::RandomForest(Forest::fit(
                x,
                y,
                n_classes,
                params,
                Splitter::Best,
                seed,
            )?),
            CandidateSpec::ExtraTrees(params) => Classifier::ExtraTrees(Forest::fit(
                x,
                y,
                n_classes,
                params,
                Splitter::Random,
                seed,
            )?),
            CandidateSpec::GradientBoosting(params) => Classifier::GradientBoosting(
                GradientBoosting::fit(x, y, n_classes, params, seed)?,
            ),
            CandidateSpec::LogisticRegression(params) => {
                Classifier::LogisticRegression(LogisticRegression::fit(x, y, n_classes, params)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_argmax_first_max() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), 1);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn test_roster_order_and_names() {
        let names: Vec<&str> = CandidateSpec::default_roster()
            .iter()
            .map(CandidateSpec::name)
            .collect();
        assert_eq!(
            names,
            vec!["RandomForest", "ExtraTrees", "GradientBoosting", "LogisticRegression"]
        );
    }

    #[test]
    fn test_spec_from_json_with_defaults() {
        let spec: CandidateSpec =
            serde_json::from_str(r#"{"family": "random_forest", "n_estimators": 10}"#).unwrap();
        match spec {
            CandidateSpec::RandomForest(params) => {
                assert_eq!(params.n_estimators, 10);
                assert_eq!(params.max_depth, Some(15));
            }
            other => panic!("unexpected {:?}", other),
        }
        let value = CandidateSpec::LogisticRegression(LinearParams::default()).hyperparameters();
        assert_eq!(value["family"], "logistic_regression");
        assert_eq!(value["max_iter"], 1000);
    }

    #[test]
    fn test_structure_check_catches_corrupt_trees() {
        let x = array![[0.0], [1.0], [5.0], [6.0]];
        let y = [0, 0, 1, 1];
        let model = CandidateSpec::GradientBoosting(BoostingParams {
            n_estimators: 2,
            ..BoostingParams::default()
        })
        .fit(x.view(), &y, 2, 42)
        .unwrap();
        assert!(model.check_structure().is_ok());

        let mut value = serde_json::to_value(&model).unwrap();
        value["GradientBoosting"]["stages"][0][0]["nodes"][0]["Split"]["right"] =
            serde_json::json!(999);
        let corrupt: Classifier = serde_json::from_value(value).unwrap();
        assert!(matches!(
            corrupt.check_structure(),
            Err(TrainingError::InconsistentBundle(_))
        ));

        let mut value = serde_json::to_value(&model).unwrap();
        value["GradientBoosting"]["stages"][0][0]["nodes"][0]["Split"]["feature"] =
            serde_json::json!(3);
        let corrupt: Classifier = serde_json::from_value(value).unwrap();
        assert!(corrupt.check_structure().is_err());
    }

    #[test]
    fn test_fit_and_predict_checks_width() {
        let x = array![[0.0], [1.0], [5.0], [6.0]];
        let y = [0, 0, 1, 1];
        let model = CandidateSpec::LogisticRegression(LinearParams::default())
            .fit(x.view(), &y, 2, 42)
            .unwrap();
        assert_eq!(model.family(), "LogisticRegression");
        assert_eq!(model.predict(x.view()).unwrap(), vec![0, 0, 1, 1]);
        assert!(model.predict_proba_row(&[1.0, 2.0]).is_err());
        assert_eq!(model.oob_score(), None);
    }

    #[test]
    fn test_classifier_binary_round_trip_shape() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [5.0, 1.0], [6.0, 0.0]];
        let y = [0, 0, 1, 1];
        let spec = CandidateSpec::GradientBoosting(BoostingParams {
            n_estimators: 5,
            ..BoostingParams::default()
        });
        let model = spec.fit(x.view(), &y, 2, 1).unwrap();
        let proba = model.predict_proba(x.view()).unwrap();
        assert_eq!(proba.dim(), (4, 2));
        assert_eq!(model.feature_importances().len(), 2);
    }
}
