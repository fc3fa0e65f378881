//! Model training, held-out evaluation and optional persistence.
//!
//! The forest hyperparameters and the split are fixed so that two runs over
//! the same dataset produce the same model.

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::{mean_absolute_error, mean_squared_error, r2};

use crate::error::{PipelineError, Result};
use crate::features::to_matrix;
use crate::models::{FeatureVector, TrainingExample, FEATURE_SCHEMA};

// ---

/// Seed shared by the train/test shuffle and the forest's bootstrap sampling.
pub const SEED: u64 = 42;

/// Number of trees in the ensemble.
pub const N_TREES: usize = 100;

/// Percentage of examples held out from fitting, rounded up.
pub const TEST_PERCENT: usize = 20;

/// Smallest example count that still leaves one row to fit on.
pub const MIN_EXAMPLES: usize = 2;

pub type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Scores of the fitted model on the held-out partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    // ---
    pub test_rows: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Undefined when every held-out label is the same (e.g. one test row).
    pub r2: Option<f64>,
}

/// A fitted regressor, kept in memory for the rest of the run.
#[derive(Debug)]
pub struct TrainedModel {
    // ---
    forest: Forest,
    /// `None` when the model was loaded from disk.
    pub evaluation: Option<Evaluation>,
}

/// On-disk form written by [`TrainedModel::save`].
#[derive(Serialize)]
struct PersistedModelRef<'a> {
    feature_schema: &'a [&'a str],
    evaluation: Option<Evaluation>,
    forest: &'a Forest,
}

/// Owned counterpart of [`PersistedModelRef`], read by [`TrainedModel::load`].
#[derive(Deserialize)]
struct PersistedModel {
    feature_schema: Vec<String>,
    evaluation: Option<Evaluation>,
    forest: Forest,
}

/// Index partition produced by [`split_indices`].
#[derive(Debug, PartialEq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with the fixed seed and hold out `ceil(n * 20%)` of it.
pub fn split_indices(n: usize) -> Split {
    // ---
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(SEED);
    indices.shuffle(&mut rng);

    let n_test = (n * TEST_PERCENT).div_ceil(100);
    let train = indices.split_off(n_test);
    Split {
        train,
        test: indices,
    }
}

/// Fit the forest on the training partition and score the test partition.
///
/// Fails with [`PipelineError::ModelFit`] when there are fewer than
/// [`MIN_EXAMPLES`] examples or the library rejects the data.
pub fn train(examples: &[TrainingExample]) -> Result<TrainedModel> {
    // ---
    if examples.len() < MIN_EXAMPLES {
        return Err(PipelineError::ModelFit(format!(
            "need at least {} training examples, got {}",
            MIN_EXAMPLES,
            examples.len()
        )));
    }

    let (rows, labels) = to_matrix(examples);
    let split = split_indices(rows.len());

    let (x_train, y_train) = select(&rows, &labels, &split.train);
    let (x_test, y_test) = select(&rows, &labels, &split.test);

    tracing::info!(
        "Fitting random forest ({} trees, seed {}) on {} rows, holding out {}",
        N_TREES,
        SEED,
        y_train.len(),
        y_test.len()
    );

    // Every split considers all three features.
    let params = RandomForestRegressorParameters::default()
        .with_n_trees(N_TREES)
        .with_m(FEATURE_SCHEMA.len())
        .with_seed(SEED);

    let x_train = DenseMatrix::from_2d_vec(&x_train);
    let forest = Forest::fit(&x_train, &y_train, params)
        .map_err(|e| PipelineError::ModelFit(e.to_string()))?;

    let mut model = TrainedModel {
        forest,
        evaluation: None,
    };
    model.evaluation = Some(model.evaluate(&x_test, &y_test)?);
    Ok(model)
}

fn select(rows: &[Vec<f64>], labels: &[f64], idx: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
    // ---
    idx.iter().map(|&i| (rows[i].clone(), labels[i])).unzip()
}

impl TrainedModel {
    /// Predict one temperature per feature vector, in input order.
    ///
    /// Library failures here are reported as [`PipelineError::ModelFit`] too.
    pub fn predict(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
        // ---
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<Vec<f64>> = features.iter().map(|f| f.to_row()).collect();
        self.predict_rows(&rows)
    }

    fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        // ---
        let x = DenseMatrix::from_2d_vec(&rows.to_vec());
        self.forest
            .predict(&x)
            .map_err(|e| PipelineError::ModelFit(e.to_string()))
    }

    fn evaluate(&self, x_test: &[Vec<f64>], y_test: &Vec<f64>) -> Result<Evaluation> {
        // ---
        let y_pred = self.predict_rows(x_test)?;
        let evaluation = Evaluation {
            test_rows: y_test.len(),
            mae: mean_absolute_error(y_test, &y_pred),
            rmse: mean_squared_error(y_test, &y_pred).sqrt(),
            r2: Some(r2(y_test, &y_pred)).filter(|v| v.is_finite()),
        };

        tracing::info!(
            "Held-out evaluation on {} rows: MAE={:.3} RMSE={:.3} R2={}",
            evaluation.test_rows,
            evaluation.mae,
            evaluation.rmse,
            evaluation
                .r2
                .map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v))
        );
        Ok(evaluation)
    }

    /// Write the fitted forest and its feature schema as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        // ---
        let persisted = PersistedModelRef {
            feature_schema: &FEATURE_SCHEMA,
            evaluation: self.evaluation,
            forest: &self.forest,
        };
        let json =
            serde_json::to_vec(&persisted).map_err(|e| PipelineError::model_io(path, e))?;
        fs::write(path, json).map_err(|e| PipelineError::model_io(path, e))?;

        tracing::info!("Saved model to {}", path.display());
        Ok(())
    }

    /// Load a model written by [`TrainedModel::save`].
    ///
    /// Rejects files whose feature schema differs from the current one.
    pub fn load(path: &Path) -> Result<Self> {
        // ---
        let bytes = fs::read(path).map_err(|e| PipelineError::model_io(path, e))?;
        let persisted: PersistedModel =
            serde_json::from_slice(&bytes).map_err(|e| PipelineError::model_io(path, e))?;

        if persisted.feature_schema != FEATURE_SCHEMA {
            return Err(PipelineError::model_io(
                path,
                format!(
                    "feature schema {:?} does not match {:?}",
                    persisted.feature_schema, FEATURE_SCHEMA
                ),
            ));
        }

        tracing::info!("Loaded model from {}", path.display());
        Ok(TrainedModel {
            forest: persisted.forest,
            evaluation: persisted.evaluation,
        })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use tempfile::NamedTempFile;

    /// Smooth synthetic series: tomorrow is a little warmer when it is drier.
    fn synthetic(n: usize) -> Vec<TrainingExample> {
        // ---
        (0..n)
            .map(|i| {
                let temp = 20.0 + (i % 10) as f64;
                let next_humidity = 40.0 + ((i * 7) % 30) as f64;
                let next_windspeed = 5.0 + ((i * 3) % 8) as f64;
                TrainingExample {
                    features: FeatureVector {
                        temp,
                        next_humidity,
                        next_windspeed,
                    },
                    label: temp + 1.0 - (next_humidity - 55.0) * 0.05,
                }
            })
            .collect()
    }

    fn probes() -> Vec<FeatureVector> {
        vec![
            FeatureVector {
                temp: 21.0,
                next_humidity: 50.0,
                next_windspeed: 6.0,
            },
            FeatureVector {
                temp: 28.0,
                next_humidity: 65.0,
                next_windspeed: 11.0,
            },
        ]
    }

    #[test]
    fn test_split_is_80_20_and_disjoint() {
        // ---
        let split = split_indices(50);

        assert_eq!(split.test.len(), 10);
        assert_eq!(split.train.len(), 40);

        let mut all: Vec<_> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        // ---
        for (n, n_test) in [(2, 1), (5, 1), (7, 2), (37, 8), (60, 12)] {
            let split = split_indices(n);
            assert_eq!(split.test.len(), n_test, "n={}", n);
            assert_eq!(split.train.len(), n - n_test, "n={}", n);
        }
    }

    #[test]
    fn test_smallest_dataset_still_fits() {
        // ---
        let model = train(&synthetic(MIN_EXAMPLES)).unwrap();
        let eval = model.evaluation.unwrap();

        assert_eq!(eval.test_rows, 1);
        assert!(eval.mae.is_finite());
        assert!(model.predict(&probes()).unwrap().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_split_is_reproducible() {
        // ---
        assert_eq!(split_indices(37), split_indices(37));
    }

    #[test]
    fn test_too_few_examples_is_fit_error() {
        // ---
        let err = train(&synthetic(MIN_EXAMPLES - 1)).unwrap_err();
        assert!(matches!(err, PipelineError::ModelFit(_)));

        assert!(matches!(train(&[]), Err(PipelineError::ModelFit(_))));
    }

    #[test]
    fn test_training_is_deterministic() {
        // ---
        let examples = synthetic(60);

        let first = train(&examples).unwrap().predict(&probes()).unwrap();
        let second = train(&examples).unwrap().predict(&probes()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_predictions_stay_within_label_range() {
        // ---
        let examples = synthetic(60);
        let model = train(&examples).unwrap();

        let lo = examples.iter().map(|e| e.label).fold(f64::INFINITY, f64::min);
        let hi = examples.iter().map(|e| e.label).fold(f64::NEG_INFINITY, f64::max);

        let preds = model.predict(&probes()).unwrap();
        assert_eq!(preds.len(), 2);
        for p in preds {
            assert!(p.is_finite());
            assert!(p >= lo - 1e-9 && p <= hi + 1e-9, "{} outside [{}, {}]", p, lo, hi);
        }
    }

    #[test]
    fn test_evaluation_covers_test_partition() {
        // ---
        let model = train(&synthetic(60)).unwrap();
        let eval = model.evaluation.unwrap();

        assert_eq!(eval.test_rows, 12);
        assert!(eval.mae >= 0.0);
        assert!(eval.rmse >= eval.mae - 1e-9);
    }

    #[test]
    fn test_empty_input_predicts_nothing() {
        // ---
        let model = train(&synthetic(20)).unwrap();
        assert!(model.predict(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_preserve_predictions() {
        // ---
        let model = train(&synthetic(40)).unwrap();
        let file = NamedTempFile::new().unwrap();

        model.save(file.path()).unwrap();
        let loaded = TrainedModel::load(file.path()).unwrap();

        assert_eq!(
            model.predict(&probes()).unwrap(),
            loaded.predict(&probes()).unwrap()
        );
        assert_eq!(model.evaluation, loaded.evaluation);
    }

    #[test]
    fn test_load_rejects_foreign_schema() {
        // ---
        let model = train(&synthetic(40)).unwrap();
        let file = NamedTempFile::new().unwrap();
        model.save(file.path()).unwrap();

        let mut json: serde_json::Value =
            serde_json::from_slice(&fs::read(file.path()).unwrap()).unwrap();
        json["feature_schema"] = serde_json::json!(["temp", "humidity", "windspeed"]);
        fs::write(file.path(), serde_json::to_vec(&json).unwrap()).unwrap();

        assert!(matches!(
            TrainedModel::load(file.path()),
            Err(PipelineError::ModelIo { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_is_model_io_error() {
        // ---
        assert!(matches!(
            TrainedModel::load(Path::new("/no/such/model.json")),
            Err(PipelineError::ModelIo { .. })
        ));
    }
}
