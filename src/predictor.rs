//! Applies the trained model to live observations.

use crate::error::{PipelineError, Result};
use crate::models::{FeatureVector, LiveRecord, Prediction};
use crate::trainer::TrainedModel;

// ---

/// Produce one [`Prediction`] per live record, in the same order.
///
/// Live `humidity`/`wind_speed` are fed in as the `next_*` features, the
/// same convention the model was trained under.
pub fn predict(model: &TrainedModel, records: &[LiveRecord]) -> Result<Vec<Prediction>> {
    // ---
    let features: Vec<FeatureVector> = records.iter().map(LiveRecord::to_features).collect();
    let temps = model.predict(&features)?;

    if temps.len() != records.len() {
        return Err(PipelineError::ModelFit(format!(
            "model returned {} predictions for {} records",
            temps.len(),
            records.len()
        )));
    }

    let predictions: Vec<Prediction> = records
        .iter()
        .zip(temps)
        .map(|(rec, predicted_temp)| Prediction {
            city: rec.city.clone(),
            predicted_temp,
        })
        .collect();

    for p in &predictions {
        tracing::debug!("Predicted {:.2} for {}", p.predicted_temp, p.city);
    }
    Ok(predictions)
}
