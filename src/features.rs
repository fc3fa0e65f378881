//! Feature/target construction.
//!
//! Aligns each day with the following one: today's temperature plus
//! tomorrow's humidity and wind speed predict tomorrow's temperature.

use crate::models::{FeatureVector, HistoricalRecord, TrainingExample};

// ---

/// Build training examples from time-ordered records.
///
/// A pair `(t, t+1)` yields an example only if both records are complete,
/// so the last record never contributes a row of its own and gaps drop the
/// pairs on either side of them. Output order follows input order.
pub fn build_training_set(records: &[HistoricalRecord]) -> Vec<TrainingExample> {
    // ---
    let examples: Vec<TrainingExample> = records
        .windows(2)
        .filter_map(|pair| example_from_pair(&pair[0], &pair[1]))
        .collect();

    tracing::debug!(
        "Built {} training examples from {} records ({} dropped)",
        examples.len(),
        records.len(),
        records.len() - examples.len()
    );
    examples
}

fn example_from_pair(today: &HistoricalRecord, tomorrow: &HistoricalRecord) -> Option<TrainingExample> {
    // ---
    if !today.is_complete() {
        return None;
    }

    Some(TrainingExample {
        features: FeatureVector {
            temp: today.temp?,
            next_humidity: tomorrow.humidity?,
            next_windspeed: tomorrow.windspeed?,
        },
        label: tomorrow.temp?,
    })
}

/// Split examples into a row-major feature matrix and a label vector.
pub fn to_matrix(examples: &[TrainingExample]) -> (Vec<Vec<f64>>, Vec<f64>) {
    // ---
    examples
        .iter()
        .map(|ex| (ex.features.to_row(), ex.label))
        .unzip()
}
