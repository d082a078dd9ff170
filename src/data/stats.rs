use serde::Serialize;

use super::model::Dataset;

/// Summary of the PM2.5 column.
///
/// The aggregates are `None` (serialized as `null`) when the dataset is empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pm25Stats {
    pub count: usize,
    pub average_pm25: Option<f64>,
    pub min_pm25: Option<f64>,
    pub max_pm25: Option<f64>,
}

pub fn pm25_stats(dataset: &Dataset) -> Pm25Stats {
    let count = dataset.len();
    if count == 0 {
        return Pm25Stats {
            count,
            average_pm25: None,
            min_pm25: None,
            max_pm25: None,
        };
    }

    let (sum, min, max) = dataset.entries().iter().fold(
        (0.0, f64::INFINITY, f64::NEG_INFINITY),
        |(sum, min, max), e| (sum + e.pm25, min.min(e.pm25), max.max(e.pm25)),
    );

    Pm25Stats {
        count,
        average_pm25: Some(sum / count as f64),
        min_pm25: Some(min),
        max_pm25: Some(max),
    }
}
