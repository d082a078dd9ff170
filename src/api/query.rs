use std::str::FromStr;

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use super::blocking;
use crate::data::filter::FilterCriteria;
use crate::data::model::Entry;
use crate::data::schema::FieldError;
use crate::data::stats::Pm25Stats;
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Raw `?year=&lat=&long=` parameters. Kept as strings so a bad value is
/// reported per field instead of as an opaque rejection.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub year: Option<String>,
    pub lat: Option<String>,
    pub long: Option<String>,
}

impl FilterParams {
    pub fn criteria(&self) -> Result<FilterCriteria, Vec<FieldError>> {
        let mut errors = Vec::new();
        let criteria = FilterCriteria {
            year: parse_param(self.year.as_deref(), "year", "an integer", &mut errors),
            latitude: parse_param(self.lat.as_deref(), "lat", "a number", &mut errors),
            longitude: parse_param(self.long.as_deref(), "long", "a number", &mut errors),
        };
        if errors.is_empty() {
            Ok(criteria)
        } else {
            Err(errors)
        }
    }
}

/// An empty value (`?year=`) counts as absent.
fn parse_param<T: FromStr>(
    raw: Option<&str>,
    name: &str,
    expected: &str,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(FieldError::new(name, format!("'{raw}' is not {expected}")));
            None
        }
    }
}

/// `GET /data/filter`
pub async fn filter(
    State(state): State<SharedState>,
    Query(params): Query<FilterParams>,
) -> ApiResult<Json<Vec<Entry>>> {
    let criteria = params.criteria().map_err(ApiError::Validation)?;
    let entries = blocking(move || state.filter(&criteria)).await?;
    log::debug!("Filter {criteria:?} matched {} entries", entries.len());
    Ok(Json(entries))
}

/// `GET /data/stats`
pub async fn stats(State(state): State<SharedState>) -> ApiResult<Json<Pm25Stats>> {
    let stats = blocking(move || state.stats()).await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::test_support::{app, send};
    use crate::data::model::Entry;

    fn sample() -> Vec<Entry> {
        vec![
            Entry::new(2019, 10.0, 20.0, 1.0),
            Entry::new(2020, 10.5, 20.0, 3.0),
            Entry::new(2020, 11.0, 21.0, 5.0),
            Entry::new(2021, 10.5, 22.0, 7.0),
        ]
    }

    #[tokio::test]
    async fn filter_by_year_keeps_order() {
        let (app, _) = app(sample());
        let (status, body) = send(&app, "GET", "/data/filter?year=2020", None).await;
        assert_eq!(status, StatusCode::OK);
        let pm: Vec<f64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["PM25"].as_f64().unwrap())
            .collect();
        assert_eq!(pm, vec![3.0, 5.0]);
    }

    #[tokio::test]
    async fn filter_composes_criteria() {
        let (app, _) = app(sample());
        let uri = "/data/filter?year=2020&lat=10.5&long=20";
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"Year": 2020, "Latitude": 10.5, "Longitude": 20.0, "PM25": 3.0}])
        );
    }

    #[tokio::test]
    async fn filter_without_criteria_returns_everything() {
        let (app, _) = app(sample());
        let (status, body) = send(&app, "GET", "/data/filter", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn filter_without_match_is_404() {
        let (app, _) = app(sample());
        let (status, body) = send(&app, "GET", "/data/filter?lat=10.50001", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "No matching data found"}));
    }

    #[tokio::test]
    async fn filter_with_bad_param_is_422() {
        let (app, _) = app(sample());
        let (status, body) = send(&app, "GET", "/data/filter?year=soon&long=x", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["field"], "year");
        assert_eq!(body["detail"][1]["field"], "long");
    }

    #[tokio::test]
    async fn stats_summarises_pm25() {
        let (app, _) = app(vec![
            Entry::new(2020, 0.0, 0.0, 1.0),
            Entry::new(2020, 0.0, 0.0, 3.0),
            Entry::new(2020, 0.0, 0.0, 5.0),
        ]);
        let (status, body) = send(&app, "GET", "/data/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"count": 3, "average_pm25": 3.0, "min_pm25": 1.0, "max_pm25": 5.0})
        );
    }

    #[tokio::test]
    async fn stats_on_empty_dataset_has_nulls() {
        let (app, _) = app(Vec::new());
        let (status, body) = send(&app, "GET", "/data/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
        assert!(body["average_pm25"].is_null());
    }

    #[tokio::test]
    async fn stats_count_follows_mutations() {
        let (app, _) = app(sample());
        send(&app, "DELETE", "/data/0", None).await;
        let (_, body) = send(&app, "GET", "/data/stats", None).await;
        assert_eq!(body["count"], 3);
    }
}
