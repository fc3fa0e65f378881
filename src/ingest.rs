//! Live observation ingest from the Visual Crossing timeline API.
//!
//! For each configured city this stores one `weather_data` row that pairs
//! today's observed temperature with tomorrow's forecast humidity and wind
//! speed. That pairing is what the predictor expects to read back.

use std::time::Duration;

use chrono::{Days, NaiveDate};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::IngestConfig;
use crate::error::{PipelineError, Result};
use crate::models::Observation;
use crate::store::PgWeatherStore;

// ---

const REQUEST_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    #[serde(rename = "currentConditions")]
    current_conditions: Option<Conditions>,
    #[serde(default)]
    days: Vec<Conditions>,
}

#[derive(Debug, Deserialize)]
struct Conditions {
    temp: Option<f64>,
    humidity: Option<f64>,
    windspeed: Option<f64>,
}

/// Thin client over the timeline endpoint.
#[derive(Debug, Clone)]
pub struct TimelineClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl TimelineClient {
    pub fn new(cfg: &IngestConfig) -> Result<Self> {
        // ---
        let base_url = Url::parse(&cfg.api_url)
            .map_err(|e| PipelineError::Ingest(format!("invalid API URL '{}': {}", cfg.api_url, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: cfg.api_key.clone(),
        })
    }

    /// `{base}/{city}/{date}?unitGroup=metric&key=…&contentType=json`
    fn timeline_url(&self, city: &str, date: NaiveDate) -> Result<Url> {
        // ---
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PipelineError::Ingest(format!("API URL '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push(city)
            .push(&date.format("%Y-%m-%d").to_string());
        url.query_pairs_mut()
            .append_pair("unitGroup", "metric")
            .append_pair("key", &self.api_key)
            .append_pair("contentType", "json");
        Ok(url)
    }

    async fn timeline(&self, city: &str, date: NaiveDate) -> Result<TimelineResponse> {
        // ---
        let url = self.timeline_url(city, date)?;
        debug!("Fetching timeline for {} on {}", city, date);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(PipelineError::Ingest(format!(
                "timeline request for {} on {} returned {}",
                city,
                date,
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Build the observation for `city`: today's temperature plus tomorrow's
    /// humidity and wind speed, dated tomorrow.
    pub async fn observation_for(&self, city: &str, today: NaiveDate) -> Result<Observation> {
        // ---
        let tomorrow = today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| PipelineError::Ingest(format!("no day after {}", today)))?;

        let missing = |what: &str| PipelineError::Ingest(format!("{} missing {}", city, what));

        let now = self.timeline(city, today).await?;
        let temperature = now
            .current_conditions
            .and_then(|c| c.temp)
            .ok_or_else(|| missing("currentConditions.temp"))?;

        let next = self.timeline(city, tomorrow).await?;
        let day = next.days.first().ok_or_else(|| missing("days[0]"))?;
        let humidity = day.humidity.ok_or_else(|| missing("days[0].humidity"))?;
        let wind_speed = day.windspeed.ok_or_else(|| missing("days[0].windspeed"))?;

        Ok(Observation {
            city: city.to_string(),
            temperature,
            humidity,
            wind_speed,
            date: tomorrow,
        })
    }
}

/// Fetch and store one observation per configured city.
///
/// Any failure aborts the ingest; rows already inserted for earlier cities
/// stay in place.
pub async fn ingest_cities(
    cfg: &IngestConfig,
    store: &PgWeatherStore,
    today: NaiveDate,
) -> Result<usize> {
    // ---
    let client = TimelineClient::new(cfg)?;

    for city in &cfg.cities {
        let obs = client.observation_for(city, today).await?;
        store.insert_observation(&obs).await?;
        info!(
            "Ingested {}: temp={} next_humidity={} next_windspeed={}",
            obs.city, obs.temperature, obs.humidity, obs.wind_speed
        );
    }
    Ok(cfg.cities.len())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cfg(base: &str) -> IngestConfig {
        IngestConfig {
            api_url: format!("{}/timeline", base),
            api_key: "test-key".to_string(),
            cities: vec!["Chennai".to_string()],
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 3).unwrap()
    }

    #[test]
    fn test_timeline_url_shape() {
        // ---
        let client = TimelineClient::new(&cfg("https://example.test/api")).unwrap();
        let url = client.timeline_url("New Delhi", today()).unwrap();

        assert_eq!(url.path(), "/api/timeline/New%20Delhi/2024-10-03");
        assert_eq!(
            url.query(),
            Some("unitGroup=metric&key=test-key&contentType=json")
        );
    }

    #[tokio::test]
    async fn test_observation_mixes_today_and_tomorrow() {
        // ---
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/timeline/Chennai/2024-10-03"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "address": "Chennai",
                "timezone": "Asia/Kolkata",
                "currentConditions": {"temp": 31.2, "humidity": 70.0, "windspeed": 9.0},
                "days": [{"temp": 30.0, "humidity": 71.0, "windspeed": 10.0}]
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/timeline/Chennai/2024-10-04"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "days": [{"temp": 29.5, "humidity": 78.5, "windspeed": 14.3}]
            })))
            .mount(&mock_server)
            .await;

        let client = TimelineClient::new(&cfg(&mock_server.uri())).unwrap();
        let obs = client.observation_for("Chennai", today()).await.unwrap();

        assert_eq!(obs.temperature, 31.2);
        assert_eq!(obs.humidity, 78.5);
        assert_eq!(obs.wind_speed, 14.3);
        assert_eq!(obs.date, NaiveDate::from_ymd_opt(2024, 10, 4).unwrap());
    }

    #[tokio::test]
    async fn test_error_status_is_ingest_error() {
        // ---
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client = TimelineClient::new(&cfg(&mock_server.uri())).unwrap();
        let err = client.observation_for("Chennai", today()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Ingest(_)));
    }

    #[tokio::test]
    async fn test_missing_forecast_day_is_ingest_error() {
        // ---
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "currentConditions": {"temp": 25.0},
                "days": []
            })))
            .mount(&mock_server)
            .await;

        let client = TimelineClient::new(&cfg(&mock_server.uri())).unwrap();
        let err = client.observation_for("Chennai", today()).await.unwrap_err();

        match err {
            PipelineError::Ingest(msg) => assert!(msg.contains("days[0]"), "{}", msg),
            other => panic!("expected ingest error, got {:?}", other),
        }
    }
}
