use async_trait::async_trait;
use dotenv::dotenv;
use reqwest::Client;
use serde::Serialize;
use std::env;
use std::error::Error;
use std::fmt;
use tracing::debug;

use crate::error::{PlannerError, Result};
use crate::model::{DailyTarget, UserProfile};
use crate::oracle::{checked_target, NutritionTargetOracle};

pub const DEFAULT_ORACLE_URL_ENV_VAR: &str = "NUTRITION_ORACLE_URL";

#[derive(Debug)]
pub enum OracleConnectionError {
    MissingEndpoint(String),
    NetworkError(reqwest::Error),
    SerializationError(serde_json::Error),
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
}

impl fmt::Display for OracleConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleConnectionError::MissingEndpoint(var_name) => {
                write!(f, "Oracle endpoint not found in environment: {}", var_name)
            }
            OracleConnectionError::NetworkError(err) => write!(f, "Network error: {}", err),
            OracleConnectionError::SerializationError(err) => {
                write!(f, "Serialization error: {}", err)
            }
            OracleConnectionError::ApiError { status, error_body } => {
                write!(f, "Oracle error {}: {}", status, error_body)
            }
        }
    }
}

impl Error for OracleConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OracleConnectionError::NetworkError(err) => Some(err),
            OracleConnectionError::SerializationError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OracleConnectionError {
    fn from(err: reqwest::Error) -> Self {
        OracleConnectionError::NetworkError(err)
    }
}

impl From<serde_json::Error> for OracleConnectionError {
    fn from(err: serde_json::Error) -> Self {
        OracleConnectionError::SerializationError(err)
    }
}

impl From<OracleConnectionError> for PlannerError {
    fn from(err: OracleConnectionError) -> Self {
        PlannerError::Oracle(err.to_string())
    }
}

/// Demographic payload posted to the oracle service.
#[derive(Debug, Serialize)]
struct TargetRequest {
    #[serde(rename = "Height_in")]
    height_in: f64,
    #[serde(rename = "Weight_lb")]
    weight_lb: f64,
    #[serde(rename = "Age")]
    age: i64,
    #[serde(rename = "Gender")]
    gender: i64,
    #[serde(rename = "Activity_Level")]
    activity_level: i64,
    #[serde(rename = "Goal")]
    goal: i64,
}

/// Oracle backed by an HTTP service. The endpoint URL is read from an
/// environment variable at call time, so `.env` changes are picked up.
#[derive(Debug, Clone)]
pub struct RemoteOracle {
    url_env_var: String,
    client: Client,
}

impl RemoteOracle {
    pub fn new(url_env_var_name: &str) -> Self {
        dotenv().ok();
        Self {
            url_env_var: url_env_var_name.to_string(),
            client: Client::new(),
        }
    }

    pub fn from_default_env() -> Self {
        Self::new(DEFAULT_ORACLE_URL_ENV_VAR)
    }

    /// True when the endpoint variable is set.
    pub fn is_configured(&self) -> bool {
        env::var(&self.url_env_var).is_ok()
    }

    pub async fn fetch_target(&self, profile: &UserProfile) -> std::result::Result<DailyTarget, OracleConnectionError> {
        let url = env::var(&self.url_env_var)
            .map_err(|_| OracleConnectionError::MissingEndpoint(self.url_env_var.clone()))?;

        let request = TargetRequest {
            height_in: profile.height_in.unwrap_or_default(),
            weight_lb: profile.weight_lb.unwrap_or_default(),
            age: profile.age.unwrap_or_default(),
            gender: profile.gender.unwrap_or_default(),
            activity_level: profile.activity_level.unwrap_or_default(),
            goal: profile.goal.unwrap_or_default(),
        };
        let payload = serde_json::to_value(&request)?;
        debug!(%url, "Requesting daily target");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            let body = response.text().await?;
            Ok(serde_json::from_str::<DailyTarget>(&body)?)
        } else {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            Err(OracleConnectionError::ApiError { status, error_body })
        }
    }
}

#[async_trait]
impl NutritionTargetOracle for RemoteOracle {
    async fn daily_target(&self, profile: &UserProfile) -> Result<DailyTarget> {
        profile.validate()?;
        let target = self.fetch_target(profile).await?;
        checked_target(target, self.name())
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_service_field_names() {
        let request = TargetRequest {
            height_in: 70.0,
            weight_lb: 180.0,
            age: 25,
            gender: 1,
            activity_level: 2,
            goal: -1,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["Height_in"], 70.0);
        assert_eq!(json["Activity_Level"], 2);
        assert_eq!(json["Goal"], -1);
    }

    #[test]
    fn test_connection_error_maps_to_oracle_error() {
        let err: PlannerError = OracleConnectionError::MissingEndpoint("X".into()).into();
        assert!(matches!(err, PlannerError::Oracle(ref msg) if msg.contains("X")));
    }
}
