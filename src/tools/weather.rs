//! Built-in weather tool backed by the Open-Meteo forecast API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{RelayError, Result};
use crate::tools::{ToolDefinition, ToolExecutor};

pub const NAME: &str = "get_current_weather";

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: "Get the current weather at a location".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "latitude": {
                    "type": "number",
                    "description": "The latitude of the location"
                },
                "longitude": {
                    "type": "number",
                    "description": "The longitude of the location"
                }
            },
            "required": ["latitude", "longitude"]
        }),
    }
}

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    latitude: f64,
    longitude: f64,
}

/// Fetches current temperature, the hourly curve and sunrise/sunset.
pub struct WeatherTool {
    client: reqwest::Client,
    forecast_url: String,
}

impl WeatherTool {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            forecast_url: format!("{}/v1/forecast", base_url.trim_end_matches('/')),
        }
    }

    fn failure(message: impl std::fmt::Display) -> RelayError {
        RelayError::Tool {
            name: NAME.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ToolExecutor for WeatherTool {
    async fn execute(&self, args: Value) -> Result<Value> {
        let args: WeatherArgs = serde_json::from_value(args).map_err(Self::failure)?;

        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", args.latitude.to_string()),
                ("longitude", args.longitude.to_string()),
                ("current", "temperature_2m".to_string()),
                ("hourly", "temperature_2m".to_string()),
                ("daily", "sunrise,sunset".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .map_err(Self::failure)?;

        if !response.status().is_success() {
            return Err(Self::failure(format!(
                "forecast API returned HTTP {}",
                response.status().as_u16()
            )));
        }

        response.json::<Value>().await.map_err(Self::failure)
    }
}
