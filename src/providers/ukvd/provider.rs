//! UK Vehicle Data registry client, used as a fallback when a registration
//! is not in the cached stock. A successful hit is reshaped into the same
//! vehicle object layout the stock feed uses so callers never need to know
//! which source answered.

use crate::error::{Error, Result};
use crate::providers::{truncate_for_log, RegistryLookup};
use crate::util::env::env_opt;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

const DEFAULT_ENDPOINT: &str = "https://uk.api.vehicledataglobal.com/r2/lookup";
const DEFAULT_PACKAGE: &str = "VehicleDetails";

/// Kilowatts to brake horsepower.
const KW_TO_BHP: f64 = 1.341;

#[derive(Debug, Clone)]
pub struct UkvdConfig {
    pub endpoint: String,
    pub api_key: String,
    pub package_name: String,
}

impl UkvdConfig {
    /// Returns `None` when UKVD_API_KEY is unset, in which case the lookup
    /// fallback is simply disabled.
    pub fn from_env() -> Option<Self> {
        let api_key = env_opt("UKVD_API_KEY")?;
        Some(Self {
            endpoint: env_opt("UKVD_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key,
            package_name: env_opt("UKVD_PACKAGE").unwrap_or_else(|| DEFAULT_PACKAGE.to_string()),
        })
    }
}

pub struct UkvdProvider {
    config: UkvdConfig,
    http: Client,
}

impl UkvdProvider {
    pub fn new(config: UkvdConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent("forecourt/0.1")
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl RegistryLookup for UkvdProvider {
    async fn lookup(&self, registration: &str) -> Result<Option<Value>> {
        let resp = self
            .http
            .get(&self.config.endpoint)
            .query(&[
                ("apiKey", self.config.api_key.as_str()),
                ("packageName", self.config.package_name.as_str()),
                ("vrm", registration),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Provider {
                status: status.as_u16(),
                message: truncate_for_log(&body, 2000),
            });
        }

        let payload: Value = serde_json::from_str(&body).map_err(|e| Error::Provider {
            status: status.as_u16(),
            message: format!("unparseable registry response: {e}"),
        })?;

        match payload.get("Results").and_then(|r| r.get("VehicleDetails")) {
            Some(details) => Ok(Some(normalize_vehicle(details, registration))),
            None => {
                if let Some(info) = payload
                    .get("ResponseInformation")
                    .and_then(|i| i.get("StatusMessage"))
                    .and_then(Value::as_str)
                {
                    warn!(registration, status_message = info, "registry lookup miss");
                }
                Ok(None)
            }
        }
    }
}

/// Reshapes a registry `VehicleDetails` block into the stock feed's vehicle
/// layout. Fields the registry does not carry are null or empty.
fn normalize_vehicle(details: &Value, registration: &str) -> Value {
    let ident = details.get("VehicleIdentification").cloned().unwrap_or(json!({}));
    let tech = details.get("DvlaTechnicalDetails").cloned().unwrap_or(json!({}));
    let history = details.get("VehicleHistory").cloned().unwrap_or(json!({}));
    let status = details.get("VehicleStatus").cloned().unwrap_or(json!({}));

    let model = ident.get("DvlaModel").cloned().unwrap_or(Value::Null);
    let body_type = ident.get("DvlaBodyType").cloned().unwrap_or(Value::Null);

    let power_bhp = tech
        .get("MaxNetPowerKw")
        .and_then(Value::as_f64)
        .map(|kw| Value::from((kw * KW_TO_BHP).round() as i64))
        .unwrap_or(Value::Null);

    json!({
        "registration": ident.get("Vrm").and_then(Value::as_str).unwrap_or(registration),
        "make": ident.get("DvlaMake").cloned().unwrap_or(Value::Null),
        "model": model.clone(),
        "generation": model.clone(),
        "derivative": body_type.as_str().unwrap_or(""),
        "vehicleType": "Car",
        "trim": model,
        "bodyType": body_type,
        "fuelType": ident.get("DvlaFuelType").cloned().unwrap_or(Value::Null),
        "transmissionType": "",
        "drivetrain": "",
        "colour": history
            .get("ColourDetails")
            .and_then(|c| c.get("CurrentColour"))
            .and_then(Value::as_str)
            .unwrap_or(""),
        "engineCapacityCC": tech.get("EngineCapacityCc").cloned().unwrap_or(Value::Null),
        "enginePowerBHP": power_bhp,
        "emissionClass": "Euro 6",
        "co2EmissionGPKM": status
            .get("VehicleExciseDutyDetails")
            .and_then(|d| d.get("DvlaCo2"))
            .cloned()
            .unwrap_or(Value::Null),
        "topSpeedMPH": Value::Null,
        "accelerationSeconds": Value::Null,
        "doors": Value::Null,
        "seats": tech.get("NumberOfSeats").cloned().unwrap_or(Value::Null),
        "firstRegistrationDate": ident.get("DateFirstRegistered").cloned().unwrap_or(Value::Null),
        "yearOfManufacture": ident.get("YearOfManufacture").cloned().unwrap_or(Value::Null),
        "odometerReadingMiles": Value::Null,
        "price": Value::Null,
        "images": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_registry_hit() {
        let details = json!({
            "VehicleIdentification": {
                "Vrm": "AB12CDE",
                "DvlaMake": "FORD",
                "DvlaModel": "FOCUS",
                "DvlaBodyType": "Hatchback",
                "DvlaFuelType": "Petrol",
                "DateFirstRegistered": "2019-03-01",
                "YearOfManufacture": 2019
            },
            "DvlaTechnicalDetails": {
                "EngineCapacityCc": 999,
                "MaxNetPowerKw": 92.0,
                "NumberOfSeats": 5
            },
            "VehicleHistory": {
                "ColourDetails": {"CurrentColour": "Blue"}
            },
            "VehicleStatus": {
                "VehicleExciseDutyDetails": {"DvlaCo2": 108}
            }
        });

        let vehicle = normalize_vehicle(&details, "AB12CDE");
        assert_eq!(vehicle["registration"], "AB12CDE");
        assert_eq!(vehicle["make"], "FORD");
        assert_eq!(vehicle["colour"], "Blue");
        // 92 kW * 1.341 = 123.372, rounded
        assert_eq!(vehicle["enginePowerBHP"], 123);
        assert_eq!(vehicle["seats"], 5);
        assert_eq!(vehicle["co2EmissionGPKM"], 108);
    }

    #[test]
    fn falls_back_to_queried_registration() {
        let details = json!({"DvlaTechnicalDetails": {}});
        let vehicle = normalize_vehicle(&details, "XY34ZZZ");
        assert_eq!(vehicle["registration"], "XY34ZZZ");
        assert_eq!(vehicle["enginePowerBHP"], Value::Null);
    }

    #[test]
    fn missing_power_stays_null() {
        let details = json!({
            "VehicleIdentification": {"Vrm": "AA11AAA"},
            "DvlaTechnicalDetails": {"EngineCapacityCc": 1600}
        });
        let vehicle = normalize_vehicle(&details, "AA11AAA");
        assert_eq!(vehicle["enginePowerBHP"], Value::Null);
        assert_eq!(vehicle["engineCapacityCC"], 1600);
    }
}
