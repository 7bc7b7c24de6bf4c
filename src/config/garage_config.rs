use crate::core::revenue::DEFAULT_CURRENCY;
use crate::domain::model::{Sector, Spot};
use crate::utils::error::{ParkingError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_non_negative_price, validate_positive_number,
    validate_range, validate_unique, validate_url, Validate,
};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarageConfig {
    #[serde(default)]
    pub garage: GarageInfo,
    #[serde(default)]
    pub sectors: Vec<SectorConfig>,
    #[serde(default)]
    pub spots: Vec<SpotConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GarageInfo {
    pub name: Option<String>,
    pub currency: Option<String>,
    pub simulator_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorConfig {
    pub code: String,
    pub base_price: Decimal,
    pub max_capacity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotConfig {
    pub code: String,
    pub sector: String,
    pub lat: f64,
    pub lng: f64,
}

/// 模擬器 `/garage` 端點回傳的 JSON 格式
#[derive(Debug, Clone, Deserialize)]
struct SimulatorLayout {
    #[serde(default)]
    garage: Vec<SimulatorSector>,
    #[serde(default)]
    spots: Vec<SimulatorSpot>,
}

#[derive(Debug, Clone, Deserialize)]
struct SimulatorSector {
    sector: String,
    #[serde(rename = "basePrice")]
    base_price: Decimal,
    max_capacity: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct SimulatorSpot {
    id: serde_json::Value,
    sector: String,
    lat: f64,
    lng: f64,
}

impl From<SimulatorLayout> for GarageConfig {
    fn from(layout: SimulatorLayout) -> Self {
        let sectors = layout
            .garage
            .into_iter()
            .map(|s| SectorConfig {
                code: s.sector,
                base_price: s.base_price,
                max_capacity: s.max_capacity,
            })
            .collect();

        // id 可能是數字或字串
        let spots = layout
            .spots
            .into_iter()
            .map(|s| SpotConfig {
                code: match s.id {
                    serde_json::Value::String(code) => code,
                    other => other.to_string(),
                },
                sector: s.sector,
                lat: s.lat,
                lng: s.lng,
            })
            .collect();

        Self {
            garage: GarageInfo::default(),
            sectors,
            spots,
        }
    }
}

impl GarageConfig {
    /// 從檔案載入，副檔名為 .json 時視為模擬器格式
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let is_json = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_simulator_json(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ParkingError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn from_simulator_json(content: &str) -> Result<Self> {
        let layout: SimulatorLayout =
            serde_json::from_str(content).map_err(|e| ParkingError::ConfigError {
                message: format!("simulator layout parsing error: {}", e),
            })?;
        Ok(layout.into())
    }

    /// 向模擬器取得車庫配置
    pub async fn fetch_from_simulator(url: &str) -> Result<Self> {
        validate_url("garage.simulator_url", url)?;
        tracing::info!("📡 Fetching garage layout from: {}", url);

        let response = reqwest::Client::new().get(url).send().await?;
        tracing::debug!("Simulator response status: {}", response.status());

        let layout: SimulatorLayout = response.error_for_status()?.json().await?;
        let mut config: Self = layout.into();
        config.garage.simulator_url = Some(url.to_string());

        tracing::info!(
            "📦 Received layout with {} sectors and {} spots",
            config.sectors.len(),
            config.spots.len()
        );
        Ok(config)
    }

    /// 替換環境變數 (例如 ${SIMULATOR_HOST})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ParkingError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.sectors.is_empty() {
            return Err(ParkingError::MissingConfigError {
                field: "sectors".to_string(),
            });
        }

        validate_unique("sectors.code", self.sectors.iter().map(|s| s.code.as_str()))?;
        for sector in &self.sectors {
            validate_non_empty_string("sectors.code", &sector.code)?;
            validate_non_negative_price("sectors.base_price", sector.base_price)?;
            validate_positive_number("sectors.max_capacity", sector.max_capacity, 1)?;
        }

        validate_unique("spots.code", self.spots.iter().map(|s| s.code.as_str()))?;
        for spot in &self.spots {
            validate_non_empty_string("spots.code", &spot.code)?;
            if !self.sectors.iter().any(|s| s.code == spot.sector) {
                return Err(ParkingError::InvalidConfigValueError {
                    field: "spots.sector".to_string(),
                    value: spot.sector.clone(),
                    reason: format!("spot {} references an unknown sector", spot.code),
                });
            }
            if !spot.lat.is_finite() || !spot.lng.is_finite() {
                return Err(ParkingError::InvalidConfigValueError {
                    field: "spots.lat/lng".to_string(),
                    value: format!("({}, {})", spot.lat, spot.lng),
                    reason: "Coordinates must be finite".to_string(),
                });
            }
            validate_range("spots.lat", spot.lat, -90.0, 90.0)?;
            validate_range("spots.lng", spot.lng, -180.0, 180.0)?;
        }

        if let Some(url) = &self.garage.simulator_url {
            validate_url("garage.simulator_url", url)?;
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        self.garage.name.as_deref().unwrap_or("garage")
    }

    pub fn currency(&self) -> &str {
        self.garage.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn total_capacity(&self) -> u64 {
        self.sectors.iter().map(|s| u64::from(s.max_capacity)).sum()
    }

    /// 依設定檔順序轉成領域模型
    pub fn to_layout(&self) -> (Vec<Sector>, Vec<Spot>) {
        let sectors = self
            .sectors
            .iter()
            .map(|s| Sector {
                code: s.code.clone(),
                base_price: s.base_price,
                max_capacity: s.max_capacity,
            })
            .collect();
        let spots = self
            .spots
            .iter()
            .map(|s| Spot::new(s.code.clone(), s.sector.clone(), s.lat, s.lng))
            .collect();
        (sectors, spots)
    }
}

impl Validate for GarageConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[garage]
name = "Paulista"

[[sectors]]
code = "A"
base_price = 10.0
max_capacity = 100

[[sectors]]
code = "B"
base_price = "4.50"
max_capacity = 20

[[spots]]
code = "A1"
sector = "A"
lat = -23.561684
lng = -46.655981

[[spots]]
code = "B1"
sector = "B"
lat = -23.561700
lng = -46.655990
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = GarageConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.name(), "Paulista");
        assert_eq!(config.currency(), "BRL");
        assert_eq!(config.sectors.len(), 2);
        assert_eq!(config.sectors[0].base_price, dec!(10));
        assert_eq!(config.sectors[1].base_price, dec!(4.50));
        assert_eq!(config.total_capacity(), 120);
        assert!(config.validate().is_ok());

        let (sectors, spots) = config.to_layout();
        assert_eq!(sectors[0].code, "A");
        assert!(!spots[0].occupied);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("GARAGE_TEST_SIMULATOR", "http://localhost:3003");

        let toml_content = r#"
[garage]
simulator_url = "${GARAGE_TEST_SIMULATOR}/garage"

[[sectors]]
code = "A"
base_price = 10.0
max_capacity = 1
"#;

        let config = GarageConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.garage.simulator_url.as_deref(),
            Some("http://localhost:3003/garage")
        );

        std::env::remove_var("GARAGE_TEST_SIMULATOR");
    }

    #[test]
    fn test_config_validation() {
        let zero_capacity = r#"
[[sectors]]
code = "A"
base_price = 10.0
max_capacity = 0
"#;
        let config = GarageConfig::from_toml_str(zero_capacity).unwrap();
        assert!(config.validate().is_err());

        let unknown_sector = r#"
[[sectors]]
code = "A"
base_price = 10.0
max_capacity = 1

[[spots]]
code = "Z1"
sector = "Z"
lat = 0.0
lng = 0.0
"#;
        let config = GarageConfig::from_toml_str(unknown_sector).unwrap();
        assert!(config.validate().is_err());

        let duplicate = r#"
[[sectors]]
code = "A"
base_price = 10.0
max_capacity = 1

[[sectors]]
code = "A"
base_price = 12.0
max_capacity = 1
"#;
        let config = GarageConfig::from_toml_str(duplicate).unwrap();
        assert!(config.validate().is_err());

        let empty = GarageConfig::from_toml_str("[garage]\nname = \"empty\"\n").unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_simulator_json_layout() {
        let json = r#"{
            "garage": [{"sector": "A", "basePrice": 10.0, "max_capacity": 100}],
            "spots": [
                {"id": 1, "sector": "A", "lat": -23.561684, "lng": -46.655981},
                {"id": "A2", "sector": "A", "lat": -23.561685, "lng": -46.655982}
            ]
        }"#;
        let config = GarageConfig::from_simulator_json(json).unwrap();
        assert_eq!(config.sectors[0].code, "A");
        assert_eq!(config.spots[0].code, "1");
        assert_eq!(config.spots[1].code, "A2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = GarageConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.name(), "Paulista");
    }
}
