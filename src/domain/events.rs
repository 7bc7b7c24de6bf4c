use crate::utils::error::{ParkingError, Result};
use crate::utils::validation::validate_non_empty_string;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 感測器 webhook 的原始內容，尚未驗證
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub license_plate: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub entry_time: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub exit_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventType {
    Entry,
    Parked,
    Exit,
}

impl EventType {
    /// 大小寫必須完全相符，前後空白也視為無效
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "ENTRY" => Ok(Self::Entry),
            "PARKED" => Ok(Self::Parked),
            "EXIT" => Ok(Self::Exit),
            other => Err(ParkingError::malformed(format!(
                "unrecognized event_type '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "ENTRY",
            Self::Parked => "PARKED",
            Self::Exit => "EXIT",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已驗證、可交給生命週期管理器的事件
#[derive(Debug, Clone, PartialEq)]
pub enum ParkingEvent {
    Entry {
        license_plate: String,
        entry_time: NaiveDateTime,
    },
    Parked {
        license_plate: String,
        lat: Option<f64>,
        lng: Option<f64>,
    },
    Exit {
        license_plate: String,
        exit_time: NaiveDateTime,
    },
}

impl ParkingEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Entry { .. } => EventType::Entry,
            Self::Parked { .. } => EventType::Parked,
            Self::Exit { .. } => EventType::Exit,
        }
    }

    pub fn license_plate(&self) -> &str {
        match self {
            Self::Entry { license_plate, .. }
            | Self::Parked { license_plate, .. }
            | Self::Exit { license_plate, .. } => license_plate,
        }
    }
}

impl TryFrom<WebhookEvent> for ParkingEvent {
    type Error = ParkingError;

    fn try_from(raw: WebhookEvent) -> Result<Self> {
        let event_type = EventType::parse(&raw.event_type)?;

        let license_plate = raw
            .license_plate
            .ok_or_else(|| ParkingError::malformed("missing license_plate"))?;
        validate_non_empty_string("license_plate", &license_plate)
            .map_err(|_| ParkingError::malformed("license_plate cannot be blank"))?;

        match event_type {
            EventType::Entry => {
                let entry_time = raw
                    .entry_time
                    .ok_or_else(|| ParkingError::malformed("ENTRY requires entry_time"))?;
                Ok(Self::Entry {
                    license_plate,
                    entry_time,
                })
            }
            EventType::Parked => {
                for coordinate in [raw.lat, raw.lng].into_iter().flatten() {
                    if !coordinate.is_finite() {
                        return Err(ParkingError::malformed("PARKED coordinates must be finite"));
                    }
                }
                Ok(Self::Parked {
                    license_plate,
                    lat: raw.lat,
                    lng: raw.lng,
                })
            }
            EventType::Exit => {
                let exit_time = raw
                    .exit_time
                    .ok_or_else(|| ParkingError::malformed("EXIT requires exit_time"))?;
                Ok(Self::Exit {
                    license_plate,
                    exit_time,
                })
            }
        }
    }
}

/// 接受 RFC 3339 (轉為 UTC) 或不含時區的本地時間
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| {
                <D::Error as serde::de::Error>::custom(format!("invalid timestamp '{}'", s))
            }),
    }
}
