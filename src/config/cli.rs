use crate::utils::error::{ParkingError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "garage-billing")]
#[command(about = "Replays garage sensor events and bills parking sessions")]
pub struct CliConfig {
    /// Garage layout file (.toml, or .json in simulator format)
    #[arg(short, long, default_value = "garage.toml")]
    pub config: String,

    /// Fetch the layout from the simulator instead of the config file
    #[arg(long)]
    pub simulator_url: Option<String>,

    /// Newline-delimited JSON webhook events
    #[arg(short, long, default_value = "events.jsonl")]
    pub events: String,

    /// Directory holding the persisted garage state between runs
    #[arg(long)]
    pub state_dir: Option<String>,

    /// Write every session to this CSV file after the replay
    #[arg(long)]
    pub export_sessions: Option<String>,

    /// Stop at the first rejected event
    #[arg(long)]
    pub fail_fast: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("events", &self.events)?;
        if let Some(url) = &self.simulator_url {
            validate_url("simulator_url", url)?;
        } else {
            validate_non_empty_string("config", &self.config)?;
        }
        if let Some(dir) = &self.state_dir {
            validate_non_empty_string("state_dir", dir)?;
        }
        if self.export_sessions.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ParkingError::InvalidConfigValueError {
                field: "export_sessions".to_string(),
                value: String::new(),
                reason: "Path cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}
