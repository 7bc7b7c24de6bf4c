use crate::core::lifecycle::{EventOutcome, SessionLifecycleManager};
use crate::domain::events::WebhookEvent;
use crate::domain::model::SessionState;
use crate::domain::ports::{Clock, ParkingStore};
use crate::utils::error::{ErrorKind, ParkingError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EventStatus {
    Accepted {
        session_id: u64,
        state: SessionState,
        spot: Option<String>,
        final_amount: Option<Decimal>,
    },
    Rejected {
        kind: ErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub line: usize,
    pub event_type: String,
    pub license_plate: Option<String>,
    #[serde(flatten)]
    pub status: EventStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayReport {
    pub processed: usize,
    pub accepted: usize,
    pub rejected: BTreeMap<ErrorKind, usize>,
    pub records: Vec<EventRecord>,
}

impl ReplayReport {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    fn record(&mut self, record: EventRecord) {
        self.processed += 1;
        match &record.status {
            EventStatus::Accepted { .. } => self.accepted += 1,
            EventStatus::Rejected { kind, .. } => *self.rejected.entry(*kind).or_default() += 1,
        }
        self.records.push(record);
    }
}

/// 逐筆重播 webhook 事件。業務規則拒絕只記錄，儲存層失敗則中止。
pub struct ReplayEngine<S: ParkingStore, C: Clock> {
    manager: SessionLifecycleManager<S, C>,
    fail_fast: bool,
}

impl<S: ParkingStore, C: Clock> ReplayEngine<S, C> {
    pub fn new(manager: SessionLifecycleManager<S, C>) -> Self {
        Self {
            manager,
            fail_fast: false,
        }
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn manager(&self) -> &SessionLifecycleManager<S, C> {
        &self.manager
    }

    pub async fn run_file<P: AsRef<Path>>(&self, path: P) -> Result<ReplayReport> {
        tracing::info!("📥 Replaying events from: {}", path.as_ref().display());
        let file = tokio::fs::File::open(path).await?;
        self.run_lines(BufReader::new(file)).await
    }

    /// 每行一個 JSON 物件；空行與 `#` 開頭的行略過
    pub async fn run_lines<R: AsyncBufRead + Unpin>(&self, reader: R) -> Result<ReplayReport> {
        let mut report = ReplayReport::default();
        let mut lines = reader.lines();
        let mut line_no = 0;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let record = match serde_json::from_str::<WebhookEvent>(trimmed) {
                Ok(raw) => self.apply(line_no, raw).await?,
                Err(e) => {
                    let err = ParkingError::malformed(format!("line {}: {}", line_no, e));
                    tracing::warn!("⚠️ Skipping unparseable event: {}", err);
                    self.rejected(line_no, String::new(), None, err)?
                }
            };
            report.record(record);
        }

        tracing::info!(
            "✅ Replay finished: {} processed, {} accepted, {} rejected",
            report.processed,
            report.accepted,
            report.rejected_total()
        );
        Ok(report)
    }

    pub async fn run_events(&self, events: Vec<WebhookEvent>) -> Result<ReplayReport> {
        let mut report = ReplayReport::default();
        for (index, raw) in events.into_iter().enumerate() {
            let record = self.apply(index + 1, raw).await?;
            report.record(record);
        }
        Ok(report)
    }

    async fn apply(&self, line: usize, raw: WebhookEvent) -> Result<EventRecord> {
        let event_type = raw.event_type.clone();
        let license_plate = raw.license_plate.clone();

        match self.manager.handle_webhook(raw).await {
            Ok(outcome) => Ok(EventRecord {
                line,
                event_type,
                license_plate,
                status: accepted(&outcome),
            }),
            Err(e) => self.rejected(line, event_type, license_plate, e),
        }
    }

    fn rejected(
        &self,
        line: usize,
        event_type: String,
        license_plate: Option<String>,
        err: ParkingError,
    ) -> Result<EventRecord> {
        if !err.is_business_rejection() || self.fail_fast {
            return Err(err);
        }
        Ok(EventRecord {
            line,
            event_type,
            license_plate,
            status: EventStatus::Rejected {
                kind: err.kind(),
                message: err.to_string(),
            },
        })
    }
}

fn accepted(outcome: &EventOutcome) -> EventStatus {
    let session = outcome.session();
    EventStatus::Accepted {
        session_id: session.id,
        state: session.state(),
        spot: session.spot.clone(),
        final_amount: session.final_amount,
    }
}
