use crate::domain::model::ParkingSession;
use crate::utils::error::Result;
use serde::Serialize;
use std::io::Write;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Serialize)]
struct SessionRow<'a> {
    id: u64,
    license_plate: &'a str,
    sector: &'a str,
    spot: &'a str,
    state: &'static str,
    entry_time: String,
    parked_time: String,
    exit_time: String,
    applied_price: String,
    final_amount: String,
}

fn state_label(session: &ParkingSession) -> &'static str {
    use crate::domain::model::SessionState::*;
    match session.state() {
        OpenUnparked => "OPEN_UNPARKED",
        OpenParked => "OPEN_PARKED",
        Closed => "CLOSED",
    }
}

/// 以 CSV 輸出所有 session，缺少的欄位留空
pub fn write_sessions_csv<W: Write>(sessions: &[ParkingSession], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for session in sessions {
        csv_writer.serialize(SessionRow {
            id: session.id,
            license_plate: &session.license_plate,
            sector: &session.sector,
            spot: session.spot.as_deref().unwrap_or(""),
            state: state_label(session),
            entry_time: session.entry_time.format(TIMESTAMP_FORMAT).to_string(),
            parked_time: session
                .parked_time
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
            exit_time: session
                .exit_time
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
            applied_price: session.applied_price.to_string(),
            final_amount: session
                .final_amount
                .map(|a| a.to_string())
                .unwrap_or_default(),
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_csv_has_header_and_blank_optionals() {
        let entry = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let sessions = vec![ParkingSession {
            id: 1,
            license_plate: "ABC1234".to_string(),
            sector: "A".to_string(),
            spot: None,
            entry_time: entry,
            parked_time: None,
            exit_time: None,
            applied_price: dec!(9.00),
            final_amount: None,
        }];

        let mut out = Vec::new();
        write_sessions_csv(&sessions, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "id,license_plate,sector,spot,state,entry_time,parked_time,exit_time,applied_price,final_amount"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1,ABC1234,A,,OPEN_UNPARKED,2025-01-01T10:00:00,,,9.00,"
        );
    }
}
