use crate::core::pricing::round_money;
use crate::utils::error::{ParkingError, Result};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// 前 30 分鐘免費
pub const GRACE_PERIOD_MINUTES: i64 = 30;

/// 超過免費時段後，不足一小時以一小時計
pub fn chargeable_hours(minutes: i64) -> i64 {
    if minutes <= GRACE_PERIOD_MINUTES {
        0
    } else {
        (minutes + 59) / 60
    }
}

pub fn final_amount(
    entry_time: NaiveDateTime,
    exit_time: NaiveDateTime,
    applied_price: Decimal,
) -> Result<Decimal> {
    if exit_time < entry_time {
        return Err(ParkingError::malformed(format!(
            "exit_time {} is before entry_time {}",
            exit_time, entry_time
        )));
    }

    let minutes = (exit_time - entry_time).num_minutes();
    let hours = chargeable_hours(minutes);
    tracing::debug!(minutes, hours, "⏱️ Parking duration computed");

    if hours == 0 {
        return Ok(Decimal::ZERO);
    }
    Ok(round_money(applied_price * Decimal::from(hours)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;

    fn entry() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_grace_period_is_free() {
        let e = entry();
        assert_eq!(final_amount(e, e, dec!(10.00)).unwrap(), Decimal::ZERO);
        assert_eq!(
            final_amount(e, e + Duration::minutes(30), dec!(99.99)).unwrap(),
            Decimal::ZERO
        );
        // 30 分 59 秒仍以 30 分鐘計
        assert_eq!(
            final_amount(e, e + Duration::seconds(30 * 60 + 59), dec!(10.00)).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_first_minute_after_grace_charges_one_hour() {
        let e = entry();
        assert_eq!(
            final_amount(e, e + Duration::minutes(31), dec!(10.00)).unwrap(),
            dec!(10.00)
        );
        assert_eq!(
            final_amount(e, e + Duration::minutes(60), dec!(10.00)).unwrap(),
            dec!(10.00)
        );
        assert_eq!(
            final_amount(e, e + Duration::minutes(61), dec!(10.00)).unwrap(),
            dec!(20.00)
        );
    }

    #[test]
    fn test_partial_hours_round_up() {
        let e = entry();
        let exit = e + Duration::hours(2) + Duration::minutes(15);
        assert_eq!(final_amount(e, exit, dec!(10.00)).unwrap(), dec!(30.00));

        let exit = e + Duration::hours(2) + Duration::minutes(5);
        assert_eq!(final_amount(e, exit, dec!(9.00)).unwrap(), dec!(27.00));
    }

    #[test]
    fn test_exit_before_entry_is_malformed() {
        let e = entry();
        let err = final_amount(e, e - Duration::minutes(1), dec!(10.00)).unwrap_err();
        assert_eq!(err.kind(), crate::utils::error::ErrorKind::Malformed);
    }
}
