use crate::domain::ports::{Clock, ParkingStore};
use crate::utils::error::{ParkingError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_CURRENCY: &str = "BRL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueReport {
    pub amount: Decimal,
    pub currency: String,
    pub timestamp: NaiveDateTime,
}

pub struct RevenueAggregator<S: ParkingStore, C: Clock> {
    store: Arc<S>,
    clock: C,
    currency: String,
}

impl<S: ParkingStore, C: Clock> RevenueAggregator<S, C> {
    pub fn new(store: Arc<S>, clock: C) -> Self {
        Self {
            store,
            clock,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// 指定日期、指定 sector 已結束 session 的 final amount 總和。
    ///
    /// sector 不存在時回傳 `NotFound`；存在但沒有資料時回傳 0。
    pub async fn revenue_for(&self, date: NaiveDate, sector: &str) -> Result<Decimal> {
        if self.store.find_sector(sector).await?.is_none() {
            return Err(ParkingError::not_found(format!("sector {} not found", sector)));
        }

        let total = self
            .store
            .sessions_exited_on(sector, date)
            .await?
            .iter()
            .filter_map(|session| session.final_amount)
            .sum::<Decimal>();

        tracing::debug!(%date, sector, amount = %total, "📊 Revenue aggregated");
        Ok(total)
    }

    pub async fn report(&self, date: NaiveDate, sector: &str) -> Result<RevenueReport> {
        let amount = self.revenue_for(date, sector).await?;
        Ok(RevenueReport {
            amount,
            currency: self.currency.clone(),
            timestamp: self.clock.now(),
        })
    }
}
