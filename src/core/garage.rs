use crate::core::pricing::applied_price;
use crate::domain::ports::ParkingStore;
use crate::utils::error::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorView {
    pub sector: String,
    pub base_price: Decimal,
    pub max_capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotView {
    pub id: String,
    pub sector: String,
    pub lat: f64,
    pub lng: f64,
}

/// 車庫設定的唯讀快照 (不含占用狀態)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarageSnapshot {
    pub garage: Vec<SectorView>,
    pub spots: Vec<SpotView>,
}

pub async fn garage_snapshot<S: ParkingStore + ?Sized>(store: &S) -> Result<GarageSnapshot> {
    let garage: Vec<SectorView> = store
        .sectors()
        .await?
        .into_iter()
        .map(|sector| SectorView {
            sector: sector.code,
            base_price: sector.base_price,
            max_capacity: sector.max_capacity,
        })
        .collect();

    let spots: Vec<SpotView> = store
        .spots()
        .await?
        .into_iter()
        .map(|spot| SpotView {
            id: spot.code,
            sector: spot.sector,
            lat: spot.lat,
            lng: spot.lng,
        })
        .collect();

    tracing::debug!(
        sectors = garage.len(),
        spots = spots.len(),
        "📋 Garage snapshot built"
    );
    Ok(GarageSnapshot { garage, spots })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorOccupancy {
    pub sector: String,
    pub occupied: u32,
    pub free_spots: usize,
    pub max_capacity: u32,
    pub occupancy_percent: f64,
    /// 此刻進場會拿到的費率
    pub current_price: Decimal,
}

pub async fn occupancy_statistics<S: ParkingStore + ?Sized>(
    store: &S,
) -> Result<Vec<SectorOccupancy>> {
    let mut stats = Vec::new();
    for sector in store.sectors().await? {
        let occupied = store.count_occupied(&sector.code).await?;
        let free_spots = store.free_spots(&sector.code).await?.len();
        let occupancy_percent = if sector.max_capacity == 0 {
            100.0
        } else {
            f64::from(occupied) / f64::from(sector.max_capacity) * 100.0
        };

        stats.push(SectorOccupancy {
            current_price: applied_price(sector.base_price, occupied, sector.max_capacity),
            sector: sector.code,
            occupied,
            free_spots,
            max_capacity: sector.max_capacity,
            occupancy_percent,
        });
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryStore;
    use crate::domain::model::{Sector, Spot};
    use crate::domain::ports::NewSession;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn store() -> InMemoryStore {
        InMemoryStore::new(
            vec![
                Sector {
                    code: "A".to_string(),
                    base_price: dec!(10.00),
                    max_capacity: 2,
                },
                Sector {
                    code: "B".to_string(),
                    base_price: dec!(4.00),
                    max_capacity: 4,
                },
            ],
            vec![
                Spot::new("A1", "A", -23.561684, -46.655981),
                Spot::new("A2", "A", -23.561685, -46.655982),
                Spot::new("B1", "B", -23.561690, -46.655990),
            ],
        )
    }

    #[tokio::test]
    async fn test_snapshot_keeps_configuration_order() {
        let snapshot = garage_snapshot(&store()).await.unwrap();
        let sectors: Vec<&str> = snapshot.garage.iter().map(|s| s.sector.as_str()).collect();
        let spots: Vec<&str> = snapshot.spots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(sectors, vec!["A", "B"]);
        assert_eq!(spots, vec!["A1", "A2", "B1"]);
        assert_eq!(snapshot.spots[2].sector, "B");
    }

    #[tokio::test]
    async fn test_statistics_reflect_occupancy_and_price() {
        let store = store();
        let now = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let session = store
            .insert_session(NewSession {
                license_plate: "ABC1234".to_string(),
                sector: "A".to_string(),
                entry_time: now,
                applied_price: dec!(9.00),
            })
            .await
            .unwrap();
        store.park(session.id, "A1", now).await.unwrap();

        let stats = occupancy_statistics(&store).await.unwrap();
        assert_eq!(stats[0].occupied, 1);
        assert_eq!(stats[0].free_spots, 1);
        assert_eq!(stats[0].occupancy_percent, 50.0);
        assert_eq!(stats[0].current_price, dec!(11.00));
        assert_eq!(stats[1].current_price, dec!(3.60));
    }
}
