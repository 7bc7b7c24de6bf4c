use chrono::{Duration, NaiveDate, NaiveDateTime};
use garage_billing::adapters::memory_store::GarageState;
use garage_billing::core::{ParkingSession, ParkingStore, Sector, SessionState, Spot};
use garage_billing::{
    ErrorKind, EventOutcome, FixedClock, InMemoryStore, ParkingEvent, RevenueAggregator,
    SessionLifecycleManager, WebhookEvent,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn sector(code: &str, base_price: Decimal, max_capacity: u32) -> Sector {
    Sector {
        code: code.to_string(),
        base_price,
        max_capacity,
    }
}

/// 100 個車位的 A 區：S1 靠近 (-23.5616, -46.6559)，其餘遠離；
/// 前 `occupied` 個遠處車位已被占用。
fn hundred_spot_garage(occupied: usize) -> Vec<Spot> {
    let mut spots = vec![Spot::new("S1", "A", -23.561684, -46.655981)];
    for i in 2..=100u32 {
        let mut spot = Spot::new(format!("S{}", i), "A", 10.0 + f64::from(i), 10.0);
        if (i as usize) <= occupied + 1 {
            spot.occupy(&format!("PRE{:04}", i), at(8, 0));
        }
        spots.push(spot);
    }
    spots
}

#[tokio::test]
async fn test_round_trip_entry_parked_exit() {
    let store = Arc::new(InMemoryStore::new(
        vec![sector("A", dec!(10.00), 100)],
        hundred_spot_garage(20),
    ));
    let manager = SessionLifecycleManager::new(Arc::clone(&store), FixedClock::new(at(10, 2)));

    let entered = manager
        .handle(ParkingEvent::Entry {
            license_plate: "ABC1234".to_string(),
            entry_time: at(10, 0),
        })
        .await
        .unwrap();
    assert_eq!(entered.session().sector, "A");
    assert_eq!(entered.session().applied_price, dec!(9.00));
    assert_eq!(entered.session().state(), SessionState::OpenUnparked);

    let parked = manager
        .handle(ParkingEvent::Parked {
            license_plate: "ABC1234".to_string(),
            lat: Some(-23.5617),
            lng: Some(-46.6560),
        })
        .await
        .unwrap();
    match &parked {
        EventOutcome::Parked { session, spot } => {
            assert_eq!(spot.code, "S1");
            assert!(spot.occupied);
            assert_eq!(spot.occupied_by.as_deref(), Some("ABC1234"));
            assert_eq!(session.state(), SessionState::OpenParked);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(store.count_occupied("A").await.unwrap(), 21);

    let exited = manager
        .handle(ParkingEvent::Exit {
            license_plate: "ABC1234".to_string(),
            exit_time: at(12, 5),
        })
        .await
        .unwrap();
    match &exited {
        EventOutcome::Exited {
            session,
            released_spot,
        } => {
            assert_eq!(session.final_amount, Some(dec!(27.00)));
            assert_eq!(session.state(), SessionState::Closed);
            let released = released_spot.as_ref().unwrap();
            assert_eq!(released.code, "S1");
            assert!(!released.occupied);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(store.count_occupied("A").await.unwrap(), 20);
}

#[tokio::test]
async fn test_pricing_tiers_at_entry() {
    for (occupied, expected) in [
        (24, dec!(9.00)),
        (25, dec!(10.00)),
        (49, dec!(10.00)),
        (50, dec!(11.00)),
        (74, dec!(11.00)),
        (75, dec!(12.50)),
    ] {
        let store = Arc::new(InMemoryStore::new(
            vec![sector("A", dec!(10.00), 100)],
            hundred_spot_garage(occupied),
        ));
        let manager = SessionLifecycleManager::new(store, FixedClock::new(at(10, 0)));

        let session = manager.entry("TIER001", at(10, 0)).await.unwrap();
        assert_eq!(
            session.applied_price, expected,
            "occupied={} should price at {}",
            occupied, expected
        );
    }
}

#[tokio::test]
async fn test_capacity_exhaustion_across_all_sectors() {
    let mut spots = vec![Spot::new("A1", "A", 0.0, 0.0), Spot::new("B1", "B", 1.0, 1.0)];
    spots[0].occupy("FULL001", at(8, 0));
    spots[1].occupy("FULL002", at(8, 0));
    let store = Arc::new(InMemoryStore::new(
        vec![sector("A", dec!(10.00), 1), sector("B", dec!(8.00), 1)],
        spots,
    ));
    let manager = SessionLifecycleManager::new(Arc::clone(&store), FixedClock::new(at(10, 0)));

    let err = manager.entry("LATE001", at(10, 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capacity);
    assert!(store.sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_webhook_dispatch_by_type() {
    let store = Arc::new(InMemoryStore::new(
        vec![sector("A", dec!(10.00), 10)],
        vec![Spot::new("A1", "A", 0.0, 0.0)],
    ));
    let manager = SessionLifecycleManager::new(store, FixedClock::new(at(10, 0)));

    let raw: WebhookEvent = serde_json::from_str(
        r#"{"license_plate": "ZUL0001", "entry_time": "2025-01-01T10:00:00", "event_type": "ENTRY"}"#,
    )
    .unwrap();
    let outcome = manager.handle_webhook(raw).await.unwrap();
    assert!(matches!(outcome, EventOutcome::Entered { .. }));

    let raw: WebhookEvent =
        serde_json::from_str(r#"{"license_plate": "ZUL0001", "event_type": "Parked"}"#).unwrap();
    let err = manager.handle_webhook(raw).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn test_revenue_aggregation_by_date_and_sector() {
    let closed = |id: u64, sector: &str, exit: NaiveDateTime, amount: Decimal| ParkingSession {
        id,
        license_plate: format!("REV{:04}", id),
        sector: sector.to_string(),
        spot: None,
        entry_time: exit - Duration::hours(2),
        parked_time: None,
        exit_time: Some(exit),
        applied_price: dec!(10.00),
        final_amount: Some(amount),
    };
    let next_day = at(12, 0) + Duration::days(1);

    let state = GarageState {
        sectors: vec![sector("A", dec!(10.00), 10), sector("B", dec!(10.00), 10)],
        spots: Vec::new(),
        sessions: vec![
            closed(1, "A", at(12, 5), dec!(27.00)),
            closed(2, "A", at(18, 0), dec!(13.00)),
            closed(3, "B", at(12, 0), dec!(99.00)),
            closed(4, "A", next_day, dec!(50.00)),
        ],
        next_session_id: 5,
    };
    let aggregator = RevenueAggregator::new(
        Arc::new(InMemoryStore::from_state(state)),
        FixedClock::new(at(23, 0)),
    );

    let day = at(0, 0).date();
    assert_eq!(aggregator.revenue_for(day, "A").await.unwrap(), dec!(40.00));
    assert_eq!(
        aggregator.revenue_for(day - Duration::days(1), "A").await.unwrap(),
        Decimal::ZERO
    );
    assert_eq!(
        aggregator.revenue_for(day, "Z").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

/// 以固定種子產生事件序列，確認任何時刻每個車牌最多一個未結束 session，
/// 且被占用車位的占用者與該 session 車牌一致。
#[tokio::test]
async fn test_single_open_session_under_random_event_sequence() {
    let store = Arc::new(InMemoryStore::new(
        vec![sector("A", dec!(10.00), 3), sector("B", dec!(6.00), 2)],
        vec![
            Spot::new("A1", "A", 0.0, 0.0),
            Spot::new("A2", "A", 0.0, 1.0),
            Spot::new("B1", "B", 5.0, 5.0),
        ],
    ));
    let manager = SessionLifecycleManager::new(Arc::clone(&store), FixedClock::new(at(0, 0)));
    let plates = ["P0", "P1", "P2", "P3", "P4", "P5"];

    let mut seed: u64 = 0x5eed;
    let mut next = || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (seed >> 33) as usize
    };

    let mut clock = at(0, 0);
    for _ in 0..300 {
        clock += Duration::minutes(7);
        let plate = plates[next() % plates.len()].to_string();
        let event = match next() % 3 {
            0 => ParkingEvent::Entry {
                license_plate: plate,
                entry_time: clock,
            },
            1 => ParkingEvent::Parked {
                license_plate: plate,
                lat: Some((next() % 6) as f64),
                lng: Some((next() % 6) as f64),
            },
            _ => ParkingEvent::Exit {
                license_plate: plate,
                exit_time: clock,
            },
        };

        if let Err(e) = manager.handle(event).await {
            assert!(e.is_business_rejection(), "unexpected failure: {}", e);
        }

        let sessions = store.sessions().await.unwrap();
        let mut open_per_plate: HashMap<&str, usize> = HashMap::new();
        for session in sessions.iter().filter(|s| s.is_open()) {
            *open_per_plate.entry(session.license_plate.as_str()).or_default() += 1;
        }
        assert!(open_per_plate.values().all(|&count| count <= 1));

        for spot in store.spots().await.unwrap().iter().filter(|s| s.occupied) {
            let holder = sessions
                .iter()
                .find(|s| s.is_open() && s.spot.as_deref() == Some(spot.code.as_str()))
                .expect("occupied spot must belong to an open session");
            assert_eq!(spot.occupied_by.as_deref(), Some(holder.license_plate.as_str()));
        }
        for session in sessions.iter().filter(|s| s.spot.is_some()) {
            assert!(session.parked_time.is_some());
        }
    }
}
