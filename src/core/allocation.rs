use crate::domain::model::Spot;

fn squared_distance(spot: &Spot, lat: f64, lng: f64) -> f64 {
    let d_lat = spot.lat - lat;
    let d_lng = spot.lng - lng;
    d_lat * d_lat + d_lng * d_lng
}

/// 選出距離目標座標最近的空車位。
///
/// 任一座標缺少時回傳第一個候選車位。距離相同時保留先出現者。
/// 候選清單為空時回傳 `None`，呼叫端應先檢查。
pub fn choose_spot<'a>(free_spots: &'a [Spot], lat: Option<f64>, lng: Option<f64>) -> Option<&'a Spot> {
    let (lat, lng) = match (lat, lng) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => return free_spots.first(),
    };

    let mut best: Option<(&Spot, f64)> = None;
    for spot in free_spots {
        let distance = squared_distance(spot, lat, lng);
        match best {
            // 嚴格小於：平手時不取代較早的候選
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((spot, distance)),
        }
    }
    best.map(|(spot, _)| spot)
}
