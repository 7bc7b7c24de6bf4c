use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// 依占用率決定的費率倍數
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTier {
    /// 占用率 < 25%
    Discount,
    /// 占用率 < 50%
    Standard,
    /// 占用率 < 75%
    Busy,
    /// 占用率 >= 75%
    Peak,
}

impl PriceTier {
    /// 以整數比較：occupied / capacity < 1/4 即 occupied * 4 < capacity
    pub fn for_occupancy(occupied: u32, max_capacity: u32) -> Self {
        let occupied = u64::from(occupied);
        let capacity = u64::from(max_capacity);

        if occupied * 4 < capacity {
            Self::Discount
        } else if occupied * 2 < capacity {
            Self::Standard
        } else if occupied * 4 < capacity * 3 {
            Self::Busy
        } else {
            Self::Peak
        }
    }

    pub fn multiplier(&self) -> Decimal {
        match self {
            Self::Discount => dec!(0.90),
            Self::Standard => dec!(1.00),
            Self::Busy => dec!(1.10),
            Self::Peak => dec!(1.25),
        }
    }
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// ENTRY 當下的每小時費率 (兩位小數、四捨五入)。
///
/// `max_capacity` 為 0 時視為滿載，實際上設定檔驗證已排除這種情況。
pub fn applied_price(base_price: Decimal, occupied: u32, max_capacity: u32) -> Decimal {
    let tier = if max_capacity == 0 {
        PriceTier::Peak
    } else {
        PriceTier::for_occupancy(occupied, max_capacity)
    };
    round_money(base_price * tier.multiplier())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(applied_price(dec!(10.00), 0, 100), dec!(9.00));
        assert_eq!(applied_price(dec!(10.00), 24, 100), dec!(9.00));
        assert_eq!(applied_price(dec!(10.00), 25, 100), dec!(10.00));
        assert_eq!(applied_price(dec!(10.00), 49, 100), dec!(10.00));
        assert_eq!(applied_price(dec!(10.00), 50, 100), dec!(11.00));
        assert_eq!(applied_price(dec!(10.00), 74, 100), dec!(11.00));
        assert_eq!(applied_price(dec!(10.00), 75, 100), dec!(12.50));
        assert_eq!(applied_price(dec!(10.00), 100, 100), dec!(12.50));
    }

    #[test]
    fn test_small_capacity_uses_real_ratio() {
        // 1/3 = 0.33 -> Standard, 2/3 = 0.67 -> Busy
        assert_eq!(PriceTier::for_occupancy(1, 3), PriceTier::Standard);
        assert_eq!(PriceTier::for_occupancy(2, 3), PriceTier::Busy);
        assert_eq!(PriceTier::for_occupancy(3, 4), PriceTier::Peak);
    }

    #[test]
    fn test_rounds_half_up_to_cents() {
        // 5.55 * 0.90 = 4.995
        assert_eq!(applied_price(dec!(5.55), 0, 10), dec!(5.00));
        // 3.33 * 1.25 = 4.1625
        assert_eq!(applied_price(dec!(3.33), 9, 10), dec!(4.16));
        assert_eq!(applied_price(dec!(0), 9, 10), dec!(0));
    }
}
