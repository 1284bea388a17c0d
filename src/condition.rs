use crate::db::models::Condition;

/// Moisture at or above this reads as dry soil.
pub const DRY_FLOOR: f64 = 800.0;
/// Moisture at or below this reads as wet soil.
pub const WET_CEILING: f64 = 500.0;

/// Map a raw soil-moisture value to its qualitative label.
///
/// Both boundaries are closed: exactly 800 is `Dry` and exactly 500 is `Wet`.
/// The two ranges cannot overlap only because `DRY_FLOOR > WET_CEILING`, so
/// every value in the open interval (500, 800) is `Good`.
pub fn classify_moisture(soil_moisture: f64) -> Condition {
    if soil_moisture >= DRY_FLOOR {
        Condition::Dry
    } else if soil_moisture <= WET_CEILING {
        Condition::Wet
    } else {
        Condition::Good
    }
}
