//! River-aware waypoint selection for ground units

use super::rules::{is_in_river, is_on_bridge, nearest_bridge, RIVER_END_Y, RIVER_START_Y};

/// How close to a bridge's center line a unit must be before it starts crossing
const BRIDGE_ALIGN_TOLERANCE: f32 = 10.0;
/// How far past the river bank a crossing unit aims
const BANK_CLEARANCE: f32 = 10.0;

/// True when a straight line from `from_y` to `to_y` spans the whole river band
pub fn needs_to_cross(from_y: f32, to_y: f32) -> bool {
    (from_y > RIVER_END_Y && to_y < RIVER_START_Y) || (from_y < RIVER_START_Y && to_y > RIVER_END_Y)
}

/// Next point a unit at (x, y) should walk toward on its way to the target
pub fn next_waypoint(x: f32, y: f32, target_x: f32, target_y: f32) -> (f32, f32) {
    let bridge_x = nearest_bridge(x).center_x;

    if is_in_river(y) {
        if is_on_bridge(x, y) {
            return (bridge_x, target_y);
        }
        // Stranded in the water: get back onto a bridge first
        return (bridge_x, y);
    }

    if !needs_to_cross(y, target_y) {
        return (target_x, target_y);
    }

    if (x - bridge_x).abs() > BRIDGE_ALIGN_TOLERANCE {
        return (bridge_x, y);
    }

    let far_bank = if target_y < y {
        RIVER_START_Y - BANK_CLEARANCE
    } else {
        RIVER_END_Y + BANK_CLEARANCE
    };
    (bridge_x, far_bank)
}
