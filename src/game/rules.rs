//! Arena geometry and combat rules shared with the server

use super::state::{Side, TowerKind, UnitKind};

pub const ARENA_WIDTH: f32 = 800.0;
pub const ARENA_HEIGHT: f32 = 1000.0;
/// Units are kept this far from the arena edge
pub const ARENA_MARGIN: f32 = 10.0;

pub const RIVER_START_Y: f32 = 480.0;
pub const RIVER_END_Y: f32 = 520.0;

/// The two crossings over the river, west then east
pub static BRIDGES: [Bridge; 2] = [
    Bridge {
        start_x: 120.0,
        end_x: 240.0,
        center_x: 180.0,
    },
    Bridge {
        start_x: 560.0,
        end_x: 680.0,
        center_x: 620.0,
    },
];

pub const RESOURCE_REGEN_PER_SEC: f32 = 1.0;
pub const MAX_RESOURCE: f32 = 10.0;

pub const PROJECTILE_SPEED: f32 = 400.0;
/// Single-target shots hit the first enemy unit closer than this to the impact point
pub const PROJECTILE_UNIT_HIT_RADIUS: f32 = 30.0;
/// Fallback radius for single-target shots landing on a tower
pub const PROJECTILE_TOWER_HIT_RADIUS: f32 = 50.0;

/// Mobile units closer than this push each other apart
pub const SEPARATION_DISTANCE: f32 = 25.0;
pub const SEPARATION_FORCE: f32 = 5.0;

/// How long a damage flash takes to fade out (ms)
pub const DAMAGE_FLASH_MS: u64 = 200;
/// Hits closer together than this don't restart the flash (ms)
pub const DAMAGE_FLASH_RETRIGGER_MS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bridge {
    pub start_x: f32,
    pub end_x: f32,
    pub center_x: f32,
}

impl Bridge {
    pub fn spans(&self, x: f32) -> bool {
        x >= self.start_x && x <= self.end_x
    }
}

/// Combat and movement stats per unit type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStats {
    /// Damage per attack
    pub damage: i32,
    /// Movement speed (units per second)
    pub move_speed: f32,
    /// Attack reach
    pub range: f32,
    /// Seconds between attacks
    pub attack_speed: f64,
    /// Splash radius, 0 for single target
    pub aoe_radius: f32,
    /// Buildings never move
    pub is_building: bool,
    /// Hit points on spawn
    pub hp: i32,
    /// Elixir cost to place
    pub cost: u32,
}

impl UnitStats {
    pub fn for_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Melee | UnitKind::Unknown => Self {
                damage: 80,
                move_speed: 60.0,
                range: 30.0,
                attack_speed: 1.0,
                aoe_radius: 0.0,
                is_building: false,
                hp: 500,
                cost: 3,
            },
            UnitKind::Ranged => Self {
                damage: 60,
                move_speed: 40.0,
                range: 250.0,
                attack_speed: 1.2,
                aoe_radius: 0.0,
                is_building: false,
                hp: 200,
                cost: 3,
            },
            UnitKind::Aoe => Self {
                damage: 50,
                move_speed: 50.0,
                range: 150.0,
                attack_speed: 1.5,
                aoe_radius: 80.0,
                is_building: false,
                hp: 350,
                cost: 4,
            },
            UnitKind::Single => Self {
                damage: 200,
                move_speed: 70.0,
                range: 200.0,
                attack_speed: 2.0,
                aoe_radius: 0.0,
                is_building: false,
                hp: 150,
                cost: 5,
            },
            UnitKind::Defense => Self {
                damage: 100,
                move_speed: 0.0,
                range: 300.0,
                attack_speed: 1.0,
                aoe_radius: 0.0,
                is_building: true,
                hp: 800,
                cost: 4,
            },
        }
    }

    /// Mobile units take part in pathing and separation
    pub fn is_mobile(&self) -> bool {
        !self.is_building && self.move_speed > 0.0
    }
}

/// Tower weapon stats
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TowerStats {
    pub damage: i32,
    pub range: f32,
    pub attack_speed: f64,
    pub max_hp: i32,
}

impl TowerStats {
    pub fn for_kind(kind: TowerKind) -> Self {
        match kind {
            TowerKind::Lateral => Self {
                damage: 100,
                range: 300.0,
                attack_speed: 1.0,
                max_hp: 1500,
            },
            TowerKind::King => Self {
                damage: 150,
                range: 350.0,
                attack_speed: 1.0,
                max_hp: 3000,
            },
        }
    }
}

pub fn is_in_river(y: f32) -> bool {
    (RIVER_START_Y..=RIVER_END_Y).contains(&y)
}

pub fn is_on_bridge(x: f32, y: f32) -> bool {
    is_in_river(y) && BRIDGES.iter().any(|b| b.spans(x))
}

/// Ties go to the eastern bridge
pub fn nearest_bridge(x: f32) -> &'static Bridge {
    let [west, east] = &BRIDGES;
    if (x - west.center_x).abs() < (x - east.center_x).abs() {
        west
    } else {
        east
    }
}

/// Each player deploys on their own bank of the river
pub fn is_in_deploy_zone(side: Side, x: f32, y: f32) -> bool {
    if !(0.0..=ARENA_WIDTH).contains(&x) || !(0.0..=ARENA_HEIGHT).contains(&y) {
        return false;
    }
    match side {
        Side::One => y > RIVER_END_Y,
        Side::Two => y < RIVER_START_Y,
    }
}

/// Clamp a point into the arena rectangle
pub fn clamp_to_arena(x: f32, y: f32) -> (f32, f32) {
    (x.clamp(0.0, ARENA_WIDTH), y.clamp(0.0, ARENA_HEIGHT))
}
