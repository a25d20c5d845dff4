//! Battle simulation modules

pub mod combat;
pub mod engine;
pub mod pathing;
pub mod physics;
pub mod projectile;
pub mod reconcile;
pub mod rules;
pub mod runtime;
pub mod smoothing;
pub mod snapshot;
pub mod state;

pub use engine::PredictionEngine;
pub use reconcile::Tuning;
pub use runtime::TowerLife;
pub use smoothing::{ResourceGauge, VisualSmoother};
pub use state::{BattleState, PlayerSide, Projectile, Side, Tower, TowerKind, Unit, UnitKind};
