//! Presentation-side easing of the predicted state
//!
//! The engine output is already prediction-corrected; this layer only hides
//! the remaining per-frame jitter. It never feeds back into the simulation.

use std::collections::HashMap;
use std::time::Duration;

use super::rules::MAX_RESOURCE;
use super::state::BattleState;

/// Fraction of the remaining unit position error closed per frame
pub const POSITION_EASE: f32 = 0.3;
pub const PROJECTILE_EASE: f32 = 0.5;
/// Fraction of an hp drop shown per frame
pub const HP_EASE: f32 = 0.2;
pub const RESOURCE_EASE: f32 = 0.2;
/// Minimum spacing between resource gauge samples
pub const RESOURCE_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Per-entity eased positions and hit points
#[derive(Debug, Default)]
pub struct VisualSmoother {
    unit_positions: HashMap<String, (f32, f32)>,
    projectile_positions: HashMap<String, (f32, f32)>,
    unit_hp: HashMap<String, i32>,
    tower_hp: HashMap<String, i32>,
}

impl VisualSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the state to draw this frame
    pub fn smooth(&mut self, state: &BattleState) -> BattleState {
        let mut out = state.clone();

        for tower in out
            .player1
            .towers
            .iter_mut()
            .chain(out.player2.towers.iter_mut())
        {
            tower.hp = ease_hp(&mut self.tower_hp, &tower.id, tower.hp);
        }

        for unit in out.units.iter_mut() {
            (unit.x, unit.y) =
                ease_point(&mut self.unit_positions, &unit.id, (unit.x, unit.y), POSITION_EASE);
            unit.hp = ease_hp(&mut self.unit_hp, &unit.id, unit.hp);
        }

        for projectile in out.projectiles.iter_mut() {
            (projectile.x, projectile.y) = ease_point(
                &mut self.projectile_positions,
                &projectile.id,
                (projectile.x, projectile.y),
                PROJECTILE_EASE,
            );
        }

        self.prune(state);
        out
    }

    /// Number of entities currently tracked
    pub fn tracked(&self) -> usize {
        self.unit_positions.len()
            + self.projectile_positions.len()
            + self.unit_hp.len()
            + self.tower_hp.len()
    }

    pub fn reset(&mut self) {
        self.unit_positions.clear();
        self.projectile_positions.clear();
        self.unit_hp.clear();
        self.tower_hp.clear();
    }

    fn prune(&mut self, state: &BattleState) {
        let has_unit = |id: &String| state.units.iter().any(|u| &u.id == id);
        self.unit_positions.retain(|id, _| has_unit(id));
        self.unit_hp.retain(|id, _| has_unit(id));
        self.projectile_positions
            .retain(|id, _| state.projectiles.iter().any(|p| &p.id == id));
        self.tower_hp.retain(|id, _| state.tower(id).is_some());
    }
}

fn ease_point(
    cache: &mut HashMap<String, (f32, f32)>,
    id: &str,
    target: (f32, f32),
    factor: f32,
) -> (f32, f32) {
    let Some(current) = cache.get_mut(id) else {
        cache.insert(id.to_string(), target);
        return target;
    };
    current.0 += (target.0 - current.0) * factor;
    current.1 += (target.1 - current.1) * factor;
    *current
}

/// Healing shows at once; damage drains over a few frames but never
/// undershoots the real value
fn ease_hp(cache: &mut HashMap<String, i32>, id: &str, target: i32) -> i32 {
    let Some(current) = cache.get_mut(id) else {
        cache.insert(id.to_string(), target);
        return target;
    };
    if target >= *current {
        *current = target;
    } else {
        let eased = *current as f32 + (target - *current) as f32 * HP_EASE;
        // Rounding alone stalls a couple of points above the target
        *current = (eased.round() as i32).min(*current - 1).max(target);
    }
    *current
}

/// HUD resource readout, sampled on its own cadence
#[derive(Debug, Default, Clone)]
pub struct ResourceGauge {
    smoothed: f32,
    display: u32,
    last_sample: Option<Duration>,
}

impl ResourceGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the engine's current value; returns the whole-number display
    pub fn sample(&mut self, target: f32, now: Duration) -> u32 {
        if let Some(last) = self.last_sample {
            if now.saturating_sub(last) <= RESOURCE_SAMPLE_INTERVAL {
                return self.display;
            }
        }

        if self.smoothed == 0.0 && target > 0.0 {
            self.smoothed = target;
        }
        self.smoothed += (target - self.smoothed) * RESOURCE_EASE;
        self.display = (self.smoothed + 1e-4).floor().max(0.0) as u32;
        self.last_sample = Some(now);
        self.display
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    pub fn display(&self) -> u32 {
        self.display
    }

    /// Bar fill in [0, 1]
    pub fn fill(&self) -> f32 {
        (self.smoothed / MAX_RESOURCE).clamp(0.0, 1.0)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
