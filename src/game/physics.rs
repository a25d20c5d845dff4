//! Unit movement and crowd separation

use super::rules::{
    UnitStats, ARENA_HEIGHT, ARENA_MARGIN, ARENA_WIDTH, SEPARATION_DISTANCE, SEPARATION_FORCE,
};
use super::state::Unit;

/// Physics helpers for moving entities around the arena
pub struct PhysicsSystem;

impl PhysicsSystem {
    pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
        let dx = x2 - x1;
        let dy = y2 - y1;
        (dx * dx + dy * dy).sqrt()
    }

    /// Step from (x, y) toward (target_x, target_y) at `speed` for `dt`
    /// seconds. Lands exactly on the target instead of overshooting.
    pub fn move_towards(
        x: f32,
        y: f32,
        target_x: f32,
        target_y: f32,
        speed: f32,
        dt: f32,
    ) -> (f32, f32) {
        let dx = target_x - x;
        let dy = target_y - y;
        let dist = (dx * dx + dy * dy).sqrt();
        let step = speed * dt;

        if dist <= step {
            return (target_x, target_y);
        }

        let ratio = step / dist;
        (x + dx * ratio, y + dy * ratio)
    }

    /// Push apart two overlapping units.
    /// Returns the offset to add to the first unit; the second gets its negation.
    pub fn separation_push(x1: f32, y1: f32, x2: f32, y2: f32) -> Option<(f32, f32)> {
        let dx = x1 - x2;
        let dy = y1 - y2;
        let dist = (dx * dx + dy * dy).sqrt();

        // Exactly stacked units have no direction to push in
        if dist <= 0.0 || dist >= SEPARATION_DISTANCE {
            return None;
        }

        let overlap = SEPARATION_DISTANCE - dist;
        let ratio = (overlap / dist) * SEPARATION_FORCE;
        Some((dx * ratio * 0.5, dy * ratio * 0.5))
    }

    /// Pairwise separation over all living mobile units, then clamp every
    /// unit back inside the arena margin
    pub fn apply_separation(units: &mut [Unit]) {
        let solid = |u: &Unit| u.is_alive() && !UnitStats::for_kind(u.kind).is_building;

        for i in 0..units.len() {
            if !solid(&units[i]) {
                continue;
            }

            for j in 0..units.len() {
                if i == j || !solid(&units[j]) {
                    continue;
                }

                let (a, b) = (&units[i], &units[j]);
                if let Some((push_x, push_y)) = Self::separation_push(a.x, a.y, b.x, b.y) {
                    units[i].x += push_x;
                    units[i].y += push_y;
                    units[j].x -= push_x;
                    units[j].y -= push_y;
                }
            }
        }

        for unit in units.iter_mut() {
            unit.x = unit.x.clamp(ARENA_MARGIN, ARENA_WIDTH - ARENA_MARGIN);
            unit.y = unit.y.clamp(ARENA_MARGIN, ARENA_HEIGHT - ARENA_MARGIN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Side, UnitKind};

    fn unit(id: &str, kind: UnitKind, x: f32, y: f32) -> Unit {
        Unit {
            id: id.into(),
            kind,
            owner: Side::One,
            hp: 100,
            max_hp: 100,
            x,
            y,
        }
    }

    #[test]
    fn move_towards_does_not_overshoot() {
        assert_eq!(
            PhysicsSystem::move_towards(0.0, 0.0, 3.0, 4.0, 100.0, 1.0),
            (3.0, 4.0)
        );

        let (x, y) = PhysicsSystem::move_towards(0.0, 0.0, 30.0, 40.0, 10.0, 0.5);
        assert!((x - 3.0).abs() < 1e-5);
        assert!((y - 4.0).abs() < 1e-5);
    }

    #[test]
    fn overlapping_units_are_pushed_apart() {
        let mut units = vec![
            unit("a", UnitKind::Melee, 100.0, 100.0),
            unit("b", UnitKind::Melee, 110.0, 100.0),
        ];

        PhysicsSystem::apply_separation(&mut units);

        let gap = PhysicsSystem::distance(units[0].x, units[0].y, units[1].x, units[1].y);
        assert!(gap > 10.0);
        assert!(units[0].x < 100.0);
        assert!(units[1].x > 110.0);
    }

    #[test]
    fn buildings_are_not_separated() {
        let mut units = vec![
            unit("tower", UnitKind::Defense, 100.0, 100.0),
            unit("walker", UnitKind::Melee, 110.0, 100.0),
        ];

        PhysicsSystem::apply_separation(&mut units);

        assert_eq!((units[0].x, units[0].y), (100.0, 100.0));
        assert_eq!((units[1].x, units[1].y), (110.0, 100.0));
    }

    #[test]
    fn units_are_clamped_inside_the_arena() {
        let mut units = vec![unit("edge", UnitKind::Ranged, -20.0, 2000.0)];
        PhysicsSystem::apply_separation(&mut units);
        assert_eq!((units[0].x, units[0].y), (10.0, 990.0));
    }
}
