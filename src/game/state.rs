//! Battle state owned by the prediction engine
//!
//! These records keep the same shape as the wire protocol so a snapshot can
//! be adopted without translation. Anything the client tracks beyond the
//! wire fields lives in [`super::runtime`], keyed by entity id.

use serde::{Deserialize, Serialize};

/// The server sends empty lists as `null`
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(items.unwrap_or_default())
}

/// One of the two players in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn enemy(self) -> Self {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Side::One => 1,
            Side::Two => 2,
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Side::One),
            2 => Ok(Side::Two),
            other => Err(format!("invalid player number {other}")),
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> Self {
        side.number()
    }
}

/// Unit (card) types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Short range, hits instantly
    #[default]
    Melee,
    /// Long range archer
    Ranged,
    /// Splash damage caster
    Aoe,
    /// High damage single-target assassin
    Single,
    /// Stationary building
    Defense,
    /// Anything the client doesn't recognize
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TowerKind {
    King,
    #[serde(other)]
    Lateral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectileKind {
    Tower,
    Ranged,
    Aoe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tower {
    pub id: String,
    pub hp: i32,
    pub max_hp: i32,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type")]
    pub kind: TowerKind,
}

impl Tower {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Keep hp within `[0, max_hp]`
    pub fn clamp_hp(&mut self) {
        self.hp = self.hp.clamp(0, self.max_hp.max(0));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub owner: Side,
    pub hp: i32,
    pub max_hp: i32,
    pub x: f32,
    pub y: f32,
}

impl Unit {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn clamp_hp(&mut self) {
        self.hp = self.hp.clamp(0, self.max_hp.max(0));
    }
}

/// In-flight projectile. Locally spawned ones aim at a fixed point; their
/// damage lives in the runtime annotations, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projectile {
    pub id: String,
    pub owner_id: String,
    pub x: f32,
    pub y: f32,
    pub target_x: f32,
    pub target_y: f32,
    #[serde(rename = "type")]
    pub kind: ProjectileKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSide {
    /// Elixir, continuous and regenerating
    #[serde(rename = "elixir")]
    pub resource: f32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub towers: Vec<Tower>,
}

/// The single mutable aggregate the engine owns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleState {
    pub tick: u64,
    pub player1: PlayerSide,
    pub player2: PlayerSide,
    pub units: Vec<Unit>,
    pub projectiles: Vec<Projectile>,
}

impl BattleState {
    pub fn side(&self, side: Side) -> &PlayerSide {
        match side {
            Side::One => &self.player1,
            Side::Two => &self.player2,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut PlayerSide {
        match side {
            Side::One => &mut self.player1,
            Side::Two => &mut self.player2,
        }
    }

    pub fn towers(&self) -> impl Iterator<Item = (Side, &Tower)> {
        self.player1
            .towers
            .iter()
            .map(|t| (Side::One, t))
            .chain(self.player2.towers.iter().map(|t| (Side::Two, t)))
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn tower(&self, id: &str) -> Option<&Tower> {
        self.towers().map(|(_, t)| t).find(|t| t.id == id)
    }
}
