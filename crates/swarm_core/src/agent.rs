//! Agents and their motion primitives
//!
//! Motion is a direct position step (no inertia): `move_toward` is a seek
//! with a fixed step length, `wander` is a uniform jitter per axis. Both clamp
//! the result into the square arena `[0, world]²`.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Added to the distance before normalising so a zero displacement stays finite.
pub const SEEK_EPSILON: f64 = 1e-6;

/// A position in arena coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Clamp both components into `[0, world]`.
    pub fn clamped(self, world: f64) -> Self {
        Self { x: self.x.clamp(0.0, world), y: self.y.clamp(0.0, world) }
    }

    pub fn in_bounds(&self, world: f64) -> bool {
        (0.0..=world).contains(&self.x) && (0.0..=world).contains(&self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Fixed role of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Defender,
    Attacker,
    Decoy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub pos: Point,
    role: Role,
}

impl Agent {
    pub fn new(pos: Point, role: Role) -> Self {
        Self { pos, role }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn distance_to(&self, point: Point) -> f64 {
        self.pos.distance_to(point)
    }

    /// Step `speed` units toward `target`, then clamp into the arena.
    pub fn move_toward(&mut self, target: Point, speed: f64, world: f64) {
        let dx = target.x - self.pos.x;
        let dy = target.y - self.pos.y;
        let dist = dx.hypot(dy) + SEEK_EPSILON;
        self.pos = Point::new(self.pos.x + speed * dx / dist, self.pos.y + speed * dy / dist)
            .clamped(world);
    }

    /// Jitter by `U[-speed, speed]` on each axis (x drawn first), then clamp.
    pub fn wander<R: Rng>(&mut self, speed: f64, world: f64, rng: &mut R) {
        let dx = rng.gen_range(-speed..=speed);
        let dy = rng.gen_range(-speed..=speed);
        self.pos = Point::new(self.pos.x + dx, self.pos.y + dy).clamped(world);
    }
}

/// Arithmetic mean position, `None` for an empty group.
pub fn centroid<'a, I>(agents: I) -> Option<Point>
where
    I: IntoIterator<Item = &'a Agent>,
{
    let (sum, count) = agents
        .into_iter()
        .fold((Point::default(), 0usize), |(acc, n), a| {
            (Point::new(acc.x + a.pos.x, acc.y + a.pos.y), n + 1)
        });
    if count == 0 {
        return None;
    }
    Some(Point::new(sum.x / count as f64, sum.y / count as f64))
}
