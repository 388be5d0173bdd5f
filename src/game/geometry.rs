//! Static arena geometry: vectors, cover boxes and segment intersection

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_4, TAU};
use std::ops::{Add, AddAssign, Mul, Sub};

/// Directions shorter than this are treated as degenerate
const EPSILON: f32 = 1e-6;

/// 3D vector used for positions, velocities and directions (y is up)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction, or `None` for zero/non-finite input
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if !len.is_finite() || len < EPSILON {
            return None;
        }
        Some(self * (1.0 / len))
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Immutable axis-aligned box blocking movement and bullets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl CoverBox {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box standing on the ground, centered on (x, z)
    pub fn grounded(x: f32, z: f32, width: f32, height: f32, depth: f32) -> Self {
        Self {
            min: Vec3::new(x - width / 2.0, 0.0, z - depth / 2.0),
            max: Vec3::new(x + width / 2.0, height, z + depth / 2.0),
        }
    }

    /// Slab-method ray test.
    ///
    /// `dir` must be a unit vector. Returns the distance along the ray at which
    /// the segment `[0, max_dist]` first touches the box. A ray starting inside
    /// the box reports a hit at distance 0.
    pub fn ray_hit(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<f32> {
        let mut near = f32::NEG_INFINITY;
        let mut far = f32::INFINITY;

        let axes = [
            (origin.x, dir.x, self.min.x, self.max.x),
            (origin.y, dir.y, self.min.y, self.max.y),
            (origin.z, dir.z, self.min.z, self.max.z),
        ];

        for (o, d, lo, hi) in axes {
            if d.abs() < EPSILON {
                // Parallel to this slab: either always inside it or never
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let t1 = (lo - o) / d;
            let t2 = (hi - o) / d;
            near = near.max(t1.min(t2));
            far = far.min(t1.max(t2));
        }

        if near > far || far < 0.0 {
            return None;
        }
        let entry = near.max(0.0);
        (entry <= max_dist).then_some(entry)
    }

    /// Whether a vertical cylinder (circle in xz, feet at `pos.y`) overlaps the box
    pub fn overlaps_cylinder(&self, pos: Vec3, radius: f32, height: f32) -> bool {
        if self.max.y <= pos.y || self.min.y >= pos.y + height {
            return false;
        }
        let cx = pos.x.clamp(self.min.x, self.max.x);
        let cz = pos.z.clamp(self.min.z, self.max.z);
        let dx = pos.x - cx;
        let dz = pos.z - cz;
        dx * dx + dz * dz < radius * radius
    }
}

/// Crate placement: (ring radius, width, height, depth)
const CRATES: [(f32, f32, f32, f32); 8] = [
    (9.0, 1.2, 1.0, 1.2),
    (12.5, 1.4, 0.9, 1.1),
    (10.0, 1.1, 1.1, 1.4),
    (16.0, 1.3, 0.8, 1.3),
    (8.5, 1.5, 1.2, 1.0),
    (13.0, 1.2, 1.0, 1.5),
    (11.0, 1.0, 0.9, 1.2),
    (15.0, 1.4, 1.1, 1.1),
];

/// Pillar ring radii
const PILLARS: [f32; 6] = [6.0, 9.5, 7.0, 12.0, 5.5, 10.5];

const CRATE_COUNT: usize = CRATES.len();
const SHORT_WALL_RADIUS: f32 = 15.0;
const SHORT_WALL_WIDTH: f32 = 3.0;
const SHORT_WALL_HEIGHT: f32 = 1.5;
const SHORT_WALL_THICKNESS: f32 = 0.2;
const PILLAR_HALF_WIDTH: f32 = 0.5;
const PILLAR_HEIGHT: f32 = 1.2;
const BOUNDARY_HEIGHT: f32 = 3.0;
const BOUNDARY_THICKNESS: f32 = 0.5;

/// Read-only set of cover boxes shared by every tick.
///
/// The layout is a fixed table so any client rendering the arena can build the
/// exact same boxes (served from `/geometry`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryCatalog {
    pub arena_size: f32,
    pub boxes: Vec<CoverBox>,
}

impl GeometryCatalog {
    /// The standard arena: crates, short walls, pillars and boundary walls
    pub fn standard(half_size: f32) -> Self {
        let mut boxes = Vec::with_capacity(CRATE_COUNT + 4 + PILLARS.len() + 4);

        for (i, &(radius, width, height, depth)) in CRATES.iter().enumerate() {
            let angle = i as f32 / CRATE_COUNT as f32 * TAU;
            boxes.push(CoverBox::grounded(
                angle.cos() * radius,
                angle.sin() * radius,
                width,
                height,
                depth,
            ));
        }

        for i in 0..4 {
            let angle = i as f32 / 4.0 * TAU + FRAC_PI_4;
            boxes.push(CoverBox::grounded(
                angle.cos() * SHORT_WALL_RADIUS,
                angle.sin() * SHORT_WALL_RADIUS,
                SHORT_WALL_WIDTH,
                SHORT_WALL_HEIGHT,
                SHORT_WALL_THICKNESS,
            ));
        }

        for (i, &radius) in PILLARS.iter().enumerate() {
            let angle = i as f32 / PILLARS.len() as f32 * TAU;
            boxes.push(CoverBox::grounded(
                angle.cos() * radius,
                angle.sin() * radius,
                PILLAR_HALF_WIDTH * 2.0,
                PILLAR_HEIGHT,
                PILLAR_HALF_WIDTH * 2.0,
            ));
        }

        boxes.extend(boundary_walls(half_size));
        Self::from_boxes(half_size, boxes)
    }

    /// Only the four perimeter walls
    pub fn boundary_only(half_size: f32) -> Self {
        Self::from_boxes(half_size, boundary_walls(half_size).to_vec())
    }

    pub fn from_boxes(half_size: f32, boxes: Vec<CoverBox>) -> Self {
        Self {
            arena_size: half_size * 2.0,
            boxes,
        }
    }

    /// Whether any box lies on the segment `from -> to`.
    ///
    /// A zero-length segment never intersects.
    pub fn segment_blocked(&self, from: Vec3, to: Vec3) -> bool {
        let delta = to - from;
        let distance = delta.length();
        let Some(dir) = delta.normalized() else {
            return false;
        };
        self.boxes
            .iter()
            .any(|b| b.ray_hit(from, dir, distance).is_some())
    }

    /// Whether a standing player at `pos` would overlap any box
    pub fn blocks_body(&self, pos: Vec3, radius: f32, height: f32) -> bool {
        self.boxes
            .iter()
            .any(|b| b.overlaps_cylinder(pos, radius, height))
    }
}

fn boundary_walls(half: f32) -> [CoverBox; 4] {
    let t = BOUNDARY_THICKNESS / 2.0;
    let h = BOUNDARY_HEIGHT;
    [
        // north
        CoverBox::new(Vec3::new(-half, 0.0, -half - t), Vec3::new(half, h, -half + t)),
        // south
        CoverBox::new(Vec3::new(-half, 0.0, half - t), Vec3::new(half, h, half + t)),
        // west
        CoverBox::new(Vec3::new(-half - t, 0.0, -half), Vec3::new(-half + t, h, half)),
        // east
        CoverBox::new(Vec3::new(half - t, 0.0, -half), Vec3::new(half + t, h, half)),
    ]
}
