//! Grid raycasting using the DDA (Amanatides & Woo) algorithm.
//!
//! The march walks a [`BlockIterator`] one face at a time, so crossing a chunk
//! boundary costs one map lookup and an unloaded chunk ends the ray.

use glam::{IVec3, Vec3};
use strata_voxel::{BlockIterator, BlockRegistry, CHUNK_SIZE_Z, ChunkMap, Direction};

/// Outcome of [`raycast`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastResult {
    pub hit: bool,
    /// Point where the ray entered the hit block, or the ray's end on a miss.
    pub impact_position: Vec3,
    /// Distance from the origin to `impact_position`.
    pub impact_distance: f32,
    /// Normal of the face the ray entered through. Zero when the ray started
    /// inside the hit block or missed.
    pub impact_normal: Vec3,
    /// The hit block, or the null iterator on a miss.
    pub block: BlockIterator,
}

impl RaycastResult {
    fn miss(origin: Vec3, direction: Vec3, max_length: f32) -> Self {
        Self {
            hit: false,
            impact_position: origin + direction * max_length,
            impact_distance: max_length,
            impact_normal: Vec3::ZERO,
            block: BlockIterator::NONE,
        }
    }

    /// Global position of the block next to the hit face, where a placed
    /// block would go.
    pub fn adjacent_position(&self) -> Option<IVec3> {
        if !self.hit || self.impact_normal == Vec3::ZERO {
            return None;
        }
        Some(self.block.global_coords()? + self.impact_normal.as_ivec3())
    }
}

/// Casts a ray through the live chunks and returns the first solid block
/// within `max_length`.
///
/// A ray starting above the world is clipped to where it crosses the top
/// layer, so casting down from the sky still finds the ground. Distances stay
/// measured from `origin`.
pub fn raycast(
    map: &ChunkMap,
    registry: &BlockRegistry,
    origin: Vec3,
    direction: Vec3,
    max_length: f32,
) -> RaycastResult {
    let dir = direction.normalize_or_zero();
    let top = CHUNK_SIZE_Z as f32;

    let (entry_t, entry, start, mut normal) = if origin.z >= top {
        if dir.z >= 0.0 {
            return RaycastResult::miss(origin, dir, max_length);
        }
        let entry_t = (origin.z - top) / -dir.z;
        if entry_t > max_length {
            return RaycastResult::miss(origin, dir, max_length);
        }
        let entry = origin + dir * entry_t;
        // Entering through the top face leaves a full block to cross downward.
        let start = entry.floor().with_z(top - 1.0);
        (entry_t, entry, start, Vec3::Z)
    } else {
        (0.0, origin, origin.floor(), Vec3::ZERO)
    };

    let mut it = BlockIterator::at_global(map, start.as_ivec3());
    if !it.is_valid() {
        return RaycastResult::miss(origin, dir, max_length);
    }
    let sub = entry - start;

    let step = IVec3::new(sign(dir.x), sign(dir.y), sign(dir.z));
    let t_delta = Vec3::new(safe_inv(dir.x.abs()), safe_inv(dir.y.abs()), safe_inv(dir.z.abs()));
    let mut t_max = Vec3::new(
        initial_t_max(sub.x, dir.x, t_delta.x),
        initial_t_max(sub.y, dir.y, t_delta.y),
        initial_t_max(sub.z, dir.z, t_delta.z),
    ) + Vec3::splat(entry_t);

    let mut t = entry_t;
    loop {
        if let Some(block) = it.block(map)
            && registry.is_solid(block.type_id())
        {
            return RaycastResult {
                hit: true,
                impact_position: origin + dir * t,
                impact_distance: t,
                impact_normal: normal,
                block: it,
            };
        }

        // Advance along the axis with the smallest t_max.
        let face = if t_max.x < t_max.y && t_max.x < t_max.z {
            t = t_max.x;
            t_max.x += t_delta.x;
            normal = Vec3::new(-step.x as f32, 0.0, 0.0);
            if step.x > 0 { Direction::East } else { Direction::West }
        } else if t_max.y < t_max.z {
            t = t_max.y;
            t_max.y += t_delta.y;
            normal = Vec3::new(0.0, -step.y as f32, 0.0);
            if step.y > 0 { Direction::North } else { Direction::South }
        } else {
            t = t_max.z;
            t_max.z += t_delta.z;
            normal = Vec3::new(0.0, 0.0, -step.z as f32);
            if step.z > 0 { Direction::Up } else { Direction::Down }
        };

        if t > max_length {
            return RaycastResult::miss(origin, dir, max_length);
        }
        it = it.step(map, face);
        if !it.is_valid() {
            return RaycastResult::miss(origin, dir, max_length);
        }
    }
}

fn sign(x: f32) -> i32 {
    if x >= 0.0 { 1 } else { -1 }
}

/// Safely compute 1.0 / x, clamping to `f32::MAX` when x ≈ 0.
fn safe_inv(x: f32) -> f32 {
    if x.abs() < f32::EPSILON {
        f32::MAX
    } else {
        1.0 / x
    }
}

/// Parametric distance to the first block boundary on one axis.
fn initial_t_max(sub: f32, dir_component: f32, t_delta: f32) -> f32 {
    if dir_component > 0.0 {
        (1.0 - sub) * t_delta
    } else if dir_component < 0.0 {
        sub * t_delta
    } else {
        f32::MAX
    }
}
