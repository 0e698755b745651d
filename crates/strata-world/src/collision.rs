//! Axis-aligned box collision against the block grid.

use glam::{BVec3, IVec3, Vec3};
use strata_voxel::{BlockIterator, BlockRegistry, CHUNK_SIZE_Z, ChunkMap};

/// Overlaps thinner than this are ignored so a box resting on a face does
/// not count as colliding.
const CONTACT_EPSILON: f32 = 1e-4;

/// Upper bound on resolution passes. Each pass resolves every block the box
/// still overlaps.
const MAX_PASSES: usize = 4;

/// An axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box from two corners in any order.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Creates a box around `center`.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Midpoint of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// The box moved by `offset`.
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Whether the box overlaps the unit cell at `cell` by more than a touch.
    fn overlaps_cell(&self, cell: IVec3) -> bool {
        let lo = cell.as_vec3();
        let hi = lo + Vec3::ONE;
        (0..3).all(|a| {
            self.max[a] > lo[a] + CONTACT_EPSILON && self.min[a] < hi[a] - CONTACT_EPSILON
        })
    }
}

/// Result of [`push_out_of_solids`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PushOut {
    /// The box moved clear of solid blocks.
    pub aabb: Aabb,
    /// Total offset applied.
    pub correction: Vec3,
    /// Axes along which the box was pushed.
    pub collided: BVec3,
}

/// Whether the block at `pos` stops movement. Unloaded chunks and everything
/// below the world are solid; everything above it is open.
pub fn is_solid_at(map: &ChunkMap, registry: &BlockRegistry, pos: IVec3) -> bool {
    if pos.z < 0 {
        return true;
    }
    if pos.z >= CHUNK_SIZE_Z as i32 {
        return false;
    }
    match BlockIterator::at_global(map, pos).block(map) {
        Some(block) => registry.is_solid(block.type_id()),
        None => true,
    }
}

/// Moves `aabb` out of every solid block it overlaps, each time along the
/// axis of least penetration.
pub fn push_out_of_solids(map: &ChunkMap, registry: &BlockRegistry, aabb: Aabb) -> PushOut {
    let mut current = aabb;
    let mut correction = Vec3::ZERO;
    let mut collided = BVec3::FALSE;

    for _ in 0..MAX_PASSES {
        let lo = current.min.floor().as_ivec3();
        let hi = (current.max.ceil().as_ivec3() - IVec3::ONE).max(lo);
        let mut moved = false;

        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    let cell = IVec3::new(x, y, z);
                    if !current.overlaps_cell(cell) || !is_solid_at(map, registry, cell) {
                        continue;
                    }
                    let (axis, offset) = least_penetration(&current, cell);
                    let mut push = Vec3::ZERO;
                    push[axis] = offset;
                    current = current.translated(push);
                    correction += push;
                    collided = collided | BVec3::new(axis == 0, axis == 1, axis == 2);
                    moved = true;
                }
            }
        }
        if !moved {
            break;
        }
    }

    if collided.any() {
        tracing::trace!("pushed box out of solids by {correction}");
    }
    PushOut {
        aabb: current,
        correction,
        collided,
    }
}

/// Axis and signed offset of the shortest move separating `aabb` from `cell`.
fn least_penetration(aabb: &Aabb, cell: IVec3) -> (usize, f32) {
    let lo = cell.as_vec3();
    let hi = lo + Vec3::ONE;
    let mut best = (0, f32::MAX);
    for axis in 0..3 {
        let negative = aabb.max[axis] - lo[axis];
        let positive = hi[axis] - aabb.min[axis];
        let offset = if negative < positive { -negative } else { positive };
        if offset.abs() < best.1.abs() {
            best = (axis, offset);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use strata_voxel::{Chunk, ChunkCoord};

    use super::*;

    /// A 2x2 patch of chunks, stone up to z = 63 and air above.
    fn flat_world(registry: &BlockRegistry) -> ChunkMap {
        let stone = registry.require("stone").unwrap();
        let mut map = ChunkMap::new();
        for x in 0..2 {
            for y in 0..2 {
                let mut chunk = Chunk::new(ChunkCoord::new(x, y));
                for lx in 0..16 {
                    for ly in 0..16 {
                        chunk.fill_column(lx, ly, 0..64, stone);
                    }
                }
                map.insert(Box::new(chunk));
            }
        }
        map
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_free_box_is_untouched() {
        let registry = BlockRegistry::with_defaults();
        let map = flat_world(&registry);
        let aabb = Aabb::new(Vec3::new(8.2, 8.2, 70.0), Vec3::new(8.8, 8.8, 71.8));
        let out = push_out_of_solids(&map, &registry, aabb);
        assert_eq!(out.aabb, aabb);
        assert_eq!(out.correction, Vec3::ZERO);
        assert!(!out.collided.any());
    }

    #[test]
    fn test_box_resting_on_floor_does_not_collide() {
        let registry = BlockRegistry::with_defaults();
        let map = flat_world(&registry);
        let aabb = Aabb::new(Vec3::new(8.2, 8.2, 64.0), Vec3::new(8.8, 8.8, 65.8));
        let out = push_out_of_solids(&map, &registry, aabb);
        assert!(!out.collided.any());
    }

    #[test]
    fn test_sunk_box_is_pushed_up() {
        let registry = BlockRegistry::with_defaults();
        let map = flat_world(&registry);
        let aabb = Aabb::new(Vec3::new(8.2, 8.2, 63.9), Vec3::new(8.8, 8.8, 65.7));
        let out = push_out_of_solids(&map, &registry, aabb);
        assert!(out.collided.z);
        assert!(!out.collided.x && !out.collided.y);
        assert!(approx(out.aabb.min.z, 64.0));
        assert!(approx(out.correction.z, 0.1));
    }

    #[test]
    fn test_wall_pushes_sideways() {
        let registry = BlockRegistry::with_defaults();
        let mut map = flat_world(&registry);
        let stone = registry.require("stone").unwrap();
        map.get_mut(ChunkCoord::new(0, 0))
            .unwrap()
            .fill_column(10, 8, 64..68, stone);

        let aabb = Aabb::new(Vec3::new(9.7, 8.2, 64.5), Vec3::new(10.2, 8.8, 65.5));
        let out = push_out_of_solids(&map, &registry, aabb);
        assert!(out.collided.x);
        assert!(approx(out.aabb.max.x, 10.0));
        assert!(approx(out.correction.x, -0.2));
    }

    #[test]
    fn test_unloaded_chunk_counts_as_solid() {
        let registry = BlockRegistry::with_defaults();
        let map = flat_world(&registry);
        let aabb = Aabb::new(Vec3::new(31.8, 8.2, 70.0), Vec3::new(32.3, 8.8, 71.0));
        let out = push_out_of_solids(&map, &registry, aabb);
        assert!(out.collided.x);
        assert!(approx(out.aabb.max.x, 32.0));
    }

    #[test]
    fn test_is_solid_at_world_limits() {
        let registry = BlockRegistry::with_defaults();
        let map = flat_world(&registry);
        assert!(is_solid_at(&map, &registry, IVec3::new(4, 4, -1)));
        assert!(!is_solid_at(&map, &registry, IVec3::new(4, 4, 128)));
        assert!(is_solid_at(&map, &registry, IVec3::new(4, 4, 10)));
        assert!(!is_solid_at(&map, &registry, IVec3::new(4, 4, 100)));
    }

    #[test]
    fn test_aabb_constructors() {
        let aabb = Aabb::from_center_half_extents(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(0.5));
        assert_eq!(aabb.min, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(aabb.center(), Vec3::new(1.0, 2.0, 3.0));
        let swapped = Aabb::new(Vec3::ONE, Vec3::ZERO);
        assert_eq!(swapped.min, Vec3::ZERO);
    }
}
