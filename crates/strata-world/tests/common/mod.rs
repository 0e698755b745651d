#![allow(dead_code)]

use std::sync::Arc;

use glam::{Vec2, Vec3};
use strata_voxel::{BlockRegistry, ChunkCoord, TemplateRegistry};
use strata_world::{ChunkStore, ExecutorKind, StreamingConfig, World};

pub fn small_config(seed: u64) -> StreamingConfig {
    StreamingConfig {
        activation_radius: 2.0,
        deactivation_radius: 3.5,
        activations_per_tick: 4,
        mesh_rebuilds_per_tick: 8,
        seed,
        ..Default::default()
    }
}

pub fn inline_world(config: StreamingConfig, store: Arc<dyn ChunkStore>) -> World {
    let registry = Arc::new(BlockRegistry::with_defaults());
    let templates = Arc::new(TemplateRegistry::with_defaults(&registry).unwrap());
    World::new(config, registry, templates, store, ExecutorKind::Inline).unwrap()
}

/// Block-space viewer position at the centre of a chunk, high above terrain.
pub fn viewer_over(coord: ChunkCoord) -> Vec3 {
    Vec3::new(coord.x as f32 * 16.0 + 8.0, coord.y as f32 * 16.0 + 8.0, 120.0)
}

/// Coordinates the world should hold for a viewer at `viewer`.
pub fn wanted(viewer: Vec3, radius: f32) -> Vec<ChunkCoord> {
    let center = Vec2::new(viewer.x / 16.0, viewer.y / 16.0);
    let reach = radius.ceil() as i32 + 1;
    let base = center.floor().as_ivec2();
    let mut coords = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let coord = ChunkCoord::new(base.x + dx, base.y + dy);
            if coord.distance_squared_to(center) <= radius * radius {
                coords.push(coord);
            }
        }
    }
    coords.sort();
    coords
}

pub fn live_coords(world: &World) -> Vec<ChunkCoord> {
    let mut coords: Vec<_> = world.chunks().coords().collect();
    coords.sort();
    coords
}

/// Ticks until every wanted chunk is live, nothing live lies beyond the
/// deactivation radius and no job is in flight. Chunks inside the hysteresis
/// band may stay live. Returns the number of ticks taken.
pub fn settle(world: &mut World, viewer: Vec3, max_ticks: usize) -> usize {
    let target = wanted(viewer, world.config().activation_radius);
    let center = Vec2::new(viewer.x / 16.0, viewer.y / 16.0);
    let limit_sq = world.config().deactivation_radius.powi(2);
    for tick in 0..max_ticks {
        world.tick(viewer, 0.016);
        let stats = world.stats();
        let idle = stats.initializing == 0 && stats.saving == 0 && stats.jobs_in_flight == 0;
        let covered = target.iter().all(|&coord| world.is_live(coord));
        let bounded = world
            .chunks()
            .coords()
            .all(|coord| coord.distance_squared_to(center) <= limit_sq);
        if idle && covered && bounded {
            return tick + 1;
        }
    }
    panic!("world did not settle within {max_ticks} ticks");
}
