//! Headless driver for the Strata world engine.
//!
//! Walks a viewer around a circle, streaming chunks in and out, and digs or
//! places a block under the viewer every few ticks. Edits are saved to the
//! configured directory, so a second run finds them again.
//!
//! Run with: `cargo run -p strata-demo -- --ticks 2000`

use std::f32::consts::TAU;
use std::sync::Arc;

use clap::Parser;
use glam::Vec3;
use strata_config::{CliArgs, Config};
use strata_voxel::{BlockRegistry, TemplateRegistry};
use strata_world::{Aabb, DiskChunkStore, ExecutorKind, StreamingConfig, World};
use tracing::info;

/// CLI arguments for the demo binary.
#[derive(Parser, Debug)]
#[command(name = "strata-demo", about = "Headless Strata world walk")]
struct DemoArgs {
    #[command(flatten)]
    cli: CliArgs,

    /// Number of ticks to run.
    #[arg(long, default_value_t = 1200)]
    ticks: u32,

    /// Radius of the walk, in chunks.
    #[arg(long, default_value_t = 6.0)]
    walk_radius: f32,

    /// Dig or place a block every this many ticks (0 = never).
    #[arg(long, default_value_t = 60)]
    edit_every: u32,

    /// Run jobs on the main thread instead of the worker pool.
    #[arg(long)]
    inline: bool,
}

/// Height the viewer floats at and casts rays from.
const VIEWER_Z: f32 = 126.5;
const TICK_SECONDS: f32 = 1.0 / 60.0;
/// Half extents of the player box dropped at each edit.
const PLAYER_HALF_EXTENTS: Vec3 = Vec3::new(0.3, 0.3, 0.9);

fn streaming_config(config: &Config) -> StreamingConfig {
    StreamingConfig {
        activation_radius: config.world.activation_radius,
        deactivation_radius: config.world.deactivation_radius,
        activations_per_tick: config.world.activations_per_tick as usize,
        mesh_rebuilds_per_tick: config.world.mesh_rebuilds_per_tick as usize,
        max_completions_per_tick: config.world.max_completions_per_tick as usize,
        max_light_updates_per_tick: config.lighting.max_updates_per_tick as usize,
        persist_edits: config.storage.persist_edits,
        seed: config.world.seed,
        sea_level: config.world.sea_level,
        day_length_seconds: config.lighting.day_length_seconds,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = DemoArgs::parse();

    let config_dir = args.cli.config_dir();
    let mut config = Config::load_or_create(&config_dir)?;
    config.apply_cli_overrides(&args.cli);
    config.validate()?;

    strata_log::init_logging(
        Some(&config_dir.join("logs")),
        cfg!(debug_assertions),
        Some(&config),
    );
    info!("Strata demo, config from {}", config_dir.display());
    info!(
        "Seed {} | radii {}/{} | saves in {}",
        config.world.seed,
        config.world.activation_radius,
        config.world.deactivation_radius,
        config.storage.save_directory.display()
    );

    let registry = Arc::new(BlockRegistry::with_defaults());
    let templates = Arc::new(TemplateRegistry::with_defaults(&registry)?);
    let store = Arc::new(DiskChunkStore::open(&config.storage.save_directory)?);
    let executor = if args.inline {
        ExecutorKind::Inline
    } else {
        ExecutorKind::Threaded {
            compute_threads: config.world.worker_threads as usize,
        }
    };
    let glowstone = registry.require("glowstone")?;
    let mut world = World::new(streaming_config(&config), registry, templates, store, executor)?;

    let walk_radius = args.walk_radius * 16.0;
    let mut digs = 0u32;
    let mut places = 0u32;
    for tick in 0..args.ticks {
        let angle = tick as f32 / args.ticks.max(1) as f32 * TAU;
        let viewer = Vec3::new(angle.cos() * walk_radius, angle.sin() * walk_radius, VIEWER_Z);
        let report = world.tick(viewer, TICK_SECONDS);
        if !report.meshes.is_empty() {
            tracing::trace!("mesh rebuilds: {:?}", report.meshes);
        }

        if args.edit_every > 0 && tick % args.edit_every == 0 {
            let hit = world.raycast(viewer, Vec3::NEG_Z, VIEWER_Z);
            if hit.hit {
                let dig = (tick / args.edit_every) % 2 == 0;
                let edited = if dig {
                    world.dig(&hit).is_some()
                } else {
                    world.place(&hit, glowstone).is_some()
                };
                if edited {
                    if dig {
                        digs += 1;
                    } else {
                        places += 1;
                    }
                    // Drop a player box into the ground at the impact point.
                    let feet = hit.impact_position + Vec3::new(0.0, 0.0, -0.2);
                    let player = Aabb::from_center_half_extents(
                        feet + Vec3::Z * PLAYER_HALF_EXTENTS.z,
                        PLAYER_HALF_EXTENTS,
                    );
                    let out = world.push_out_of_solids(player);
                    tracing::debug!(
                        "edit at {:?}, player pushed by {}",
                        hit.block.global_coords(),
                        out.correction
                    );
                }
            }
        }

        if config.debug.stats_interval_ticks > 0 && tick % config.debug.stats_interval_ticks == 0 {
            let stats = world.stats();
            let sky = world.sky();
            info!(
                "tick {tick}: {} live, {} initializing, {} saving, {} jobs, light x{:.2}",
                stats.live,
                stats.initializing,
                stats.saving,
                stats.jobs_in_flight,
                sky.outdoor_light_factor()
            );
        }
    }

    let written = world.shutdown();
    let stats = world.stats();
    info!(
        "Done: {digs} digs, {places} places | generated {}, loaded {}, saved {} (+{written} at shutdown)",
        stats.generated, stats.loaded, stats.saved - written as u64
    );
    Ok(())
}
