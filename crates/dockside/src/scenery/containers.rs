//! Shipping container yard.
//!
//! Containers are scattered on concentric rings around the driving area. The
//! outer ring is a dense barrier; inner rings are sparser, wobblier and lower.
//! Only ground-level containers collide. Stacked ones are on the decor layer,
//! which nothing collides with but camera occlusion rays still hit.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use avian3d::prelude::*;
use bevy::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{camera::Occluder, physics::GameLayer};

/// Container dimensions (m): width, height, length.
pub const CONTAINER_SIZE: Vec3 = Vec3::new(2.438, 2.591, 6.058);
/// Radius of the barrier ring (m).
pub const YARD_RADIUS: f32 = 50.0;
/// Number of rings, barrier included.
pub const RING_COUNT: usize = 3;
/// Tallest stack per ring.
pub const RING_MAX_HEIGHT: [u32; RING_COUNT] = [5, 3, 2];
/// Shortest barrier stack.
pub const BARRIER_MIN_HEIGHT: u32 = 3;
/// Nothing is placed inside this radius (m), measured to the container centre
/// less half its length.
pub const MIN_INNER_RADIUS: f32 = 15.0;

const GROUND_OFFSET: f32 = 1.296;
const RING_SPACING: f32 = 2.0;
const BARRIER_GAP: f32 = 0.15;
const INNER_GAP: f32 = 3.0;
const INNER_RADIUS_NOISE: f32 = 2.5;
const BARRIER_ZIGZAG: f32 = 0.25;
const INNER_WOBBLE: f32 = 3.0;
const SKIP_CHANCE: f64 = 0.15;
const PERPENDICULAR_CHANCE: f64 = 0.7;
const INNER_ROTATION_CHAOS: f32 = 0.8;
const BARRIER_ROTATION_JITTER: f32 = 0.05;

/// Paint job of a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerPaint {
    Green,
    White,
    Red,
    Blue,
    Gray,
}

impl ContainerPaint {
    pub const ALL: [ContainerPaint; 5] = [
        ContainerPaint::Green,
        ContainerPaint::White,
        ContainerPaint::Red,
        ContainerPaint::Blue,
        ContainerPaint::Gray,
    ];

    /// Gray appears twice, so it is twice as likely.
    const POOL: [ContainerPaint; 6] = [
        ContainerPaint::Green,
        ContainerPaint::White,
        ContainerPaint::Red,
        ContainerPaint::Blue,
        ContainerPaint::Gray,
        ContainerPaint::Gray,
    ];

    pub fn color(self) -> Color {
        match self {
            ContainerPaint::Green => Color::srgb(0.18, 0.4, 0.24),
            ContainerPaint::White => Color::srgb(0.82, 0.82, 0.8),
            ContainerPaint::Red => Color::srgb(0.6, 0.15, 0.11),
            ContainerPaint::Blue => Color::srgb(0.14, 0.28, 0.52),
            ContainerPaint::Gray => Color::srgb(0.42, 0.43, 0.45),
        }
    }
}

/// One container in the yard.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerPlacement {
    /// Ring index; 0 is the barrier.
    pub ring: usize,
    /// Slot within the ring.
    pub slot: usize,
    /// Stack level; 0 stands on the floor.
    pub level: u32,
    pub translation: Vec3,
    pub yaw: f32,
    pub scale: f32,
    pub paint: ContainerPaint,
}

impl ContainerPlacement {
    pub fn is_grounded(&self) -> bool {
        self.level == 0
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.translation)
            .with_rotation(Quat::from_rotation_y(self.yaw))
            .with_scale(Vec3::splat(self.scale))
    }
}

/// Plan the yard layout. The same seed always gives the same layout.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn plan_yard(seed: u64) -> Vec<ContainerPlacement> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut placements = Vec::new();

    for ring in 0..RING_COUNT {
        let is_barrier = ring == 0;
        let gap = if is_barrier { BARRIER_GAP } else { INNER_GAP };
        let noise = if is_barrier {
            0.0
        } else {
            rng.random_range(-INNER_RADIUS_NOISE..INNER_RADIUS_NOISE)
        };
        let ring_radius = YARD_RADIUS - ring as f32 * (CONTAINER_SIZE.z + RING_SPACING) + noise;
        let slots = (TAU * ring_radius / (CONTAINER_SIZE.x + gap)).floor() as usize;
        let angle_step = TAU / slots as f32;
        let mut skip = 0;

        for slot in 0..slots {
            if !is_barrier {
                if skip > 0 {
                    skip -= 1;
                    continue;
                }
                if rng.random_bool(SKIP_CHANCE) {
                    // This slot plus a run of 1..=3 more.
                    skip = rng.random_range(1..4);
                    continue;
                }
            }

            let angle = slot as f32 * angle_step;
            let radius_offset = if is_barrier {
                if slot % 2 == 0 {
                    BARRIER_ZIGZAG
                } else {
                    -BARRIER_ZIGZAG
                }
            } else {
                (angle * 4.0).sin() * INNER_WOBBLE
            };
            let radius = ring_radius + radius_offset;
            if radius < MIN_INNER_RADIUS + CONTAINER_SIZE.z / 2.0 {
                continue;
            }

            let yaw = if is_barrier {
                angle + rng.random_range(-BARRIER_ROTATION_JITTER..BARRIER_ROTATION_JITTER)
            } else {
                let orientation = if rng.random_bool(PERPENDICULAR_CHANCE) {
                    FRAC_PI_2
                } else {
                    0.0
                };
                angle
                    + orientation
                    + rng.random_range(-INNER_ROTATION_CHAOS..INNER_ROTATION_CHAOS)
            };

            let min_height = if is_barrier { BARRIER_MIN_HEIGHT } else { 1 };
            let height = rng.random_range(min_height..=RING_MAX_HEIGHT[ring]);
            let drift = if is_barrier { 0.02 } else { 0.15 };
            let (x, z) = (angle.sin() * radius, angle.cos() * radius);

            for level in 0..height {
                let paint = ContainerPaint::POOL[rng.random_range(0..ContainerPaint::POOL.len())];
                placements.push(ContainerPlacement {
                    ring,
                    slot,
                    level,
                    translation: Vec3::new(
                        x + rng.random_range(-drift..drift),
                        GROUND_OFFSET + level as f32 * CONTAINER_SIZE.y,
                        z + rng.random_range(-drift..drift),
                    ),
                    yaw: yaw + rng.random_range(-0.05..0.05) + PI,
                    scale: rng.random_range(0.995..1.005),
                    paint,
                });
            }
        }
    }

    placements
}

/// Spawn the planned yard.
pub(super) fn spawn_containers(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    seed: u64,
) {
    let placements = plan_yard(seed);
    let mesh = meshes.add(Cuboid::from_size(CONTAINER_SIZE));
    let paints: Vec<(ContainerPaint, Handle<StandardMaterial>)> = ContainerPaint::ALL
        .iter()
        .map(|&paint| {
            let material = materials.add(StandardMaterial {
                base_color: paint.color(),
                perceptual_roughness: 0.6,
                metallic: 0.3,
                ..default()
            });
            (paint, material)
        })
        .collect();

    let mut grounded = 0;
    commands
        .spawn((Name::new("Containers"), Transform::default(), Visibility::default()))
        .with_children(|parent| {
            for placement in &placements {
                let Some((_, material)) = paints.iter().find(|(paint, _)| *paint == placement.paint)
                else {
                    continue;
                };
                let layers = if placement.is_grounded() {
                    grounded += 1;
                    CollisionLayers::default()
                } else {
                    CollisionLayers::new(GameLayer::Decor, LayerMask::NONE)
                };
                parent.spawn((
                    Mesh3d(mesh.clone()),
                    MeshMaterial3d(material.clone()),
                    placement.transform(),
                    RigidBody::Static,
                    Collider::cuboid(CONTAINER_SIZE.x, CONTAINER_SIZE.y, CONTAINER_SIZE.z),
                    layers,
                    Occluder,
                ));
            }
        });

    tracing::info!(
        "Container yard: {} containers, {grounded} on the ground layer (seed {seed})",
        placements.len()
    );
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_same_seed_same_layout() {
        assert_eq!(plan_yard(7), plan_yard(7));
        assert_ne!(plan_yard(7), plan_yard(8));
    }

    #[test]
    fn test_nothing_inside_minimum_radius() {
        for seed in 0..8 {
            for placement in plan_yard(seed) {
                let horizontal = Vec2::new(placement.translation.x, placement.translation.z).length();
                // Allow for the per-container drift.
                assert!(
                    horizontal >= MIN_INNER_RADIUS + CONTAINER_SIZE.z / 2.0 - 0.25,
                    "container at radius {horizontal}"
                );
            }
        }
    }

    #[test]
    fn test_stack_heights_per_ring() {
        for seed in 0..8 {
            let mut stacks: HashMap<(usize, usize), u32> = HashMap::new();
            for placement in plan_yard(seed) {
                *stacks.entry((placement.ring, placement.slot)).or_default() += 1;
            }
            for ((ring, _), height) in stacks {
                assert!(height <= RING_MAX_HEIGHT[ring]);
                if ring == 0 {
                    assert!(height >= BARRIER_MIN_HEIGHT);
                }
            }
        }
    }

    #[test]
    fn test_every_stack_has_one_ground_container() {
        let placements = plan_yard(3);
        let mut grounded: HashMap<(usize, usize), u32> = HashMap::new();
        for placement in &placements {
            grounded.entry((placement.ring, placement.slot)).or_default();
            if placement.is_grounded() {
                *grounded.entry((placement.ring, placement.slot)).or_default() += 1;
            }
        }
        assert!(grounded.values().all(|&count| count == 1));
    }

    #[test]
    fn test_inner_gaps_span_at_least_two_slots() {
        let mut saw_gap = false;
        for seed in 0..8 {
            let placements = plan_yard(seed);
            for ring in 1..RING_COUNT {
                let mut slots: Vec<usize> = placements
                    .iter()
                    .filter(|p| p.ring == ring && p.is_grounded())
                    .map(|p| p.slot)
                    .collect();
                slots.sort_unstable();
                for pair in slots.windows(2) {
                    let missing = pair[1] - pair[0] - 1;
                    assert!(
                        missing == 0 || (2..=4).contains(&missing),
                        "ring {ring} seed {seed}: gap of {missing} slots"
                    );
                    saw_gap |= missing > 0;
                }
            }
        }
        assert!(saw_gap);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn test_barrier_ring_is_full() {
        let barrier_slots = (TAU * YARD_RADIUS / (CONTAINER_SIZE.x + BARRIER_GAP)).floor() as usize;
        let placements = plan_yard(11);
        let ground_barrier = placements
            .iter()
            .filter(|p| p.ring == 0 && p.is_grounded())
            .count();
        assert_eq!(ground_barrier, barrier_slots);
    }
}
