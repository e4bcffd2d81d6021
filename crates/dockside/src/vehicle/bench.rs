//! Headless drive bench.
//!
//! Runs the same vehicle plugin as the app on a flat plane with a scripted
//! drive: settle, accelerate, brake, then a held left turn. One CSV telemetry
//! row per physics step goes to stdout and a summary goes to stderr.
//!
//! Run with: cargo run -p dockside --bin drive-bench -- [--engine-force N] [--drive-direction reverse]

#[cfg(target_family = "wasm")]
fn main() {}

#[cfg(not(target_family = "wasm"))]
mod bench {
    use std::f32::consts::PI;

    use avian3d::prelude::*;
    use bevy::{
        app::ScheduleRunnerPlugin,
        prelude::*,
        render::settings::{RenderCreation, WgpuSettings},
    };
    use clap::Parser;

    use dockside::{
        launch_params::{LaunchParams, parse_drive_direction, parse_engine_force},
        vehicle::{
            Chassis, DriveControls, VehiclePlugin, VehicleState,
            core::{CHASSIS_FORWARD, DriveDirection, DriveInput},
            telemetry::{StdoutTelemetryOutput, TelemetrySink},
        },
    };

    /// Fixed timestep for physics simulation (60 Hz).
    const FIXED_TIMESTEP: f64 = 1.0 / 60.0;

    /// Speed used for the acceleration milestone (m/s).
    const SPEED_MILESTONE: f32 = 10.0;

    /// Below this speed the car counts as stopped (m/s).
    const STOPPED_SPEED: f32 = 0.2;

    #[derive(Parser)]
    #[command(about = "Run the vehicle headless with a scripted drive")]
    struct BenchArgs {
        /// Engine force override in newtons.
        #[arg(long, value_parser = parse_engine_force)]
        engine_force: Option<f32>,

        /// Engine force sign (forward or reverse).
        #[arg(long, value_parser = parse_drive_direction, default_value = "forward")]
        drive_direction: DriveDirection,
    }

    /// Scripted drive phase.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) enum Phase {
        Settle,
        Accelerate,
        Brake,
        Turn,
    }

    impl Phase {
        /// Phases in order with their durations (s).
        const SCRIPT: [(Phase, f32); 4] = [
            (Phase::Settle, 2.0),
            (Phase::Accelerate, 6.0),
            (Phase::Brake, 3.0),
            (Phase::Turn, 6.0),
        ];

        /// Phase active at `elapsed` seconds, or `None` once the script ends.
        pub(crate) fn at(elapsed: f32) -> Option<Phase> {
            let mut end = 0.0;
            for (phase, duration) in Self::SCRIPT {
                end += duration;
                if elapsed < end {
                    return Some(phase);
                }
            }
            None
        }

        /// Keys held during this phase.
        pub(crate) fn input(self) -> DriveInput {
            match self {
                Phase::Settle => DriveInput::default(),
                Phase::Accelerate => DriveInput {
                    forward: true,
                    ..Default::default()
                },
                Phase::Brake => DriveInput {
                    brake: true,
                    ..Default::default()
                },
                Phase::Turn => DriveInput {
                    forward: true,
                    left: true,
                    ..Default::default()
                },
            }
        }
    }

    /// Measurements accumulated over the run.
    #[derive(Resource, Default)]
    struct BenchResults {
        mass: f32,
        settled_height: f32,
        settled_grounded: usize,
        top_speed: f32,
        time_to_milestone: Option<f32>,
        brake_start: Option<(f32, Vec3)>,
        stop: Option<(f32, f32)>,
        turn_start_heading: Option<f32>,
        turn_heading: f32,
        last_phase: Option<Phase>,
    }

    /// Spawn the flat test plane.
    fn setup_ground(mut commands: Commands) {
        commands.spawn((
            Name::new("Bench ground"),
            RigidBody::Static,
            Collider::cuboid(2000.0, 1.0, 2000.0),
            Transform::from_translation(Vec3::new(0.0, -0.5, 0.0)),
        ));
        eprintln!("# Drive bench: settle, accelerate, brake, turn");
    }

    /// Write this step's scripted input.
    fn apply_script(time: Res<Time>, mut controls: ResMut<DriveControls>) {
        if let Some(phase) = Phase::at(time.elapsed_secs()) {
            **controls = phase.input();
        }
    }

    /// Heading around +Y, increasing for a left turn.
    fn heading(rotation: Quat) -> f32 {
        let forward = rotation * CHASSIS_FORWARD;
        (-forward.z).atan2(forward.x)
    }

    /// Track per-phase metrics and finish once the script ends.
    fn measure(
        time: Res<Time>,
        mut results: ResMut<BenchResults>,
        query: Query<(&VehicleState, &Position, &Rotation), With<Chassis>>,
    ) {
        let Ok((state, position, rotation)) = query.single() else {
            return;
        };
        let elapsed = time.elapsed_secs();
        let Some(phase) = Phase::at(elapsed) else {
            print_summary(&results);
            std::process::exit(0);
        };

        if results.last_phase != Some(phase) {
            eprintln!("# t={elapsed:.2}s: {phase:?}");
            results.last_phase = Some(phase);
        }

        let speed = state.forward_speed.abs();
        results.mass = state.mass;

        match phase {
            Phase::Settle => {
                results.settled_height = position.y;
                results.settled_grounded = state.grounded_wheels;
            }
            Phase::Accelerate => {
                results.top_speed = results.top_speed.max(speed);
                if results.time_to_milestone.is_none() && speed >= SPEED_MILESTONE {
                    results.time_to_milestone = Some(elapsed - Phase::SCRIPT[0].1);
                }
            }
            Phase::Brake => {
                let (start_time, start_position) =
                    *results.brake_start.get_or_insert((elapsed, position.0));
                if results.stop.is_none() && speed < STOPPED_SPEED {
                    results.stop = Some((
                        elapsed - start_time,
                        position.0.distance(start_position),
                    ));
                }
            }
            Phase::Turn => {
                let current = heading(rotation.0);
                let start = *results.turn_start_heading.get_or_insert(current);
                let mut delta = current - start - results.turn_heading;
                // Unwrap across the ±π seam.
                while delta > PI {
                    delta -= 2.0 * PI;
                }
                while delta < -PI {
                    delta += 2.0 * PI;
                }
                results.turn_heading += delta;
            }
        }
    }

    fn print_summary(results: &BenchResults) {
        let turn_time = Phase::SCRIPT[3].1;
        eprintln!();
        eprintln!("# === Drive bench ===");
        eprintln!("# Mass: {:.1} kg", results.mass);
        eprintln!("# Settle:");
        eprintln!("#   Chassis height: {:.3} m", results.settled_height);
        eprintln!("#   Grounded wheels: {}/4", results.settled_grounded);
        eprintln!("# Accelerate:");
        eprintln!(
            "#   Top speed: {:.1} m/s ({:.1} km/h)",
            results.top_speed,
            results.top_speed * 3.6
        );
        match results.time_to_milestone {
            Some(time) => eprintln!("#   Time to {SPEED_MILESTONE:.0} m/s: {time:.2} s"),
            None => eprintln!("#   Time to {SPEED_MILESTONE:.0} m/s: (not reached)"),
        }
        eprintln!("# Brake:");
        match results.stop {
            Some((time, distance)) => {
                eprintln!("#   Stopped in {time:.2} s over {distance:.1} m");
            }
            None => eprintln!("#   Did not stop"),
        }
        eprintln!("# Turn:");
        eprintln!(
            "#   Heading change: {:.1}° ({:.1}°/s)",
            results.turn_heading.to_degrees(),
            results.turn_heading.to_degrees() / turn_time
        );
    }

    /// Entry point for the bench.
    pub fn run() {
        let args = BenchArgs::parse();

        App::new()
            // Headless plugins: DefaultPlugins without windowing, with headless rendering.
            .add_plugins(
                DefaultPlugins
                    .set(bevy::render::RenderPlugin {
                        render_creation: RenderCreation::Automatic(WgpuSettings {
                            backends: None,
                            ..default()
                        }),
                        ..default()
                    })
                    .disable::<bevy::winit::WinitPlugin>(),
            )
            .add_plugins(ScheduleRunnerPlugin::run_loop(
                std::time::Duration::from_secs_f64(FIXED_TIMESTEP),
            ))
            .add_plugins(PhysicsPlugins::default())
            .insert_resource(Gravity::default())
            .insert_resource(Time::<Fixed>::from_seconds(FIXED_TIMESTEP))
            .insert_resource(LaunchParams {
                engine_force: args.engine_force,
                drive_direction: args.drive_direction,
                ..Default::default()
            })
            // The same vehicle systems as the app.
            .add_plugins(VehiclePlugin)
            .insert_resource(TelemetrySink(Some(Box::new(StdoutTelemetryOutput))))
            .init_resource::<BenchResults>()
            .add_systems(Startup, setup_ground)
            .add_systems(FixedFirst, apply_script)
            .add_systems(FixedPostUpdate, measure.after(PhysicsSystems::Last))
            .run();
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_script_phases() {
            assert_eq!(Phase::at(0.0), Some(Phase::Settle));
            assert_eq!(Phase::at(2.5), Some(Phase::Accelerate));
            assert_eq!(Phase::at(8.5), Some(Phase::Brake));
            assert_eq!(Phase::at(11.5), Some(Phase::Turn));
            assert_eq!(Phase::at(17.0), None);
        }

        #[test]
        fn test_phase_inputs() {
            assert!(!Phase::Settle.input().is_driving());
            assert!(Phase::Accelerate.input().forward);
            assert!(Phase::Brake.input().brake);
            let turn = Phase::Turn.input();
            assert!(turn.forward && turn.left && !turn.right);
        }

        #[test]
        fn test_heading_increases_turning_left() {
            let straight = heading(Quat::IDENTITY);
            let left = heading(Quat::from_rotation_y(0.3));
            assert!(straight.abs() < 1e-6);
            assert!(left > straight);
        }
    }
}

#[cfg(not(target_family = "wasm"))]
fn main() {
    bench::run();
}
