//! Vehicle physics telemetry logging.
//!
//! Outputs CSV data for analysis. The drive bench writes to stdout; the viewer
//! writes to a file when launched with `--telemetry`, restarting the file each
//! time a vehicle is mounted.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use avian3d::prelude::*;
use bevy::prelude::*;

use super::{
    components::{Chassis, DriveControls, VehicleState},
    core::DriveInput,
};

/// Snapshot of the vehicle state for one physics step.
pub struct TelemetrySnapshot {
    pub elapsed: f32,
    pub dt: f32,
    pub input: DriveInput,
    pub steering: f32,
    pub engine_force: f32,
    pub brake: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_vel: Vec3,
    pub angular_vel: Vec3,
    pub forward_speed: f32,
    pub grounded_wheels: usize,
    pub suspension_lengths: [f32; 4],
    pub suspension_forces: [f32; 4],
}

/// Trait for telemetry output destinations.
pub trait TelemetryOutput: Send + Sync {
    /// Write the CSV header.
    fn write_header(&mut self, header: &str);
    /// Write a data row.
    fn write_row(&mut self, row: &str);
}

/// File-based output.
pub struct FileTelemetryOutput {
    writer: BufWriter<File>,
}

impl FileTelemetryOutput {
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl TelemetryOutput for FileTelemetryOutput {
    fn write_header(&mut self, header: &str) {
        // A remount restarts the file.
        let _ = self.writer.flush();
        let _ = self.writer.get_mut().set_len(0);
        let _ = io::Seek::rewind(self.writer.get_mut());
        let _ = writeln!(self.writer, "{header}");
    }

    fn write_row(&mut self, row: &str) {
        let _ = writeln!(self.writer, "{row}");
    }
}

/// Stdout output for the drive bench.
pub struct StdoutTelemetryOutput;

impl TelemetryOutput for StdoutTelemetryOutput {
    fn write_header(&mut self, header: &str) {
        println!("{header}");
    }

    fn write_row(&mut self, row: &str) {
        println!("{row}");
    }
}

/// Macro to define CSV schema and generate telemetry functions.
///
/// This generates `reset_telemetry_to()` and `emit_telemetry_to()` from a
/// single schema definition, keeping column names and formats in sync.
macro_rules! define_telemetry {
    (
        columns: { $( $name:ident : $fmt:literal ),* $(,)? },
        prelude: |$snapshot:ident| { $( $prelude:stmt );* $(;)? },
        row_values: { $( $val:expr ),* $(,)? }
    ) => {
        /// CSV header string.
        const CSV_HEADER: &str = concat!( $( stringify!($name), "," ),* );

        /// Reset telemetry (write header) to the specified output.
        pub fn reset_telemetry_to(output: &mut dyn TelemetryOutput) {
            output.write_header(CSV_HEADER.trim_end_matches(','));
        }

        /// Write telemetry data to the specified output.
        pub fn emit_telemetry_to($snapshot: &TelemetrySnapshot, output: &mut dyn TelemetryOutput) {
            $( $prelude )*

            let line = format!( concat!( $( $fmt, "," ),* ), $( $val ),* );
            let line = line.trim_end_matches(',');

            output.write_row(line);
        }
    };
}

define_telemetry! {
    columns: {
        t: "{:.4}",
        dt: "{:.5}",
        fwd: "{}",
        back: "{}",
        left: "{}",
        right: "{}",
        brake: "{}",
        engine: "{:.1}",
        brake_force: "{:.1}",
        steer_deg: "{:.2}",
        speed: "{:.3}",
        kmh: "{:.1}",
        grounded: "{}",
        pos_x: "{:.3}",
        pos_y: "{:.3}",
        pos_z: "{:.3}",
        yaw_deg: "{:.2}",
        pitch_deg: "{:.2}",
        roll_deg: "{:.2}",
        vel_y: "{:.3}",
        ang_y: "{:.3}",
        susp_fl: "{:.3}",
        susp_fr: "{:.3}",
        susp_rl: "{:.3}",
        susp_rr: "{:.3}",
        force_fl: "{:.0}",
        force_fr: "{:.0}",
        force_rl: "{:.0}",
        force_rr: "{:.0}",
    },
    prelude: |t| {
        let (yaw, pitch, roll) = t.rotation.to_euler(EulerRot::YZX);
    },
    row_values: {
        t.elapsed,
        t.dt,
        u8::from(t.input.forward),
        u8::from(t.input.backward),
        u8::from(t.input.left),
        u8::from(t.input.right),
        u8::from(t.input.brake),
        t.engine_force,
        t.brake,
        t.steering.to_degrees(),
        t.forward_speed,
        t.forward_speed * 3.6,
        t.grounded_wheels,
        t.position.x,
        t.position.y,
        t.position.z,
        yaw.to_degrees(),
        pitch.to_degrees(),
        roll.to_degrees(),
        t.linear_vel.y,
        t.angular_vel.y,
        t.suspension_lengths[0],
        t.suspension_lengths[1],
        t.suspension_lengths[2],
        t.suspension_lengths[3],
        t.suspension_forces[0],
        t.suspension_forces[1],
        t.suspension_forces[2],
        t.suspension_forces[3],
    }
}

/// Optional telemetry destination for the viewer.
#[derive(Resource, Default)]
pub struct TelemetrySink(pub Option<Box<dyn TelemetryOutput>>);

/// Build a snapshot from ECS components.
#[allow(clippy::too_many_arguments)]
pub fn snapshot_from_components(
    elapsed: f32,
    dt: f32,
    input: DriveInput,
    state: &VehicleState,
    position: &Position,
    rotation: &Rotation,
    linear_velocity: &LinearVelocity,
    angular_velocity: &AngularVelocity,
) -> TelemetrySnapshot {
    TelemetrySnapshot {
        elapsed,
        dt,
        input,
        steering: state.steering,
        engine_force: state.engine_force,
        brake: state.brake,
        position: position.0,
        rotation: rotation.0,
        linear_vel: linear_velocity.0,
        angular_vel: angular_velocity.0,
        forward_speed: state.forward_speed,
        grounded_wheels: state.grounded_wheels,
        suspension_lengths: state.suspension_lengths,
        suspension_forces: state.suspension_forces,
    }
}

/// Write one telemetry row per chassis per fixed step.
#[allow(clippy::type_complexity)]
pub fn emit_telemetry_system(
    time: Res<Time>,
    controls: Res<DriveControls>,
    mut sink: ResMut<TelemetrySink>,
    query: Query<
        (
            &VehicleState,
            &Position,
            &Rotation,
            &LinearVelocity,
            &AngularVelocity,
        ),
        With<Chassis>,
    >,
) {
    let Some(output) = sink.0.as_deref_mut() else {
        return;
    };
    for (state, position, rotation, linear_velocity, angular_velocity) in &query {
        let snapshot = snapshot_from_components(
            time.elapsed_secs(),
            time.delta_secs(),
            **controls,
            state,
            position,
            rotation,
            linear_velocity,
            angular_velocity,
        );
        emit_telemetry_to(&snapshot, output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Capture {
        lines: Vec<String>,
    }

    impl TelemetryOutput for Capture {
        fn write_header(&mut self, header: &str) {
            self.lines.clear();
            self.lines.push(header.to_string());
        }

        fn write_row(&mut self, row: &str) {
            self.lines.push(row.to_string());
        }
    }

    #[test]
    fn test_header_and_row_column_counts_match() {
        let mut capture = Capture::default();
        reset_telemetry_to(&mut capture);
        let snapshot = TelemetrySnapshot {
            elapsed: 1.0,
            dt: 1.0 / 60.0,
            input: DriveInput {
                forward: true,
                ..Default::default()
            },
            steering: 0.1,
            engine_force: 1500.0,
            brake: 0.0,
            position: Vec3::new(1.0, 0.8, -2.0),
            rotation: Quat::IDENTITY,
            linear_vel: Vec3::X,
            angular_vel: Vec3::ZERO,
            forward_speed: 1.0,
            grounded_wheels: 4,
            suspension_lengths: [0.3; 4],
            suspension_forces: [2450.0; 4],
        };
        emit_telemetry_to(&snapshot, &mut capture);

        assert_eq!(capture.lines.len(), 2);
        let header_columns = capture.lines[0].split(',').count();
        let row_columns = capture.lines[1].split(',').count();
        assert_eq!(header_columns, row_columns);
        assert!(capture.lines[0].starts_with("t,dt,fwd"));
        assert!(!capture.lines[0].ends_with(','));
    }
}
