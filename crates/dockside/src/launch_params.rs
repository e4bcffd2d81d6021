//! Launch parameter parsing.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use std::path::PathBuf;

use bevy::prelude::*;

use crate::vehicle::core::DriveDirection;

/// Default container layout seed.
pub const DEFAULT_SEED: u64 = 2_438;
/// Default number of rain drops.
pub const DEFAULT_RAIN_DROPS: u32 = 10_000;

/// Launch parameters for the viewer.
#[derive(Resource, Debug, Clone)]
pub struct LaunchParams {
    /// Seed for the container yard layout.
    pub seed: u64,
    /// Number of rain drops. Zero disables rain.
    pub rain_drops: u32,
    /// Start with the debug UI hidden.
    pub hide_ui: bool,
    /// Start with collider gizmos visible.
    pub physics_debug: bool,
    /// Engine force override (N).
    pub engine_force: Option<f32>,
    /// Engine force sign.
    pub drive_direction: DriveDirection,
    /// CSV file receiving one telemetry row per physics step.
    pub telemetry: Option<PathBuf>,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            rain_drops: DEFAULT_RAIN_DROPS,
            hide_ui: false,
            physics_debug: false,
            engine_force: None,
            drive_direction: DriveDirection::default(),
            telemetry: None,
        }
    }
}

/// Parse a drive direction name.
pub fn parse_drive_direction(s: &str) -> Result<DriveDirection, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "forward" | "fwd" | "1" => Ok(DriveDirection::Forward),
        "reverse" | "rev" | "-1" => Ok(DriveDirection::Reverse),
        other => Err(format!("expected 'forward' or 'reverse', got '{other}'")),
    }
}

/// Parse an engine force, rejecting negative and non-finite values.
pub fn parse_engine_force(s: &str) -> Result<f32, String> {
    let force = s
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("invalid engine force: {e}"))?;
    if !force.is_finite() || force < 0.0 {
        return Err(format!("engine force must be a non-negative number, got {force}"));
    }
    Ok(force)
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(about = "Drive a suspension-modelled car around a rainy container yard")]
    struct CliArgs {
        /// Seed for the container yard layout.
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Number of rain drops.
        #[arg(long, default_value_t = DEFAULT_RAIN_DROPS)]
        rain_drops: u32,

        /// Disable rain entirely.
        #[arg(long)]
        no_rain: bool,

        /// Start with the debug UI hidden (toggle with Q).
        #[arg(long)]
        hide_ui: bool,

        /// Start with collider gizmos visible.
        #[arg(long)]
        physics_debug: bool,

        /// Engine force override in newtons.
        #[arg(long, value_parser = parse_engine_force)]
        engine_force: Option<f32>,

        /// Engine force sign (forward or reverse).
        #[arg(long, value_parser = parse_drive_direction, default_value = "forward")]
        drive_direction: DriveDirection,

        /// Write per-step vehicle telemetry CSV to this file.
        #[arg(long)]
        telemetry: Option<PathBuf>,
    }

    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        LaunchParams {
            seed: args.seed,
            rain_drops: if args.no_rain { 0 } else { args.rain_drops },
            hide_ui: args.hide_ui,
            physics_debug: args.physics_debug,
            engine_force: args.engine_force,
            drive_direction: args.drive_direction,
            telemetry: args.telemetry,
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drive_direction() {
        assert_eq!(parse_drive_direction("forward"), Ok(DriveDirection::Forward));
        assert_eq!(parse_drive_direction(" Reverse "), Ok(DriveDirection::Reverse));
        assert_eq!(parse_drive_direction("-1"), Ok(DriveDirection::Reverse));
        assert!(parse_drive_direction("sideways").is_err());
    }

    #[test]
    fn test_parse_engine_force() {
        assert_eq!(parse_engine_force("2200"), Ok(2200.0));
        assert!(parse_engine_force("-5").is_err());
        assert!(parse_engine_force("fast").is_err());
        assert!(parse_engine_force("inf").is_err());
    }
}
