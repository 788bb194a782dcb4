//! Rep Kinematics Engine
//!
//! Demo binary: runs a synthetic dumbbell curl through a session, or loads an
//! exercise configuration from the JSON file given as the first argument and
//! runs the same synthetic landmarks against it.
//!
//! This is the entry point for standalone binaries. For library use, see lib.rs.

use std::env;
use std::f64::consts::PI;

use anyhow::{Context, Result};
use log::info;

use rep_kinematics::{
    AthleteConfig, ExerciseConfig, ExerciseSession, Landmark, PoseProvider, Side, Units,
};

const FPS: f64 = 30.0;
const FOREARM_PX: f64 = 300.0;

/// Landmarks of a left-side curl at a given elbow angle.
struct SyntheticCurl;

impl PoseProvider for SyntheticCurl {
    type Frame = f64;

    fn locate(&mut self, elbow_angle_deg: &f64) -> Vec<Landmark> {
        let (elbow_x, elbow_y) = (640.0, 500.0);
        let theta = elbow_angle_deg.to_radians();
        vec![
            Landmark::new(11, elbow_x as i32, (elbow_y - 280.0) as i32),
            Landmark::new(13, elbow_x as i32, elbow_y as i32),
            Landmark::new(
                15,
                (elbow_x + FOREARM_PX * theta.sin()).round() as i32,
                (elbow_y - FOREARM_PX * theta.cos()).round() as i32,
            ),
        ]
    }
}

fn default_config() -> ExerciseConfig {
    let athlete = AthleteConfig {
        height: 1.78,
        body_weight: 78.0,
        limb_length: 0.32,
        load: 12.5,
        units: Units::Metric,
        side: Side::Left,
    };
    ExerciseConfig::new(
        "Dumbbell curl",
        "biceps",
        athlete,
        &[
            "torque",
            "power",
            "speed",
            "time under tension",
            "angles",
            "velocity lost",
            "tempo",
            "resistance profile",
        ],
    )
}

/// Five reps that slow down as the set goes on.
fn synthetic_set() -> Vec<(f64, f64)> {
    let mut frames = Vec::new();
    let mut t = 0.0;
    for rep in 0..5 {
        let period_s = 2.0 + 0.4 * rep as f64;
        let count = (period_s * FPS) as usize;
        for i in 0..count {
            let phase = 2.0 * PI * i as f64 / count as f64;
            frames.push((100.0 + 50.0 * phase.cos(), t));
            t += 1.0 / FPS;
        }
    }
    frames
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => ExerciseConfig::from_path(&path)
            .with_context(|| format!("Failed to load exercise configuration from {path}"))?,
        None => default_config(),
    };
    info!("Analysing '{}'", config.name);

    let session = ExerciseSession::new(config).context("Invalid exercise configuration")?;
    let report = session.run(&mut SyntheticCurl, synthetic_set());

    println!("{}", report.render_text());
    if let Some(json) = report.profile_json()? {
        println!("{json}");
    }
    Ok(())
}
