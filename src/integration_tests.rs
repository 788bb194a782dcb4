/// Integration tests for the complete exercise session
/// Feeds synthetic landmark streams for realistic lifts through
/// `ExerciseSession` and checks the rep and set records end to end.

#[cfg(test)]
mod integration_tests {
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    use crate::config::{AthleteConfig, ExerciseConfig, Units};
    use crate::export::SessionReport;
    use crate::pipeline::*;
    use crate::profile::PhaseThresholds;
    use crate::types::*;
    use crate::KinematicsError;

    const FPS: f64 = 30.0;
    const CADENCE: usize = 4;

    /// The reference curl: one full rep at a four-frame sampling cadence.
    const CURL_ANGLES: [f64; 13] = [
        140.0, 130.0, 120.0, 110.0, 95.0, 80.0, 70.0, 60.0, 70.0, 85.0, 100.0, 120.0, 140.0,
    ];

    fn athlete(side: Side) -> AthleteConfig {
        AthleteConfig {
            height: 1.8,
            body_weight: 80.0,
            limb_length: 0.3,
            load: 12.0,
            units: Units::Metric,
            side,
        }
    }

    /// Helper: left-side curl landmarks at an elbow angle (upper arm vertical).
    fn curl_landmarks(elbow_angle_deg: f64) -> Vec<Landmark> {
        let theta = elbow_angle_deg.to_radians();
        vec![
            Landmark::new(11, 5000, 2000),
            Landmark::new(13, 5000, 5000),
            Landmark::new(
                15,
                (5000.0 + 3000.0 * theta.sin()).round() as i32,
                (5000.0 - 3000.0 * theta.cos()).round() as i32,
            ),
        ]
    }

    /// Helper: left-side squat landmarks at a knee angle (shin vertical).
    fn squat_landmarks(knee_angle_deg: f64) -> Vec<Landmark> {
        let theta = knee_angle_deg.to_radians();
        let hip_x = (5000.0 - 2000.0 * theta.sin()).round() as i32;
        let hip_y = (6000.0 + 2000.0 * theta.cos()).round() as i32;
        vec![
            Landmark::new(11, hip_x, hip_y - 3000),
            Landmark::new(23, hip_x, hip_y),
            Landmark::new(25, 5000, 6000),
            Landmark::new(27, 5000, 8000),
        ]
    }

    /// Helper: right arm seen from the front, raised `angle` from hanging.
    fn raise_landmarks(arm_angle_deg: f64) -> Vec<Landmark> {
        let theta = arm_angle_deg.to_radians();
        let at = |length: f64| {
            (
                (5000.0 + length * theta.sin()).round() as i32,
                (5000.0 + length * theta.cos()).round() as i32,
            )
        };
        let (elbow_x, elbow_y) = at(1500.0);
        let (wrist_x, wrist_y) = at(3000.0);
        vec![
            Landmark::new(12, 5000, 5000),
            Landmark::new(14, elbow_x, elbow_y),
            Landmark::new(16, wrist_x, wrist_y),
        ]
    }

    /// Each angle held for one sampling interval.
    fn held(angles: &[f64]) -> Vec<f64> {
        angles
            .iter()
            .flat_map(|&a| std::iter::repeat(a).take(CADENCE))
            .collect()
    }

    /// Cosine reps between `low` and `high`, one period per entry.
    fn cosine_reps(periods_s: &[f64], low: f64, high: f64) -> Vec<f64> {
        let mid = (low + high) / 2.0;
        let amp = (high - low) / 2.0;
        periods_s
            .iter()
            .flat_map(|&period| {
                let count = (period * FPS) as usize;
                (0..count).map(move |i| mid + amp * (2.0 * PI * i as f64 / count as f64).cos())
            })
            .chain(std::iter::once(high))
            .collect()
    }

    /// Constant-speed reps: `half_frames` down from `high` to `low`, then back.
    fn triangle_reps(periods: usize, half_frames: usize, low: f64, high: f64) -> Vec<f64> {
        let step = (high - low) / half_frames as f64;
        (0..=periods * 2 * half_frames)
            .map(|f| {
                let p = f % (2 * half_frames);
                if p <= half_frames {
                    high - step * p as f64
                } else {
                    low + step * (p - half_frames) as f64
                }
            })
            .collect()
    }

    fn run(
        config: ExerciseConfig,
        angles: &[f64],
        landmarks: impl Fn(f64) -> Vec<Landmark>,
    ) -> (SessionReport, Vec<FrameSnapshot>) {
        let mut session = ExerciseSession::new(config).unwrap();
        let snapshots = angles
            .iter()
            .enumerate()
            .filter_map(|(i, &a)| session.process_frame(&landmarks(a), i as f64 / FPS))
            .collect();
        (session.finish(), snapshots)
    }

    fn number(lines: Option<&MetricLine>) -> f64 {
        lines.and_then(MetricLine::as_number).unwrap()
    }

    // ============================================================================
    // CURL
    // ============================================================================

    #[test]
    fn test_reference_curl_yields_one_rep() {
        let config = ExerciseConfig::new(
            "Dumbbell curl",
            "biceps",
            athlete(Side::Left),
            &["torque", "tempo", "angles"],
        );
        let (report, snapshots) = run(config, &held(&CURL_ANGLES), curl_landmarks);

        assert_eq!(report.rep_count, 1.0);
        assert_eq!(report.reps.len(), 1);

        let phase_changes: Vec<(MovementPhase, MovementPhase)> = snapshots
            .iter()
            .flat_map(|s| s.events.iter())
            .filter_map(|e| match e {
                SegmentEvent::PhaseChanged { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            phase_changes,
            vec![
                (MovementPhase::Shortening, MovementPhase::Lengthening),
                (MovementPhase::Lengthening, MovementPhase::Shortening),
            ]
        );

        let rep = &report.reps[0];
        assert_eq!(rep.label, "Rep #1");
        assert!(rep.failures.is_empty(), "{:?}", rep.failures);
        assert!(number(rep.line("Torque")) > 0.0);
        assert_abs_diff_eq!(number(rep.line("Min angle")), 60.0, epsilon = 0.05);
        assert_abs_diff_eq!(number(rep.line("Max angle")), 140.0, epsilon = 0.05);
        assert!(number(rep.line("Concentric time")) > 0.0);
        assert!(number(rep.line("Eccentric time")) > 0.0);
    }

    #[test]
    fn test_extremes_held_between_ticks() {
        let config = ExerciseConfig::new("Curl", "biceps", athlete(Side::Left), &["angles"]);
        // The 60 degree block dips to 45 on the three frames after its tick.
        let mut angles = held(&CURL_ANGLES);
        for angle in &mut angles[29..32] {
            *angle = 45.0;
        }
        let (report, snapshots) = run(config, &angles, curl_landmarks);

        assert_eq!(report.rep_count, 1.0);
        assert!(snapshots[29..32].iter().all(|s| !s.ticked));
        assert_abs_diff_eq!(number(report.reps[0].line("Min angle")), 45.0, epsilon = 0.05);
        assert_abs_diff_eq!(number(report.set.line("Min angle")), 45.0, epsilon = 0.05);
    }

    #[test]
    fn test_rep_record_delivered_on_boundary_frame() {
        let config = ExerciseConfig::new("Curl", "biceps", athlete(Side::Left), &["torque"]);
        let (_, snapshots) = run(config, &held(&CURL_ANGLES), curl_landmarks);

        let boundary: Vec<&FrameSnapshot> =
            snapshots.iter().filter(|s| !s.completed.is_empty()).collect();
        assert_eq!(boundary.len(), 1);
        assert!(boundary[0].ticked);
        assert_eq!(boundary[0].rep_count, 1.0);
        assert!(boundary[0]
            .events
            .contains(&SegmentEvent::RepCompleted { rep: 1 }));
    }

    #[test]
    fn test_detection_gaps_do_not_count_reps() {
        let config = ExerciseConfig::new("Curl", "biceps", athlete(Side::Left), &["torque"]);
        let mut session = ExerciseSession::new(config).unwrap();

        let mut t = 0.0;
        for angle in held(&CURL_ANGLES) {
            // Lost tracking for two frames after every frame.
            session.process_frame(&curl_landmarks(angle), t);
            session.process_frame(&[], t + 0.01);
            session.process_frame(&[], t + 0.02);
            t += 1.0 / FPS;
        }
        let report = session.finish();
        assert_eq!(report.rep_count, 1.0);
        assert_eq!(report.frames.skipped, 2 * report.frames.processed);
    }

    #[test]
    fn test_fatiguing_set() {
        let config = ExerciseConfig::new(
            "Dumbbell curl",
            "biceps",
            athlete(Side::Left),
            &[
                "torque",
                "power",
                "speed",
                "work",
                "time under tension",
                "angles",
                "velocity lost",
                "resistance profile",
            ],
        );
        let angles = cosine_reps(&[2.0, 2.5, 3.0, 4.0], 50.0, 150.0);
        let (report, snapshots) = run(config, &angles, curl_landmarks);

        assert_eq!(report.rep_count, 4.0);
        let labels: Vec<&str> = report.reps.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Rep #1", "Rep #2", "Rep #3", "Rep #4"]);
        for rep in &report.reps {
            assert!(rep.failures.is_empty(), "{}: {:?}", rep.label, rep.failures);
            assert!(number(rep.line("Work")) > 0.0);
        }

        // Slower reps lose velocity.
        let first = number(report.reps[0].line("Conc. velocity"));
        let last = number(report.reps[3].line("Conc. velocity"));
        assert!(last < first);
        let lost = number(report.set.line("Velocity lost"));
        assert_abs_diff_eq!(lost, ((first - last) / first * 100.0 * 100.0).round() / 100.0, epsilon = 0.011);

        // Forearm never closer than 30 degrees to vertical: always under tension.
        let first_ts = snapshots.first().unwrap().timestamp_s;
        let last_ts = snapshots.last().unwrap().timestamp_s;
        assert_abs_diff_eq!(
            number(report.set.line("Time under significant tension")),
            last_ts - first_ts,
            epsilon = 1e-3
        );

        assert_abs_diff_eq!(number(report.set.line("Min angle")), 50.0, epsilon = 0.05);
        assert_abs_diff_eq!(number(report.set.line("Max angle")), 150.0, epsilon = 0.05);

        let profile = report.resistance_profile.as_ref().unwrap();
        assert!(!profile.is_empty());
        assert_eq!(profile.angles.len(), profile.torques.len());
        assert!(profile.torques.iter().all(|&t| t > 0.0));
    }

    #[test]
    fn test_symmetric_motion_has_matching_phase_speeds() {
        let config = ExerciseConfig::new("Curl", "biceps", athlete(Side::Left), &["speed"]);
        // 100 degrees in 24 frames each way: 125 deg/s throughout.
        let angles = triangle_reps(3, 24, 50.0, 150.0);
        let (report, _) = run(config, &angles, curl_landmarks);
        let expected = 125.0_f64.to_radians();

        assert_eq!(report.reps.len(), 3);
        for rep in &report.reps {
            assert!(rep.failures.is_empty(), "{}: {:?}", rep.label, rep.failures);
            let conc = number(rep.line("Conc. velocity"));
            let ecc = number(rep.line("Ecc. velocity"));
            assert_abs_diff_eq!(conc, expected, epsilon = 0.01);
            assert_abs_diff_eq!(ecc, expected, epsilon = 0.01);
        }
    }

    #[test]
    fn test_imperial_matches_metric() {
        let mut imperial = athlete(Side::Left);
        imperial.units = Units::Imperial;
        imperial.limb_length = 12.0;
        imperial.load = 25.0;

        let mut metric = athlete(Side::Left);
        metric.limb_length = 0.3048;
        metric.load = 11.339_8;

        let angles = held(&CURL_ANGLES);
        let (a, _) = run(
            ExerciseConfig::new("Curl", "biceps", imperial, &["torque"]),
            &angles,
            curl_landmarks,
        );
        let (b, _) = run(
            ExerciseConfig::new("Curl", "biceps", metric, &["torque"]),
            &angles,
            curl_landmarks,
        );
        assert_abs_diff_eq!(
            number(a.reps[0].line("Torque")),
            number(b.reps[0].line("Torque")),
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_hysteresis_override() {
        let mut config = ExerciseConfig::new("Curl", "biceps", athlete(Side::Left), &["torque"]);
        config.thresholds = Some(PhaseThresholds::Hysteresis {
            low: 80.0,
            high: 100.0,
        });
        let angles = cosine_reps(&[2.0, 2.0, 2.0], 50.0, 150.0);
        let (report, _) = run(config, &angles, curl_landmarks);
        // Reversals at each bottom and at the two inner tops.
        assert_eq!(report.rep_count, 2.5);
        assert_eq!(report.reps.len(), 2);
    }

    // ============================================================================
    // SQUAT
    // ============================================================================

    #[test]
    fn test_squat_depth_per_rep() {
        let mut config = ExerciseConfig::new(
            "Back squat",
            "quadriceps",
            athlete(Side::Left),
            &["parallel", "torque", "angle with gravity"],
        );
        config.athlete.load = 60.0;
        config.thresholds = Some(PhaseThresholds::Crossing {
            start: 140.0,
            end: 120.0,
        });

        // Deep rep to 70 degrees, then a shallow rep to 110 degrees.
        let mut angles = cosine_reps(&[3.0], 70.0, 170.0);
        angles.extend(cosine_reps(&[3.0], 110.0, 170.0));
        let (report, _) = run(config, &angles, squat_landmarks);

        assert_eq!(report.reps.len(), 2);
        let depth: Vec<MetricValue> = report
            .reps
            .iter()
            .map(|r| r.line("Parallel").unwrap().value)
            .collect();
        assert_eq!(depth, vec![MetricValue::Flag(true), MetricValue::Flag(false)]);

        for rep in &report.reps {
            assert!(rep.line("Torque").is_some());
            assert_eq!(rep.failures.len(), 1);
            assert_eq!(rep.failures[0].measure, Measure::GravityAngle);
        }
        assert_eq!(report.set.failures.len(), 1);
    }

    #[test]
    fn test_parallel_rejected_for_curl() {
        let config = ExerciseConfig::new("Curl", "biceps", athlete(Side::Left), &["parallel"]);
        let err = ExerciseSession::new(config).unwrap_err();
        assert!(err.is_configuration_error());
    }

    // ============================================================================
    // FRONT VIEW
    // ============================================================================

    #[test]
    fn test_front_view_lateral_raise() {
        let mut config = ExerciseConfig::new(
            "Lateral raise",
            "deltoids",
            athlete(Side::Front),
            &["angles", "angle with gravity", "torque"],
        );
        config.right_side = true;
        let angles = held(&[20.0, 40.0, 60.0, 85.0, 105.0, 110.0, 95.0, 75.0, 50.0, 20.0]);
        let (report, _) = run(config, &angles, raise_landmarks);

        assert_eq!(report.rep_count, 1.0);
        let rep = &report.reps[0];
        assert!(rep.failures.is_empty(), "{:?}", rep.failures);
        assert_abs_diff_eq!(number(rep.line("Max angle")), 110.0, epsilon = 0.05);
        assert_abs_diff_eq!(number(rep.line("Max angle with gravity")), 110.0, epsilon = 0.05);
    }

    #[test]
    fn test_front_view_lower_body_rejected() {
        let config = ExerciseConfig::new("Back squat", "glutes", athlete(Side::Back), &["torque"]);
        assert!(matches!(
            ExerciseSession::new(config),
            Err(KinematicsError::UnsupportedViewingSide { .. })
        ));
    }

    // ============================================================================
    // REPORT
    // ============================================================================

    #[test]
    fn test_report_export() {
        let config = ExerciseConfig::new(
            "Dumbbell curl",
            "biceps",
            athlete(Side::Left),
            &["torque", "time under tension"],
        );
        let (report, _) = run(config, &held(&CURL_ANGLES), curl_landmarks);

        let text = report.render_text();
        assert!(text.contains("Rep #1\n  Torque: "));
        assert!(text.contains("Time under significant tension: "));

        let restored = SessionReport::from_json(&report.to_json().unwrap()).unwrap();
        assert_eq!(restored, report);
    }
}
