//! Full measurement pipeline: frames → timer → aggregator → record →
//! comparison → rendered report, with no platform hardware involved.

use std::path::Path;

use frame_source::{FrameSource, SyntheticPattern, SyntheticSource};
use metrics::Aggregator;
use record::RunResultRecord;
use report::{compare, render, Advantage, ReportOptions};
use telemetry::FrameTimer;
use testsupport::fixed_generated_at;

fn run_once(platform: &str, stages: &[&str], frames: u64) -> RunResultRecord {
    let mut source = SyntheticSource::new(32, 24, SyntheticPattern::Gradient);
    let mut agg = Aggregator::new();

    for _ in 0..frames {
        let frame = source.next_frame().unwrap().unwrap();
        let mut timer = FrameTimer::start(frame.meta.frame_idx);
        for stage in stages {
            timer.begin_stage(stage).unwrap();
            // touch the buffer in place of real work
            let sum: u64 = frame.as_slice().iter().map(|b| *b as u64).sum();
            std::hint::black_box(sum);
            timer.end_stage(stage).unwrap();
        }
        agg.observe(timer.finalize_frame().unwrap()).unwrap();
    }

    let metrics = agg.finish();
    RunResultRecord::from_metrics(platform, "accelerated", "yolov8n", &metrics, fixed_generated_at())
}

#[test]
fn test_pipeline_to_report() {
    let a = run_once("discrete", &["h2d", "compute", "d2h"], 20);
    let b = run_once("uma", &["compute"], 20);

    assert_eq!(a.frame_count, 20);
    assert!(a.fps > 0.0);
    assert!(a.stages_ms.contains_key("h2d"));
    assert!(!b.stages_ms.contains_key("h2d"));

    let cmp = compare(&a, &b).unwrap();
    assert!(cmp.only_in_a.contains(&"stages_ms.h2d".to_string()));
    assert!(cmp.metric("stages_ms.compute").is_some());

    let html = render(&cmp, &ReportOptions::new("pipeline", fixed_generated_at()));
    assert!(!html.is_empty());
}

#[test]
fn test_persisted_records_survive_comparison() {
    let dir = tempfile::tempdir().unwrap();
    let path_a = dir.path().join("a.json");
    let path_b = dir.path().join("b.json");

    run_once("discrete", &["compute"], 5).save(&path_a).unwrap();
    run_once("uma", &["compute"], 5).save(&path_b).unwrap();

    let a = RunResultRecord::load(Path::new(&path_a)).unwrap();
    let b = RunResultRecord::load(Path::new(&path_b)).unwrap();
    let cmp = compare(&a, &b).unwrap();

    let fps = cmp.metric("fps").unwrap();
    assert!(matches!(
        fps.advantage,
        Advantage::A | Advantage::B | Advantage::Tie
    ));
}
