//! Benchmark Runner
//!
//! Executes one benchmark run on one platform: frame source → timed
//! stage chain → metrics aggregation → persisted run record. Which
//! stages exist (PCIe transfer stages, sync, ...) comes from the TOML
//! config, so discrete-GPU and unified-memory platforms share this one
//! binary and only differ in configuration.

use anyhow::{anyhow, Result};
use chrono::Utc;
use common_io::Stage;
use config::{PatternKind, RunConfig, SourceKind};
use frame_source::{FrameSource, ImageDirSource, SyntheticPattern, SyntheticSource};
use metrics::Aggregator;
use record::RunResultRecord;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sysmon::ResourceSampler;
use telemetry::FrameTimer;

mod workload;
use workload::Workload;

fn build_source(config: &RunConfig) -> Result<Box<dyn FrameSource>> {
    match config.source.kind {
        SourceKind::Synthetic => {
            let pattern = match config.source.pattern {
                PatternKind::Gradient => SyntheticPattern::Gradient,
                PatternKind::Checker => SyntheticPattern::Checker,
            };
            Ok(Box::new(SyntheticSource::new(
                config.source.width,
                config.source.height,
                pattern,
            )))
        }
        SourceKind::ImageDir => {
            let dir = config
                .source
                .dir
                .as_ref()
                .ok_or_else(|| anyhow!("source.dir missing for image_dir source"))?;
            let source = ImageDirSource::open(Path::new(dir), config.source.loop_frames)?;
            println!("  ✓ {} image(s) in {}", source.len(), dir);
            Ok(Box::new(source))
        }
    }
}

fn run(config: &RunConfig) -> Result<()> {
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  BENCHMARK RUNNER                                        ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();
    println!("  Platform: {}", config.identity.platform);
    println!("  Phase:    {}", config.identity.phase);
    println!("  Model:    {}", config.identity.model);
    println!(
        "  Stages:   {}",
        config
            .stages
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    );
    println!();

    let mut source = build_source(config)?;
    let mut workload = Workload::from_config(&config.stages);

    let aggregator = Arc::new(Mutex::new(Aggregator::new()));

    let sampler = if config.sampling.enable {
        println!(
            "  ✓ Resource sampling every {}ms",
            config.sampling.interval_ms
        );
        Some(ResourceSampler::spawn(
            aggregator.clone(),
            Duration::from_millis(config.sampling.interval_ms),
        ))
    } else {
        None
    };

    // Signal handler: stop cleanly at the next frame boundary
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\n🛑 Stopping at next frame boundary...");
        r.store(false, Ordering::SeqCst);
    })?;

    let budget = &config.run;
    let duration = if budget.duration_seconds > 0 {
        println!("  ⏱️  Duration budget: {}s", budget.duration_seconds);
        Some(Duration::from_secs(budget.duration_seconds))
    } else {
        None
    };
    if budget.max_frames > 0 {
        println!("  ⏱️  Frame budget: {}", budget.max_frames);
    }
    println!();

    let mut ok_frames = 0u64;
    let mut errored_frames = 0u64;
    let mut consecutive_errors = 0u32;
    let start_time = Instant::now();

    loop {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        if let Some(limit) = duration {
            if start_time.elapsed() >= limit {
                println!("\n⏱️  Duration reached - stopping");
                break;
            }
        }
        if budget.max_frames > 0 && ok_frames + errored_frames >= budget.max_frames {
            println!("\n⏱️  Frame budget reached - stopping");
            break;
        }

        let frame = match source.next_frame()? {
            Some(frame) => frame,
            None => {
                println!("\n📭 Frame source exhausted - stopping");
                break;
            }
        };

        let mut timer = FrameTimer::start(frame.meta.frame_idx);
        let mut packet = frame;
        for stage in &mut workload.stages {
            timer.begin_stage(&stage.name)?;
            match stage.process(packet.clone()) {
                Ok(out) => {
                    timer.end_stage(&stage.name)?;
                    packet = out;
                }
                Err(e) => {
                    timer.fail_stage(&stage.name, &e.to_string())?;
                    break;
                }
            }
        }

        // A timer mismatch is a harness bug local to this frame: drop
        // the frame and keep the run going.
        let timing = match timer.finalize_frame() {
            Ok(timing) => timing,
            Err(e) => {
                eprintln!("⚠️  Frame dropped: {e}");
                continue;
            }
        };

        if timing.is_error() {
            errored_frames += 1;
            consecutive_errors += 1;
            if let Some(err) = &timing.error {
                eprintln!("⚠️  Frame {} failed: {err}", timing.frame_idx);
            }
            // The sampler thread is joined by its Drop on the way out
            if consecutive_errors >= budget.max_consecutive_errors {
                return Err(anyhow!(
                    "{consecutive_errors} consecutive frame failures - aborting run"
                ));
            }
        } else {
            ok_frames += 1;
            consecutive_errors = 0;
        }

        {
            let mut agg = aggregator.lock().unwrap();
            agg.observe(timing)?;

            let total = ok_frames + errored_frames;
            if budget.stats_print_interval > 0 && total % budget.stats_print_interval == 0 {
                let elapsed = start_time.elapsed().as_secs_f64();
                println!(
                    "📊 Frames: {} ok / {} errored | FPS: {:.2} | Recent latency: {:.2}ms",
                    ok_frames,
                    errored_frames,
                    ok_frames as f64 / elapsed,
                    agg.recent_avg_latency_ms(),
                );
            }
        }
    }

    if let Some(sampler) = sampler {
        sampler.stop();
    }

    let metrics = aggregator.lock().unwrap().finish();
    let record = RunResultRecord::from_metrics(
        &config.identity.platform,
        &config.identity.phase,
        &config.identity.model,
        &metrics,
        Utc::now(),
    );
    let record_path = Path::new(&config.output.record_path);
    record.save(record_path)?;

    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  FINAL SUMMARY                                           ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();
    println!("  Frames (ok):        {}", record.frame_count);
    println!("  Frames (errored):   {}", record.error_count);
    println!("  Elapsed:            {:.2}s", record.elapsed_seconds);
    println!("  Average FPS:        {:.2}", record.fps);
    println!("  Average latency:    {:.2}ms", record.avg_latency_ms);
    if !record.stages_ms.is_empty() {
        println!();
        println!("  Stage breakdown:");
        for (stage, ms) in &record.stages_ms {
            let pct = if record.avg_latency_ms > 0.0 {
                ms / record.avg_latency_ms * 100.0
            } else {
                0.0
            };
            println!("    {:<12} {:.2}ms ({:.1}%)", stage, ms, pct);
        }
    }
    let res = &record.resources;
    if res.cpu_pct.is_some() || res.gpu_pct.is_some() || res.power_w.is_some() {
        println!();
        println!("  Resources (mean):");
        if let Some(v) = res.cpu_pct {
            println!("    CPU load:      {:.1}%", v);
        }
        if let Some(v) = res.mem_pct {
            println!("    Memory:        {:.1}%", v);
        }
        if let Some(v) = res.gpu_pct {
            println!("    GPU load:      {:.1}%", v);
        }
        if let Some(v) = res.gpu_temp_c {
            println!("    Temperature:   {:.1}°C", v);
        }
        if let Some(v) = res.power_w {
            println!("    Power:         {:.2}W", v);
        }
    }
    println!();
    println!("📁 Record saved to: {}", record_path.display());
    println!();
    println!("✅ Run completed!");

    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <config_path>", args[0]);
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  {} configs/run_discrete_gpu.toml", args[0]);
        eprintln!("  {} configs/run_jetson_uma.toml", args[0]);
        eprintln!();
        return Err(anyhow!("Missing config path argument"));
    }

    println!("📋 Loading configuration: {}", args[1]);
    let config = config::load_config(&args[1])?;
    println!();

    run(&config)
}
