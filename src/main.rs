//! Demo mission: drives a seeded synthetic rover through a degraded
//! channel and prints what the pipeline recovered.

use env_logger::Env;

use telemetry_core::constants::{APP_NAME, APP_VERSION};
use telemetry_core::logic::pipeline::{Pipeline, PipelineConfig};
use telemetry_core::logic::schema::TelemetrySchema;
use telemetry_core::logic::source::SyntheticFrameSource;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    log::info!("{} v{}", APP_NAME, APP_VERSION);

    let config = PipelineConfig {
        loss_rate: 0.08,
        field_corruption_rate: 0.03,
        jitter_stddev: 0.02,
        seed: 42,
        db_path: "mission.db".into(),
        mission_id: Some("demo".to_string()),
        ..PipelineConfig::default()
    };

    let schema = TelemetrySchema::rover_default();
    let mut pipeline = match Pipeline::new(config, schema.clone()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            log::error!("pipeline setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let source = SyntheticFrameSource::new(schema, 1.0, 120, 7);
    let stats = match pipeline.run(source) {
        Ok(stats) => stats,
        Err(e) => {
            log::error!("mission aborted: {}", e);
            std::process::exit(1);
        }
    };

    log::info!(
        "channel: {} lost / {} corrupted of {} packets",
        stats.channel.packets_lost,
        stats.channel.packets_corrupted,
        stats.channel.packets_in
    );
    log::info!(
        "cleaner: {} repaired fields, {} interpolated frames, {} unrecoverable",
        stats.cleaner.fields_repaired,
        stats.cleaner.packets_interpolated,
        stats.cleaner.packets_unrecoverable
    );
    log::info!(
        "detector: {} critical / {} warning findings",
        stats.detector.critical_count,
        stats.detector.warning_count
    );

    match pipeline.archive().latest(3, pipeline.mission_id()) {
        Ok(frames) => {
            for labeled in frames {
                log::info!(
                    "t={:>6.1} frame {:>3} quality={} anomalies={}",
                    labeled.frame.timestamp,
                    labeled.frame.frame_id,
                    labeled.frame.metadata.quality.as_str(),
                    labeled.anomalies.len()
                );
            }
        }
        Err(e) => log::warn!("latest query failed: {}", e),
    }

    match pipeline.archive().anomalies(pipeline.mission_id(), Some("critical"), 5) {
        Ok(records) => {
            for record in records {
                log::info!("critical at t={:.1}: {}", record.timestamp, record.description);
            }
        }
        Err(e) => log::warn!("anomaly query failed: {}", e),
    }

    if let Err(e) = pipeline
        .archive()
        .export_jsonl(pipeline.mission_id(), "mission.jsonl")
    {
        log::warn!("export failed: {}", e);
    }
}
