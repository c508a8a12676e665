use std::thread;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use inputframe::config::PipelineConfig;
use inputframe::ingest::{
    DisplayMetrics, IngestHandle, PointerAction, RawPointer, RawPointerEvent, RawSensorEvent,
    RawWindowEvent, Rotation, SensorAccuracy, WindowEventKind,
};
use inputframe::pipeline::{NormalizedOutput, PipelineHandle};
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const FRAME_NS: u64 = 4_000_000;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::load(&path)?,
        None => PipelineConfig::load_or_default()?,
    };
    setup(&config)?;
    info!("Starting input pipeline demo");

    let (output_sender, mut output_receiver) = mpsc::channel(config.worker.output_buffer);
    let mut pipeline = PipelineHandle::from_config(&config, output_sender)
        .map_err(|e| eyre!("Failed to spawn pipeline: {}", e))?;

    let consumer = tokio::spawn(async move {
        let mut received = 0usize;
        while let Some(output) = output_receiver.recv().await {
            received += 1;
            log_output(&output);
        }
        received
    });

    // Platform callbacks run on their own thread in a real host
    let ingest = pipeline.ingest();
    let producer = thread::spawn(move || simulate_session(&ingest));
    producer
        .join()
        .map_err(|_| eyre!("Producer thread panicked"))?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let report = pipeline.shutdown().await?;
    drop(pipeline);

    let received = consumer.await?;
    info!(
        "Demo finished: {} outputs received, {} pointer frames, {} gyro frames, {} events dropped",
        received,
        report.core.pointer.frames_emitted,
        report.core.gyro_frames,
        report.queue.dropped_sensor + report.queue.dropped_move
    );
    debug!("Final report: {:?}", report);
    Ok(())
}

fn setup(config: &PipelineConfig) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env(&config.logging.level);
    Ok(())
}

fn setup_logging_env(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

// Attach, one swipe, a gyro burst, a second finger that is still down at the end
fn simulate_session(ingest: &IngestHandle) {
    let metrics = DisplayMetrics::new(1080, 2400, 420, Rotation::Rotation0);
    ingest.submit_window(RawWindowEvent {
        time_nanos: 0,
        kind: WindowEventKind::Attached,
        metrics,
    });

    let mut t = FRAME_NS;
    let touch = |t: u64, action: PointerAction, id: i32, pointers: Vec<RawPointer>| {
        RawPointerEvent {
            time_nanos: t,
            action,
            changed_id: id,
            pointers,
            display: metrics,
        }
    };

    ingest.submit_pointer(touch(t, PointerAction::Down, 0, vec![RawPointer::new(0, 100.0, 1200.0)]));
    for step in 1..=40 {
        t += FRAME_NS;
        let x = 100.0 + step as f32 * 20.0;
        ingest.submit_pointer(touch(t, PointerAction::Move, 0, vec![RawPointer::new(0, x, 1200.0)]));
        ingest.submit_sensor(RawSensorEvent::gyroscope(
            t,
            [0.01 * step as f32, 0.0, -0.02],
            SensorAccuracy::High,
        ));
    }
    t += FRAME_NS;
    ingest.submit_pointer(touch(t, PointerAction::Up, 0, vec![RawPointer::new(0, 900.0, 1200.0)]));

    for burst in 0..5_000u64 {
        let outcome = ingest.submit_sensor(RawSensorEvent::gyroscope(
            t + burst * 1_000,
            [0.0, 0.5, 0.0],
            SensorAccuracy::Medium,
        ));
        if !outcome.is_accepted() && burst % 1_000 == 0 {
            warn!("Gyro burst saturating the queue at sample {}", burst);
        }
    }

    t += 10 * FRAME_NS;
    ingest.submit_pointer(touch(t, PointerAction::Down, 1, vec![RawPointer::new(1, 540.0, 600.0)]));
}

fn log_output(output: &NormalizedOutput) {
    match output {
        NormalizedOutput::Pointer(frame) => info!(
            "Pointer frame t={} changed={:?} canceled={} active={}",
            frame.time_nanos,
            frame.changed_ids,
            frame.canceled,
            frame.pointers_by_id.len()
        ),
        NormalizedOutput::Gyro(frame) => debug!(
            "Gyro frame t={} yaw={:.3} pitch={:.3} roll={:.3}",
            frame.time_nanos, frame.yaw_rate, frame.pitch_rate, frame.roll_rate
        ),
        NormalizedOutput::Drop(event) => warn!(
            "Dropped {} {:?} events before t={}",
            event.dropped_count, event.kind, event.time_nanos
        ),
    }
}
