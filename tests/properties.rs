use std::collections::BTreeSet;

use inputframe::ingest::{
    DisplayMetrics, DropKind, PointerAction, PointerId, PushOutcome, QueueSettings, RawPointer,
    RawPointerEvent, RawSensorEvent, RawWindowEvent, Rotation, SensorAccuracy, WindowEventKind,
};
use inputframe::normalize::{PointerFrame, PointerPhase, DEFAULT_MOVE_INTERVAL_NS};
use inputframe::pipeline::{CoreSettings, InputPipeline, NormalizedOutput};

const MS: u64 = 1_000_000;

fn metrics(rotation: Rotation) -> DisplayMetrics {
    DisplayMetrics::new(1080, 2400, 480, rotation)
}

fn landscape() -> DisplayMetrics {
    metrics(Rotation::Rotation90)
}

fn pointer_event(
    t: u64,
    action: PointerAction,
    changed_id: PointerId,
    pointers: &[(PointerId, f32, f32)],
) -> RawPointerEvent {
    RawPointerEvent {
        time_nanos: t,
        action,
        changed_id,
        pointers: pointers
            .iter()
            .map(|&(id, x, y)| RawPointer::new(id, x, y))
            .collect(),
        display: landscape(),
    }
}

fn attach(pipeline: &InputPipeline, t: u64, metrics: DisplayMetrics) {
    pipeline.submit(RawWindowEvent {
        time_nanos: t,
        kind: WindowEventKind::Attached,
        metrics,
    });
}

fn pointer_frames(outputs: &[NormalizedOutput]) -> Vec<&PointerFrame> {
    outputs.iter().filter_map(NormalizedOutput::as_pointer).collect()
}

// Every DOWN is followed by exactly one UP or a cancel, never by activity after the UP
fn assert_lifecycle_complete(frames: &[&PointerFrame]) {
    let mut active: BTreeSet<PointerId> = BTreeSet::new();
    for frame in frames {
        if frame.canceled {
            assert!(frame.pointers_by_id.is_empty());
            active.clear();
            continue;
        }
        for (id, state) in &frame.pointers_by_id {
            match state.phase {
                PointerPhase::Down if frame.changed_ids.contains(id) => {
                    active.insert(*id);
                }
                PointerPhase::Up => {
                    assert!(active.remove(id), "UP for pointer {} that was not active", id);
                }
                _ => assert!(active.contains(id), "pointer {} reported after its UP", id),
            }
        }
    }
    assert!(active.is_empty(), "pointers left without terminal frame: {:?}", active);
}

#[test]
fn tap_and_multi_touch_lifecycle_is_complete() {
    let pipeline = InputPipeline::default();
    let mut out: Vec<NormalizedOutput> = Vec::new();
    attach(&pipeline, 0, landscape());

    pipeline.submit(pointer_event(MS, PointerAction::Down, 0, &[(0, 10.0, 10.0)]));
    pipeline.submit(pointer_event(2 * MS, PointerAction::Down, 1, &[(0, 10.0, 10.0), (1, 50.0, 50.0)]));
    pipeline.submit(pointer_event(40 * MS, PointerAction::Move, 0, &[(0, 20.0, 10.0), (1, 60.0, 50.0)]));
    pipeline.submit(pointer_event(41 * MS, PointerAction::Up, 0, &[(0, 25.0, 10.0), (1, 60.0, 50.0)]));
    // Stale id from the platform, must not disturb pointer 1
    pipeline.submit(pointer_event(42 * MS, PointerAction::Up, 0, &[(1, 60.0, 50.0)]));
    pipeline.submit(pointer_event(43 * MS, PointerAction::Move, 1, &[(1, 70.0, 55.0)]));
    pipeline.submit(pointer_event(80 * MS, PointerAction::Up, 1, &[(1, 75.0, 55.0)]));
    pipeline.pump(&mut out);

    let frames = pointer_frames(&out);
    assert_lifecycle_complete(&frames);

    let last = frames.last().unwrap();
    assert_eq!(last.phase_of(1), Some(PointerPhase::Up));
    assert_eq!(last.pointer(1).map(|p| (p.x, p.y)), Some((75.0, 55.0)));
    assert_eq!(pipeline.core_stats().anomalies.unknown_pointer, 1);
}

#[test]
fn scripted_noise_keeps_lifecycle_complete() {
    let pipeline = InputPipeline::default();
    let mut out: Vec<NormalizedOutput> = Vec::new();

    // Deterministic pseudo-random gesture soup
    let mut seed: u64 = 0x5eed;
    let mut next = || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (seed >> 33) as u32
    };

    let mut t = 0;
    for _ in 0..2_000 {
        t += u64::from(next() % 8) * MS;
        let id = (next() % 3) as PointerId;
        let action = match next() % 10 {
            0..=2 => PointerAction::Down,
            3..=7 => PointerAction::Move,
            8 => PointerAction::Up,
            _ => PointerAction::Cancel,
        };
        let x = (next() % 1080) as f32;
        let y = (next() % 2400) as f32;
        pipeline.submit(pointer_event(t, action, id, &[(id, x, y)]));
    }
    pipeline.shutdown(&mut out);

    let frames = pointer_frames(&out);
    assert!(!frames.is_empty());
    assert_lifecycle_complete(&frames);
}

#[test]
fn outputs_preserve_acceptance_order() {
    let pipeline = InputPipeline::default();
    let mut out: Vec<NormalizedOutput> = Vec::new();
    attach(&pipeline, 0, landscape());

    let mut submitted = Vec::new();
    pipeline.submit(pointer_event(MS, PointerAction::Down, 0, &[(0, 0.0, 0.0)]));
    submitted.push(MS);
    for step in 1..=50u64 {
        let t = MS + step * 5 * MS;
        pipeline.submit(RawSensorEvent::gyroscope(t, [0.1, 0.2, 0.3], SensorAccuracy::High));
        submitted.push(t);
    }
    pipeline.submit(pointer_event(300 * MS, PointerAction::Up, 0, &[(0, 5.0, 5.0)]));
    submitted.push(300 * MS);
    pipeline.pump(&mut out);

    let times: Vec<u64> = out.iter().map(NormalizedOutput::time_nanos).collect();
    assert_eq!(times, submitted);
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn regressing_clock_never_reorders_pointer_frames() {
    let pipeline = InputPipeline::default();
    let mut out: Vec<NormalizedOutput> = Vec::new();
    pipeline.submit(pointer_event(100 * MS, PointerAction::Down, 0, &[(0, 0.0, 0.0)]));
    pipeline.submit(pointer_event(90 * MS, PointerAction::Up, 0, &[(0, 1.0, 1.0)]));
    pipeline.pump(&mut out);

    let frames = pointer_frames(&out);
    assert_eq!(frames.len(), 2);
    assert!(frames[1].time_nanos >= frames[0].time_nanos);
    assert_eq!(pipeline.core_stats().anomalies.clock_regression, 1);
}

#[test]
fn move_burst_respects_coalescing_bound() {
    let pipeline = InputPipeline::default();
    let mut out: Vec<NormalizedOutput> = Vec::new();
    attach(&pipeline, 0, landscape());

    let start = MS;
    let duration = 500 * MS;
    let raw_moves = 250u64;
    pipeline.submit(pointer_event(start, PointerAction::Down, 0, &[(0, 0.0, 0.0)]));
    for step in 1..=raw_moves {
        let t = start + step * (duration / raw_moves);
        pipeline.submit(pointer_event(t, PointerAction::Move, 0, &[(0, step as f32, 0.0)]));
    }
    pipeline.submit(pointer_event(start + duration, PointerAction::Up, 0, &[(0, 300.0, 0.0)]));
    pipeline.pump(&mut out);

    let frames = pointer_frames(&out);
    let bound = duration.div_ceil(DEFAULT_MOVE_INTERVAL_NS) + 2;
    assert!(frames.len() as u64 <= bound, "{} frames exceeds {}", frames.len(), bound);
    assert!((frames.len() as u64) < raw_moves);

    // Terminal frame carries the final position
    let last = frames.last().unwrap();
    assert_eq!(last.phase_of(0), Some(PointerPhase::Up));
    assert_eq!(last.pointer(0).map(|p| p.x), Some(300.0));

    let stats = pipeline.core_stats();
    assert_eq!(stats.pointer.moves_applied, raw_moves);
    assert!(stats.pointer.moves_coalesced > 0);
}

#[test]
fn frames_after_cancel_stay_empty_until_next_down() {
    let pipeline = InputPipeline::default();
    let mut out: Vec<NormalizedOutput> = Vec::new();

    pipeline.submit(pointer_event(MS, PointerAction::Down, 0, &[(0, 1.0, 1.0)]));
    pipeline.submit(pointer_event(2 * MS, PointerAction::Down, 1, &[(0, 1.0, 1.0), (1, 2.0, 2.0)]));
    pipeline.submit(pointer_event(3 * MS, PointerAction::Cancel, 0, &[]));
    pipeline.submit(pointer_event(50 * MS, PointerAction::Move, 0, &[(0, 9.0, 9.0)]));
    pipeline.submit(pointer_event(60 * MS, PointerAction::Up, 1, &[(1, 9.0, 9.0)]));
    pipeline.submit(pointer_event(70 * MS, PointerAction::Cancel, 0, &[]));
    pipeline.submit(pointer_event(80 * MS, PointerAction::Down, 1, &[(1, 4.0, 4.0)]));
    pipeline.pump(&mut out);

    let frames = pointer_frames(&out);
    let cancel_at = frames.iter().position(|f| f.canceled).unwrap();
    let next_down = frames
        .iter()
        .position(|f| f.phase_of(1) == Some(PointerPhase::Down) && f.time_nanos == 80 * MS)
        .unwrap();
    assert!(frames[cancel_at..next_down].iter().all(|f| f.pointers_by_id.is_empty()));
    assert!(frames[next_down].pointer(1).is_some());
    assert!(pipeline.core_stats().anomalies.input_after_cancel >= 2);
}

#[test]
fn sensor_flood_never_loses_lifecycle_events() {
    let pipeline = InputPipeline::new(
        QueueSettings {
            capacity: 64,
            drop_report_batch: 100,
        },
        CoreSettings::default(),
    );
    let mut out: Vec<NormalizedOutput> = Vec::new();

    // One second of 10 kHz samples against a consumer that never pumps
    for i in 0..10_000u64 {
        let t = i * 100_000;
        pipeline.submit(RawSensorEvent::gyroscope(t, [0.0, 0.0, 1.0], SensorAccuracy::High));
        match i {
            2_500 => {
                pipeline.submit(pointer_event(t, PointerAction::Down, 0, &[(0, 1.0, 1.0)]));
            }
            5_000 => {
                pipeline.submit(pointer_event(t, PointerAction::Up, 0, &[(0, 2.0, 2.0)]));
            }
            7_500 => {
                pipeline.submit(pointer_event(t, PointerAction::Cancel, 0, &[]));
            }
            _ => {}
        }
    }
    pipeline.shutdown(&mut out);

    let frames = pointer_frames(&out);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].phase_of(0), Some(PointerPhase::Down));
    assert_eq!(frames[1].phase_of(0), Some(PointerPhase::Up));
    assert!(frames[2].canceled);

    let drops: Vec<_> = out.iter().filter_map(NormalizedOutput::as_drop).collect();
    assert!(!drops.is_empty());
    assert!(drops.iter().all(|d| d.kind == DropKind::Sensor));

    // Every dropped sample is accounted for in some report
    let stats = pipeline.queue_stats();
    let reported: u64 = drops.iter().map(|d| d.dropped_count).sum();
    assert_eq!(reported, stats.dropped_sensor);
    assert!(stats.dropped_sensor > 0);
}

#[test]
fn rotation_maps_into_landscape_basis() {
    let pipeline = InputPipeline::default();
    let mut out: Vec<NormalizedOutput> = Vec::new();

    attach(&pipeline, 0, metrics(Rotation::Rotation90));
    pipeline.submit(pointer_event(MS, PointerAction::Down, 0, &[(0, 123.5, 456.25)]));
    pipeline.submit(pointer_event(2 * MS, PointerAction::Up, 0, &[(0, 123.5, 456.25)]));

    pipeline.submit(RawWindowEvent {
        time_nanos: 3 * MS,
        kind: WindowEventKind::MetricsChanged,
        metrics: metrics(Rotation::Rotation0),
    });
    pipeline.submit(pointer_event(4 * MS, PointerAction::Down, 0, &[(0, 0.0, 0.0)]));
    pipeline.submit(pointer_event(
        5 * MS,
        PointerAction::Down,
        1,
        &[(0, 0.0, 0.0), (1, 1080.0, 2400.0)],
    ));
    pipeline.pump(&mut out);

    let frames = pointer_frames(&out);
    assert_eq!(frames[0].pointer(0).map(|p| (p.x, p.y)), Some((123.5, 456.25)));
    assert_eq!(frames[2].pointer(0).map(|p| (p.x, p.y)), Some((2400.0, 0.0)));
    assert_eq!(frames[3].pointer(1).map(|p| (p.x, p.y)), Some((0.0, 1080.0)));
    assert_eq!(frames[3].space.width_px, 1080);
    assert_eq!(frames[3].space.height_px, 2400);
}

#[test]
fn gyro_axes_are_frozen_and_sign_preserving() {
    let pipeline = InputPipeline::default();
    let mut out: Vec<NormalizedOutput> = Vec::new();
    pipeline.submit(RawSensorEvent::gyroscope(1, [0.5, 1.0, 1.5], SensorAccuracy::High));
    pipeline.submit(RawSensorEvent::gyroscope(2, [-0.5, -1.0, -1.5], SensorAccuracy::High));
    pipeline.pump(&mut out);

    let gyro: Vec<_> = out.iter().filter_map(NormalizedOutput::as_gyro).collect();
    assert_eq!(gyro.len(), 2);
    assert_eq!(
        (gyro[0].pitch_rate, gyro[0].roll_rate, gyro[0].yaw_rate),
        (0.5, 1.0, 1.5)
    );
    assert_eq!(
        (gyro[1].pitch_rate, gyro[1].roll_rate, gyro[1].yaw_rate),
        (-0.5, -1.0, -1.5)
    );
}

#[test]
fn every_accuracy_level_is_emitted() {
    let pipeline = InputPipeline::default();
    let mut out: Vec<NormalizedOutput> = Vec::new();
    let levels = [
        SensorAccuracy::Unreliable,
        SensorAccuracy::Low,
        SensorAccuracy::Medium,
        SensorAccuracy::High,
    ];
    for (i, accuracy) in levels.iter().enumerate() {
        pipeline.submit(RawSensorEvent::gyroscope(i as u64, [0.0, 0.0, 0.0], *accuracy));
    }
    pipeline.pump(&mut out);

    let emitted: Vec<SensorAccuracy> = out
        .iter()
        .filter_map(NormalizedOutput::as_gyro)
        .map(|g| g.accuracy)
        .collect();
    assert_eq!(emitted, levels);
}

#[test]
fn detach_and_shutdown_terminate_open_gestures() {
    let pipeline = InputPipeline::default();
    let mut out: Vec<NormalizedOutput> = Vec::new();
    attach(&pipeline, 0, landscape());
    pipeline.submit(pointer_event(MS, PointerAction::Down, 0, &[(0, 1.0, 1.0)]));
    pipeline.submit(RawWindowEvent {
        time_nanos: 2 * MS,
        kind: WindowEventKind::Detached,
        metrics: landscape(),
    });
    attach(&pipeline, 3 * MS, landscape());
    pipeline.submit(pointer_event(4 * MS, PointerAction::Down, 2, &[(2, 1.0, 1.0)]));
    pipeline.submit(pointer_event(5 * MS, PointerAction::Move, 2, &[(2, 3.0, 1.0)]));
    pipeline.shutdown(&mut out);

    let frames = pointer_frames(&out);
    assert_lifecycle_complete(&frames);
    assert_eq!(frames.iter().filter(|f| f.canceled).count(), 2);
    assert_eq!(pipeline.core_stats().pointer.cancels_synthesized, 2);
}

#[test]
fn sync_shutdown_rejects_later_submissions() {
    let pipeline = InputPipeline::default();
    let mut out: Vec<NormalizedOutput> = Vec::new();
    pipeline.submit(pointer_event(MS, PointerAction::Down, 0, &[(0, 1.0, 1.0)]));
    pipeline.shutdown(&mut out);

    let late = pipeline.submit(pointer_event(2 * MS, PointerAction::Up, 0, &[(0, 1.0, 1.0)]));
    assert_eq!(late, PushOutcome::Closed);
    assert!(!pipeline.ingest().is_open());
    assert_eq!(pipeline.pump(&mut out), 0);
    assert_eq!(pointer_frames(&out).len(), 2);
}
