//! Behaviour shared by every scheduler: identical pixels, swap counts,
//! failure isolation and the full run from job list to PNG files.

use image::Rgba;
use lockstep::prelude::*;
use std::path::Path;

const MODES: [Mode; 3] = [Mode::Sequential, Mode::Bsp, Mode::Pipeline];

fn source(seed: u32, width: u32, height: u32) -> Plane {
    Plane::from_fn(width, height, |x, y| {
        let v = (x * 7919 + y * 104_729 + seed * 15_485_863) % 65_536;
        Rgba([v as u16, (v * 3 % 65_536) as u16, (65_535 - v) as u16, (v | 0x8000) as u16])
    })
}

fn specs(effects: &[&[&str]]) -> Vec<TaskSpec> {
    effects
        .iter()
        .enumerate()
        .map(|(index, codes)| {
            TaskSpec::new(
                index,
                format!("in/{index}.png"),
                format!("out/{index}.png"),
                codes.iter().map(|code| code.to_string()).collect(),
            )
        })
        .collect()
}

fn seeded_store(sizes: &[(u32, u32)]) -> MemoryStore {
    let store = MemoryStore::new();
    for (index, &(width, height)) in sizes.iter().enumerate() {
        store.insert(format!("in/{index}.png"), source(index as u32, width, height));
    }
    store
}

fn run(mode: Mode, threads: usize, policy: FailurePolicy, specs: &[TaskSpec], store: &dyn ImageStore) -> RunReport {
    scheduler_for(mode, threads, policy).run(specs, store, &ProgressTracker::new(specs.len()))
}

/// Apply `effects` one full-image pass at a time.
fn reference(plane: &Plane, effects: &[Effect]) -> Plane {
    let mut current = plane.clone();
    for effect in effects {
        let mut image = Image::new(current);
        image.apply(*effect, image.bounds()).unwrap();
        current = image.output().unwrap().clone();
    }
    current
}

// ============================================================================
// Equivalence
// ============================================================================

#[test]
fn all_engines_produce_identical_pixels() {
    let sizes = [(7, 7), (5, 11), (9, 4), (1, 1)];
    let specs = specs(&[&["B", "G"], &["S", "E", "B"], &["G"], &["E", "S", "B", "G"]]);

    let baseline = seeded_store(&sizes);
    let report = run(Mode::Sequential, 1, FailurePolicy::Continue, &specs, &baseline);
    assert!(report.is_success());

    for threads in [1, 2, 3] {
        for mode in [Mode::Bsp, Mode::Pipeline] {
            let store = seeded_store(&sizes);
            let report = run(mode, threads, FailurePolicy::Continue, &specs, &store);
            assert!(report.is_success(), "{mode} with {threads} thread(s)");

            for spec in &specs {
                assert_eq!(
                    store.get(&spec.output),
                    baseline.get(&spec.output),
                    "{mode} with {threads} thread(s), task {}",
                    spec.index
                );
            }
        }
    }
}

#[test]
fn saved_image_is_the_last_stage_output() {
    let sizes = [(6, 5)];
    let specs = specs(&[&["S", "B", "E"]]);
    let expected = reference(
        &source(0, 6, 5),
        &[Effect::Sharpen, Effect::Blur, Effect::EdgeDetect],
    );

    for mode in MODES {
        let store = seeded_store(&sizes);
        let report = run(mode, 3, FailurePolicy::Continue, &specs, &store);

        assert!(matches!(
            report.outcomes[0].status,
            TaskStatus::Saved { stages: 3, swaps: 2 }
        ));
        assert_eq!(store.get("out/0.png").unwrap(), expected, "{mode}");
    }
}

#[test]
fn swap_count_is_one_less_than_stage_count() {
    let codes: [&[&str]; 4] = [&["G"], &["G", "B"], &["G", "B", "S"], &["G", "B", "S", "E"]];
    let specs = specs(&codes);
    let sizes = [(3, 3); 4];

    for mode in MODES {
        let store = seeded_store(&sizes);
        let report = run(mode, 2, FailurePolicy::Continue, &specs, &store);
        for (k, outcome) in report.outcomes.iter().enumerate() {
            match outcome.status {
                TaskStatus::Saved { stages, swaps } => {
                    assert_eq!(stages, k + 1);
                    assert_eq!(swaps, k);
                }
                TaskStatus::Failed(ref error) => panic!("{mode}: task {k} failed: {error}"),
            }
        }
    }
}

#[test]
fn bsp_runs_one_round_per_stage() {
    let sizes = [(4, 4), (4, 4), (4, 4)];
    let specs = specs(&[&["B", "G"], &["S"], &["E", "B", "G", "S"]]);

    for threads in [1, 2, 3, 8] {
        let store = seeded_store(&sizes);
        let report = run(Mode::Bsp, threads, FailurePolicy::Continue, &specs, &store);
        assert_eq!(report.stats.rounds, 7, "{threads} thread(s)");
    }
}

// ============================================================================
// Failure isolation
// ============================================================================

/// Memory store whose saves fail for destinations containing `fail`.
struct FlakyStore {
    inner: MemoryStore,
}

impl ImageStore for FlakyStore {
    fn load(&self, path: &Path) -> Result<Plane, ImageError> {
        self.inner.load(path)
    }

    fn save(&self, plane: &Plane, path: &Path) -> Result<(), ImageError> {
        if path.to_string_lossy().contains("fail") {
            return Err(ImageError::CreateDir {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.inner.save(plane, path)
    }
}

fn failure_fixture() -> (Vec<TaskSpec>, FlakyStore) {
    let specs = vec![
        TaskSpec::new(0, "in/ok.png", "out/0.png", vec!["B".into(), "G".into()]),
        TaskSpec::new(1, "in/ok.png", "out/1.png", vec!["B".into(), "X".into()]),
        TaskSpec::new(2, "in/missing.png", "out/2.png", vec!["G".into()]),
        TaskSpec::new(3, "in/ok.png", "out/fail.png", vec!["S".into()]),
        TaskSpec::new(4, "in/ok.png", "out/4.png", vec!["E".into()]),
    ];
    let store = FlakyStore {
        inner: MemoryStore::new().with("in/ok.png", source(9, 5, 6)),
    };
    (specs, store)
}

#[test]
fn failures_stay_with_their_task() {
    for mode in MODES {
        let (specs, store) = failure_fixture();
        let report = run(mode, 3, FailurePolicy::Continue, &specs, &store);

        assert!(report.outcomes[0].is_saved(), "{mode}");
        assert!(matches!(
            report.outcomes[1].error(),
            Some(TaskError::UnknownEffect { code }) if code == "X"
        ));
        assert!(matches!(report.outcomes[2].error(), Some(TaskError::Load(_))));
        assert!(matches!(report.outcomes[3].error(), Some(TaskError::Save(_))));
        assert!(report.outcomes[4].is_saved(), "{mode}");

        assert_eq!(report.stats.tasks_saved, 2);
        assert_eq!(report.stats.tasks_failed, 3);
        assert_eq!(report.stats.tasks_aborted, 0);
        assert!(store.inner.contains("out/4.png"));
        assert!(!store.inner.contains("out/1.png"));
    }
}

#[test]
fn abort_policy_stops_the_run() {
    for mode in MODES {
        let (specs, store) = failure_fixture();
        let report = run(mode, 2, FailurePolicy::Abort, &specs, &store);

        assert!(!report.is_success(), "{mode}");
        assert_eq!(report.outcomes.len(), 5);
        assert!(report
            .failures()
            .any(|(_, error)| !error.is_aborted()));
        // Both report their failures before any later task is started
        if mode != Mode::Pipeline {
            assert!(report.stats.tasks_aborted >= 2, "{mode}: {:?}", report.stats);
        }
    }
}

#[test]
fn abort_report_matches_the_files_written() {
    for mode in MODES {
        for threads in [1, 2, 3] {
            let (specs, store) = failure_fixture();
            let report = run(mode, threads, FailurePolicy::Abort, &specs, &store);

            for outcome in &report.outcomes {
                let written = store.inner.contains(&outcome.destination);
                match outcome.error() {
                    None => assert!(written, "{mode}/{threads}: task {} saved but missing", outcome.index),
                    Some(error) if error.is_aborted() => {
                        assert!(!written, "{mode}/{threads}: task {} aborted but written", outcome.index)
                    }
                    Some(_) => {}
                }
            }
        }
    }
}

#[test]
fn sequential_abort_keeps_earlier_results() {
    let (specs, store) = failure_fixture();
    let report = run(Mode::Sequential, 1, FailurePolicy::Abort, &specs, &store);

    assert!(report.outcomes[0].is_saved());
    assert!(matches!(report.outcomes[1].error(), Some(TaskError::UnknownEffect { .. })));
    for outcome in &report.outcomes[2..] {
        assert!(outcome.error().unwrap().is_aborted());
    }
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn gray_image_blurred_then_grayscaled_end_to_end() {
    const GRAY: u16 = 30_000;
    let opaque_gray = Rgba([GRAY, GRAY, GRAY, u16::MAX]);

    let mut outputs = Vec::new();
    for mode in MODES {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join("effects.txt"),
            r#"{"inPath": "gray.png", "outPath": "gray.png", "effects": ["B", "G"]}"#,
        )
        .unwrap();

        let config = RunConfig::new()
            .with_mode(mode)
            .with_threads(3)
            .with_data_dirs("small")
            .with_data_root(root.path());
        let layout = config.layout();

        let store = PngStore::new();
        store
            .save(&Plane::filled(4, 4, opaque_gray), &layout.input_path("small", "gray.png"))
            .unwrap();

        let report = ExecutionEngine::new(config).execute(&store).unwrap();
        assert!(report.is_success(), "{mode}");

        let written = std::fs::read(layout.output_path("small", "gray.png")).unwrap();
        let plane = store.load(&layout.output_path("small", "gray.png")).unwrap();
        outputs.push((written, plane));
    }

    let (first_bytes, plane) = &outputs[0];
    for (bytes, _) in &outputs[1..] {
        assert_eq!(bytes, first_bytes);
    }

    // The interior sees nine gray samples; the border is zero padded
    let corner = (4.0 * GRAY as f64 / 9.0).round() as u16;
    let edge = (6.0 * GRAY as f64 / 9.0).round() as u16;
    for y in 0..4 {
        for x in 0..4 {
            let border_sides = [x == 0, x == 3, y == 0, y == 3].iter().filter(|&&b| b).count();
            let expected = match border_sides {
                0 => GRAY,
                1 => edge,
                _ => corner,
            };
            assert_eq!(plane.get(x, y), Rgba([expected, expected, expected, u16::MAX]), "({x}, {y})");
        }
    }
}

#[test]
fn empty_job_list_runs_nothing() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("effects.txt"), "").unwrap();

    for mode in MODES {
        let config = RunConfig::new().with_mode(mode).with_data_root(root.path());
        let report = ExecutionEngine::new(config).execute(&MemoryStore::new()).unwrap();
        assert!(report.outcomes.is_empty());
        assert!(report.is_success());
    }
}
