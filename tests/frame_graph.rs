//! Frame graph integration tests.
//!
//! Small graphs of closure passes run through the engine on a headless
//! device. The device log of creations, uploads and submissions is what the
//! assertions look at.
//!
//! # Test Categories
//!
//! - **Ordering**: data dependencies, registration tie-breaks, cycles, writers
//! - **Resources**: handles, persistence, aliasing, slots, uploads
//! - **Execution**: undeclared access, queue fallback, parallel batches
//! - **Recovery**: failed frames and idle object trimming
//!
//! ```bash
//! cargo test --test frame_graph
//! ```

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rstest::rstest;

use common::{init_logging, Board, TestPass};
use framegraph_engine::backend::{
    BackendError, Extent2d, GpuObject, HeadlessDevice, QueueCapabilities, QueueKind, ResourceKind,
    TextureBufferDesc, TextureFormat, UniformBufferDesc,
};
use framegraph_engine::render_graph::{
    FrameGraphPassResources, FrameGraphResource, FrameGraphSlot, ResourceDesc, UploadBuffer,
};
use framegraph_engine::{Engine, FrameError, FrameGraphSettings, GraphError, GraphResult, Scene};

fn engine(settings: FrameGraphSettings) -> Engine<HeadlessDevice> {
    init_logging();
    Engine::new(HeadlessDevice::new(64, 64), settings).unwrap()
}

fn texture() -> TextureBufferDesc {
    TextureBufferDesc::attachment(Extent2d::new(64, 64), TextureFormat::Rgba8Unorm)
}

/// Pass creating a texture named `name`, writing it and publishing it on the board
fn producer<const ID: usize>(name: &'static str, board: &Board) -> TestPass<ID> {
    TestPass::new(name, board, move |b, board| {
        let texture = b.create_texture_buffer(name, texture());
        b.write(texture)?;
        board.set(name, texture);
        Ok(())
    })
}

type ObjectLog = Arc<Mutex<Vec<(String, GpuObject)>>>;

/// Execute callback logging the objects behind the named board handles
fn record_objects(
    log: &ObjectLog,
    names: &'static [&'static str],
) -> impl Fn(&FrameGraphPassResources, &Board) -> GraphResult<()> + Send + Sync + 'static {
    let log = log.clone();
    move |resources, board| {
        for name in names {
            let object = resources.object(board.get(name))?;
            log.lock().push((name.to_string(), object));
        }
        Ok(())
    }
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_dependency_beats_registration_order() {
    let board = Board::new();
    let mut engine = engine(FrameGraphSettings::default());

    let creator = TestPass::<0>::new("creator", &board, |b, board| {
        board.set("x", b.create_texture_buffer("x", texture()));
        Ok(())
    });
    let consumer = TestPass::<1>::new("consumer", &board, |b, board| b.read(board.get("x")));
    let writer = TestPass::<2>::new("writer", &board, |b, board| b.write(board.get("x")));

    let registry = engine.registry_mut();
    registry.register(creator).unwrap();
    registry.register(consumer).unwrap();
    registry.register(writer).unwrap();

    let report = engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(report.pass_order, ["creator", "writer", "consumer"]);
    assert_eq!(
        engine.device().submitted_labels(),
        ["creator", "writer", "consumer"]
    );
    // All three target the render queue and go out together
    assert_eq!(engine.device().submissions().len(), 1);
}

#[test]
fn test_independent_passes_keep_registration_order() {
    let board = Board::new();
    let mut engine = engine(FrameGraphSettings::default());
    let registry = engine.registry_mut();
    registry.register(producer::<0>("c", &board)).unwrap();
    registry.register(producer::<1>("a", &board)).unwrap();
    registry.register(producer::<2>("b", &board)).unwrap();

    for _ in 0..3 {
        let report = engine.render_frame(&Scene::default()).unwrap();
        assert_eq!(report.pass_order, ["c", "a", "b"]);
        assert_eq!(report.batches, [vec!["c", "a", "b"]]);
    }
}

#[test]
fn test_cycle_is_rejected_before_any_work() {
    let board = Board::new();
    let mut engine = engine(FrameGraphSettings::default());

    let creator = TestPass::<0>::new("creator", &board, |b, board| {
        board.set("x", b.create_texture_buffer("x", texture()));
        board.set("y", b.create_texture_buffer("y", texture()));
        Ok(())
    });
    let a = TestPass::<1>::new("a", &board, |b, board| {
        b.read(board.get("x"))?;
        b.write(board.get("y"))
    });
    let c = TestPass::<2>::new("b", &board, |b, board| {
        b.read(board.get("y"))?;
        b.write(board.get("x"))
    });
    let registry = engine.registry_mut();
    registry.register(creator).unwrap();
    registry.register(a).unwrap();
    registry.register(c).unwrap();

    let err = engine.render_frame(&Scene::default()).unwrap_err();
    assert_eq!(
        err,
        FrameError::Graph(GraphError::CyclicDependency {
            passes: vec!["a".to_string(), "b".to_string()],
        })
    );
    assert!(engine.device().submissions().is_empty());
    assert_eq!(engine.device().created_count(), 0);
}

#[test]
fn test_unordered_writers_are_rejected() {
    let board = Board::new();
    let mut engine = engine(FrameGraphSettings::default());

    let creator = TestPass::<0>::new("creator", &board, |b, board| {
        board.set("x", b.create_texture_buffer("x", texture()));
        Ok(())
    });
    let first = TestPass::<1>::new("first", &board, |b, board| b.write(board.get("x")));
    let second = TestPass::<2>::new("second", &board, |b, board| b.write(board.get("x")));
    let registry = engine.registry_mut();
    registry.register(creator).unwrap();
    registry.register(first).unwrap();
    registry.register(second).unwrap();

    let err = engine.render_frame(&Scene::default()).unwrap_err();
    assert_eq!(
        err,
        FrameError::Graph(GraphError::MultipleWriters {
            resource: "x".to_string(),
            first: "first".to_string(),
            second: "second".to_string(),
        })
    );
    assert!(engine.device().submissions().is_empty());
}

#[test]
fn test_writers_ordered_through_a_read_are_accepted() {
    let board = Board::new();
    let mut engine = engine(FrameGraphSettings::default());

    let clear = producer::<0>("clear", &board);
    // Reading and writing orders the draw after the clear
    let draw = TestPass::<1>::new("draw", &board, |b, board| {
        let target = board.get("clear");
        b.read(target)?;
        b.write(target)
    });
    let registry = engine.registry_mut();
    registry.register(clear).unwrap();
    registry.register(draw).unwrap();

    let report = engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(report.pass_order, ["clear", "draw"]);
}

// ============================================================================
// Resources
// ============================================================================

#[test]
fn test_handles_are_unique_and_go_stale_after_the_frame() {
    let board = Board::new();
    let handles: Arc<Mutex<Vec<FrameGraphResource>>> = Arc::default();
    let mut engine = engine(FrameGraphSettings::default());

    let recorded = handles.clone();
    let creator = TestPass::<0>::new("creator", &board, move |b, _| {
        let mut handles = recorded.lock();
        if handles.is_empty() {
            for i in 0..64 {
                let buffer = b.create_uniform_buffer(&format!("buffer {}", i), UniformBufferDesc::new(64));
                b.write(buffer)?;
                handles.push(buffer);
            }
            Ok(())
        } else {
            b.read(handles[0])
        }
    });
    engine.registry_mut().register(creator).unwrap();

    engine.render_frame(&Scene::default()).unwrap();
    let unique: HashSet<_> = handles.lock().iter().copied().collect();
    assert_eq!(unique.len(), 64);
    assert!(unique.iter().all(|h| h.is_assigned()));

    let err = engine.render_frame(&Scene::default()).unwrap_err();
    assert!(matches!(
        err,
        FrameError::Graph(GraphError::StaleHandle { .. })
    ));
}

#[rstest]
#[case::three_frames(3)]
#[case::ten_frames(10)]
fn test_persisted_resource_is_created_once(#[case] frames: usize) {
    let board = Board::new();
    let size = Arc::new(AtomicU64::new(256));
    let seen: Arc<Mutex<Vec<GpuObject>>> = Arc::default();
    let mut engine = engine(FrameGraphSettings::default());

    let requested = size.clone();
    let recorded = seen.clone();
    let owner = TestPass::<0>::new("owner", &board, move |b, board| {
        let desc = ResourceDesc::UniformBuffer(UniformBufferDesc::new(
            requested.load(Ordering::SeqCst),
        ));
        let mut constants = board.get("constants");
        if !b.contains(constants) {
            constants = b.create_resource("constants", desc);
            board.set("constants", constants);
        } else if b.desc(constants)? != &desc {
            b.redeclare(constants, desc)?;
        }
        b.persist(constants)?;
        b.write(constants)
    })
    .on_execute(move |resources, board| {
        recorded.lock().push(resources.object(board.get("constants"))?);
        Ok(())
    });
    engine.registry_mut().register(owner).unwrap();

    for _ in 0..frames {
        engine.render_frame(&Scene::default()).unwrap();
    }
    assert_eq!(engine.device().created_count(), 1);
    {
        let seen = seen.lock();
        assert_eq!(seen.len(), frames);
        assert!(seen.iter().all(|&object| object == seen[0]));
        assert!(engine.device().is_live(seen[0]));
    }

    // A changed descriptor replaces the physical object
    size.store(512, Ordering::SeqCst);
    engine.render_frame(&Scene::default()).unwrap();
    engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(engine.device().created_count(), 2);
    let seen = seen.lock();
    assert_ne!(seen[frames], seen[0]);
    assert_eq!(seen[frames], seen[frames + 1]);
}

#[rstest]
#[case::aliasing(true, 2, 1)]
#[case::no_aliasing(false, 3, 0)]
fn test_transients_alias_only_when_lifetimes_are_disjoint(
    #[case] alias_transients: bool,
    #[case] expected_objects: usize,
    #[case] expected_aliased: usize,
) {
    let board = Board::new();
    let objects: ObjectLog = Arc::default();
    let mut engine = engine(FrameGraphSettings {
        alias_transients,
        ..Default::default()
    });


    // t0 lives over passes 0-1, t1 over 1-2, t2 over 2-3
    let p0 = producer::<0>("t0", &board).on_execute(record_objects(&objects, &["t0"]));
    let p1 = TestPass::<1>::new("t1", &board, |b, board| {
        b.read(board.get("t0"))?;
        let t1 = b.create_texture_buffer("t1", texture());
        b.write(t1)?;
        board.set("t1", t1);
        Ok(())
    })
    .on_execute(record_objects(&objects, &["t0", "t1"]));
    let p2 = TestPass::<2>::new("t2", &board, |b, board| {
        b.read(board.get("t1"))?;
        let t2 = b.create_texture_buffer("t2", texture());
        b.write(t2)?;
        board.set("t2", t2);
        Ok(())
    })
    .on_execute(record_objects(&objects, &["t1", "t2"]));
    let p3 = TestPass::<3>::new("sink", &board, |b, board| b.read(board.get("t2")))
        .on_execute(record_objects(&objects, &["t2"]));

    let registry = engine.registry_mut();
    registry.register(p0).unwrap();
    registry.register(p1).unwrap();
    registry.register(p2).unwrap();
    registry.register(p3).unwrap();

    let report = engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(report.transient_objects, expected_objects);
    assert_eq!(report.aliased, expected_aliased);
    assert_eq!(engine.device().created_count(), expected_objects);

    let objects = objects.lock();
    let object_of = |name: &str| {
        objects
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, o)| *o)
            .unwrap()
    };
    // Overlapping lifetimes never share an object
    assert_ne!(object_of("t0"), object_of("t1"));
    assert_ne!(object_of("t1"), object_of("t2"));
    assert_eq!(object_of("t0") == object_of("t2"), alias_transients);

    // A second frame reuses the pooled objects
    drop(objects);
    engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(engine.device().created_count(), expected_objects);
}

#[test]
fn test_unaccessed_transient_is_culled() {
    let board = Board::new();
    let mut engine = engine(FrameGraphSettings::default());
    let pass = TestPass::<0>::new("creator", &board, |b, _| {
        b.create_texture_buffer("unused", texture());
        Ok(())
    });
    engine.registry_mut().register(pass).unwrap();

    let report = engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(report.culled, 1);
    assert_eq!(engine.device().created_count(), 0);
}

#[test]
fn test_slots_are_per_frame() {
    let board = Board::new();
    let assign = Arc::new(AtomicBool::new(true));
    let observed: Arc<Mutex<Vec<(bool, bool, bool)>>> = Arc::default();
    let mut engine = engine(FrameGraphSettings::default());

    let enabled = assign.clone();
    let assigner = TestPass::<0>::new("assigner", &board, move |b, board| {
        let screen = b.create_texture_buffer("screen", texture());
        b.write(screen)?;
        board.set("screen", screen);
        if enabled.load(Ordering::SeqCst) {
            b.assign_slot(FrameGraphSlot::ScreenColor, screen)?;
        }
        Ok(())
    });
    let recorded = observed.clone();
    let query = TestPass::<1>::new("query", &board, move |b, board| {
        let assigned = b.check_slot(FrameGraphSlot::ScreenColor);
        let matches = b.get_slot(FrameGraphSlot::ScreenColor) == board.get("screen");
        let shadow = b.get_slot(FrameGraphSlot::ShadowMapPoint).is_assigned();
        recorded.lock().push((assigned, matches, shadow));
        if assigned {
            b.read(b.get_slot(FrameGraphSlot::ScreenColor))?;
        }
        Ok(())
    });
    let registry = engine.registry_mut();
    registry.register(assigner).unwrap();
    registry.register(query).unwrap();

    engine.render_frame(&Scene::default()).unwrap();
    assign.store(false, Ordering::SeqCst);
    engine.render_frame(&Scene::default()).unwrap();

    assert_eq!(*observed.lock(), [(true, true, false), (false, false, false)]);
}

#[test]
fn test_slot_cannot_be_assigned_twice() {
    let board = Board::new();
    let mut engine = engine(FrameGraphSettings::default());
    let first = producer::<0>("first", &board);
    let second = TestPass::<1>::new("second", &board, |b, board| {
        b.assign_slot(FrameGraphSlot::ScreenColor, board.get("first"))?;
        let other = b.create_texture_buffer("other", texture());
        b.assign_slot(FrameGraphSlot::ScreenColor, other)
    });
    let registry = engine.registry_mut();
    registry.register(first).unwrap();
    registry.register(second).unwrap();

    let err = engine.render_frame(&Scene::default()).unwrap_err();
    assert_eq!(
        err,
        FrameError::Graph(GraphError::SlotAlreadyAssigned {
            slot: FrameGraphSlot::ScreenColor,
        })
    );
}

#[test]
fn test_upload_runs_at_execution_not_setup() {
    let board = Board::new();
    let produced = Arc::new(AtomicUsize::new(0));
    let produced_during_setup = Arc::new(AtomicUsize::new(usize::MAX));
    let mut engine = engine(FrameGraphSettings::default());

    let counter = produced.clone();
    let uploader = TestPass::<0>::new("uploader", &board, move |b, board| {
        let constants = b.create_uniform_buffer("constants", UniformBufferDesc::new(16));
        let counter = counter.clone();
        b.upload(constants, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            UploadBuffer::from_value(&[1.0f32, 2.0, 3.0, 4.0])
        })?;
        board.set("constants", constants);
        Ok(())
    });
    let counter = produced.clone();
    let observed = produced_during_setup.clone();
    let reader = TestPass::<1>::new("reader", &board, move |b, board| {
        observed.store(counter.load(Ordering::SeqCst), Ordering::SeqCst);
        b.read(board.get("constants"))
    });
    let registry = engine.registry_mut();
    registry.register(uploader).unwrap();
    registry.register(reader).unwrap();

    let report = engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(produced_during_setup.load(Ordering::SeqCst), 0);
    assert_eq!(produced.load(Ordering::SeqCst), 1);
    assert_eq!(report.execution.uploads, 1);

    let uploads = engine.device().uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0.kind(), ResourceKind::UniformBuffer);
    assert_eq!(uploads[0].1, 16);
}

// ============================================================================
// Execution
// ============================================================================

#[rstest]
#[case::sequential(false)]
#[case::parallel(true)]
fn test_undeclared_access_fails_only_that_frame(#[case] parallel_execute: bool) {
    let board = Board::new();
    let misbehave = Arc::new(AtomicBool::new(true));
    let mut engine = engine(FrameGraphSettings {
        parallel_execute,
        ..Default::default()
    });

    let writer = TestPass::<0>::new("writer", &board, |b, board| {
        for name in ["x", "y"] {
            let texture = b.create_texture_buffer(name, texture());
            b.write(texture)?;
            board.set(name, texture);
        }
        Ok(())
    });
    let enabled = misbehave.clone();
    let reader = TestPass::<1>::new("reader", &board, |b, board| b.read(board.get("x")))
        .on_execute(move |resources, board| {
            resources.object(board.get("x"))?;
            if enabled.load(Ordering::SeqCst) {
                resources.object(board.get("y"))?;
            }
            Ok(())
        });
    let registry = engine.registry_mut();
    registry.register(writer).unwrap();
    registry.register(reader).unwrap();

    let err = engine.render_frame(&Scene::default()).unwrap_err();
    assert_eq!(
        err,
        FrameError::Graph(GraphError::UndeclaredAccess {
            pass: "reader".to_string(),
            resource: "y".to_string(),
        })
    );
    assert!(engine.device().submissions().is_empty());

    misbehave.store(false, Ordering::SeqCst);
    let report = engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(report.pass_order, ["writer", "reader"]);
    assert_eq!(engine.device().submitted_labels(), ["writer", "reader"]);
}

fn register_queue_chain(engine: &mut Engine<HeadlessDevice>, board: &Board) {
    let a = producer::<0>("a", board);
    let b = TestPass::<1>::new("b", board, |b, board| {
        b.read(board.get("a"))?;
        let y = b.create_texture_buffer("y", texture());
        b.write(y)?;
        board.set("y", y);
        Ok(())
    })
    .on_queue(QueueKind::Compute);
    let c = TestPass::<2>::new("c", board, |b, board| b.read(board.get("y")));

    let registry = engine.registry_mut();
    registry.register(a).unwrap();
    registry.register(b).unwrap();
    registry.register(c).unwrap();
}

#[test]
fn test_submissions_follow_queue_changes() {
    let board = Board::new();
    let mut engine = engine(FrameGraphSettings::default());
    register_queue_chain(&mut engine, &board);

    let report = engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(report.execution.submissions, 3);
    assert_eq!(report.execution.queue_fallbacks, 0);

    let queues: Vec<_> = engine
        .device()
        .submissions()
        .iter()
        .map(|s| s.queue)
        .collect();
    assert_eq!(queues, [QueueKind::Render, QueueKind::Compute, QueueKind::Render]);
}

#[test]
fn test_missing_queue_falls_back_to_render() {
    init_logging();
    let board = Board::new();
    let device = HeadlessDevice::new(64, 64).with_queues(QueueCapabilities::render_only());
    let mut engine = Engine::new(device, FrameGraphSettings::default()).unwrap();
    register_queue_chain(&mut engine, &board);

    let report = engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(report.execution.queue_fallbacks, 1);
    assert_eq!(report.execution.command_buffers, 3);
    assert_eq!(report.execution.submissions, 1);

    let submissions = engine.device().submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].queue, QueueKind::Render);
    assert_eq!(submissions[0].labels(), ["a", "b", "c"]);
}

#[rstest]
#[case::sequential(false)]
#[case::parallel(true)]
fn test_execution_mode_does_not_change_the_frame(#[case] parallel_execute: bool) {
    let board = Board::new();
    let mut engine = engine(FrameGraphSettings {
        parallel_execute,
        ..Default::default()
    });

    let root = producer::<0>("root", &board);
    let left = TestPass::<1>::new("left", &board, |b, board| {
        b.read(board.get("root"))?;
        let left = b.create_texture_buffer("left", texture());
        b.write(left)?;
        board.set("left", left);
        Ok(())
    });
    let right = TestPass::<2>::new("right", &board, |b, board| {
        b.read(board.get("root"))?;
        let right = b.create_texture_buffer("right", texture());
        b.write(right)?;
        board.set("right", right);
        Ok(())
    });
    let sink = TestPass::<3>::new("sink", &board, |b, board| {
        b.read(board.get("left"))?;
        b.read(board.get("right"))
    });
    let registry = engine.registry_mut();
    registry.register(root).unwrap();
    registry.register(right).unwrap();
    registry.register(left).unwrap();
    registry.register(sink).unwrap();

    let report = engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(
        report.batches,
        [vec!["root"], vec!["right", "left"], vec!["sink"]]
    );
    assert_eq!(
        engine.device().submitted_labels(),
        ["root", "right", "left", "sink"]
    );
}

// ============================================================================
// Recovery
// ============================================================================

#[test]
fn test_failed_frame_keeps_persisted_objects() {
    let board = Board::new();
    let grow = Arc::new(AtomicBool::new(false));
    let seen: Arc<Mutex<Vec<GpuObject>>> = Arc::default();
    let mut engine = engine(FrameGraphSettings::default());

    let recorded = seen.clone();
    let owner = TestPass::<0>::new("owner", &board, |b, board| {
        let mut history = board.get("history");
        if !b.contains(history) {
            history = b.create_texture_buffer("history", texture());
            board.set("history", history);
        }
        b.persist(history)?;
        b.write(history)
    })
    .on_execute(move |resources, board| {
        recorded.lock().push(resources.object(board.get("history"))?);
        Ok(())
    });
    let enabled = grow.clone();
    let extra = TestPass::<1>::new("extra", &board, move |b, board| {
        b.read(board.get("history"))?;
        if enabled.load(Ordering::SeqCst) {
            let scratch = b.create_uniform_buffer("scratch", UniformBufferDesc::new(64));
            b.write(scratch)?;
        }
        Ok(())
    });
    let registry = engine.registry_mut();
    registry.register(owner).unwrap();
    registry.register(extra).unwrap();

    engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(engine.device().created_count(), 1);

    grow.store(true, Ordering::SeqCst);
    engine.device_mut().fail_creation_after(0);
    engine.device_mut().clear_log();
    let err = engine.render_frame(&Scene::default()).unwrap_err();
    assert!(matches!(
        err,
        FrameError::Backend(BackendError::ResourceCreationFailed { .. })
    ));
    assert!(engine.device().submissions().is_empty());
    assert!(engine.device().is_live(seen.lock()[0]));

    engine.device_mut().allow_creation();
    engine.render_frame(&Scene::default()).unwrap();
    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], seen[1]);
    assert_eq!(engine.device().created_of_kind(ResourceKind::TextureBuffer), 1);
    assert_eq!(engine.device().submitted_labels(), ["owner", "extra"]);
}

/// A failed frame either grows the persisted constants, or leaves them
/// unreferenced while a scratch texture fails to be created. Whatever the
/// recovery frame asks for, the object it binds gets its contents again.
#[rstest]
#[case::grown_and_kept(Some(512), 512)]
#[case::grown_and_reverted(Some(512), 256)]
#[case::unreferenced(None, 256)]
fn test_failed_frame_does_not_skip_uploads(
    #[case] failing_size: Option<u64>,
    #[case] recovery_size: u64,
) {
    let board = Board::new();
    let size = Arc::new(AtomicU64::new(256));
    let referenced = Arc::new(AtomicBool::new(true));
    let seen: Arc<Mutex<Vec<GpuObject>>> = Arc::default();
    let mut engine = engine(FrameGraphSettings::default());

    let requested = size.clone();
    let wanted = referenced.clone();
    let recorded = seen.clone();
    let owner = TestPass::<0>::new("owner", &board, move |b, board| {
        if !wanted.load(Ordering::SeqCst) {
            return Ok(());
        }
        let desc = ResourceDesc::UniformBuffer(UniformBufferDesc::new(
            requested.load(Ordering::SeqCst),
        ));
        let mut constants = board.get("constants");
        let fresh = if !b.contains(constants) {
            constants = b.create_resource("constants", desc);
            board.set("constants", constants);
            true
        } else if b.desc(constants)? != &desc {
            b.redeclare(constants, desc)?;
            true
        } else {
            false
        };
        b.persist(constants)?;
        if fresh {
            b.upload(constants, || UploadBuffer::from_bytes(vec![1; 16]))?;
        }
        b.read(constants)
    })
    .on_execute(move |resources, board| {
        if let Ok(object) = resources.object(board.get("constants")) {
            recorded.lock().push(object);
        }
        Ok(())
    });
    let scratch_wanted = referenced.clone();
    let scratch = TestPass::<1>::new("scratch", &board, move |b, _| {
        if !scratch_wanted.load(Ordering::SeqCst) {
            let scratch = b.create_texture_buffer("scratch", texture());
            b.write(scratch)?;
        }
        Ok(())
    });
    let registry = engine.registry_mut();
    registry.register(owner).unwrap();
    registry.register(scratch).unwrap();

    engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(engine.device().uploads().len(), 1);

    match failing_size {
        Some(bytes) => size.store(bytes, Ordering::SeqCst),
        None => referenced.store(false, Ordering::SeqCst),
    }
    engine.device_mut().fail_creation_after(0);
    assert!(engine.render_frame(&Scene::default()).is_err());

    engine.device_mut().allow_creation();
    engine.device_mut().clear_log();
    size.store(recovery_size, Ordering::SeqCst);
    referenced.store(true, Ordering::SeqCst);
    engine.render_frame(&Scene::default()).unwrap();

    let object = *seen.lock().last().unwrap();
    assert!(engine.device().is_live(object));
    assert!(engine.device().uploads().iter().any(|(o, _)| *o == object));

    // Contents stay valid afterwards, so the next frame uploads nothing
    engine.device_mut().clear_log();
    engine.render_frame(&Scene::default()).unwrap();
    assert!(engine.device().uploads().is_empty());
    assert_eq!(*seen.lock().last().unwrap(), object);
}

#[test]
fn test_idle_pooled_objects_are_trimmed() {
    let board = Board::new();
    let active = Arc::new(AtomicBool::new(true));
    let mut engine = engine(FrameGraphSettings {
        max_idle_frames: 1,
        ..Default::default()
    });

    let enabled = active.clone();
    let pass = TestPass::<0>::new("scratch", &board, move |b, _| {
        if enabled.load(Ordering::SeqCst) {
            let scratch = b.create_texture_buffer("scratch", texture());
            b.write(scratch)?;
        }
        Ok(())
    });
    engine.registry_mut().register(pass).unwrap();

    engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(engine.device().created_count(), 1);
    assert_eq!(engine.device().live_count(), 1);

    active.store(false, Ordering::SeqCst);
    engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(engine.device().destroyed_count(), 0);
    engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(engine.device().destroyed_count(), 1);
    assert_eq!(engine.device().live_count(), 0);
}

#[test]
fn test_shutdown_destroys_every_object() {
    let board = Board::new();
    let mut engine = engine(FrameGraphSettings::default());
    let owner = TestPass::<0>::new("owner", &board, |b, board| {
        let mut history = board.get("history");
        if !b.contains(history) {
            history = b.create_texture_buffer("history", texture());
            board.set("history", history);
        }
        b.persist(history)?;
        b.write(history)?;
        let scratch = b.create_texture_buffer("scratch", texture());
        b.write(scratch)
    });
    engine.registry_mut().register(owner).unwrap();

    engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(engine.device().live_count(), 2);

    engine.shutdown();
    assert_eq!(engine.device().live_count(), 0);
    assert_eq!(engine.device().destroyed_count(), 2);

    // The persisted handle is gone, so the pass recreates it
    engine.render_frame(&Scene::default()).unwrap();
    assert_eq!(engine.device().live_count(), 2);
}
