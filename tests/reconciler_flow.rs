use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use waste_sorter::config::StreamSettings;
use waste_sorter::{
    CategoryTables, ClassNames, FrameReconciler, LabelSet, LatestFrameSink, ReconcilerSettings,
    ScriptStep, ScriptedBackend, SessionState, SharedBackend, Sidebar, StepReport, StreamSession,
    SyntheticSource, VideoFrame, WasteCategory,
};

fn names() -> ClassNames {
    ClassNames::new(vec![
        "glass_bottle".into(),
        "banana_peel".into(),
        "battery".into(),
        "chip_bag".into(),
    ])
}

fn tables() -> Arc<CategoryTables> {
    Arc::new(CategoryTables::new(
        ["glass_bottle"].into_iter().collect(),
        ["chip_bag"].into_iter().collect(),
        ["battery"].into_iter().collect(),
    ))
}

fn settings() -> ReconcilerSettings {
    ReconcilerSettings {
        confidence: 0.6,
        width: 64,
        height: 36,
    }
}

fn reconciler(script: Vec<ScriptStep>, state: SessionState) -> FrameReconciler {
    let backend: SharedBackend = Arc::new(Mutex::new(ScriptedBackend::new(names(), script)));
    FrameReconciler::new(backend, tables(), state, settings())
}

fn frame(sequence: u64) -> VideoFrame {
    VideoFrame::filled(160, 90, [20, 20, 20], sequence).unwrap()
}

#[test]
fn glass_bottle_and_banana_peel_render_one_recyclable_item() {
    let state = SessionState::new();
    state.set_playing(true);
    let mut reconciler = reconciler(
        vec![ScriptStep::Detect(vec![(0, 0.9), (1, 0.85)])],
        state.clone(),
    );

    let outcome = reconciler.process(frame(1));
    let update = outcome.update().expect("label set changed");
    assert_eq!(update.recyclable, ["glass_bottle"].into_iter().collect::<LabelSet>());
    assert!(update.non_recyclable.is_empty());
    assert!(update.hazardous.is_empty());

    let mut sidebar = Sidebar::new();
    assert!(sidebar.render(&state));
    assert_eq!(
        sidebar.placeholder(WasteCategory::Recyclable).content(),
        Some("Recyclable items:\n\n- glass bottle")
    );
    assert_eq!(sidebar.text(), "Recyclable items:\n\n- glass bottle");
}

#[test]
fn unchanged_frames_do_not_trigger_rerender() {
    let state = SessionState::new();
    state.set_playing(true);
    let mut reconciler = reconciler(vec![ScriptStep::Detect(vec![(2, 0.9)])], state.clone());
    let mut sidebar = Sidebar::new();

    reconciler.process(frame(1));
    assert!(sidebar.render(&state));

    reconciler.process(frame(2));
    assert!(!state.is_dirty());
    assert!(!sidebar.render(&state));
    assert_eq!(sidebar.render_count(), 1);
}

#[test]
fn failed_frame_keeps_sidebar_and_returns_original() {
    let state = SessionState::new();
    state.set_playing(true);
    let mut reconciler = reconciler(
        vec![
            ScriptStep::Detect(vec![(3, 0.9)]),
            ScriptStep::Fail("truncated frame".into()),
        ],
        state.clone(),
    );
    let mut sidebar = Sidebar::new();

    reconciler.process(frame(1));
    sidebar.render(&state);
    let before = sidebar.text();

    let original = frame(2);
    let outcome = reconciler.process(original.clone());
    assert!(outcome.error().is_some());
    assert!(outcome.update().is_none());
    assert_eq!(outcome.frame(), &original);
    assert!(!sidebar.render(&state));
    assert_eq!(sidebar.text(), before);
    assert_eq!(before, "Non-Recyclable items:\n\n- chip bag");
}

#[test]
fn frame_thread_and_render_thread_share_state() {
    let state = SessionState::new();
    let sink = LatestFrameSink::new();
    let frames = {
        let state = state.clone();
        let sink = sink.clone();
        std::thread::spawn(move || {
            let source = SyntheticSource::new(StreamSettings {
                source: "stub://flow".into(),
                target_fps: 30,
                width: 48,
                height: 27,
            })
            .unpaced();
            let script = vec![
                ScriptStep::Detect(vec![(0, 0.9)]),
                ScriptStep::Detect(vec![(0, 0.9), (2, 0.9)]),
                ScriptStep::Detect(vec![(3, 0.9)]),
            ];
            let mut session = StreamSession::new(
                Box::new(source),
                reconciler(script, state),
                Box::new(sink),
            );
            session.start().unwrap();
            let reports: Vec<StepReport> = (0..6).map(|_| session.step().unwrap()).collect();
            (reports, session.stats())
        })
    };
    let (reports, stats) = frames.join().unwrap();

    assert!(reports.iter().all(|r| *r == StepReport::Updated));
    assert_eq!(stats.updates, 6);
    assert_eq!(sink.frames_shown(), 6);
    assert_eq!(sink.latest().map(|f| (f.width, f.height)), Some((64, 36)));

    let mut sidebar = Sidebar::new();
    assert!(sidebar.render(&state));
    assert_eq!(sidebar.text(), "Non-Recyclable items:\n\n- chip bag");
    assert!(!sidebar.render(&state));
}

#[test]
fn losing_every_label_clears_the_sidebar() {
    let state = SessionState::new();
    state.set_playing(true);
    let mut reconciler = reconciler(
        vec![ScriptStep::Detect(vec![(0, 0.9)]), ScriptStep::Detect(vec![])],
        state.clone(),
    );
    let mut sidebar = Sidebar::new();

    reconciler.process(frame(1));
    assert!(sidebar.render(&state));
    assert_eq!(sidebar.text(), "Recyclable items:\n\n- glass bottle");

    let outcome = reconciler.process(frame(2));
    assert!(outcome.update().is_some_and(|update| update.is_empty()));
    assert!(state.is_dirty());

    assert!(sidebar.render(&state));
    assert!(!state.is_dirty());
    assert_eq!(sidebar.text(), "");
    for category in WasteCategory::ALL {
        assert!(sidebar.placeholder(category).content().is_none());
    }
}

#[test]
fn render_pass_runs_alongside_frame_loop() {
    const FRAMES: u64 = 300;
    let scenes = [
        "Recyclable items:\n\n- glass bottle",
        "Recyclable items:\n\n- glass bottle\n\nHazardous items:\n\n- battery",
        "Non-Recyclable items:\n\n- chip bag",
    ];

    let state = SessionState::new();
    state.set_playing(true);
    let done = Arc::new(AtomicBool::new(false));

    let frames = {
        let state = state.clone();
        let done = done.clone();
        std::thread::spawn(move || {
            let source = SyntheticSource::new(StreamSettings {
                source: "stub://race".into(),
                target_fps: 30,
                width: 48,
                height: 27,
            })
            .unpaced();
            let script = vec![
                ScriptStep::Detect(vec![(0, 0.9)]),
                ScriptStep::Detect(vec![(0, 0.9), (2, 0.9)]),
                ScriptStep::Detect(vec![(3, 0.9)]),
            ];
            let mut session = StreamSession::new(
                Box::new(source),
                reconciler(script, state),
                Box::new(LatestFrameSink::new()),
            );
            session.start().unwrap();
            for _ in 0..FRAMES {
                session.step().unwrap();
            }
            done.store(true, Ordering::SeqCst);
            session.stats()
        })
    };

    let mut sidebar = Sidebar::new();
    let mut redraws = 0u64;
    while !done.load(Ordering::SeqCst) {
        if sidebar.render(&state) {
            redraws += 1;
            assert!(scenes.contains(&sidebar.text().as_str()));
        }
        std::thread::yield_now();
    }
    let stats = frames.join().unwrap();
    if sidebar.render(&state) {
        redraws += 1;
    }

    assert_eq!(stats.updates, FRAMES);
    assert_eq!(state.update_count(), FRAMES);
    assert!(redraws >= 1);
    assert!(redraws <= state.update_count());
    assert_eq!(sidebar.render_count(), redraws);
    assert!(!state.is_dirty());
    assert!(!sidebar.render(&state));
    assert_eq!(sidebar.text(), scenes[((FRAMES - 1) % 3) as usize]);
}

#[test]
fn stopping_the_session_clears_the_sidebar() {
    let state = SessionState::new();
    let source = SyntheticSource::new(StreamSettings {
        source: "stub://stop".into(),
        target_fps: 30,
        width: 48,
        height: 27,
    })
    .unpaced();
    let mut session = StreamSession::new(
        Box::new(source),
        reconciler(vec![ScriptStep::Detect(vec![(2, 0.9)])], state.clone()),
        Box::new(LatestFrameSink::new()),
    );
    let mut sidebar = Sidebar::new();

    session.start().unwrap();
    session.step().unwrap();
    assert!(sidebar.render(&state));
    assert_eq!(sidebar.text(), "Hazardous items:\n\n- battery");

    session.stop();
    assert!(!sidebar.render(&state));
    assert_eq!(sidebar.text(), "");
}
