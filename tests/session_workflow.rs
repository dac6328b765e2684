use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use waveregions::backend::DocumentBackend;
use waveregions::history_store::MemoryStore;
use waveregions::render::{
    RegionEvent, RegionEventKind, RegionRenderer, VisualHandle, VisualRegion,
};
use waveregions::session::{EventOutcome, LoadOutcome, SwitchOutcome};
use waveregions::{EditorConfig, EditorError, EditorSession, RegionId, Side};

const ROWS: &str = "A,0,5\nA,10,15\nB,20,25\n";

#[derive(Default)]
struct FakeBackend {
    versions: HashMap<String, String>,
    fail_increment: bool,
    increments: usize,
    message: Option<String>,
    files: HashMap<String, String>,
}

impl FakeBackend {
    fn with(version: &str, text: &str) -> Self {
        let mut b = Self::default();
        b.versions.insert(version.to_string(), text.to_string());
        b
    }
}

impl DocumentBackend for FakeBackend {
    fn fetch_rows(&mut self, version: &str) -> anyhow::Result<String> {
        self.versions
            .get(version)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no version {version}"))
    }

    fn increment_version(&mut self) -> anyhow::Result<()> {
        if self.fail_increment {
            anyhow::bail!("service unavailable");
        }
        self.increments += 1;
        Ok(())
    }

    fn set_commit_message(&mut self, message: &str) -> anyhow::Result<()> {
        self.message = Some(message.to_string());
        Ok(())
    }

    fn set_associated_file(&mut self, name: &str, content: &str) -> anyhow::Result<()> {
        self.files.insert(name.to_string(), content.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingRenderer {
    next: u64,
    live: BTreeMap<VisualHandle, VisualRegion>,
}

impl RegionRenderer for RecordingRenderer {
    fn add_visual_region(&mut self, region: &VisualRegion) -> VisualHandle {
        self.next += 1;
        let handle = VisualHandle(self.next);
        self.live.insert(handle, region.clone());
        handle
    }

    fn remove_visual_region(&mut self, handle: VisualHandle) {
        self.live.remove(&handle);
    }
}

impl RecordingRenderer {
    fn handle_for(&self, label: &str) -> VisualHandle {
        self.live
            .iter()
            .find(|(_, v)| v.label == label)
            .map(|(h, _)| *h)
            .unwrap_or_else(|| panic!("no visual labelled {label}"))
    }
}

fn session() -> EditorSession {
    EditorSession::with_store("doc-1", EditorConfig::default(), Arc::new(MemoryStore::new()))
        .expect("session")
}

fn loaded(text: &str) -> EditorSession {
    let mut s = session();
    let ticket = s.begin_load(Side::Primary, "current");
    s.complete_load(&ticket, text).expect("load");
    s
}

fn id_at(s: &EditorSession, side: Side, index: usize) -> RegionId {
    s.set(side).working()[index].id
}

fn bounds(s: &EditorSession, side: Side) -> Vec<(String, f64, f64)> {
    s.set(side)
        .working()
        .iter()
        .map(|r| (r.label.clone(), r.start, r.end))
        .collect()
}

#[test]
fn load_applies_rows_and_starts_fresh_history() {
    let mut s = session();
    let ticket = s.begin_load(Side::Primary, "current");
    let outcome = s
        .complete_load(&ticket, "A,0,5\nbroken\nB,5,9\n")
        .expect("load");
    match outcome {
        LoadOutcome::Applied(summary) => {
            assert_eq!(summary.regions, 2);
            assert_eq!(summary.row_errors.len(), 1);
            assert_eq!(summary.row_errors[0].line, 2);
        }
        LoadOutcome::Stale => panic!("fresh ticket reported stale"),
    }
    assert_eq!(s.history().len(), 1);
    assert!(!s.can_undo());
    assert_eq!(s.version(Side::Primary), Some("current"));
}

#[test]
fn stale_load_result_is_ignored() {
    let mut s = session();
    let old = s.begin_load(Side::Primary, "nminus-1");
    let new = s.begin_load(Side::Primary, "current");
    s.complete_load(&new, ROWS).expect("load");
    let outcome = s.complete_load(&old, "X,0,1\n").expect("stale load");
    assert_eq!(outcome, LoadOutcome::Stale);
    assert_eq!(s.primary().len(), 3);
    assert_eq!(s.version(Side::Primary), Some("current"));
}

#[test]
fn drag_merges_and_undo_redo_restore() {
    let mut s = loaded(ROWS);
    let first = id_at(&s, Side::Primary, 0);
    let moved = id_at(&s, Side::Primary, 1);

    let report = s.drag_region(moved, 4.0, 12.0).expect("drag");
    let merge = report.merge.expect("merge happened");
    assert_eq!(merge.absorbed, vec![first]);
    assert_eq!(
        bounds(&s, Side::Primary),
        vec![("A".to_string(), 0.0, 12.0), ("B".to_string(), 20.0, 25.0)]
    );

    assert!(s.undo());
    assert_eq!(s.primary().len(), 3);
    assert_eq!(s.selected(), Some(moved));
    assert_eq!(s.selected_region().map(|r| (r.start, r.end)), Some((10.0, 15.0)));

    assert!(s.redo());
    assert_eq!(s.primary().len(), 2);
    assert!(!s.redo());
}

#[test]
fn consecutive_time_edits_are_one_undo_step() {
    let mut s = loaded(ROWS);
    let b = id_at(&s, Side::Primary, 2);
    s.select(Side::Primary, b).expect("select");
    s.set_times(20.0, 26.0, None).expect("edit");
    s.set_times(20.0, 27.0, None).expect("edit");
    assert_eq!(s.history().len(), 2);

    assert!(s.undo());
    assert_eq!(s.selected_region().map(|r| r.end), Some(25.0));
    assert!(!s.can_undo());
}

#[test]
fn typed_times_are_corrected() {
    let mut s = loaded(ROWS);
    let b = id_at(&s, Side::Primary, 2);
    s.select(Side::Primary, b).expect("select");
    s.set_times(30.0, 28.0, Some(100.0)).expect("edit");
    assert_eq!(s.selected_region().map(|r| (r.start, r.end)), Some((27.0, 28.0)));
    s.set_times(90.0, 140.0, Some(100.0)).expect("edit");
    assert_eq!(s.selected_region().map(|r| (r.start, r.end)), Some((90.0, 100.0)));
    assert!(matches!(
        s.set_times(f64::NAN, 3.0, None),
        Err(EditorError::InvalidInterval { .. })
    ));
}

#[test]
fn editing_locked_region_unlocks_and_undo_relocks() {
    let mut s = loaded("C,30,35,true\n");
    let c = id_at(&s, Side::Primary, 0);
    s.select(Side::Primary, c).expect("select");
    let report = s.set_label("Carol").expect("relabel");
    assert_eq!(report.unlocked, vec![c]);
    assert!(!s.selected_region().expect("region").locked);

    assert!(s.undo());
    let r = s.primary().get(c).expect("region");
    assert!(r.locked);
    assert_eq!(r.label, "C");
}

#[test]
fn bad_labels_are_refused_without_history() {
    let mut s = loaded(ROWS);
    assert!(matches!(s.set_label("X"), Err(EditorError::NoSelection)));
    s.select(Side::Primary, id_at(&s, Side::Primary, 0)).expect("select");
    assert!(matches!(s.set_label("   "), Err(EditorError::EmptyLabel)));
    assert!(matches!(s.set_label("a,b"), Err(EditorError::InvalidLabel { .. })));
    assert_eq!(s.history().len(), 1);
    assert_eq!(s.primary().working()[0].label, "A");
}

#[test]
fn new_regions_step_right() {
    let mut s = session();
    let a = s.create_region(0.0).expect("create");
    let b = s.create_region(100.0).expect("create");
    let ra = s.primary().get(a).expect("first");
    let rb = s.primary().get(b).expect("second");
    assert_eq!((ra.start, ra.end), (0.0, 15.0));
    assert_eq!((rb.start, rb.end), (105.0, 120.0));
    assert_eq!(ra.label, "NEW_SPEAKER");
    assert_eq!(s.selected(), Some(b));
    assert!(s.edits_made());
}

#[test]
fn remove_then_undo_reselects() {
    let mut s = loaded(ROWS);
    let b = id_at(&s, Side::Primary, 2);
    s.select(Side::Primary, b).expect("select");
    let removed = s.remove_selected().expect("remove");
    assert_eq!(removed.len(), 1);
    assert_eq!(s.selected(), None);
    assert_eq!(s.primary().len(), 2);

    assert!(s.undo());
    assert_eq!(s.primary().len(), 3);
    assert_eq!(s.selected(), Some(b));
    assert_eq!(s.selected_index(), Some(2));
}

#[test]
fn select_all_then_relabel() {
    let mut s = loaded(ROWS);
    s.select(Side::Primary, id_at(&s, Side::Primary, 0)).expect("select");
    assert_eq!(s.set_select_all(true).expect("select all"), 2);
    assert_eq!(s.selected_indexes(), vec![0, 1]);

    s.set_label("Ann").expect("relabel");
    let labels: Vec<&str> = s.primary().working().iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["Ann", "Ann", "B"]);
    assert!(s.primary().known_labels().contains("Ann"));
    assert!(!s.primary().known_labels().contains("A"));
}

#[test]
fn dual_track_operations() {
    let mut s = loaded(ROWS);
    let ticket = s.begin_load(Side::Secondary, "nminus-1");
    s.complete_load(&ticket, "X,1,3\nY,40,50\n").expect("load secondary");
    let a = id_at(&s, Side::Primary, 0);
    s.select(Side::Primary, a).expect("select");

    assert!(matches!(s.copy_selected(), Err(EditorError::DualModeRequired)));
    assert!(s.toggle_dual_mode());

    let ids = s.replace_selected().expect("replace");
    assert_eq!(ids.len(), 1);
    assert_ne!(ids[0], a);
    assert_eq!(
        bounds(&s, Side::Secondary),
        vec![("A".to_string(), 0.0, 5.0), ("Y".to_string(), 40.0, 50.0)]
    );
    assert_eq!(s.boundary_conflicts().len(), 1);
    assert!(s.label_conflicts().is_empty());

    assert!(s.undo());
    assert_eq!(s.secondary().len(), 2);
    assert_eq!(s.secondary().working()[0].label, "X");
}

#[test]
fn overdub_merges_into_other_track() {
    let mut s = loaded(ROWS);
    let ticket = s.begin_load(Side::Secondary, "nminus-1");
    s.complete_load(&ticket, "A,3,8\n").expect("load secondary");
    s.toggle_dual_mode();
    s.select(Side::Primary, id_at(&s, Side::Primary, 0)).expect("select");

    let kept = s.overdub_selected().expect("overdub");
    assert_eq!(kept.len(), 1);
    assert_eq!(bounds(&s, Side::Secondary), vec![("A".to_string(), 0.0, 8.0)]);

    assert!(s.undo());
    assert_eq!(bounds(&s, Side::Secondary), vec![("A".to_string(), 3.0, 8.0)]);
}

#[test]
fn label_and_boundary_conflicts() {
    let mut s = loaded("X,2,5\nZ,6,7\n");
    let ticket = s.begin_load(Side::Secondary, "nminus-1");
    s.complete_load(&ticket, "Y,2,5\nZ,6,7\n").expect("load secondary");
    assert_eq!(s.boundary_conflicts().len(), 2);
    let labels = s.label_conflicts();
    assert_eq!(labels.len(), 1);
    assert_eq!(s.primary().get(labels[0].primary).map(|r| r.label.as_str()), Some("X"));
}

#[test]
fn commit_writes_rows_and_resets_history() {
    let mut s = loaded(ROWS);
    let mut backend = FakeBackend::default();
    assert!(matches!(
        s.commit("  ", &mut backend),
        Err(EditorError::EmptyCommitMessage)
    ));
    assert_eq!(backend.increments, 0);

    s.select(Side::Primary, id_at(&s, Side::Primary, 2)).expect("select");
    s.set_label("SPEAKER_07").expect("relabel");
    assert!(s.has_unsaved_changes("current"));

    s.commit("fix speaker", &mut backend).expect("commit");
    assert_eq!(backend.increments, 1);
    assert_eq!(backend.message.as_deref(), Some("fix speaker"));
    assert_eq!(
        backend.files.get("structured-audio.csv").map(String::as_str),
        Some("A,0,5,false,true,true\nA,10,15,false,true,true\nSPEAKER_07,20,25,false,false,false\n")
    );
    assert_eq!(s.primary().committed(), s.primary().working());
    assert!(!s.can_undo());
    assert!(!s.has_unsaved_changes("current"));
}

#[test]
fn failed_commit_keeps_local_state() {
    let mut s = loaded(ROWS);
    s.select(Side::Primary, id_at(&s, Side::Primary, 0)).expect("select");
    s.set_label("Ann").expect("relabel");
    let mut backend = FakeBackend {
        fail_increment: true,
        ..FakeBackend::default()
    };
    assert!(matches!(
        s.commit("msg", &mut backend),
        Err(EditorError::Backend(_))
    ));
    assert!(s.can_undo());
    assert!(s.primary().is_dirty());
    assert!(backend.files.is_empty());
}

#[test]
fn discard_returns_to_committed() {
    let mut s = loaded(ROWS);
    s.select(Side::Primary, id_at(&s, Side::Primary, 0)).expect("select");
    s.remove_selected().expect("remove");
    s.discard();
    assert_eq!(s.primary().working(), s.primary().committed());
    assert_eq!(s.primary().len(), 3);
    assert!(!s.can_undo());
    assert!(!s.edits_made());
}

#[test]
fn switching_versions_guards_unsaved_edits() {
    let mut backend = FakeBackend::with("current", ROWS);
    backend
        .versions
        .insert("nminus-1".to_string(), "Q,1,2\n".to_string());
    let mut s = session();
    s.load_from(&mut backend, Side::Primary, "current").expect("load");
    s.select(Side::Primary, id_at(&s, Side::Primary, 0)).expect("select");
    s.set_label("Ann").expect("relabel");

    let refused = s
        .switch_version(Side::Primary, "nminus-1", &mut backend, false)
        .expect("switch");
    assert_eq!(
        refused,
        SwitchOutcome::UnsavedChanges {
            version: "current".to_string()
        }
    );
    assert_eq!(s.primary().len(), 3);

    let switched = s
        .switch_version(Side::Primary, "nminus-1", &mut backend, true)
        .expect("switch");
    assert!(matches!(switched, SwitchOutcome::Switched(LoadOutcome::Applied(_))));
    assert_eq!(bounds(&s, Side::Primary), vec![("Q".to_string(), 1.0, 2.0)]);
    assert_eq!(s.version(Side::Primary), Some("nminus-1"));
}

#[test]
fn failed_fetch_leaves_state() {
    let mut backend = FakeBackend::with("current", ROWS);
    let mut s = session();
    s.load_from(&mut backend, Side::Primary, "current").expect("load");
    let err = s
        .load_from(&mut backend, Side::Primary, "nminus-9")
        .expect_err("missing version");
    assert!(matches!(err, EditorError::Backend(_)));
    assert_eq!(s.primary().len(), 3);
    assert_eq!(s.version(Side::Primary), Some("current"));
}

#[test]
fn widget_events_resolve_by_handle() {
    let mut s = loaded(ROWS);
    s.load_words(r#"{"transcription":"hello world","words":[{"startTime":0.0,"endTime":0.4},{"startTime":0.5,"endTime":0.9}]}"#)
        .expect("words");
    let mut renderer = RecordingRenderer::default();
    assert_eq!(s.redraw(&mut renderer), 5);
    assert_eq!(s.redraw(&mut renderer), 5);
    assert_eq!(renderer.live.len(), 5);
    assert!(renderer.live.values().filter(|v| v.side.is_none()).all(|v| !v.editable));

    let b = id_at(&s, Side::Primary, 2);
    let handle = renderer.handle_for("B");
    let click = RegionEvent {
        kind: RegionEventKind::Click,
        handle,
        start: 20.0,
        end: 25.0,
    };
    assert_eq!(s.handle_region_event(&click).expect("click"), EventOutcome::Selected(b));

    let drag = RegionEvent {
        kind: RegionEventKind::Drag,
        start: 21.0,
        end: 26.0,
        ..click
    };
    assert!(matches!(
        s.handle_region_event(&drag).expect("drag"),
        EventOutcome::Edited(id, _) if id == b
    ));
    assert_eq!(s.selected_region().map(|r| (r.start, r.end)), Some((21.0, 26.0)));

    let word = RegionEvent {
        handle: renderer.handle_for("world"),
        ..click
    };
    assert_eq!(s.handle_region_event(&word).expect("word"), EventOutcome::Word(1));

    let unknown = RegionEvent {
        handle: VisualHandle(999),
        ..click
    };
    assert!(matches!(
        s.handle_region_event(&unknown),
        Err(EditorError::UnknownHandle(999))
    ));
}

#[test]
fn resize_snaps_to_other_track_in_dual_mode() {
    let mut s = loaded("A,0,5\n");
    let ticket = s.begin_load(Side::Secondary, "nminus-1");
    s.complete_load(&ticket, "B,10,20\n").expect("load secondary");
    s.toggle_dual_mode();
    let mut renderer = RecordingRenderer::default();
    s.redraw(&mut renderer);

    let a = id_at(&s, Side::Primary, 0);
    let resize = RegionEvent {
        kind: RegionEventKind::ResizeEnd,
        handle: renderer.handle_for("A"),
        start: 0.0,
        end: 9.4,
    };
    s.handle_region_event(&resize).expect("resize");
    assert_eq!(s.primary().get(a).map(|r| r.end), Some(10.0));
    assert_eq!(s.snap_position(15.0), 15.0);
    assert_eq!(s.snap_position(19.5), 20.0);
}

#[test]
fn filters_run_on_active_track() {
    let s = loaded("Alice,0,2\nSPEAKER_01,2,10\nalice b,12,13\n");
    assert_eq!(s.speaker_filter("ALICE").len(), 2);
    assert_eq!(s.duration_filter(1.0, 2.0).len(), 2);
    assert!(!s.has_conflict_marker());
}

#[test]
fn lock_toggling_and_multi_selection() {
    let mut s = loaded(ROWS);
    let a = id_at(&s, Side::Primary, 0);
    let b = id_at(&s, Side::Primary, 2);
    assert!(matches!(s.toggle_lock(), Err(EditorError::NoSelection)));

    s.select(Side::Primary, a).expect("select");
    s.extend_selection(b).expect("extend");
    assert_eq!(s.selected_indexes(), vec![0, 2]);
    assert!(s.toggle_lock().expect("lock"));
    assert!(s.primary().get(a).expect("a").locked);
    assert!(s.primary().get(b).expect("b").locked);

    s.unlock(b).expect("unlock");
    assert!(!s.primary().get(b).expect("b").locked);
    assert_eq!(s.history().len(), 3);

    s.clear_selection();
    assert!(s.selected_indexes().is_empty());
    assert!(s.undo());
    assert!(s.primary().get(b).expect("b").locked);
}

#[test]
fn drags_are_ignored_outside_edit_mode() {
    let mut s = loaded(ROWS);
    s.set_edit_mode(false);
    let mut renderer = RecordingRenderer::default();
    s.redraw(&mut renderer);
    assert!(renderer.live.values().all(|v| !v.editable));

    let drag = RegionEvent {
        kind: RegionEventKind::Drag,
        handle: renderer.handle_for("B"),
        start: 30.0,
        end: 31.0,
    };
    assert_eq!(s.handle_region_event(&drag).expect("drag"), EventOutcome::Ignored);
    assert_eq!(s.primary().working()[2].start, 20.0);
}

#[test]
fn failed_load_keeps_previous_regions() {
    let mut s = loaded(ROWS);
    let ticket = s.begin_load(Side::Primary, "nminus-1");
    s.fail_load(&ticket, &anyhow::anyhow!("timeout"));
    assert_eq!(s.primary().len(), 3);
    assert_eq!(s.version(Side::Primary), Some("current"));
}

#[test]
fn chapter_filter_and_word_lookup() {
    let mut s = loaded("Alice,0,2\nSPEAKER_01,2,10\nalice b,12,13\n");
    assert_eq!(s.chapter_filter("alice", 1.5, 5.0).len(), 1);
    s.load_words(r#"{"transcription":"one two","words":[{"startTime":0.0,"endTime":0.5},{"startTime":0.5,"endTime":1.0}]}"#)
        .expect("words");
    assert_eq!(s.word_at(0.7).map(|w| w.text.as_str()), Some("two"));
    assert!(s.word_at(3.0).is_none());
}

#[test]
fn copies_mark_the_destination_version_unsaved() {
    let mut s = loaded(ROWS);
    let ticket = s.begin_load(Side::Secondary, "nminus-1");
    s.complete_load(&ticket, "Y,40,50\n").expect("load secondary");
    s.toggle_dual_mode();
    s.select(Side::Primary, id_at(&s, Side::Primary, 2)).expect("select");
    s.copy_selected().expect("copy");
    assert!(s.has_unsaved_changes("nminus-1"));
    assert!(!s.has_unsaved_changes("current"));
}

#[test]
fn undoing_select_all_restores_single_selection() {
    let mut s = loaded(ROWS);
    let a = id_at(&s, Side::Primary, 0);
    s.select(Side::Primary, a).expect("select");
    assert_eq!(s.set_select_all(true).expect("select all"), 2);

    assert!(s.undo());
    assert!(s.selected_many().is_empty());
    assert_eq!(s.selected(), Some(a));

    s.set_label("Z").expect("relabel");
    let labels: Vec<&str> = s.primary().working().iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["Z", "A", "B"]);
}

#[test]
fn undoing_mode_toggle_restores_earlier_selection() {
    let mut s = loaded(ROWS);
    s.select(Side::Primary, id_at(&s, Side::Primary, 0)).expect("select");
    s.extend_selection(id_at(&s, Side::Primary, 2)).expect("extend");
    assert!(s.toggle_dual_mode());

    assert!(s.undo());
    assert!(!s.dual_mode());
    assert_eq!(s.active_side(), Side::Primary);
    assert!(s.selected_many().is_empty());
}

#[test]
fn drags_on_different_regions_undo_separately() {
    let mut s = loaded("A,0,2\nB,5,7\n");
    let a = id_at(&s, Side::Primary, 0);
    let b = id_at(&s, Side::Primary, 1);
    s.drag_region(a, 0.0, 3.0).expect("drag a");
    s.drag_region(b, 5.0, 8.0).expect("drag b");
    s.drag_region(b, 5.0, 9.0).expect("drag b again");
    assert_eq!(s.history().len(), 3);

    assert!(s.undo());
    assert_eq!(
        bounds(&s, Side::Primary),
        vec![("A".to_string(), 0.0, 3.0), ("B".to_string(), 5.0, 7.0)]
    );
    assert!(s.undo());
    assert_eq!(
        bounds(&s, Side::Primary),
        vec![("A".to_string(), 0.0, 2.0), ("B".to_string(), 5.0, 7.0)]
    );
}
