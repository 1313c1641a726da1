//! End-to-end mirror behavior against the in-memory notebook.

use std::time::Instant;

use pincell::{BridgeEffect, DockState, MirrorConfig, MirrorError, PanelManager, ToolbarAction, UiEvent};
use pincell_host::{DocumentHost, MemoryNotebook, RunOrigin};
use pincell_types::{CellId, CellKind, CellSnapshot, ExecutionCount};

fn notebook(sources: &[&str]) -> (MemoryNotebook, Vec<CellId>) {
    let mut nb = MemoryNotebook::default();
    let ids = sources.iter().map(|s| nb.add_code_cell(s)).collect();
    (nb, ids)
}

fn click(panel: &mut PanelManager<MemoryNotebook>, m: pincell_types::MirrorId, action: ToolbarAction) {
    let mut event = UiEvent::new();
    panel.dispatch(m, action, &mut event).unwrap();
    assert!(event.is_suppressed());
}

#[test]
fn test_create_then_close_restores_visibility() {
    let (mut nb, ids) = notebook(&["a", "b", "c"]);
    nb.set_input_hidden(ids[1], true).unwrap();
    let mut panel = PanelManager::new(nb, MirrorConfig::default());

    for &cell in &ids {
        let m = panel.create_from_existing(cell).unwrap();
        click(&mut panel, m, ToolbarAction::Close);
        let snapshot = panel.host().cell(cell).unwrap();
        assert!(snapshot.is_fully_visible(), "cell {cell:?} left hidden");
        assert!(panel.mirror_for(cell).is_none());
    }
}

#[test]
fn test_duplicate_leaves_existing_mirror_intact() {
    let (nb, ids) = notebook(&["x"]);
    let mut panel = PanelManager::new(nb, MirrorConfig::default());
    let m = panel.create_from_existing(ids[0]).unwrap();
    panel.float(m).unwrap();
    let before = panel.summary(m).unwrap();

    assert_eq!(
        panel.create_from_existing(ids[0]),
        Err(MirrorError::Duplicate(ids[0]))
    );
    assert_eq!(panel.summary(m).unwrap(), before);
    assert_eq!(panel.live().count(), 1);
}

#[test]
fn test_count_display_tracks_every_transition() {
    let (nb, ids) = notebook(&["1", "2"]);
    let mut panel = PanelManager::new(nb, MirrorConfig::default());
    let m = panel.create_from_existing(ids[0]).unwrap();
    assert_eq!(panel.summary(m).unwrap().execution, "[*]");

    for round in 1..=3u32 {
        panel.host_mut().run_cell(ids[1], RunOrigin::User).unwrap();
        panel.host_mut().run_cell(ids[0], RunOrigin::User).unwrap();
        panel.pump(Instant::now()).unwrap();
        assert_eq!(panel.summary(m).unwrap().execution, "[*]");

        panel.host_mut().complete_all();
        panel.pump(Instant::now()).unwrap();
        let expected = ExecutionCount::settled(round * 2);
        assert_eq!(panel.mirror(m).unwrap().count(), expected);
        assert_eq!(panel.summary(m).unwrap().execution, expected.to_string());
    }
}

#[test]
fn test_float_land_round_trip() {
    let (nb, ids) = notebook(&["a", "b"]);
    let mut panel = PanelManager::new(nb, MirrorConfig::default());
    let first = panel.create_from_existing(ids[0]).unwrap();
    let second = panel.create_from_existing(ids[1]).unwrap();
    let before = panel.summary(first).unwrap();
    let outline = panel.view(first).unwrap().tree().outline();

    click(&mut panel, first, ToolbarAction::Float);
    assert_eq!(
        panel.mirror(first).unwrap().dock(),
        DockState::Floating { index: 1 }
    );
    assert_eq!(panel.containers().placements(first), 1);
    assert_eq!(panel.window(first).unwrap().offset(), (24, 24));

    click(&mut panel, first, ToolbarAction::Land);
    assert_eq!(panel.mirror(first).unwrap().dock(), DockState::Docked);
    assert_eq!(panel.summary(first).unwrap(), before);
    assert_eq!(panel.view(first).unwrap().tree().outline(), outline);
    assert_eq!(
        panel.containers().docked().collect::<Vec<_>>(),
        vec![first, second]
    );
}

#[test]
fn test_run_scenario_keeps_output_hidden() {
    let mut nb = MemoryNotebook::default();
    let mut cell = CellSnapshot::code(CellId::new(), "6 * 7");
    cell.execution_count = ExecutionCount::settled(3);
    cell.outputs = vec!["42".into()];
    let id = nb.push(cell);
    let mut panel = PanelManager::new(nb, MirrorConfig::default());
    let m = panel.create_from_existing(id).unwrap();
    assert_eq!(panel.summary(m).unwrap().execution, "[3]");
    assert_eq!(panel.summary(m).unwrap().output, "42");

    click(&mut panel, m, ToolbarAction::Run);
    panel.pump(Instant::now()).unwrap();
    assert_eq!(panel.summary(m).unwrap().execution, "[*]");

    panel.host_mut().complete_all();
    panel.pump(Instant::now()).unwrap();
    assert_eq!(panel.summary(m).unwrap().execution, "[4]");
    let canonical = panel.host().cell(id).unwrap();
    assert!(canonical.input_hidden);
    assert!(canonical.output_hidden);
}

#[test]
fn test_two_floats_stack() {
    let mut nb = MemoryNotebook::default();
    let a = nb.add_code_cell("a");
    let b = nb.add_code_cell("b");
    let md = nb.add_cell(CellKind::Markdown, "# notes");
    let mut panel = PanelManager::new(nb, MirrorConfig::default());
    let ma = panel.create_from_existing(a).unwrap();
    let mb = panel.create_from_existing(b).unwrap();
    let mm = panel.create_from_existing(md).unwrap();

    let first = panel.float(ma).unwrap();
    let other_kind = panel.float(mm).unwrap();
    let second = panel.float(mb).unwrap();
    assert_eq!(second, first + 1);
    assert_eq!(other_kind, 1);

    // Closing a floating mirror frees its stacking slot for later floats.
    panel.close(mb).unwrap();
    panel.land(ma).unwrap();
    assert_eq!(panel.float(ma).unwrap(), 1);
}

#[test]
fn test_removed_canonical_cell() {
    let (nb, ids) = notebook(&["a", "b"]);
    let mut panel = PanelManager::new(nb, MirrorConfig::default());
    let m = panel.create_from_existing(ids[0]).unwrap();
    panel.host_mut().remove_cell(ids[0]).unwrap();
    panel.pump(Instant::now()).unwrap();
    assert!(panel.mirror(m).is_none());
    assert!(panel.is_disposed(m));
    assert_eq!(panel.dispose(m), Ok(()));
    assert_eq!(
        panel.execute(m, false, RunOrigin::User),
        Err(MirrorError::Disposed(m))
    );
}

#[test]
fn test_close_after_canonical_removed() {
    let (nb, ids) = notebook(&["a", "b"]);
    let mut panel = PanelManager::new(nb, MirrorConfig::default());
    let m = panel.create_from_existing(ids[0]).unwrap();
    panel.host_mut().remove_cell(ids[0]).unwrap();

    // The removal is still queued: close finds nothing to restore.
    click(&mut panel, m, ToolbarAction::Close);
    assert!(panel.is_disposed(m));
    assert!(panel.view(m).is_none());
    assert!(panel.mirror_for(ids[0]).is_none());
    assert!(panel.pump(Instant::now()).unwrap().is_empty());
}

#[test]
fn test_removal_with_queued_events_leaves_other_mirrors_current() {
    let (nb, ids) = notebook(&["a", "b"]);
    let mut panel = PanelManager::new(nb, MirrorConfig::default());
    let ma = panel.create_from_existing(ids[0]).unwrap();
    let mb = panel.create_from_existing(ids[1]).unwrap();

    panel.host_mut().run_cell(ids[0], RunOrigin::User).unwrap();
    panel.host_mut().complete_all();
    panel.host_mut().edit_source(ids[1], "b + 1").unwrap();
    panel.host_mut().remove_cell(ids[0]).unwrap();

    let effects = panel.pump(Instant::now()).unwrap();
    assert_eq!(effects.last(), Some(&(mb, BridgeEffect::DirtyUpdated { dirty: true })));
    assert!(effects.contains(&(ma, BridgeEffect::Disposed)));
    assert!(panel.is_disposed(ma));
    assert!(panel.mirror_for(ids[0]).is_none());

    let summary = panel.summary(mb).unwrap();
    assert_eq!(summary.source, "b + 1");
    assert!(summary.dirty);
    assert_eq!(panel.live().count(), 1);
}

#[test]
fn test_summaries_serialize() {
    let (nb, ids) = notebook(&["a"]);
    let mut panel = PanelManager::new(nb, MirrorConfig::default());
    let m = panel.create_from_existing(ids[0]).unwrap();
    panel.float(m).unwrap();
    let json = serde_json::to_value(panel.summaries().unwrap()).unwrap();
    assert_eq!(json[0]["dock"]["state"], "floating");
    assert_eq!(json[0]["dock"]["index"], 1);
    assert_eq!(json[0]["offset"][0], 24);
    assert_eq!(json[0]["kind"], "code");
}
