//! Debounced auto-run across mirrors.

use std::time::{Duration, Instant};

use pincell::{MirrorConfig, PanelManager};
use pincell_host::{DocumentHost, MemoryNotebook, RunOrigin};
use pincell_types::CellId;

fn setup(cells: usize) -> (PanelManager<MemoryNotebook>, Vec<CellId>) {
    let mut nb = MemoryNotebook::default();
    let ids = (0..cells).map(|i| nb.add_code_cell(&i.to_string())).collect();
    let config = MirrorConfig {
        auto_run: true,
        ..MirrorConfig::default()
    };
    (PanelManager::new(nb, config), ids)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_burst_of_other_runs_fires_once() {
    let (mut panel, ids) = setup(6);
    let m = panel.create_from_existing(ids[0]).unwrap();
    let t0 = Instant::now();

    for (i, &cell) in ids[1..].iter().enumerate() {
        panel.host_mut().run_cell(cell, RunOrigin::User).unwrap();
        panel.pump(t0 + ms(i as u64 * 20)).unwrap();
    }
    let deadline = panel.next_deadline().unwrap();
    assert_eq!(deadline, t0 + ms(80 + 200));

    assert!(panel.tick(deadline - ms(1)).unwrap().is_empty());
    assert_eq!(panel.tick(deadline).unwrap(), vec![m]);
    assert!(panel.tick(deadline + ms(1000)).unwrap().is_empty());

    // Five user runs plus the single auto-run.
    assert_eq!(panel.host().pending_runs(), 6);
}

#[test]
fn test_own_cell_runs_never_trigger() {
    let (mut panel, ids) = setup(2);
    panel.create_from_existing(ids[0]).unwrap();
    let t0 = Instant::now();
    for i in 0..3 {
        panel.host_mut().run_cell(ids[0], RunOrigin::User).unwrap();
        panel.pump(t0 + ms(i * 10)).unwrap();
    }
    assert!(panel.next_deadline().is_none());
    assert!(panel.tick(t0 + ms(5000)).unwrap().is_empty());
}

#[test]
fn test_auto_run_restores_active_position() {
    let (mut panel, ids) = setup(3);
    panel.create_from_existing(ids[2]).unwrap();
    let t0 = Instant::now();
    panel.host_mut().run_cell(ids[0], RunOrigin::User).unwrap();
    panel.pump(t0).unwrap();
    panel.host_mut().set_active_index(1).unwrap();

    panel.tick(t0 + ms(200)).unwrap();
    assert_eq!(panel.host().active_index(), 1);
    panel.host_mut().complete_all();
    panel.pump(t0 + ms(300)).unwrap();
    assert_eq!(panel.host().cell(ids[2]).unwrap().execution_count.value(), Some(2));
}

#[test]
fn test_two_auto_mirrors_do_not_ping_pong() {
    let (mut panel, ids) = setup(3);
    let a = panel.create_from_existing(ids[0]).unwrap();
    let b = panel.create_from_existing(ids[1]).unwrap();
    let t0 = Instant::now();

    panel.host_mut().run_cell(ids[2], RunOrigin::User).unwrap();
    panel.pump(t0).unwrap();
    let fired = panel.tick(t0 + ms(200)).unwrap();
    assert_eq!(fired, vec![a, b]);

    // The auto-runs just issued are tagged and must not re-arm anyone.
    panel.pump(t0 + ms(210)).unwrap();
    assert!(panel.next_deadline().is_none());
}

#[test]
fn test_disabled_toggle_and_closed_mirror_stay_quiet() {
    let (mut panel, ids) = setup(3);
    let a = panel.create_from_existing(ids[0]).unwrap();
    let b = panel.create_from_existing(ids[1]).unwrap();
    panel.set_auto_run(a, false).unwrap();
    panel.close(b).unwrap();

    let t0 = Instant::now();
    panel.host_mut().run_cell(ids[2], RunOrigin::User).unwrap();
    panel.pump(t0).unwrap();
    assert!(panel.tick(t0 + ms(1000)).unwrap().is_empty());
}

#[test]
fn test_removed_cell_does_not_cancel_other_auto_runs() {
    let (mut panel, ids) = setup(3);
    panel.create_from_existing(ids[0]).unwrap();
    let b = panel.create_from_existing(ids[1]).unwrap();
    let t0 = Instant::now();
    panel.host_mut().run_cell(ids[2], RunOrigin::User).unwrap();
    panel.pump(t0).unwrap();

    // Gone from the document, but its removal has not been pumped yet.
    panel.host_mut().remove_cell(ids[0]).unwrap();
    assert_eq!(panel.tick(t0 + ms(200)).unwrap(), vec![b]);
    let queued: Vec<CellId> = panel.host().queued_runs().collect();
    assert_eq!(queued, vec![ids[2], ids[1]]);
    assert!(panel.next_deadline().is_none());
}
