//! End-to-end: demo source → store → pane group → synchronizer.

use runscope_core::api::{BacktestApi, DemoApi};
use runscope_core::domain::RunId;
use runscope_core::normalize::TradeReasonPolicy;
use runscope_core::store::{ApplyOutcome, FetchKind, RunStore};
use runscope_core::{
    ChartError, GroupState, LogicalRange, PaneGroup, PaneKind, RenderSurface, SceneSurface,
    SyncOutcome, TimeScaleSynchronizer,
};

fn scene_group() -> PaneGroup<SceneSurface> {
    PaneGroup::new(|kind| SceneSurface::new(kind.surface_options(120, 12)))
}

/// First and last visible bar time of every pane.
fn time_windows(group: &PaneGroup<SceneSurface>) -> Vec<Option<(i64, i64)>> {
    group
        .panes()
        .map(|p| p.surface().visible_time_range())
        .collect()
}

fn load(api: &DemoApi, store: &mut RunStore, run: &RunId) {
    let ticket = store.select(Some(run.clone())).unwrap();
    for kind in FetchKind::ALL {
        let outcome = store.apply(&ticket, kind, api.fetch(kind, run));
        assert!(matches!(outcome, ApplyOutcome::Applied { .. }), "{kind}: {outcome:?}");
    }
}

#[test]
fn demo_run_renders_in_three_aligned_panes() {
    let api = DemoApi::default();
    let mut store = RunStore::new();
    store.set_runs(api.runs().unwrap());
    let run = store.runs()[0].run_id.clone();
    load(&api, &mut store, &run);
    assert!(!store.is_loading());

    let mut group = scene_group();
    let sync = TimeScaleSynchronizer::new();
    let summary = group
        .refresh(
            store.signals().unwrap(),
            store.trades(),
            TradeReasonPolicy::RequireReason,
            &sync,
        )
        .unwrap();

    assert!(summary.price_points > 1000);
    assert_eq!(summary.dropped_trades, 1);
    assert!(matches!(group.state(), GroupState::Ready(_)));

    let ranges: Vec<_> = group
        .panes()
        .map(|p| p.surface().visible_logical_range())
        .collect();
    assert!(ranges[0].is_some());
    assert!(ranges.iter().all(|r| *r == ranges[0]));

    let windows = time_windows(&group);
    assert!(windows[0].is_some());
    assert!(windows.iter().all(|w| *w == windows[0]), "{windows:?}");
    assert!(summary.rsi_points < summary.price_points);

    let merged = store.metrics().unwrap();
    assert!(merged.get("final_portfolio_value").is_some());
}

#[test]
fn zoom_on_oscillator_moves_every_pane() {
    let api = DemoApi::default();
    let mut store = RunStore::new();
    let run = api.runs().unwrap()[1].run_id.clone();
    load(&api, &mut store, &run);

    let mut group = scene_group();
    let sync = TimeScaleSynchronizer::new();
    group
        .refresh(
            store.signals().unwrap(),
            store.trades(),
            TradeReasonPolicy::FallbackLabel,
            &sync,
        )
        .unwrap();

    group.pane_mut(PaneKind::Oscillator).zoom(0.25).unwrap();
    group.pane_mut(PaneKind::Oscillator).pan(-40.0).unwrap();
    let outcomes = sync.dispatch_pending(&mut group);
    assert_eq!(outcomes.len(), 1);

    let target = group
        .pane(PaneKind::Oscillator)
        .surface()
        .visible_logical_range()
        .unwrap();
    assert!(matches!(
        &outcomes[0],
        SyncOutcome::Propagated { range, failures, .. } if *range == target && failures.is_empty()
    ));
    for kind in PaneKind::ALL {
        assert_eq!(group.pane(kind).surface().visible_logical_range(), Some(target));
    }
    let windows = time_windows(&group);
    assert!(windows.iter().all(|w| w.is_some() && *w == windows[0]), "{windows:?}");
    assert!(sync.dispatch_pending(&mut group).is_empty());
}

#[test]
fn price_window_names_the_same_instants_on_the_oscillator() {
    let api = DemoApi::default();
    let run = api.runs().unwrap()[0].run_id.clone();
    let signals = api.signals(&run).unwrap();

    let mut group = scene_group();
    let sync = TimeScaleSynchronizer::new();
    group
        .refresh(&signals, &[], TradeReasonPolicy::RequireReason, &sync)
        .unwrap();
    group
        .pane_mut(PaneKind::Price)
        .surface_mut()
        .set_visible_logical_range(LogicalRange::new(99.5, 149.5))
        .unwrap();
    sync.dispatch_pending(&mut group);

    let windows = time_windows(&group);
    assert!(windows.iter().all(|w| *w == windows[0]), "{windows:?}");

    let (from, to) = windows[0].unwrap();
    for pane in group.panes() {
        let surface = pane.surface();
        let visible = surface.points_in(&surface.series()[0], surface.visible_bars());
        assert!(!visible.is_empty());
        assert!(visible.iter().all(|p| (from..=to).contains(&p.time)));
    }
}

#[test]
fn switching_runs_drops_previous_state() {
    let api = DemoApi::default();
    let runs = api.runs().unwrap();
    let mut store = RunStore::new();

    let r1 = store.select(Some(runs[0].run_id.clone())).unwrap();
    let r2 = store.select(Some(runs[1].run_id.clone())).unwrap();

    let late = api.fetch(FetchKind::Signals, &r1.run_id);
    assert_eq!(store.apply(&r1, FetchKind::Signals, late), ApplyOutcome::Stale);
    assert!(store.signals().is_none());

    let fresh = api.fetch(FetchKind::Signals, &r2.run_id);
    store.apply(&r2, FetchKind::Signals, fresh);
    assert_eq!(
        store.signals().unwrap(),
        api.signals(&r2.run_id).unwrap().as_slice()
    );
}

#[test]
fn empty_payload_keeps_existing_charts() {
    let api = DemoApi::default();
    let run = api.runs().unwrap()[0].run_id.clone();
    let signals = api.signals(&run).unwrap();

    let mut group = scene_group();
    let sync = TimeScaleSynchronizer::new();
    let policy = TradeReasonPolicy::RequireReason;
    group.refresh(&signals, &[], policy, &sync).unwrap();
    group
        .pane_mut(PaneKind::Price)
        .surface_mut()
        .set_visible_logical_range(LogicalRange::new(3.0, 30.0))
        .unwrap();
    sync.dispatch_pending(&mut group);

    let before: Vec<_> = group
        .panes()
        .map(|p| (p.surface().series().to_vec(), p.surface().visible_logical_range()))
        .collect();

    assert_eq!(
        group.refresh(&[], &[], policy, &sync),
        Err(ChartError::NoDisplayableData)
    );

    let after: Vec<_> = group
        .panes()
        .map(|p| (p.surface().series().to_vec(), p.surface().visible_logical_range()))
        .collect();
    assert_eq!(before, after);
}
