use std::collections::HashMap;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};

use super::*;
use crate::patcher_test::{statefulset, test_config, MockApi};
use crate::resources::{CpuValue, ResourceSpec};

/// Spawn a runner over a mock API, deliver the given events, and join the runner.
async fn run_events(api: MockApi, refresh_events: Vec<String>, events: Vec<LifecycleEvent>) -> Result<()> {
    let (config, _ns_file) = test_config("my-app")?;
    let desired: HashMap<_, _> = vec![(
        "charm".to_string(),
        ResourceSpec { memory: Some("1Gi".into()), cpu: Some(CpuValue::Cores(1)) },
    )]
    .into_iter()
    .collect();
    let patcher = StatefulSetPatcher::new(api, config, desired);

    let (events_tx, events_rx) = mpsc::channel(16);
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
    let handle = PatchRunner::new(patcher, refresh_events, events_rx, shutdown_tx).spawn();

    for event in events {
        events_tx.send(event).await.context("error sending lifecycle event")?;
    }
    // Closing the subscription drains any queued events and stops the runner.
    drop(events_tx);
    handle.await.context("error joining runner")?
}

#[tokio::test]
async fn install_and_update_status_trigger_reconcile() -> Result<()> {
    let api = MockApi::default();
    api.state.lock().unwrap().sts = Some(statefulset("my-app", vec![]));

    run_events(api.clone(), vec![], vec![LifecycleEvent::Install, LifecycleEvent::UpdateStatus]).await?;

    let state = api.state.lock().unwrap();
    assert_eq!(state.gets, 2, "expected each lifecycle event to run one reconcile, got {} fetches", state.gets);
    assert_eq!(state.deletes, 0);
    Ok(())
}

#[tokio::test]
async fn remove_triggers_teardown() -> Result<()> {
    let api = MockApi::default();
    api.state.lock().unwrap().sts = Some(statefulset("my-app", vec![]));

    run_events(api.clone(), vec![], vec![LifecycleEvent::Remove]).await?;

    let state = api.state.lock().unwrap();
    assert_eq!(state.deletes, 1, "expected the remove event to delete the target");
    assert_eq!(state.gets, 0);
    assert!(state.sts.is_none());
    Ok(())
}

#[tokio::test]
async fn registered_refresh_events_trigger_reconcile() -> Result<()> {
    let api = MockApi::default();
    api.state.lock().unwrap().sts = Some(statefulset("my-app", vec![]));

    run_events(
        api.clone(),
        vec!["config-changed".to_string()],
        vec![
            LifecycleEvent::Custom("config-changed".to_string()),
            LifecycleEvent::Custom("leader-elected".to_string()), // Not registered, must be ignored.
        ],
    )
    .await?;

    let state = api.state.lock().unwrap();
    assert_eq!(state.gets, 1, "only the registered refresh event may trigger reconciliation, got {} fetches", state.gets);
    Ok(())
}

#[tokio::test]
async fn handler_errors_do_not_stop_the_runner() -> Result<()> {
    // No live object: the install reconcile fails with not-found, then the remove event must
    // still be handled.
    let api = MockApi::default();

    run_events(api.clone(), vec![], vec![LifecycleEvent::Install, LifecycleEvent::Remove]).await?;

    let state = api.state.lock().unwrap();
    assert_eq!(state.gets, 1);
    assert_eq!(state.deletes, 1, "the runner must keep processing events after a handler error");
    Ok(())
}

#[tokio::test]
async fn runner_survives_dropped_shutdown_sender() -> Result<()> {
    // The runner holds its own copy of the shutdown sender, so the channel must stay open and
    // events must keep flowing even after the caller drops every sender it kept.
    let api = MockApi::default();
    api.state.lock().unwrap().sts = Some(statefulset("my-app", vec![]));
    let (config, _ns_file) = test_config("my-app")?;
    let patcher = StatefulSetPatcher::new(api.clone(), config, HashMap::new());

    let (events_tx, events_rx) = mpsc::channel(16);
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
    let handle = PatchRunner::new(patcher, vec![], events_rx, shutdown_tx).spawn();

    // Give the runner ample time to observe a closed shutdown channel, were it to hold none.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    events_tx
        .send(LifecycleEvent::Install)
        .await
        .context("the runner dropped its event subscription without a shutdown signal")?;
    drop(events_tx);
    handle.await.context("error joining runner")??;

    let state = api.state.lock().unwrap();
    assert_eq!(state.gets, 1, "expected the event to be handled after the caller dropped its shutdown sender");
    Ok(())
}

#[tokio::test]
async fn shutdown_signal_stops_the_runner() -> Result<()> {
    let api = MockApi::default();
    api.state.lock().unwrap().sts = Some(statefulset("my-app", vec![]));
    let (config, _ns_file) = test_config("my-app")?;
    let patcher = StatefulSetPatcher::new(api, config, HashMap::new());

    let (_events_tx, events_rx) = mpsc::channel(16);
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
    let handle = PatchRunner::new(patcher, vec![], events_rx, shutdown_tx.clone()).spawn();

    shutdown_tx.send(()).context("error sending shutdown signal")?;
    handle.await.context("error joining runner")?
}
