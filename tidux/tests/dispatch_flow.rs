//! End-to-end dispatch behavior through the public API

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tidux::prelude::*;
use tidux::testing::{Recorder, RenderCounter};
use tidux::{assert_broadcast, assert_not_broadcast, count_broadcasts};

const TIMEOUT: Duration = Duration::from_secs(2);

fn counter_actions() -> (Arc<AtomicI32>, SyncAction<(), i32>) {
    let count = Arc::new(AtomicI32::new(0));
    let c = count.clone();
    let increase = SyncAction::new("Increase", move |_: (), _ctx| {
        Ok(c.fetch_add(1, Ordering::SeqCst) + 1)
    });
    (count, increase)
}

#[test]
fn test_increase_twice_broadcasts_twice() {
    let dispatcher = Dispatcher::new();
    let recorder = Recorder::new();
    recorder.attach(&dispatcher);
    let (count, increase) = counter_actions();

    assert_eq!(dispatcher.dispatch(&increase, ()).unwrap(), 1);
    assert_eq!(dispatcher.dispatch(&increase, ()).unwrap(), 2);

    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(count_broadcasts!(recorder, &increase), 2);

    let results: Vec<i32> = recorder
        .records()
        .iter()
        .filter_map(|p| p.result::<i32>().copied())
        .collect();
    assert_eq!(results, vec![1, 2]);
}

#[tokio::test]
async fn test_delayed_action_broadcasts_after_delay() {
    let dispatcher = Dispatcher::new();
    let recorder = Recorder::new();
    recorder.attach(&dispatcher);

    let delayed = AsyncAction::new("Delayed", |ms: u64, _ctx| async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(ms)
    });

    let task = dispatcher.dispatch(&delayed, 40);
    assert_not_broadcast!(recorder, &delayed);

    let result = tokio::time::timeout(TIMEOUT, task)
        .await
        .expect("timeout")
        .expect("action failed");
    assert_eq!(result, Some(40));
    assert_eq!(count_broadcasts!(recorder, &delayed), 1);
}

#[tokio::test]
async fn test_cancel_stops_every_nested_call() {
    let dispatcher = Dispatcher::new();
    let recorder = Recorder::new();
    recorder.attach(&dispatcher);

    let step = SyncAction::new("Step", |_: (), _ctx| Ok(()));
    let child = AsyncAction::new("Child", |_: (), _ctx| async move { Ok(()) });
    let failures = Arc::new(Mutex::new(Vec::new()));

    let (s, c, f) = (step.clone(), child.clone(), failures.clone());
    let parent = AsyncAction::new("Parent", move |_: (), ctx: DispatchContext| {
        let (step, child, failures) = (s.clone(), c.clone(), f.clone());
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let outcomes = [
                ctx.dispatch(&step, ()).err(),
                ctx.dispatch(&child, ()).err(),
                ctx.until([step.id()]).err(),
            ];
            for err in outcomes.into_iter().flatten() {
                failures.lock().unwrap().push(err.is_cancelled());
            }
            ctx.dispatch(&step, ())?;
            Ok::<_, DispatchError>(())
        }
    });

    let task = dispatcher.dispatch(&parent, ());
    task.cancel();

    let outcome = tokio::time::timeout(TIMEOUT, task).await.expect("timeout");
    assert!(matches!(outcome, Ok(None)));
    assert_eq!(*failures.lock().unwrap(), vec![true, true, true]);
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_subtask_propagates_cancellation_to_parent() {
    let dispatcher = Dispatcher::new();
    let recorder = Recorder::new();
    recorder.attach(&dispatcher);

    let slow = AsyncAction::new("Slow", |_: (), ctx: DispatchContext| async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        ctx.cancel();
        let marker = Marker::<()>::new("AfterCancel");
        ctx.dispatch(&marker, ())?;
        Ok::<_, DispatchError>(())
    });
    let parent = AsyncAction::new("Parent", move |_: (), ctx: DispatchContext| {
        let slow = slow.clone();
        async move {
            ctx.dispatch(&slow, ())?.await?;
            Ok::<_, DispatchError>("unreachable")
        }
    });

    let outcome = tokio::time::timeout(TIMEOUT, dispatcher.dispatch(&parent, ()))
        .await
        .expect("timeout");
    assert!(matches!(outcome, Ok(None)));
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_until_resolves_once() {
    let dispatcher = Dispatcher::new();
    let first = Marker::<u32>::new("First");
    let second = Marker::<u32>::new("Second");
    let other = Marker::<u32>::new("Other");

    let waiter = dispatcher.until([first.id(), second.id()]);
    assert_eq!(dispatcher.listener_count(), 1);

    dispatcher.dispatch(&other, 0);
    assert!(waiter.is_pending());

    dispatcher.dispatch(&second, 7);
    dispatcher.dispatch(&first, 8);
    assert_eq!(dispatcher.listener_count(), 0);

    let params = tokio::time::timeout(TIMEOUT, waiter)
        .await
        .expect("timeout")
        .expect("detached");
    assert!(params.is(&second));
    assert_eq!(params.payload::<u32>(), Some(&7));
}

#[tokio::test]
async fn test_async_action_waits_for_confirmation() {
    let dispatcher = Dispatcher::new();
    let confirm = Marker::<bool>::new("Confirm");

    let confirm_id = confirm.id();
    let save = AsyncAction::new("Save", move |draft: String, ctx: DispatchContext| async move {
        let answer = ctx.until([confirm_id])?.await?;
        match answer.payload::<bool>() {
            Some(true) => Ok(format!("saved {draft}")),
            _ => Err(DispatchError::msg("rejected")),
        }
    });

    let task = dispatcher.dispatch(&save, "note".to_string());
    tokio::time::sleep(Duration::from_millis(10)).await;
    dispatcher.dispatch(&confirm, true);

    let saved = tokio::time::timeout(TIMEOUT, task)
        .await
        .expect("timeout")
        .expect("save failed");
    assert_eq!(saved.as_deref(), Some("saved note"));
}

#[test]
fn test_selector_rerenders_only_on_change() {
    let dispatcher = Dispatcher::new();
    let (count, increase) = counter_actions();
    let noop = Marker::<()>::new("Noop");
    let renders = RenderCounter::new();

    let source = count.clone();
    let mut binding = SelectorBinding::new(&dispatcher, renders.clone(), move || {
        Some(source.load(Ordering::SeqCst))
    })
    .unwrap();
    binding.mount();

    dispatcher.dispatch(&noop, ());
    assert_eq!(renders.count(), 0);

    dispatcher.dispatch(&increase, ()).unwrap();
    assert_eq!(renders.count(), 1);
    assert_eq!(binding.select().unwrap(), 1);

    binding.unmount();
    dispatcher.dispatch(&increase, ()).unwrap();
    assert_eq!(renders.count(), 1);
}

#[test]
fn test_unsubscribe_stops_notifications() {
    let dispatcher = Dispatcher::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let ping = Marker::<()>::new("Ping");
    let pong = Marker::<()>::new("Pong");

    let c = calls.clone();
    let sub = dispatcher.subscribe_to([ping.id()], move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    dispatcher.dispatch(&pong, ());
    dispatcher.dispatch(&ping, ());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(sub.unsubscribe());
    assert!(!sub.unsubscribe());
    dispatcher.dispatch(&ping, ());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_listener_may_dispatch_reentrantly() {
    let dispatcher = Dispatcher::new();
    let recorder = Recorder::new();
    recorder.attach(&dispatcher);

    let saved = Marker::<()>::new("Saved");
    let save = SyncAction::new("Save", |_: (), _ctx| Ok(()));

    let inner = dispatcher.clone();
    let follow_up = saved;
    dispatcher.subscribe_to([save.id()], move |_| inner.dispatch(&follow_up, ()));

    dispatcher.dispatch(&save, ()).unwrap();
    assert_broadcast!(recorder, &saved);
    assert_eq!(recorder.names(), vec!["Save", "Saved"]);
}

#[test]
fn test_global_dispatcher() {
    tidux::test_cleanup();

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let ping = Marker::<()>::new("GlobalPing");
    let sub = tidux::subscribe_to([ping.id()], move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });

    tidux::dispatch(&ping, ());
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    tidux::test_cleanup();
    assert!(!sub.is_active());
    tidux::dispatch(&ping, ());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
