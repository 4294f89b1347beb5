//! Chains across several runners, driven through the public API only.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use chainrun::{
    AsyncAction, AsyncError, AsyncRunner, AsyncRunnerExt, CurrentThreadAsyncRunner, RunnerRef,
};

fn runner(name: &str) -> RunnerRef {
    CurrentThreadAsyncRunner::new().named(name).shared()
}

fn counts(runners: &[&RunnerRef]) -> Vec<usize> {
    runners.iter().map(|r| r.scheduled_task_count()).collect()
}

#[test]
fn test_three_runner_hand_off() {
    let r1 = runner("r1");
    let r2 = runner("r2");
    let r3 = runner("r3");
    let value = Arc::new(AtomicI32::new(0));

    let t = r1.schedule(|| {});
    let c = {
        let r3 = r3.clone();
        let value = value.clone();
        t.then_on_async_action(
            Some(&r2),
            Some(move || r3.schedule(move || value.store(4, Ordering::SeqCst))),
        )
        .unwrap()
    };
    let d = {
        let value = value.clone();
        c.then(Some(move || assert_eq!(value.load(Ordering::SeqCst), 4)))
            .unwrap()
    };

    assert_eq!(t.paused_task_count(), 1);
    assert_eq!(counts(&[&r1, &r2, &r3]), vec![1, 0, 0]);

    r1.await_all();
    assert_eq!(counts(&[&r1, &r2, &r3]), vec![0, 1, 0]);

    r2.await_all();
    assert_eq!(counts(&[&r1, &r2, &r3]), vec![0, 0, 1]);

    r3.await_all();
    assert_eq!(value.load(Ordering::SeqCst), 4);
    assert_eq!(counts(&[&r1, &r2, &r3]), vec![0, 0, 0]);
    assert_eq!(t.paused_task_count(), 0);
    assert_eq!(c.paused_task_count(), 0);
    assert_eq!(d.wait(), Ok(()));
}

#[test]
fn test_value_pipeline() {
    let io = runner("io");
    let cpu = runner("cpu");
    let ui = runner("ui");

    let text = io.schedule(|| "3 4 5".to_string());
    let sum = text
        .then_on_with(
            Some(&cpu),
            Some(|s: &String| s.split(' ').map(|n| n.parse::<u32>().unwrap()).sum::<u32>()),
        )
        .unwrap();
    let label = sum
        .then_on_with(Some(&ui), Some(|n: &u32| format!("total={}", n)))
        .unwrap();

    io.await_all();
    cpu.await_all();
    ui.await_all();
    assert_eq!(label.wait().unwrap(), "total=12");
}

#[test]
fn test_async_function_completes_on_inner_runner() {
    let ui = runner("ui");
    let worker = runner("worker");

    let start = ui.schedule(|| {});
    let fetched = {
        let worker = worker.clone();
        start
            .then_async_function(Some(move || worker.schedule(|| vec![1u8, 2, 3])))
            .unwrap()
    };
    let len = fetched.then_with(Some(|v: &Vec<u8>| v.len())).unwrap();

    ui.await_all();
    assert!(!len.is_completed());
    assert_eq!(worker.scheduled_task_count(), 1);

    worker.await_all();
    assert_eq!(len.wait(), Ok(3));
    assert_eq!(ui.scheduled_task_count(), 0);
}

#[test]
fn test_failure_reaches_end_of_chain() {
    let r1 = runner("r1");
    let r2 = runner("r2");

    let load = r1.schedule_fallible(|| -> anyhow::Result<String> {
        Err(anyhow::anyhow!("permission denied").context("reading settings"))
    });
    let parsed = load.then_on_with(Some(&r2), Some(|s: &String| s.len())).unwrap();
    let shown: AsyncAction = parsed.then(Some(|| ())).unwrap();

    r1.await_all();
    r2.await_all();

    let err = shown.wait().unwrap_err();
    assert_eq!(err.task(), load.id());
    assert_eq!(
        err,
        AsyncError::Failed {
            task: load.id(),
            message: "reading settings: permission denied".to_string(),
        }
    );
    assert!(err.to_string().contains("reading settings"));
}

#[test]
fn test_absent_continuations_are_noops() {
    let r1 = runner("r1");
    let r2 = runner("r2");
    let t = r1.schedule(|| 1);

    assert!(t.then(None::<fn()>).is_none());
    assert!(t.then_on(Some(&r2), None::<fn()>).is_none());
    assert!(t.then_on(None, Some(|| ())).is_none());
    assert!(t.then_on_async_action(Some(&r2), None::<fn() -> AsyncAction>).is_none());
    assert!(t
        .then_on_async_function(None, Some(|| -> chainrun::AsyncFunction<i32> { unreachable!() }))
        .is_none());

    assert_eq!(t.paused_task_count(), 0);
    assert_eq!(counts(&[&r1, &r2]), vec![1, 0]);
}
