//! Moving work between threads by scheduling on a runner another thread drains.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chainrun::runtime::scheduler::StatsSnapshot;
use chainrun::{AsyncRunner, AsyncRunnerExt, BlockingSynchronization, CurrentThreadAsyncRunner, RunnerRef};

#[test]
fn test_results_marshaled_back_to_owner_thread() {
    let owner = CurrentThreadAsyncRunner::new().named("owner").shared();
    let background = CurrentThreadAsyncRunner::new().named("background").shared();
    let owner_thread = thread::current().id();

    let computed = background.schedule(|| (thread::current().id(), 6 * 7));
    let delivered = computed
        .then_on_with(Some(&owner), Some(|(worker, v): &(thread::ThreadId, i32)| {
            (*worker, thread::current().id(), *v)
        }))
        .unwrap();

    let worker = {
        let background = background.clone();
        thread::spawn(move || background.await_all())
    };
    worker.join().unwrap();

    let (worker_thread, delivered_on, value) = delivered.wait().unwrap();
    assert_ne!(worker_thread, owner_thread);
    assert_eq!(delivered_on, owner_thread);
    assert_eq!(value, 42);
}

#[test]
fn test_many_producers_one_drainer() {
    let sink: RunnerRef = Arc::new(CurrentThreadAsyncRunner::with_synchronization(Arc::new(
        BlockingSynchronization::with_poll_interval(Duration::from_millis(1)),
    )));

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let sink = sink.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|i| sink.schedule(move || p * 100 + i))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let tasks: Vec<_> = producers
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(sink.scheduled_task_count(), 100);

    sink.await_all();
    let total: usize = tasks.iter().map(|t| t.wait().unwrap()).sum();
    assert_eq!(total, (0..4).map(|p| p * 100 * 25 + (0..25).sum::<usize>()).sum::<usize>());
    assert_eq!(
        sink.stats().snapshot(),
        StatsSnapshot {
            tasks_scheduled: 100,
            tasks_completed: 100,
            tasks_failed: 0,
            tasks_waiting: 0,
            drains: 1,
        }
    );
}

#[test]
fn test_waiter_on_one_thread_drainer_on_another() {
    let worker = CurrentThreadAsyncRunner::new().named("worker").shared();
    let (tx, rx) = mpsc::channel();

    let job = worker.schedule(|| "done".to_string());

    let waiter = {
        let job = job.clone();
        thread::spawn(move || {
            tx.send(()).unwrap();
            job.wait()
        })
    };

    rx.recv().unwrap();
    thread::sleep(Duration::from_millis(10));
    // either side may drain first; the job still runs exactly once
    worker.await_all();

    assert_eq!(waiter.join().unwrap().unwrap(), "done");
    assert_eq!(worker.stats().snapshot().tasks_finished(), 1);
}
