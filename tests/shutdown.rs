#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use elmish::prelude::*;
use tokio::time::{Duration, Instant, sleep, timeout};

// Test program that keeps itself busy forever
struct Spinner {
    spins: u64,
}

impl Program for Spinner {
    type Message = ();
    type Flags = ();

    fn init(_: ()) -> (Self, Cmd<()>) {
        (Spinner { spins: 0 }, Cmd::of_msg(()))
    }

    fn update(&mut self, _: ()) -> Cmd<()> {
        self.spins += 1;
        Cmd::of_msg(())
    }
}

#[tokio::test]
async fn test_shutdown_stops_busy_loop() {
    let runtime = Runtime::<Spinner>::new(());
    let token = runtime.shutdown_token();

    tokio::spawn(async move {
        sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let start = Instant::now();
    let result = timeout(Duration::from_secs(1), runtime.run()).await;
    let elapsed = start.elapsed();

    assert!(result.is_ok(), "Runtime should stop within 1 second");
    let spinner = result.unwrap().expect("Runtime should not error");
    assert!(spinner.spins > 0, "loop should have made progress");
    assert!(
        elapsed < Duration::from_millis(500),
        "Should stop quickly after cancellation, took {elapsed:?}"
    );
}

// Test program that waits for messages without an idle timeout
struct Waiter;

impl Program for Waiter {
    type Message = ();
    type Flags = ();

    fn init(_: ()) -> (Self, Cmd<()>) {
        (Waiter, Cmd::none())
    }

    fn update(&mut self, _: ()) -> Cmd<()> {
        Cmd::none()
    }
}

#[tokio::test]
async fn test_shutdown_while_waiting() {
    let runtime = Runtime::<Waiter>::new(());
    let token = runtime.shutdown_token();
    let _dispatch = runtime.dispatcher();

    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        token.cancel();
    });

    let result = timeout(Duration::from_secs(1), runtime.run()).await;
    assert!(result.is_ok(), "cancellation should wake an idle loop");
}

#[tokio::test]
async fn test_without_idle_timeout_keeps_running() {
    let runtime = Runtime::<Waiter>::new(());
    let _dispatch = runtime.dispatcher();

    let result = timeout(Duration::from_millis(50), runtime.run()).await;
    assert!(result.is_err(), "loop should wait while a handle is alive");
}

#[tokio::test]
async fn test_run_ends_when_no_handle_is_left() {
    let runtime = Runtime::<Waiter>::new(());

    let result = timeout(Duration::from_millis(300), runtime.run()).await;
    assert!(result.is_ok(), "nothing can send another message, so run should end");
}

#[tokio::test]
async fn test_run_ends_after_last_handle_is_dropped() {
    let runtime = Runtime::<Waiter>::new(());
    let dispatch = runtime.dispatcher();

    tokio::spawn(async move {
        sleep(Duration::from_millis(20)).await;
        dispatch.send(());
    });

    let start = Instant::now();
    timeout(Duration::from_secs(1), runtime.run())
        .await
        .expect("run should end once the handle is dropped")
        .expect("Runtime should not error");
    assert!(start.elapsed() >= Duration::from_millis(20));
}

// Test program with one slow effect
struct Slow {
    received: Vec<String>,
}

impl Program for Slow {
    type Message = String;
    type Flags = ();

    fn init(_: ()) -> (Self, Cmd<String>) {
        let cmd = Cmd::perform(
            async {
                sleep(Duration::from_millis(30)).await;
                "late".to_string()
            },
            |s: String| s,
        );
        (Slow { received: vec![] }, cmd)
    }

    fn update(&mut self, msg: String) -> Cmd<String> {
        self.received.push(msg);
        Cmd::none()
    }
}

#[tokio::test]
async fn test_pending_effect_keeps_run_alive() {
    let slow = timeout(Duration::from_secs(1), Runtime::<Slow>::new(()).run())
        .await
        .expect("Runtime should complete")
        .expect("Runtime should not error");

    assert_eq!(slow.received, vec!["late"]);
}

#[tokio::test]
async fn test_effect_dispatching_after_teardown() {
    let config = RuntimeConfig::default().with_idle_timeout(Duration::from_millis(5));
    let runtime = Runtime::<Slow>::with_config((), config);

    timeout(Duration::from_secs(1), runtime.run())
        .await
        .expect("Runtime should complete")
        .expect("Runtime should not error");

    // The pending effect dispatches into a dropped queue; it must not panic.
    sleep(Duration::from_millis(60)).await;
}
