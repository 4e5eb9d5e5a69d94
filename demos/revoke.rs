//! Revocation in both flavors: before a task is claimed, and mid-execution.
//!
//! A single worker is kept busy by a long task, so a second submission sits
//! unclaimed in the queue and can be revoked without ever running. The long
//! task itself is then revoked cooperatively while executing.
//!
//! Run with: `cargo run --example revoke`

use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use taskflux::{EngineConfig, EngineError, HandlerFn, RetryPolicy, TaskEngine, TaskError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), EngineError> {
    tracing_subscriber::fmt().init();

    let engine = TaskEngine::builder(EngineConfig {
        workers: 1,
        ..EngineConfig::default()
    })
    .register(
        "long_running",
        HandlerFn::arc(|args: Vec<Value>, ctx: CancellationToken| async move {
            let seconds = args.first().and_then(Value::as_u64).unwrap_or(30);
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                _ = ctx.cancelled() => return Err(TaskError::Canceled),
            }
            Ok(Value::from("finished"))
        }),
        RetryPolicy::default(),
    )
    .register_default(
        "never_runs",
        HandlerFn::arc(|_args: Vec<Value>, _ctx: CancellationToken| async move {
            Ok(Value::from("you should not see this"))
        }),
    )
    .build();

    engine.start();

    // Occupies the only worker for 30 seconds.
    let long_id = engine.submit_task("long_running", vec![json!(30)]).await?;
    // Queued behind it, never claimed.
    let queued_id = engine.submit_task("never_runs", vec![]).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let queued_outcome = engine.revoke_task(&queued_id).await;
    println!(
        "queued task: revoked={} status={:?}",
        queued_outcome.revoked, queued_outcome.status
    );

    let running_outcome = engine.revoke_task(&long_id).await;
    println!(
        "running task: revoked={} status={:?}",
        running_outcome.revoked, running_outcome.status
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("running task settled as {:?}", engine.get_status(&long_id).status);

    engine.shutdown().await
}
