//! End-to-end demo: the three classic tasks and a live event stream.
//!
//! Registers `add`, `long_running`, and `unreliable`, submits one of each,
//! and prints every status event as the SSE frame an observer would receive.
//!
//! Run with: `cargo run --example demo`

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use taskflux::{
    EngineConfig, EventStream, HandlerFn, JitterPolicy, LogWriter, RetryPolicy, Subscribe,
    TaskEngine, TaskError, TaskStatus,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let engine = Arc::new(
        TaskEngine::builder(EngineConfig {
            workers: 2,
            ..EngineConfig::default()
        })
        .with_subscribers(subscribers)
        .register(
            "add",
            HandlerFn::arc(|args: Vec<Value>, _ctx: CancellationToken| async move {
                let x = args.first().and_then(Value::as_i64).unwrap_or(0);
                let y = args.get(1).and_then(Value::as_i64).unwrap_or(0);
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, TaskError>(Value::from(x + y))
            }),
            RetryPolicy::new(0, Duration::from_secs(5)),
        )
        .register(
            "long_running",
            HandlerFn::arc(|args: Vec<Value>, ctx: CancellationToken| async move {
                let seconds = args.first().and_then(Value::as_u64).unwrap_or(5);
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                    _ = ctx.cancelled() => return Err(TaskError::Canceled),
                }
                Ok(Value::from(format!(
                    "long running task completed after {seconds} seconds"
                )))
            }),
            RetryPolicy::new(0, Duration::from_secs(5)),
        )
        .register(
            "unreliable",
            HandlerFn::arc(|_args: Vec<Value>, _ctx: CancellationToken| async move {
                if rand::rng().random_bool(0.5) {
                    return Err(TaskError::Fail {
                        error: "simulated failure".into(),
                    });
                }
                Ok(Value::from("unreliable task completed"))
            }),
            RetryPolicy::new(1, Duration::from_secs(5)).with_jitter(JitterPolicy::Equal),
        )
        .build(),
    );

    engine.start();

    // The observer side of the house: print each event as its SSE frame.
    let mut stream = engine.open_event_stream();
    let printer = tokio::spawn(async move {
        while let Ok(ev) = stream.recv().await {
            if let Some(frame) = EventStream::sse_frame(&ev) {
                print!("{frame}");
            }
        }
    });

    let add_id = engine.submit_task("add", vec![json!(4), json!(6)]).await?;
    let long_id = engine.submit_task("long_running", vec![json!(3)]).await?;
    let flaky_id = engine.submit_task("unreliable", vec![]).await?;

    for (name, id) in [("add", &add_id), ("long_running", &long_id), ("unreliable", &flaky_id)] {
        wait_terminal(&engine, id).await;
        let snapshot = engine.get_status(id);
        println!("{name}: {:?} result={:?}", snapshot.status, snapshot.result);
    }

    engine.shutdown().await?;
    printer.abort();
    Ok(())
}

/// Polls the result store until the task settles.
async fn wait_terminal(engine: &TaskEngine, task_id: &str) {
    loop {
        let status = engine.get_status(task_id).status;
        if status.is_terminal() || status == TaskStatus::NotFound {
            return;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
