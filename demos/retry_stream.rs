//! Watch a retrying task through the event stream.
//!
//! A handler that fails twice before succeeding, with a short retry delay:
//! the stream shows `STARTED, RETRY, STARTED, RETRY, STARTED, SUCCESS` with
//! 1-based attempt numbers.
//!
//! Run with: `cargo run --example retry_stream`

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use taskflux::{EngineConfig, EngineError, HandlerFn, RetryPolicy, TaskEngine, TaskError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), EngineError> {
    tracing_subscriber::fmt().init();

    let attempts = Arc::new(AtomicU32::new(0));
    let handler = {
        let attempts = Arc::clone(&attempts);
        HandlerFn::arc(move |_args: Vec<Value>, _ctx: CancellationToken| {
            let attempts = Arc::clone(&attempts);
            async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt <= 2 {
                    Err(TaskError::Fail {
                        error: "scripted failure".into(),
                    })
                } else {
                    Ok(json!(format!("recovered on attempt {attempt}")))
                }
            }
        })
    };

    let engine = TaskEngine::builder(EngineConfig {
        workers: 1,
        ..EngineConfig::default()
    })
    .register("recovering", handler, RetryPolicy::new(3, Duration::from_millis(500)))
    .build();

    let mut stream = engine.open_event_stream();
    engine.start();

    let task_id = engine.submit_task("recovering", vec![]).await?;

    while let Ok(ev) = stream.recv().await {
        println!(
            "seq={} kind={:?} attempt={:?} result={:?}",
            ev.seq, ev.kind, ev.attempt, ev.result
        );
        if ev.task_id.as_deref() == Some(task_id.as_str())
            && ev.status().is_some_and(|s| s.is_terminal())
        {
            break;
        }
    }

    engine.shutdown().await
}
