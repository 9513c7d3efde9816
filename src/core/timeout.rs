//! # Timeout Supervisor Module / 超时监督模块
//!
//! Races a case body against its deadline. The body runs on its own task and
//! reports through a oneshot channel; when the deadline wins, the receiver is
//! dropped and whatever the body produces later is discarded. The body task
//! itself is left to run to completion.
//!
//! 让用例主体与其截止时间赛跑。主体在独立任务上运行并通过 oneshot 通道报告结果；
//! 当截止时间先到时，接收端被丢弃，主体之后产生的结果都会被丢弃。
//! 主体任务本身会继续运行直到结束。

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Outcome of a supervised body.
/// 受监督主体的执行结果。
#[derive(Debug, Clone, PartialEq)]
pub enum Supervised<T> {
    /// The body finished before the deadline.
    /// 主体在截止时间前完成。
    Completed(T),
    /// The deadline elapsed first.
    /// 截止时间先到达。
    TimedOut(Duration),
    /// The body panicked, with the panic message.
    /// 主体发生 panic，附带 panic 消息。
    Panicked(String),
}

/// Runs `body` with an optional deadline in milliseconds. `None` or `Some(0)`
/// waits without bound.
///
/// 以可选的毫秒级截止时间运行 `body`。`None` 或 `Some(0)` 表示无限等待。
pub async fn run_with_timeout<F>(timeout_ms: Option<u64>, body: F) -> Supervised<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let outcome = AssertUnwindSafe(body).catch_unwind().await;
        if tx.send(outcome).is_err() {
            debug!("suppressing result of a body that finished after its deadline");
        }
    });

    let received = match timeout_ms.filter(|ms| *ms > 0) {
        Some(ms) => {
            let deadline = Duration::from_millis(ms);
            match tokio::time::timeout(deadline, rx).await {
                Ok(received) => received,
                Err(_) => {
                    debug!(timeout_ms = ms, "test body exceeded its deadline");
                    return Supervised::TimedOut(deadline);
                }
            }
        }
        None => rx.await,
    };

    match received {
        Ok(Ok(output)) => Supervised::Completed(output),
        Ok(Err(payload)) => Supervised::Panicked(panic_message(payload.as_ref())),
        Err(_) => Supervised::Panicked("test task ended without reporting a result".to_string()),
    }
}

/// Extracts the message of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "test panicked with a non-string payload".to_string()
    }
}
