//! # Message Bus Module / 消息总线模块
//!
//! An ordered, multi-subscriber event channel. Every publisher (discovery,
//! concurrently running cases, the legacy adapter's callbacks) pushes into one
//! unbounded queue, and a single delivery task drains that queue and fans each
//! event out to the subscribers. The queue is the only synchronization point,
//! so all subscribers observe the same total order.
//!
//! 有序的多订阅者事件通道。所有发布者（发现阶段、并发运行的用例、旧版适配器的回调）
//! 都写入同一个无界队列，由唯一的投递任务取出并分发给订阅者。
//! 该队列是唯一的同步点，因此所有订阅者看到的是同一个全序。

use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::models::{FailureReason, TestCaseIdentity};

/// Lifecycle events published during discovery and execution.
/// 发现和执行期间发布的生命周期事件。
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum MessageBusEvent {
    DiscoveryStarting {
        assembly: String,
    },
    TestCaseDiscovered {
        case: TestCaseIdentity,
    },
    DiscoveryComplete {
        assembly: String,
        test_cases: usize,
    },
    TestStarting {
        unique_id: String,
        display_name: String,
    },
    TestPassed {
        unique_id: String,
        duration: Duration,
    },
    TestFailed {
        unique_id: String,
        reason: FailureReason,
        messages: Vec<String>,
        duration: Duration,
    },
    TestSkipped {
        unique_id: String,
        reason: String,
    },
    TestNotRun {
        unique_id: String,
    },
    TestAssemblyFinished {
        assembly: String,
        summary: RunSummary,
    },
}

/// The discriminant of a [`MessageBusEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DiscoveryStarting,
    TestCaseDiscovered,
    DiscoveryComplete,
    TestStarting,
    TestPassed,
    TestFailed,
    TestSkipped,
    TestNotRun,
    TestAssemblyFinished,
}

impl MessageBusEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MessageBusEvent::DiscoveryStarting { .. } => EventKind::DiscoveryStarting,
            MessageBusEvent::TestCaseDiscovered { .. } => EventKind::TestCaseDiscovered,
            MessageBusEvent::DiscoveryComplete { .. } => EventKind::DiscoveryComplete,
            MessageBusEvent::TestStarting { .. } => EventKind::TestStarting,
            MessageBusEvent::TestPassed { .. } => EventKind::TestPassed,
            MessageBusEvent::TestFailed { .. } => EventKind::TestFailed,
            MessageBusEvent::TestSkipped { .. } => EventKind::TestSkipped,
            MessageBusEvent::TestNotRun { .. } => EventKind::TestNotRun,
            MessageBusEvent::TestAssemblyFinished { .. } => EventKind::TestAssemblyFinished,
        }
    }

    /// The originating case's unique id; `None` for assembly-level events.
    /// 来源用例的唯一 ID；程序集级事件返回 `None`。
    pub fn unique_id(&self) -> Option<&str> {
        match self {
            MessageBusEvent::TestCaseDiscovered { case } => Some(case.unique_id()),
            MessageBusEvent::TestStarting { unique_id, .. }
            | MessageBusEvent::TestPassed { unique_id, .. }
            | MessageBusEvent::TestFailed { unique_id, .. }
            | MessageBusEvent::TestSkipped { unique_id, .. }
            | MessageBusEvent::TestNotRun { unique_id } => Some(unique_id),
            _ => None,
        }
    }

    /// `true` for Passed/Failed/Skipped/NotRun.
    pub fn is_case_terminal(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::TestPassed | EventKind::TestFailed | EventKind::TestSkipped | EventKind::TestNotRun
        )
    }
}

/// Totals for one execution phase.
/// 单个执行阶段的统计数据。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Filtered out by the explicit policy; counted in neither pass nor fail.
    /// 被 explicit 策略过滤掉的用例；既不计入通过也不计入失败。
    pub not_run: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Folds one terminal event into the totals. Non-terminal events are ignored.
    pub fn record(&mut self, event: &MessageBusEvent) {
        match event.kind() {
            EventKind::TestPassed => self.passed += 1,
            EventKind::TestFailed => self.failed += 1,
            EventKind::TestSkipped => self.skipped += 1,
            EventKind::TestNotRun => self.not_run += 1,
            _ => return,
        }
        self.total += 1;
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.not_run += other.not_run;
    }
}

type EventPredicate = Box<dyn Fn(&MessageBusEvent) -> bool + Send>;

struct Subscriber {
    filter: Option<EventPredicate>,
    tx: mpsc::UnboundedSender<MessageBusEvent>,
}

impl Subscriber {
    /// Returns `false` once the receiving side is gone.
    fn deliver(&self, event: &MessageBusEvent) -> bool {
        if let Some(filter) = &self.filter {
            if !filter(event) {
                return !self.tx.is_closed();
            }
        }
        self.tx.send(event.clone()).is_ok()
    }
}

enum BusCommand {
    Subscribe(Subscriber),
    Publish(MessageBusEvent),
}

/// Handle to the bus. Clones share the same queue and delivery task.
///
/// When the last handle is dropped, or [`MessageBus::close`] is called, the
/// delivery task stops and every subscription and completion waiter is
/// released.
///
/// 总线句柄。克隆体共享同一队列和投递任务。
/// 当最后一个句柄被丢弃或调用 [`MessageBus::close`] 时，投递任务停止，
/// 所有订阅和完成等待者都会被释放。
#[derive(Clone)]
pub struct MessageBus {
    tx: mpsc::UnboundedSender<BusCommand>,
    closed: CancellationToken,
    finished: watch::Receiver<bool>,
}

impl MessageBus {
    /// Creates a bus and spawns its delivery task on the current tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (finished_tx, finished_rx) = watch::channel(false);
        let closed = CancellationToken::new();
        tokio::spawn(deliver(rx, closed.clone(), finished_tx));
        Self {
            tx,
            closed,
            finished: finished_rx,
        }
    }

    /// Appends an event to the bus. Returns `false` if the bus is closed.
    /// 向总线追加一个事件。如果总线已关闭则返回 `false`。
    pub fn publish(&self, event: MessageBusEvent) -> bool {
        if self.closed.is_cancelled() {
            return false;
        }
        self.tx.send(BusCommand::Publish(event)).is_ok()
    }

    /// Subscribes to every event published after this call.
    pub fn subscribe(&self) -> Subscription {
        self.register(None)
    }

    /// Subscribes to the subsequent events matching `predicate`.
    pub fn subscribe_filtered<P>(&self, predicate: P) -> Subscription
    where
        P: Fn(&MessageBusEvent) -> bool + Send + 'static,
    {
        self.register(Some(Box::new(predicate)))
    }

    fn register(&self, filter: Option<EventPredicate>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        // A closed bus drops the subscriber immediately, which ends the subscription.
        let _ = self.tx.send(BusCommand::Subscribe(Subscriber { filter, tx }));
        Subscription { rx }
    }

    /// Stops delivery. Undelivered events are discarded and all waiters released.
    /// 停止投递。未投递的事件将被丢弃，所有等待者都会被释放。
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once `TestAssemblyFinished` has been delivered or the bus stops.
    /// 当 `TestAssemblyFinished` 已投递或总线停止时完成。
    pub async fn wait_for_finished(&self) {
        let mut finished = self.finished.clone();
        // An Err means the delivery task exited, which also counts as finished.
        let _ = finished.wait_for(|done| *done).await;
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

async fn deliver(
    mut rx: mpsc::UnboundedReceiver<BusCommand>,
    closed: CancellationToken,
    finished: watch::Sender<bool>,
) {
    let mut subscribers: Vec<Subscriber> = Vec::new();
    let mut delivered = 0usize;

    loop {
        let command = tokio::select! {
            biased;
            _ = closed.cancelled() => break,
            command = rx.recv() => command,
        };

        match command {
            Some(BusCommand::Subscribe(subscriber)) => subscribers.push(subscriber),
            Some(BusCommand::Publish(event)) => {
                subscribers.retain(|subscriber| subscriber.deliver(&event));
                delivered += 1;
                if event.kind() == EventKind::TestAssemblyFinished {
                    finished.send_replace(true);
                }
            }
            None => break,
        }
    }

    debug!(delivered, subscribers = subscribers.len(), "message bus delivery stopped");
    finished.send_replace(true);
}

/// The receiving end of a bus subscription.
/// 总线订阅的接收端。
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<MessageBusEvent>,
}

impl Subscription {
    /// Waits for the next event; `None` once the bus has stopped.
    pub async fn next(&mut self) -> Option<MessageBusEvent> {
        self.rx.recv().await
    }

    /// Collects events up to and including the first event of `kind`.
    /// Returns early with what was collected if the bus stops first.
    ///
    /// 收集事件，直到（并包括）第一个类型为 `kind` 的事件。
    /// 如果总线先停止，则提前返回已收集的事件。
    pub async fn collect_until(mut self, kind: EventKind) -> Vec<MessageBusEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            let done = event.kind() == kind;
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<MessageBusEvent> {
        UnboundedReceiverStream::new(self.rx)
    }
}
