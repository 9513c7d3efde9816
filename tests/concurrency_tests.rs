//! # Concurrency Tests using Loom
//!
//! This module uses loom to check the two synchronization points of a run:
//! the stop-on-fail cancellation token raced by concurrently running cases,
//! and the single queue every publisher funnels its events through.

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use loom::sync::atomic::{AtomicUsize, Ordering};
    use loom::sync::{Arc, Mutex};
    use loom::thread;
    use tokio_util::sync::CancellationToken;

    // Loom explores deep interleavings; give the model a larger stack.
    const STACK_SIZE: usize = 8 * 1024 * 1024;

    fn run_model<F>(name: &str, model: F)
    where
        F: Fn() + Sync + Send + 'static,
    {
        let handle = std::thread::Builder::new()
            .name(name.into())
            .stack_size(STACK_SIZE)
            .spawn(move || loom::model(model))
            .unwrap();
        handle.join().unwrap();
    }

    /// Models `stop_on_fail`: one case fails and cancels the run while the
    /// other races to check the token before it starts.
    ///
    /// Every case that started must also finish, and the failing case always
    /// gets to run.
    #[test]
    fn test_stop_on_fail_cancellation_is_thread_safe() {
        run_model("loom-stop-on-fail", || {
            const NUM_CASES: usize = 2;
            let started = Arc::new(AtomicUsize::new(0));
            let finished = Arc::new(AtomicUsize::new(0));
            let token = Arc::new(CancellationToken::new());

            let handles: Vec<_> = (0..NUM_CASES)
                .map(|i| {
                    let token = token.clone();
                    let started = started.clone();
                    let finished = finished.clone();
                    thread::spawn(move || {
                        // Case 1 is already running when the race begins.
                        if i == 1 || !token.is_cancelled() {
                            started.fetch_add(1, Ordering::SeqCst);
                            if i == 1 {
                                token.cancel();
                            }
                            finished.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            assert!(token.is_cancelled());
            let started = started.load(Ordering::SeqCst);
            assert_eq!(started, finished.load(Ordering::SeqCst));
            assert!(
                (1..=NUM_CASES).contains(&started),
                "started count was {started}"
            );
        });
    }

    /// Models the bus funnel: two publishers append to one queue while a
    /// single deliverer drains it and fans each event out to two subscriber
    /// inboxes.
    ///
    /// Both subscribers must see the same sequence, and each publisher's
    /// events must keep their relative order.
    #[test]
    fn test_funnel_gives_every_subscriber_one_order() {
        run_model("loom-bus-funnel", || {
            const PUBLISHERS: usize = 2;
            const EVENTS_EACH: usize = 2;
            let queue = Arc::new(Mutex::new(VecDeque::<(usize, usize)>::new()));
            let done = Arc::new(AtomicUsize::new(0));
            let inboxes = [
                Arc::new(Mutex::new(Vec::<(usize, usize)>::new())),
                Arc::new(Mutex::new(Vec::<(usize, usize)>::new())),
            ];

            let deliverer = {
                let queue = queue.clone();
                let done = done.clone();
                let inboxes = inboxes.clone();
                thread::spawn(move || loop {
                    let next = queue.lock().unwrap().pop_front();
                    match next {
                        Some(event) => {
                            for inbox in &inboxes {
                                inbox.lock().unwrap().push(event);
                            }
                        }
                        None if done.load(Ordering::SeqCst) == PUBLISHERS => {
                            if queue.lock().unwrap().is_empty() {
                                break;
                            }
                        }
                        None => thread::yield_now(),
                    }
                })
            };

            let publishers: Vec<_> = (0..PUBLISHERS)
                .map(|publisher| {
                    let queue = queue.clone();
                    let done = done.clone();
                    thread::spawn(move || {
                        for seq in 0..EVENTS_EACH {
                            queue.lock().unwrap().push_back((publisher, seq));
                        }
                        done.fetch_add(1, Ordering::SeqCst);
                    })
                })
                .collect();
            for publisher in publishers {
                publisher.join().unwrap();
            }
            deliverer.join().unwrap();

            let first = inboxes[0].lock().unwrap().clone();
            let second = inboxes[1].lock().unwrap().clone();
            assert_eq!(first, second);
            assert_eq!(first.len(), PUBLISHERS * EVENTS_EACH);
            for publisher in 0..PUBLISHERS {
                let seqs: Vec<usize> = first
                    .iter()
                    .filter(|(p, _)| *p == publisher)
                    .map(|(_, seq)| *seq)
                    .collect();
                assert_eq!(seqs, (0..EVENTS_EACH).collect::<Vec<_>>());
            }
        });
    }
}
