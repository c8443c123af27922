//! Bounded frame queue with a newest-frame overflow policy.
//!
//! The producer never waits: when the queue is full the oldest buffered
//! frame is discarded to make room. A monitor only cares about what is on
//! screen now, so stale frames are worth less than fresh ones.
//!
//! Closing wakes every waiting consumer and discards whatever is still
//! buffered; `dequeue` on a closed queue returns `None` immediately until
//! the queue is reopened.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::frame::Frame;

#[derive(Debug, Default)]
struct QueueState {
    frames: VecDeque<Frame>,
    closed: bool,
}

/// Concurrency-safe frame buffer shared by the capture driver and the
/// pipeline consumer.
#[derive(Debug)]
pub struct FrameQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: AtomicUsize,
    dropped: AtomicU64,
}

impl FrameQueue {
    /// Create an open queue. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            capacity: AtomicUsize::new(capacity.max(1)),
            dropped: AtomicU64::new(0),
        }
    }

    // The lock is never held across an await or user code, so a poisoned
    // guard still holds a consistent deque.
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Buffer `frame`, evicting the oldest frames if the queue is full.
    ///
    /// Returns `false` (and drops the frame) when the queue is closed.
    pub fn enqueue(&self, frame: Frame) -> bool {
        let capacity = self.capacity();
        {
            let mut state = self.state();
            if state.closed {
                return false;
            }
            while state.frames.len() >= capacity {
                state.frames.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            state.frames.push_back(frame);
        }
        self.notify.notify_one();
        true
    }

    /// Wait for the next frame. Returns `None` once the queue is closed.
    pub async fn dequeue(&self) -> Option<Frame> {
        loop {
            // Register interest before inspecting the state so that a
            // `close` racing with this check still wakes us.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if state.closed {
                    return None;
                }
                if let Some(frame) = state.frames.pop_front() {
                    return Some(frame);
                }
            }

            notified.await;
        }
    }

    /// Close the queue, discard buffered frames and wake all waiters.
    /// Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.state();
            state.closed = true;
            state.frames.clear();
        }
        self.notify.notify_waiters();
    }

    /// Make a closed queue accept frames again.
    pub fn reopen(&self) {
        self.state().closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Change the capacity, evicting the oldest frames if it shrank.
    pub fn set_capacity(&self, capacity: usize) {
        let capacity = capacity.max(1);
        self.capacity.store(capacity, Ordering::Relaxed);
        let mut state = self.state();
        while state.frames.len() > capacity {
            state.frames.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.state().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total frames evicted by the overflow policy since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use image::RgbaImage;

    use super::*;

    fn frame(second: u32) -> Frame {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).unwrap();
        Frame::with_timestamp(RgbaImage::new(1, 1), ts)
    }

    fn second_of(frame: &Frame) -> u32 {
        use chrono::Timelike;
        frame.timestamp().second()
    }

    #[tokio::test]
    async fn fifo_order() {
        let queue = FrameQueue::new(4);
        assert!(queue.enqueue(frame(1)));
        assert!(queue.enqueue(frame(2)));
        assert_eq!(second_of(&queue.dequeue().await.unwrap()), 1);
        assert_eq!(second_of(&queue.dequeue().await.unwrap()), 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_keeps_newest() {
        let queue = FrameQueue::new(2);
        for s in 1..=5 {
            assert!(queue.enqueue(frame(s)));
        }
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped(), 3);
        assert_eq!(second_of(&queue.dequeue().await.unwrap()), 4);
        assert_eq!(second_of(&queue.dequeue().await.unwrap()), 5);
    }

    #[tokio::test]
    async fn dequeue_waits_for_enqueue() {
        let queue = Arc::new(FrameQueue::new(1));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue(frame(7));
        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second_of(&got.unwrap()), 7);
    }

    #[tokio::test]
    async fn close_wakes_blocked_consumers() {
        let queue = Arc::new(FrameQueue::new(1));
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { queue.dequeue().await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        queue.close();
        queue.close();

        for waiter in waiters {
            let got = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
            assert!(got.is_none());
        }
    }

    #[tokio::test]
    async fn closed_queue_rejects_and_reopens() {
        let queue = FrameQueue::new(2);
        queue.enqueue(frame(1));
        queue.close();
        assert!(queue.is_closed());
        assert!(queue.is_empty());
        assert!(!queue.enqueue(frame(2)));
        assert!(queue.dequeue().await.is_none());

        queue.reopen();
        assert!(queue.enqueue(frame(3)));
        assert_eq!(second_of(&queue.dequeue().await.unwrap()), 3);
    }

    #[test]
    fn shrinking_capacity_evicts_oldest() {
        let queue = FrameQueue::new(4);
        for s in 1..=4 {
            queue.enqueue(frame(s));
        }
        queue.set_capacity(1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.dropped(), 3);
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(FrameQueue::new(0).capacity(), 1);
    }
}
