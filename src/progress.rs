// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Transfer progress notifications.

use tokio::sync::mpsc;
use tracing::debug;

/// Phase of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Connecting,
    InProgress,
    Completed,
    Aborted,
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Connecting => "Connecting...",
            TransferState::InProgress => "In progress",
            TransferState::Completed => "Completed",
            TransferState::Aborted => "Aborted",
        }
    }

    /// Terminal states end the transfer.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Aborted)
    }

    fn rank(&self) -> u8 {
        match self {
            TransferState::Connecting => 0,
            TransferState::InProgress => 1,
            TransferState::Completed | TransferState::Aborted => 2,
        }
    }
}

/// Snapshot of a transfer handed to a [`ProgressObserver`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    percentage: f32,
    state: TransferState,
}

impl Progress {
    /// Create a progress value. The percentage is clamped to `0.0..=100.0`.
    pub fn new(percentage: f32, state: TransferState) -> Self {
        Self {
            percentage: percentage.clamp(0.0, 100.0),
            state,
        }
    }

    pub fn percentage(&self) -> f32 {
        self.percentage
    }

    pub fn state(&self) -> TransferState {
        self.state
    }
}

/// Receives progress notifications, synchronously and in order.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}

/// Observer that forwards every notification into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<Progress>,
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, progress: Progress) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(progress);
    }
}

/// Create an observer whose notifications are queued on the returned receiver.
pub fn channel() -> (ChannelObserver, mpsc::UnboundedReceiver<Progress>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelObserver { tx }, rx)
}

/// Emits progress for a single transfer, at most one observer per transfer.
pub(crate) struct ProgressReporter<'a> {
    observer: Option<&'a dyn ProgressObserver>,
    current: Option<TransferState>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(observer: Option<&'a dyn ProgressObserver>) -> Self {
        Self {
            observer,
            current: None,
        }
    }

    pub fn report(&mut self, percentage: f32, state: TransferState) {
        if let Some(current) = self.current {
            debug_assert!(!current.is_terminal(), "progress after terminal state");
            debug_assert!(state.rank() >= current.rank(), "progress moved backwards");
        }
        self.current = Some(state);

        let progress = Progress::new(percentage, state);
        debug!(
            "Progress: {:.1}% ({})",
            progress.percentage(),
            state.as_str()
        );

        if let Some(observer) = self.observer {
            observer.on_progress(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_percentage_is_clamped() {
        assert_eq!(Progress::new(150.0, TransferState::InProgress).percentage(), 100.0);
        assert_eq!(Progress::new(-3.0, TransferState::Aborted).percentage(), 0.0);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Completed.is_terminal());
        assert!(TransferState::Aborted.is_terminal());
        assert!(!TransferState::Connecting.is_terminal());
        assert!(!TransferState::InProgress.is_terminal());
    }

    #[test]
    fn test_reporter_without_observer() {
        let mut reporter = ProgressReporter::new(None);
        reporter.report(0.0, TransferState::Connecting);
        reporter.report(100.0, TransferState::Completed);
        assert_eq!(reporter.current, Some(TransferState::Completed));
    }

    #[test]
    fn test_closure_observer_receives_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = move |p: Progress| sink.lock().unwrap().push(p.state());

        let mut reporter = ProgressReporter::new(Some(&observer));
        reporter.report(0.0, TransferState::Connecting);
        reporter.report(50.0, TransferState::InProgress);
        reporter.report(0.0, TransferState::Aborted);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                TransferState::Connecting,
                TransferState::InProgress,
                TransferState::Aborted
            ]
        );
    }

    #[test]
    fn test_channel_observer() {
        let (observer, mut rx) = channel();
        observer.on_progress(Progress::new(42.0, TransferState::InProgress));
        drop(observer);

        let received = rx.try_recv().unwrap();
        assert_eq!(received.percentage(), 42.0);
        assert!(rx.try_recv().is_err());
    }
}
