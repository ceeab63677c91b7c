use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::types::{DefenseDecision, SectionType};

// Progress reporting and cancellation for a cleaning run.
// Observers get plain events; nothing here knows about any UI.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PipelineEvent {
    StepStarted {
        step: String,
        index: usize,
        total: usize,
    },
    SectionResolved {
        section: SectionType,
        decision: DefenseDecision,
    },
    StepCompleted {
        step: String,
        confidence: Option<f64>,
        fallback: bool,
    },
    Cancelled {
        completed_steps: usize,
    },
}

pub trait ProgressObserver {
    fn on_event(&mut self, event: &PipelineEvent);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&PipelineEvent),
{
    fn on_event(&mut self, event: &PipelineEvent) {
        self(event)
    }
}

impl ProgressObserver for Sender<PipelineEvent> {
    fn on_event(&mut self, event: &PipelineEvent) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.send(event.clone());
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn on_event(&mut self, _event: &PipelineEvent) {}
}

/// Shared flag checked between pipeline steps
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn closures_and_channels_observe_events() {
        let mut seen = Vec::new();
        {
            let mut observer = |event: &PipelineEvent| seen.push(event.clone());
            observer.on_event(&PipelineEvent::Cancelled { completed_steps: 2 });
        }
        assert_eq!(seen.len(), 1);

        let (mut tx, rx) = mpsc::channel();
        tx.on_event(&PipelineEvent::Cancelled { completed_steps: 1 });
        assert_eq!(rx.recv().unwrap(), PipelineEvent::Cancelled { completed_steps: 1 });
    }

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
