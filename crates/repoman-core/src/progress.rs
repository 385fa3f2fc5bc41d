use std::sync::mpsc::Sender;

/// Emitted once per finished batch item, whatever its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub index: usize,
    pub name: String,
    pub completed: usize,
    pub total: usize,
    pub success: bool,
}

pub trait ProgressObserver {
    fn on_complete(&self, event: ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressEvent),
{
    fn on_complete(&self, event: ProgressEvent) {
        self(event)
    }
}

impl ProgressObserver for Sender<ProgressEvent> {
    fn on_complete(&self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}
