use model::pagination::filter::{FilterEvent, FilterValue};
use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};
use tokio::{sync::mpsc, time::Instant};

pub const DEFAULT_FILTER_DELAY: Duration = Duration::from_millis(300);

/// Raw input coming from filter controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterInput {
    /// Text field content after a key release.
    Keystroke(String, String),
    /// Checkbox changed.
    Toggle(String, bool),
    Enter(String),
    Blur(String),
    Escape(String),
}

/// Turns raw control input into committed filter events.
///
/// Keystrokes on one attribute coalesce until `delay` passes without more
/// typing; enter and blur commit pending text at once.
pub struct FilterInputDebouncer {
    input: mpsc::Receiver<FilterInput>,
    delay: Duration,
    pending: BTreeMap<String, (String, Instant)>,
    ready: VecDeque<FilterEvent>,
    closed: bool,
}

impl FilterInputDebouncer {
    pub fn new(input: mpsc::Receiver<FilterInput>, delay: Duration) -> Self {
        FilterInputDebouncer {
            input,
            delay,
            pending: BTreeMap::new(),
            ready: VecDeque::new(),
            closed: false,
        }
    }

    pub fn channel(buffer: usize, delay: Duration) -> (mpsc::Sender<FilterInput>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx, delay))
    }

    /// Next committed event, or `None` once the input is closed and drained.
    pub async fn next(&mut self) -> Option<FilterEvent> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(event);
            }

            if self.closed {
                let attribute = self.pending.keys().next().cloned()?;
                return self.take_pending(&attribute);
            }

            let deadline = self.pending.values().map(|(_, at)| *at).min();
            let received = match deadline {
                Some(at) => tokio::select! {
                    msg = self.input.recv() => Some(msg),
                    _ = tokio::time::sleep_until(at) => None,
                },
                None => Some(self.input.recv().await),
            };

            match received {
                Some(Some(input)) => self.accept(input),
                Some(None) => self.closed = true,
                None => self.commit_due(Instant::now()),
            }
        }
    }

    fn accept(&mut self, input: FilterInput) {
        match input {
            FilterInput::Keystroke(attribute, text) => {
                self.pending
                    .insert(attribute, (text, Instant::now() + self.delay));
            }
            FilterInput::Toggle(attribute, checked) => {
                self.pending.remove(&attribute);
                self.ready
                    .push_back(FilterEvent::Commit(attribute, FilterValue::Bool(checked)));
            }
            FilterInput::Enter(attribute) | FilterInput::Blur(attribute) => {
                if let Some(event) = self.take_pending(&attribute) {
                    self.ready.push_back(event);
                }
            }
            FilterInput::Escape(attribute) => {
                self.pending.remove(&attribute);
                self.ready.push_back(FilterEvent::Escape(attribute));
            }
        }
    }

    fn commit_due(&mut self, now: Instant) {
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, (_, at))| *at <= now)
            .map(|(attribute, _)| attribute.clone())
            .collect();
        for attribute in due {
            if let Some(event) = self.take_pending(&attribute) {
                self.ready.push_back(event);
            }
        }
    }

    fn take_pending(&mut self, attribute: &str) -> Option<FilterEvent> {
        let (text, _) = self.pending.remove(attribute)?;
        Some(FilterEvent::Commit(
            attribute.to_string(),
            FilterValue::Text(text),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(attribute: &str, value: &str) -> FilterEvent {
        FilterEvent::Commit(attribute.into(), FilterValue::from(value))
    }

    #[tokio::test(start_paused = true)]
    async fn coalesces_keystrokes_into_one_commit() {
        let (tx, mut debouncer) = FilterInputDebouncer::channel(16, DEFAULT_FILTER_DELAY);
        for partial in ["a", "ad", "adm"] {
            tx.send(FilterInput::Keystroke("name".into(), partial.into()))
                .await
                .unwrap();
        }

        assert_eq!(debouncer.next().await, Some(text("name", "adm")));

        drop(tx);
        assert_eq!(debouncer.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn enter_commits_without_waiting() {
        let (tx, mut debouncer) = FilterInputDebouncer::channel(16, Duration::from_secs(60));
        tx.send(FilterInput::Keystroke("email".into(), "a@".into()))
            .await
            .unwrap();
        tx.send(FilterInput::Enter("email".into())).await.unwrap();

        let start = Instant::now();
        assert_eq!(debouncer.next().await, Some(text("email", "a@")));
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn escape_discards_pending_text() {
        let (tx, mut debouncer) = FilterInputDebouncer::channel(16, DEFAULT_FILTER_DELAY);
        tx.send(FilterInput::Keystroke("name".into(), "typo".into()))
            .await
            .unwrap();
        tx.send(FilterInput::Escape("name".into())).await.unwrap();
        drop(tx);

        assert_eq!(debouncer.next().await, Some(FilterEvent::Escape("name".into())));
        assert_eq!(debouncer.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn toggles_commit_immediately() {
        let (tx, mut debouncer) = FilterInputDebouncer::channel(16, DEFAULT_FILTER_DELAY);
        tx.send(FilterInput::Toggle("isAdmin".into(), true))
            .await
            .unwrap();

        assert_eq!(
            debouncer.next().await,
            Some(FilterEvent::Commit("isAdmin".into(), FilterValue::Bool(true)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn closing_input_flushes_pending_text() {
        let (tx, mut debouncer) = FilterInputDebouncer::channel(16, Duration::from_secs(60));
        tx.send(FilterInput::Keystroke("name".into(), "bob".into()))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(debouncer.next().await, Some(text("name", "bob")));
        assert_eq!(debouncer.next().await, None);
    }
}
