use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::core::message::Message;
use crate::core::persistence::PersistenceAdapter;

pub const DEFAULT_PERSIST_EVERY: usize = 32;

/// Identifies the bot message a reveal cycle is allowed to grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHandle(u64);

#[derive(Debug, Clone, Copy)]
struct ActiveStream {
    handle: StreamHandle,
    index: usize,
}

/// Owns the ordered conversation and mirrors it to durable storage.
pub struct MessageStore {
    messages: Vec<Message>,
    persistence: Arc<dyn PersistenceAdapter>,
    revision: watch::Sender<u64>,
    active_stream: Option<ActiveStream>,
    next_stream_id: u64,
    pending_mutations: usize,
    persist_every: usize,
}

impl MessageStore {
    pub fn new(persistence: Arc<dyn PersistenceAdapter>) -> Self {
        Self::with_messages(persistence, Vec::new())
    }

    /// Starts from whatever conversation the adapter has stored.
    pub fn rehydrate(persistence: Arc<dyn PersistenceAdapter>) -> Self {
        let messages = persistence.load_conversation();
        Self::with_messages(persistence, messages)
    }

    /// Resumes the stored conversation, or erases it and starts empty.
    pub fn open(persistence: Arc<dyn PersistenceAdapter>, resume: bool) -> Self {
        if resume {
            return Self::rehydrate(persistence);
        }
        let mut store = Self::new(persistence);
        store.clear();
        store
    }

    fn with_messages(persistence: Arc<dyn PersistenceAdapter>, messages: Vec<Message>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            messages,
            persistence,
            revision,
            active_stream: None,
            next_stream_id: 1,
            pending_mutations: 0,
            persist_every: DEFAULT_PERSIST_EVERY,
        }
    }

    pub fn with_persist_every(mut self, persist_every: usize) -> Self {
        self.persist_every = persist_every.max(1);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Receiver that observes a new revision number after every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.notify();
        self.persist();
    }

    /// Appends an empty bot message and makes it the only mutable entry.
    pub fn begin_stream(&mut self) -> StreamHandle {
        let handle = StreamHandle(self.next_stream_id);
        self.next_stream_id += 1;
        self.append(Message::bot(String::new()));
        self.active_stream = Some(ActiveStream {
            handle,
            index: self.messages.len() - 1,
        });
        handle
    }

    /// Applies `updater` to the tail's content if `handle` still owns the tail.
    ///
    /// Returns `false` without touching anything when the conversation is
    /// empty, the stream was retired, or another message was appended since.
    pub fn mutate_last<F>(&mut self, handle: StreamHandle, updater: F) -> bool
    where
        F: FnOnce(&mut String),
    {
        let Some(active) = self.active_stream else {
            return false;
        };
        if active.handle != handle || active.index + 1 != self.messages.len() {
            return false;
        }
        let Some(tail) = self.messages.last_mut() else {
            return false;
        };
        if !tail.is_bot() {
            return false;
        }

        updater(&mut tail.content);
        self.notify();

        self.pending_mutations += 1;
        if self.pending_mutations >= self.persist_every {
            self.persist();
        }
        true
    }

    pub fn is_streaming(&self, handle: StreamHandle) -> bool {
        self.active_stream
            .is_some_and(|active| active.handle == handle)
    }

    /// Retires the stream and writes the final state.
    pub fn end_stream(&mut self, handle: StreamHandle) {
        if self.is_streaming(handle) {
            self.active_stream = None;
        }
        self.flush();
    }

    /// Writes any debounced mutations.
    pub fn flush(&mut self) {
        if self.pending_mutations > 0 {
            self.persist();
        }
    }

    /// Empties the conversation and erases the durable copy.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.active_stream = None;
        self.pending_mutations = 0;
        self.notify();
        if let Err(err) = self.persistence.clear_conversation() {
            warn!(error = %err, "Failed to erase stored conversation");
        }
    }

    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn persist(&mut self) {
        self.pending_mutations = 0;
        if let Err(err) = self.persistence.save_conversation(&self.messages) {
            warn!(error = %err, "Failed to persist conversation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::MemoryStore;

    fn store_with_backend() -> (MessageStore, Arc<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        (MessageStore::new(backend.clone()), backend)
    }

    #[test]
    fn append_writes_through_and_notifies() {
        let (mut store, backend) = store_with_backend();
        let mut rx = store.subscribe();

        store.append(Message::user("Hello"));

        assert!(rx.has_changed().expect("sender alive"));
        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(backend.load_conversation(), vec![Message::user("Hello")]);
    }

    #[test]
    fn mutate_last_grows_the_streamed_tail() {
        let (mut store, _) = store_with_backend();
        store.append(Message::user("Hello"));
        let handle = store.begin_stream();

        assert!(store.mutate_last(handle, |content| content.push_str("Hi")));
        assert!(store.mutate_last(handle, |content| content.push('!')));

        assert_eq!(store.last(), Some(&Message::bot("Hi!")));
    }

    #[test]
    fn mutate_last_is_a_noop_without_an_eligible_tail() {
        let (mut store, _) = store_with_backend();
        let handle = store.begin_stream();
        store.clear();
        assert!(!store.mutate_last(handle, |content| content.push('x')));
        assert!(store.is_empty());

        store.append(Message::bot("done"));
        assert!(!store.mutate_last(handle, |content| content.push('x')));
        assert_eq!(store.last(), Some(&Message::bot("done")));
    }

    #[test]
    fn mutate_last_refuses_a_tail_it_did_not_create() {
        let (mut store, _) = store_with_backend();
        let stale = store.begin_stream();
        store.append(Message::user("interloper"));

        assert!(!store.mutate_last(stale, |content| content.push('x')));
        assert_eq!(store.last(), Some(&Message::user("interloper")));

        let fresh = store.begin_stream();
        assert!(!store.mutate_last(stale, |content| content.push('x')));
        assert!(store.mutate_last(fresh, |content| content.push('y')));
    }

    #[test]
    fn retired_streams_cannot_mutate() {
        let (mut store, _) = store_with_backend();
        let handle = store.begin_stream();
        store.end_stream(handle);
        assert!(!store.is_streaming(handle));
        assert!(!store.mutate_last(handle, |content| content.push('x')));
    }

    #[test]
    fn streamed_mutations_are_debounced_then_flushed() {
        let backend = Arc::new(MemoryStore::new());
        let mut store = MessageStore::new(backend.clone()).with_persist_every(3);
        let handle = store.begin_stream();

        store.mutate_last(handle, |content| content.push('a'));
        store.mutate_last(handle, |content| content.push('b'));
        assert_eq!(backend.load_conversation(), vec![Message::bot("")]);

        store.mutate_last(handle, |content| content.push('c'));
        assert_eq!(backend.load_conversation(), vec![Message::bot("abc")]);

        store.mutate_last(handle, |content| content.push('d'));
        store.end_stream(handle);
        assert_eq!(backend.load_conversation(), vec![Message::bot("abcd")]);
    }

    #[test]
    fn rehydrate_and_clear_use_the_durable_copy() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .save_conversation(&[Message::user("earlier"), Message::bot("reply")])
            .expect("seed failed");

        let mut store = MessageStore::rehydrate(backend.clone());
        assert_eq!(store.len(), 2);

        store.clear();
        assert!(store.is_empty());
        assert!(backend.load_conversation().is_empty());
    }

    #[test]
    fn open_either_resumes_or_starts_fresh() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .save_conversation(&[Message::user("earlier")])
            .expect("seed failed");

        let resumed = MessageStore::open(backend.clone(), true);
        assert_eq!(resumed.messages(), &[Message::user("earlier")]);

        let fresh = MessageStore::open(backend.clone(), false);
        assert!(fresh.is_empty());
        assert!(backend.load_conversation().is_empty());
    }
}
