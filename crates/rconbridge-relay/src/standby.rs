//! Standby: lets a workflow wait for a specific future message or reaction.
//!
//! A waiting workflow registers a predicate and gets a oneshot receiver.
//! The application offers every inbound platform event to the standby;
//! each waiter whose predicate matches receives a copy and is removed.
//! Waiters whose receivers were dropped (the workflow timed out) are pruned
//! on the next event.
//!
//! Because each waiter carries its own predicate, concurrent workflows
//! never see each other's replies as long as their predicates differ in
//! author, channel or message id.

use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::{IncomingMessage, IncomingReaction};

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct Waiter<T> {
    predicate: Predicate<T>,
    sender: oneshot::Sender<T>,
}

/// A list of waiters for one kind of event.
struct Waiters<T> {
    inner: Mutex<Vec<Waiter<T>>>,
}

impl<T: Clone> Waiters<T> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    fn register(&self, predicate: Predicate<T>) -> oneshot::Receiver<T> {
        let (sender, receiver) = oneshot::channel();
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Waiter { predicate, sender });
        receiver
    }

    /// Delivers `event` to every matching waiter. Returns how many
    /// received it.
    fn process(&self, event: &T) -> usize {
        let mut waiters = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        for waiter in std::mem::take(&mut *waiters) {
            if waiter.sender.is_closed() {
                continue;
            }
            if (waiter.predicate)(event) {
                if waiter.sender.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            } else {
                waiters.push(waiter);
            }
        }
        delivered
    }

    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|w| !w.sender.is_closed())
            .count()
    }
}

/// Registry of pending message and reaction waiters.
pub struct Standby {
    messages: Waiters<IncomingMessage>,
    reactions: Waiters<IncomingReaction>,
}

impl Standby {
    pub fn new() -> Self {
        Self {
            messages: Waiters::new(),
            reactions: Waiters::new(),
        }
    }

    /// Waits for the first message matching `predicate`.
    ///
    /// Register before prompting, so a quick reply cannot slip past.
    pub fn wait_for_message(
        &self,
        predicate: impl Fn(&IncomingMessage) -> bool + Send + Sync + 'static,
    ) -> oneshot::Receiver<IncomingMessage> {
        self.messages.register(Box::new(predicate))
    }

    /// Waits for the first reaction matching `predicate`.
    pub fn wait_for_reaction(
        &self,
        predicate: impl Fn(&IncomingReaction) -> bool + Send + Sync + 'static,
    ) -> oneshot::Receiver<IncomingReaction> {
        self.reactions.register(Box::new(predicate))
    }

    /// Offers an inbound message to the waiters. Returns how many matched.
    pub fn process_message(&self, message: &IncomingMessage) -> usize {
        self.messages.process(message)
    }

    /// Offers an inbound reaction to the waiters. Returns how many matched.
    pub fn process_reaction(&self, reaction: &IncomingReaction) -> usize {
        self.reactions.process(reaction)
    }

    /// Live message waiters.
    pub fn pending_messages(&self) -> usize {
        self.messages.len()
    }

    /// Live reaction waiters.
    pub fn pending_reactions(&self) -> usize {
        self.reactions.len()
    }
}

impl Default for Standby {
    fn default() -> Self {
        Self::new()
    }
}
