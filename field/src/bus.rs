//! In-process, synchronous publish/subscribe for field commands.
//!
//! Delivery happens inside [`CommandBus::publish`], on the calling thread, in registration
//! order. Nothing is queued or replayed. Component subscribers are held weakly: once the
//! component is dropped its subscription simply stops receiving.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Commands accepted by the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Tear down the current grid and detect a new one.
    CreateGrid,
    /// Switch gravity on for the gazed cube, or for all cubes.
    Drop { all: bool },
    /// Send the gazed cube, or all cubes, back to their origin.
    Revert { all: bool },
}

/// Payload-free discriminant of a [`Command`], used to subscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandTag {
    CreateGrid,
    Drop,
    Revert,
}

impl Command {
    pub fn tag(&self) -> CommandTag {
        match self {
            Command::CreateGrid => CommandTag::CreateGrid,
            Command::Drop { .. } => CommandTag::Drop,
            Command::Revert { .. } => CommandTag::Revert,
        }
    }
}

/// A component that reacts to commands. Handlers should tolerate redundant delivery.
pub trait CommandHandler {
    fn handle(&mut self, command: &Command);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
enum Handler {
    Component(Weak<RefCell<dyn CommandHandler>>),
    Callback(Rc<RefCell<dyn FnMut(&Command)>>),
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    tag: CommandTag,
    handler: Handler,
}

#[derive(Default)]
pub struct CommandBus {
    subscriptions: RefCell<Vec<Subscription>>,
    next_id: Cell<u64>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `command` to the `handler` for as long as the handler is alive.
    pub fn subscribe<H>(&self, tag: CommandTag, handler: &Rc<RefCell<H>>) -> SubscriptionId
    where
        H: CommandHandler + 'static,
    {
        let handler: Rc<RefCell<dyn CommandHandler>> = handler.clone();
        self.insert(tag, Handler::Component(Rc::downgrade(&handler)))
    }

    /// Deliver matching commands to a closure until unsubscribed.
    pub fn subscribe_fn<F>(&self, tag: CommandTag, callback: F) -> SubscriptionId
    where
        F: FnMut(&Command) + 'static,
    {
        self.insert(tag, Handler::Callback(Rc::new(RefCell::new(callback))))
    }

    /// Returns `false` if the subscription did not exist.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    /// Number of live subscriptions for `tag`.
    pub fn subscriber_count(&self, tag: CommandTag) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|s| s.tag == tag && s.is_alive())
            .count()
    }

    /// Synchronously deliver `command` to every subscriber of its tag.
    ///
    /// Handlers may publish or subscribe while being called. A handler that is already
    /// running further up the stack is skipped for the nested delivery.
    pub fn publish(&self, command: &Command) {
        let tag = command.tag();
        let targets: Vec<Subscription> = {
            let mut subscriptions = self.subscriptions.borrow_mut();
            subscriptions.retain(Subscription::is_alive);
            subscriptions
                .iter()
                .filter(|s| s.tag == tag)
                .cloned()
                .collect()
        };

        if targets.is_empty() {
            log::debug!("{command:?}: no subscribers");
            return;
        }

        for subscription in targets {
            match &subscription.handler {
                Handler::Component(weak) => {
                    let Some(component) = weak.upgrade() else {
                        continue;
                    };
                    match component.try_borrow_mut() {
                        Ok(mut component) => component.handle(command),
                        Err(_) => log::warn!(
                            "{command:?}: subscriber {:?} is busy, skipped",
                            subscription.id
                        ),
                    }
                }
                Handler::Callback(callback) => match callback.try_borrow_mut() {
                    Ok(mut callback) => (&mut *callback)(command),
                    Err(_) => log::warn!(
                        "{command:?}: subscriber {:?} is busy, skipped",
                        subscription.id
                    ),
                },
            }
        }
    }

    fn insert(&self, tag: CommandTag, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscriptions.borrow_mut().push(Subscription { id, tag, handler });
        id
    }
}

impl Subscription {
    fn is_alive(&self) -> bool {
        match &self.handler {
            Handler::Component(weak) => weak.strong_count() > 0,
            Handler::Callback(_) => true,
        }
    }
}
