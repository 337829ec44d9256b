//! Event registrar - script listeners on native events.
//!
//! Listeners are keyed by native identity, interface and event name. The
//! default [`ListenerTable`] subscribes one native delegate per key when the
//! first listener arrives and fans every raise out to all listeners on the
//! scripting thread; the subscription is dropped with the last listener.
//!
//! Listeners live as long as the proxy they were added through. Dropping the
//! proxy releases every subscription of its identity, so an identity that is
//! later reused starts from an empty table.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use projection_core::{
    DelegateSignature, EventToken, InterfaceId, NativeDelegate, NativeObject, NativeRef,
    NativeValue, ObjectId, ProjectionError, ProjectionResult, ScriptFunction,
};
use projection_registry::EventDescriptor;

use crate::Context;

/// Key of one native event subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    /// Identity of the object raising the event.
    pub object: ObjectId,
    /// Interface declaring the event.
    pub interface: InterfaceId,
    /// Event name.
    pub event: String,
}

/// One event of one native object.
#[derive(Clone, Copy)]
pub struct EventSource<'a> {
    /// Context the listeners run in.
    pub context: &'a Arc<Context>,
    /// Identity of the projected object.
    pub identity: ObjectId,
    /// Interface declaring the event.
    pub interface: InterfaceId,
    /// Interface-typed handle to subscribe on.
    pub target: &'a NativeRef,
    /// The event.
    pub event: &'a EventDescriptor,
}

impl EventSource<'_> {
    /// Key identifying this source.
    pub fn key(&self) -> EventKey {
        EventKey {
            object: self.identity,
            interface: self.interface,
            event: self.event.name().to_string(),
        }
    }
}

/// Tracks script listeners and their native subscriptions.
pub trait EventRegistrar: Send + Sync {
    /// Add `handler`. Adding the same handler twice is ignored.
    fn add_listener(&self, source: EventSource<'_>, handler: ScriptFunction)
    -> ProjectionResult<()>;

    /// Remove `handler`. Removing an unknown handler is a no-op.
    fn remove_listener(&self, source: EventSource<'_>, handler: &ScriptFunction)
    -> ProjectionResult<()>;

    /// Number of listeners registered for `source`.
    fn listener_count(&self, source: EventSource<'_>) -> usize;

    /// Drop every listener of `identity`, unsubscribing natively where the
    /// object is still alive. Called when the identity's proxy goes away.
    fn release(&self, identity: ObjectId);
}

type Listeners = Arc<Mutex<Vec<ScriptFunction>>>;

struct Subscription {
    token: EventToken,
    listeners: Listeners,
    target: Weak<dyn NativeObject>,
    event: EventDescriptor,
}

impl Subscription {
    /// Unsubscribe natively. A dead target has nothing left to unsubscribe.
    fn unsubscribe(&self, key: &EventKey) {
        let Some(target) = self.target.upgrade() else {
            tracing::trace!(event = %key.event, "event source already gone");
            return;
        };
        match self.event.remove(&target, self.token) {
            Ok(()) => tracing::debug!(
                event = %key.event,
                token = self.token.0,
                "unsubscribed native event"
            ),
            Err(err) => tracing::warn!(event = %key.event, %err, "native unsubscribe failed"),
        }
    }
}

/// Default [`EventRegistrar`].
#[derive(Default)]
pub struct ListenerTable {
    subscriptions: Mutex<FxHashMap<EventKey, Subscription>>,
}

impl ListenerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live native subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

impl EventRegistrar for ListenerTable {
    fn add_listener(
        &self,
        source: EventSource<'_>,
        handler: ScriptFunction,
    ) -> ProjectionResult<()> {
        let key = source.key();
        {
            let mut subscriptions = self.subscriptions.lock();
            match subscriptions.get(&key) {
                Some(subscription) if subscription.target.strong_count() > 0 => {
                    let mut listeners = subscription.listeners.lock();
                    if listeners.iter().any(|l| l.ptr_eq(&handler)) {
                        tracing::trace!(event = %key.event, "duplicate listener ignored");
                    } else {
                        listeners.push(handler);
                    }
                    return Ok(());
                }
                Some(_) => {
                    // The identity now belongs to a different object.
                    tracing::debug!(event = %key.event, "discarding stale subscription");
                    subscriptions.remove(&key);
                }
                None => {}
            }
        }

        let listeners: Listeners = Arc::new(Mutex::new(vec![handler]));
        let delegate = fan_out(
            Arc::clone(source.context),
            Arc::clone(source.event.handler_signature()),
            Arc::clone(&listeners),
        );
        let token = source.event.add(source.target, delegate)?;
        tracing::debug!(
            event = %key.event,
            interface = %key.interface,
            token = token.0,
            "subscribed native event"
        );
        let subscription = Subscription {
            token,
            listeners,
            target: Arc::downgrade(source.target),
            event: source.event.clone(),
        };
        self.subscriptions.lock().insert(key, subscription);
        Ok(())
    }

    fn remove_listener(
        &self,
        source: EventSource<'_>,
        handler: &ScriptFunction,
    ) -> ProjectionResult<()> {
        let key = source.key();
        let mut subscriptions = self.subscriptions.lock();
        let Some(subscription) = subscriptions.get(&key) else {
            return Ok(());
        };
        {
            let mut listeners = subscription.listeners.lock();
            let before = listeners.len();
            listeners.retain(|l| !l.ptr_eq(handler));
            if listeners.len() == before || !listeners.is_empty() {
                return Ok(());
            }
        }
        let Some(subscription) = subscriptions.remove(&key) else {
            return Ok(());
        };
        drop(subscriptions);

        source.event.remove(source.target, subscription.token)?;
        tracing::debug!(
            event = %key.event,
            token = subscription.token.0,
            "unsubscribed native event"
        );
        Ok(())
    }

    fn listener_count(&self, source: EventSource<'_>) -> usize {
        self.subscriptions
            .lock()
            .get(&source.key())
            .map_or(0, |s| s.listeners.lock().len())
    }

    fn release(&self, identity: ObjectId) {
        let released: Vec<(EventKey, Subscription)> = {
            let mut subscriptions = self.subscriptions.lock();
            let keys: Vec<EventKey> = subscriptions
                .keys()
                .filter(|key| key.object == identity)
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|key| subscriptions.remove(&key).map(|s| (key, s)))
                .collect()
        };
        for (key, subscription) in &released {
            subscription.unsubscribe(key);
        }
        if !released.is_empty() {
            tracing::debug!(
                identity = identity.0,
                released = released.len(),
                "released event subscriptions"
            );
        }
    }
}

impl fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerTable")
            .field("subscriptions", &self.subscriptions.lock().len())
            .finish()
    }
}

/// The single native delegate behind every listener of one key.
fn fan_out(
    context: Arc<Context>,
    signature: Arc<DelegateSignature>,
    listeners: Listeners,
) -> NativeDelegate {
    NativeDelegate::new(move |args: &[NativeValue]| {
        let task = {
            let context = Arc::clone(&context);
            let signature = Arc::clone(&signature);
            let listeners = Arc::clone(&listeners);
            let args = args.to_vec();
            move || raise(&context, &signature, &listeners, args)
        };
        context.invoker().call(Box::new(task));
        Ok(NativeValue::Empty)
    })
}

fn raise(
    context: &Context,
    signature: &DelegateSignature,
    listeners: &Listeners,
    args: Vec<NativeValue>,
) {
    let _span = tracing::debug_span!("raise_event", delegate = %signature.name).entered();
    let script_args = match signature
        .params
        .iter()
        .zip(args)
        .map(|(converter, arg)| converter.to_script(arg, context))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(args) => args,
        Err(err) => {
            context.raise_unhandled(ProjectionError::from(err).into());
            return;
        }
    };

    // Listeners may add or remove listeners while running.
    let snapshot = listeners.lock().clone();
    for listener in snapshot {
        if let Err(err) = listener.call(&script_args) {
            context.raise_unhandled(err);
        }
    }
}
