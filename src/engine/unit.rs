// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Units: named bundles of channels and reactive functions.
//!
//! A [`Unit`] is a cheap, clonable handle. Reactive functions capture a weak handle to the
//! unit that runs them, and trips hold weak handles to the units they visit, so the only
//! strong owners of a unit are its creator and, inside a network, the network itself.
//!
//! Construction happens in two steps. [`Unit::local`] builds the stored channels and records
//! linked channels as pending; [`Resolution::bind_links`] then replaces every pending link
//! with a bound one. [`Unit::new`] does both for a standalone unit.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::{FunctionConfig, ProviderConfig, UnitConfig};
use crate::engine::aggregate::aggregate;
use crate::engine::channel::{Channel, ChannelHandle, StoredChannel};
use crate::engine::payload::{Inputs, Outputs};
use crate::engine::resolution::Resolution;
use crate::engine::trip::Hop;
use crate::engine::Message;
use crate::errors::{GraphError, GraphResult};
use crate::observability::messages::unit::{FunctionFailed, UnitStarted, UnitStopped};
use crate::observability::messages::StructuredLog;
use crate::stream::stages::Stage;
use crate::stream::{Stream, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Running,
    Stopped,
}

/// A linked channel waiting for its provider to be bound.
#[derive(Clone)]
pub(crate) struct PendingLink {
    pub(crate) provider: ProviderConfig,
    pub(crate) pipes: Vec<Option<Stage>>,
}

enum ChannelSlot {
    Ready(Channel),
    Pending(PendingLink),
}

/// What a lookup found under a channel name.
pub(crate) enum ChannelState {
    Ready(Channel),
    Pending,
    Missing,
}

struct UnitInner {
    name: String,
    channels: RefCell<BTreeMap<String, ChannelSlot>>,
    functions: Vec<FunctionConfig>,
    subscriptions: RefCell<Vec<Subscription>>,
    lifecycle: Cell<Lifecycle>,
    routes: RefCell<BTreeMap<String, Vec<Hop>>>,
}

#[derive(Clone)]
pub struct Unit {
    inner: Rc<UnitInner>,
}

/// Non-owning handle to a unit.
#[derive(Clone)]
pub struct WeakUnit(Weak<UnitInner>);

impl WeakUnit {
    pub fn upgrade(&self) -> Option<Unit> {
        self.0.upgrade().map(|inner| Unit { inner })
    }
}

impl Unit {
    /// Build a standalone unit. Links may point at the unit itself or at other unit
    /// instances.
    pub fn new(config: UnitConfig) -> GraphResult<Unit> {
        let unit = Unit::local(&config.name, &config);
        Resolution::new(&unit).bind_links(&[&unit])?;
        Ok(unit)
    }

    /// First construction pass: stored channels are built, linked channels are left pending.
    pub(crate) fn local(name: &str, config: &UnitConfig) -> Unit {
        let channels = config
            .channels
            .iter()
            .map(|(channel, spec)| {
                let slot = match &spec.provider {
                    Some(provider) => ChannelSlot::Pending(PendingLink {
                        provider: provider.clone(),
                        pipes: spec.pipes.clone(),
                    }),
                    None => ChannelSlot::Ready(Channel::Stored(StoredChannel::new(
                        name,
                        channel,
                        spec.stateful,
                        spec.default.clone(),
                        &spec.pipes,
                    ))),
                };
                (channel.clone(), slot)
            })
            .collect();

        Unit {
            inner: Rc::new(UnitInner {
                name: name.to_string(),
                channels: RefCell::new(channels),
                functions: config.functions.clone(),
                subscriptions: RefCell::new(Vec::new()),
                lifecycle: Cell::new(Lifecycle::Created),
                routes: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    pub(crate) fn pending_links(&self) -> Vec<(String, PendingLink)> {
        self.inner
            .channels
            .borrow()
            .iter()
            .filter_map(|(name, slot)| match slot {
                ChannelSlot::Pending(link) => Some((name.clone(), link.clone())),
                ChannelSlot::Ready(_) => None,
            })
            .collect()
    }

    pub(crate) fn channel_state(&self, name: &str) -> ChannelState {
        match self.inner.channels.borrow().get(name) {
            Some(ChannelSlot::Ready(channel)) => ChannelState::Ready(channel.clone()),
            Some(ChannelSlot::Pending(_)) => ChannelState::Pending,
            None => ChannelState::Missing,
        }
    }

    pub(crate) fn bind(&self, name: &str, channel: Channel) {
        self.inner
            .channels
            .borrow_mut()
            .insert(name.to_string(), ChannelSlot::Ready(channel));
    }

    pub(crate) fn set_routes(&self, routes: BTreeMap<String, Vec<Hop>>) {
        *self.inner.routes.borrow_mut() = routes;
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle.get()
    }

    pub fn downgrade(&self) -> WeakUnit {
        WeakUnit(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Unit) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.inner.channels.borrow().keys().cloned().collect()
    }

    /// Short description of the unit's channels, e.g. `[channels: [number, squares]]`.
    pub fn info(&self) -> String {
        format!("[channels: [{}]]", self.channel_names().join(", "))
    }

    /// Look a channel up by name.
    ///
    /// Never fails by itself: an unknown name or an unbound link yields a poisoned handle
    /// whose first use reports the problem.
    pub fn get(&self, name: &str) -> ChannelHandle {
        match self.inner.channels.borrow().get(name) {
            Some(ChannelSlot::Ready(channel)) => ChannelHandle::Resolved(channel.clone()),
            Some(ChannelSlot::Pending(link)) => {
                ChannelHandle::Poisoned(GraphError::UnresolvedLink {
                    unit: self.name().to_string(),
                    channel: name.to_string(),
                    provider_unit: link.provider.unit.describe(),
                    provider_channel: link.provider.channel.clone(),
                })
            }
            None => ChannelHandle::Poisoned(GraphError::invalid_channel(self.name(), name)),
        }
    }

    /// Publish every entry of `outputs`, in order.
    ///
    /// All channel names are checked before anything is published. A failure while
    /// publishing stops at that entry; earlier entries have already been delivered.
    pub fn publish(&self, outputs: Outputs) -> GraphResult<()> {
        if self.lifecycle() == Lifecycle::Stopped {
            return Err(GraphError::stopped_unit(self.name()));
        }
        let resolved = outputs
            .into_iter()
            .map(|(name, message)| Ok((self.get(&name).into_channel()?, message)))
            .collect::<GraphResult<Vec<(Channel, Message)>>>()?;

        for (channel, message) in resolved {
            channel.publish(message)?;
        }
        Ok(())
    }

    /// Alias of [`Unit::publish`] for functions that forward their outputs by hand.
    pub fn next(&self, outputs: Outputs) -> GraphResult<()> {
        self.publish(outputs)
    }

    /// Publish a single value.
    pub fn publish_one(&self, channel: &str, message: impl Into<Message>) -> GraphResult<()> {
        self.publish(Outputs::one(channel, message))
    }

    pub fn subscribe(
        &self,
        channel: &str,
        handler: impl Fn(Message) -> GraphResult<()> + 'static,
    ) -> GraphResult<Subscription> {
        self.get(channel).subscribe(handler)
    }

    /// Subscribe several handlers at once; the returned subscription cancels all of them.
    pub fn subscribe_map<F>(
        &self,
        handlers: impl IntoIterator<Item = (String, F)>,
    ) -> GraphResult<Subscription>
    where
        F: Fn(Message) -> GraphResult<()> + 'static,
    {
        let mut all = Subscription::empty();
        for (channel, handler) in handlers {
            match self.subscribe(&channel, handler) {
                Ok(subscription) => all.add(subscription),
                Err(error) => {
                    all.unsubscribe();
                    return Err(error);
                }
            }
        }
        Ok(all)
    }

    /// Wire every reactive function to its aggregated input stream.
    ///
    /// Starting a running unit wires the functions a second time. Starting a stopped unit
    /// reopens its stored channels first. Either every function is wired or none is: on
    /// failure the subscriptions made so far are cancelled and the lifecycle is unchanged.
    pub fn start(&self) -> GraphResult<()> {
        let streams = self
            .inner
            .functions
            .iter()
            .map(|function| aggregate(self, function.strategy, &function.channels))
            .collect::<GraphResult<Vec<_>>>()?;

        let previous = self.lifecycle();
        if previous == Lifecycle::Stopped {
            self.set_stored_open(true);
        }
        // Stateful inputs replay while wiring, and the replayed outputs must be publishable.
        self.inner.lifecycle.set(Lifecycle::Running);

        let mut wired = Vec::with_capacity(streams.len());
        for (function, stream) in self.inner.functions.iter().zip(streams) {
            match self.wire(function, stream) {
                Ok(subscription) => wired.push(subscription),
                Err(error) => {
                    for subscription in wired {
                        subscription.unsubscribe();
                    }
                    if previous == Lifecycle::Stopped {
                        self.set_stored_open(false);
                    }
                    self.inner.lifecycle.set(previous);
                    return Err(error);
                }
            }
        }
        self.inner.subscriptions.borrow_mut().extend(wired);

        UnitStarted {
            unit: self.name(),
            channels: self.inner.channels.borrow().len(),
            functions: self.inner.functions.len(),
        }
        .log();
        Ok(())
    }

    /// Reopen the stored channels of a stopped unit without wiring its functions.
    ///
    /// A network reopens every member before any of them wires, so links onto a sibling's
    /// channels never meet a closed subject.
    pub(crate) fn reopen(&self) {
        if self.lifecycle() == Lifecycle::Stopped {
            self.set_stored_open(true);
        }
    }

    fn set_stored_open(&self, open: bool) {
        for slot in self.inner.channels.borrow().values() {
            if let ChannelSlot::Ready(Channel::Stored(stored)) = slot {
                if open {
                    stored.reopen();
                } else {
                    stored.close();
                }
            }
        }
    }

    fn wire(
        &self,
        function: &FunctionConfig,
        stream: Stream<Vec<Message>>,
    ) -> GraphResult<Subscription> {
        let weak = self.downgrade();
        let transform = Rc::clone(&function.func);
        let channels: Rc<[String]> = Rc::from(function.channels.clone());

        stream.subscribe(move |values: Vec<Message>| {
            let Some(unit) = weak.upgrade() else {
                return Ok(());
            };
            let inputs = Inputs::new(unit.name(), Rc::clone(&channels), values);
            let outputs = transform(&unit, inputs).inspect_err(|error| {
                FunctionFailed {
                    unit: unit.name(),
                    channels: &channels,
                    error,
                }
                .log()
            })?;
            unit.publish(outputs)
        })
    }

    /// Cancel every function subscription and close this unit's stored channels.
    ///
    /// Linked channels belong to their providers and are left open.
    pub fn stop(&self) {
        let subscriptions: Vec<Subscription> =
            self.inner.subscriptions.borrow_mut().drain(..).collect();
        let cancelled = subscriptions.len();
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        self.set_stored_open(false);
        self.inner.lifecycle.set(Lifecycle::Stopped);
        UnitStopped {
            unit: self.name(),
            subscriptions: cancelled,
        }
        .log();
    }

    /// Hops of a named route.
    pub fn route(&self, name: &str) -> GraphResult<Vec<Hop>> {
        self.inner
            .routes
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownRoute {
                network: self.name().to_string(),
                route: name.to_string(),
            })
    }

    pub fn route_names(&self) -> Vec<String> {
        self.inner.routes.borrow().keys().cloned().collect()
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name())
            .field("lifecycle", &self.lifecycle())
            .field("channels", &self.channel_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::engine::Strategy;
    use serde_json::json;

    fn squarer() -> Unit {
        Unit::new(
            UnitConfig::new("square")
                .channel("number", ChannelConfig::new())
                .channel("squares", ChannelConfig::new())
                .function(FunctionConfig::new(&["number"], |_, inputs| {
                    let n = inputs.number(0)?;
                    Ok(Outputs::one("squares", json!(n * n)))
                })),
        )
        .unwrap()
    }

    fn record(unit: &Unit, channel: &str) -> (Rc<RefCell<Vec<Message>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription = unit
            .subscribe(channel, move |m: Message| {
                sink.borrow_mut().push(m);
                Ok(())
            })
            .unwrap();
        (seen, subscription)
    }

    #[test]
    fn test_function_publishes_outputs() {
        let unit = squarer();
        unit.start().unwrap();
        let (seen, _s) = record(&unit, "squares");

        unit.publish_one("number", json!(5)).unwrap();
        assert_eq!(*seen.borrow(), vec![Message::from(json!(25.0))]);
    }

    #[test]
    fn test_publish_checks_all_names_first() {
        let unit = squarer();
        let (seen, _s) = record(&unit, "number");

        let err = unit
            .publish(Outputs::one("number", json!(1)).with("nope", json!(2)))
            .unwrap_err();
        assert_eq!(err, GraphError::invalid_channel("square", "nope"));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_get_unknown_channel_is_poisoned() {
        let unit = squarer();
        assert!(!unit.get("missing").is_resolved());
        assert!(unit.get("number").is_resolved());
    }

    #[test]
    fn test_stop_then_publish_fails_and_restart_recovers() {
        let unit = squarer();
        unit.start().unwrap();
        unit.stop();
        assert_eq!(unit.lifecycle(), Lifecycle::Stopped);
        assert_eq!(
            unit.publish_one("number", json!(2)).unwrap_err(),
            GraphError::stopped_unit("square")
        );

        unit.start().unwrap();
        let (seen, _s) = record(&unit, "squares");
        unit.publish_one("number", json!(3)).unwrap();
        assert_eq!(*seen.borrow(), vec![Message::from(json!(9.0))]);
    }

    #[test]
    fn test_duplicate_start_wires_functions_twice() {
        let unit = squarer();
        unit.start().unwrap();
        unit.start().unwrap();
        let (seen, _s) = record(&unit, "squares");
        unit.publish_one("number", json!(2)).unwrap();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_failed_subscription_rolls_back_earlier_functions() {
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        let unit = Unit::new(
            UnitConfig::new("partial")
                .channel("a", ChannelConfig::new())
                .channel("broken", ChannelConfig::new().pipes([None]))
                .function(FunctionConfig::new(&["a"], move |_, _| {
                    counter.set(counter.get() + 1);
                    Ok(Outputs::none())
                }))
                .function(FunctionConfig::new(&["broken"], |_, _| Ok(Outputs::none()))),
        )
        .unwrap();

        assert!(matches!(
            unit.start(),
            Err(GraphError::InvalidPipe { index: 0, .. })
        ));
        assert_eq!(unit.lifecycle(), Lifecycle::Created);
        unit.publish_one("a", json!(1)).unwrap();
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn test_failed_restart_stays_stopped() {
        let unit = Unit::new(
            UnitConfig::new("strict")
                .channel("a", ChannelConfig::new())
                .channel("broken", ChannelConfig::new().pipes([None]))
                .function(FunctionConfig::new(&["broken"], |_, _| Ok(Outputs::none()))),
        )
        .unwrap();
        unit.stop();

        assert!(unit.start().is_err());
        assert_eq!(unit.lifecycle(), Lifecycle::Stopped);
        assert_eq!(
            unit.publish_one("a", json!(1)).unwrap_err(),
            GraphError::stopped_unit("strict")
        );
    }

    #[test]
    fn test_self_link_with_pipe() {
        let unit = Unit::new(
            UnitConfig::new("u")
                .channel("raw", ChannelConfig::new())
                .channel(
                    "pairs",
                    ChannelConfig::linked("u", "raw")
                        .pipes([crate::stream::stages::buffer_count(2)]),
                ),
        )
        .unwrap();
        let (seen, _s) = record(&unit, "pairs");
        unit.publish_one("raw", json!(1)).unwrap();
        unit.publish_one("raw", json!(2)).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![Message::Batch(vec![json!(1).into(), json!(2).into()])]
        );
    }

    #[test]
    fn test_function_error_propagates_to_publisher() {
        let unit = Unit::new(
            UnitConfig::new("strict")
                .channel("a", ChannelConfig::new())
                .channel("b", ChannelConfig::new())
                .function(
                    FunctionConfig::new(&["a", "b"], |_, inputs| {
                        inputs.number(1)?;
                        Ok(Outputs::none())
                    })
                    .with_strategy(Strategy::All),
                ),
        )
        .unwrap();
        unit.start().unwrap();
        unit.publish_one("a", json!(1)).unwrap();
        let err = unit.publish_one("b", json!("x")).unwrap_err();
        assert!(matches!(err, GraphError::FunctionFailed { .. }));
    }

    #[test]
    fn test_subscribe_map_cancels_together() {
        let unit = squarer();
        let count = Rc::new(Cell::new(0));
        let handlers = ["number", "squares"].into_iter().map(|channel| {
            let count = Rc::clone(&count);
            (channel.to_string(), move |_: Message| {
                count.set(count.get() + 1);
                Ok(())
            })
        });
        let subscription = unit.subscribe_map(handlers).unwrap();
        unit.publish_one("number", json!(1)).unwrap();
        unit.publish_one("squares", json!(1)).unwrap();
        subscription.unsubscribe();
        unit.publish_one("number", json!(1)).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_next_publishes_like_publish() {
        let unit = squarer();
        unit.start().unwrap();
        let (seen, _s) = record(&unit, "squares");
        unit.next(Outputs::one("number", json!(4))).unwrap();
        assert_eq!(*seen.borrow(), vec![Message::from(json!(16.0))]);
    }

    #[test]
    fn test_info_lists_channels() {
        assert_eq!(squarer().info(), "[channels: [number, squares]]");
    }

    #[test]
    fn test_unknown_route() {
        assert_eq!(
            squarer().route("nowhere").unwrap_err(),
            GraphError::UnknownRoute {
                network: "square".to_string(),
                route: "nowhere".to_string()
            }
        );
    }
}
