// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named pub/sub endpoints owned by units.
//!
//! A channel is either **stored** (it owns a [`Subject`] and publishes "origin" values) or
//! **linked** (it re-exposes another unit's channel under a local name and owns nothing).
//! Both carry an effective stream with the channel's pipeline applied once, at construction.

use std::fmt;

use crate::engine::Message;
use crate::errors::{GraphError, GraphResult};
use crate::stream::stages::{self, Stage};
use crate::stream::{Stream, Subject, Subscription};

#[derive(Clone)]
pub enum Channel {
    Stored(StoredChannel),
    Linked(LinkedChannel),
}

#[derive(Clone)]
pub struct StoredChannel {
    owner: String,
    name: String,
    subject: Subject<Message>,
    stream: Stream<Message>,
}

/// Another unit's channel seen under a local name.
#[derive(Clone)]
pub struct LinkedChannel {
    owner: String,
    name: String,
    provider: Box<Channel>,
    stream: Stream<Message>,
}

impl StoredChannel {
    pub fn new(
        owner: &str,
        name: &str,
        stateful: bool,
        default: Option<Message>,
        pipes: &[Option<Stage>],
    ) -> Self {
        let subject = if stateful || default.is_some() {
            Subject::stateful(default)
        } else {
            Subject::new()
        }
        .owned_by(owner);
        let stream = stages::apply(subject.stream(), pipes, name);
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            subject,
            stream,
        }
    }

    pub(crate) fn close(&self) {
        self.subject.close();
    }

    pub(crate) fn reopen(&self) {
        self.subject.reopen();
    }
}

impl Channel {
    pub fn stored(owner: &str, name: &str) -> Self {
        Channel::Stored(StoredChannel::new(owner, name, false, None, &[]))
    }

    /// Link `provider` into `owner` under `name`, applying local `pipes` on top of the
    /// provider's own pipeline.
    pub fn linked(owner: &str, name: &str, provider: Channel, pipes: &[Option<Stage>]) -> Self {
        let stream = stages::apply(provider.stream(), pipes, name);
        Channel::Linked(LinkedChannel {
            owner: owner.to_string(),
            name: name.to_string(),
            provider: Box::new(provider),
            stream,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Channel::Stored(c) => &c.name,
            Channel::Linked(c) => &c.name,
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            Channel::Stored(c) => &c.owner,
            Channel::Linked(c) => &c.owner,
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, Channel::Linked(_))
    }

    pub fn is_stateful(&self) -> bool {
        match self {
            Channel::Stored(c) => c.subject.is_stateful(),
            Channel::Linked(c) => c.provider.is_stateful(),
        }
    }

    /// The last value of a stateful channel.
    pub fn last(&self) -> Option<Message> {
        match self {
            Channel::Stored(c) => c.subject.last(),
            Channel::Linked(c) => c.provider.last(),
        }
    }

    /// `(unit, channel)` of the stored channel that ultimately backs this one.
    pub fn origin(&self) -> (&str, &str) {
        match self {
            Channel::Stored(c) => (&c.owner, &c.name),
            Channel::Linked(c) => c.provider.origin(),
        }
    }

    /// Push a value into the backing subject. Links publish into their provider.
    pub fn publish(&self, message: Message) -> GraphResult<()> {
        match self {
            Channel::Stored(c) => {
                if c.subject.is_closed() {
                    return Err(GraphError::stopped_unit(c.owner.clone()));
                }
                // A replayed trip would already be taken.
                if message.is_trip() {
                    c.subject.next_transient(message)
                } else {
                    c.subject.next(message)
                }
            }
            Channel::Linked(c) => c.provider.publish(message),
        }
    }

    /// The effective stream, pipeline included.
    pub fn stream(&self) -> Stream<Message> {
        match self {
            Channel::Stored(c) => c.stream.clone(),
            Channel::Linked(c) => c.stream.clone(),
        }
    }

    pub fn subscribe(
        &self,
        handler: impl Fn(Message) -> GraphResult<()> + 'static,
    ) -> GraphResult<Subscription> {
        self.stream().subscribe(handler)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (unit, channel) = self.origin();
        match self {
            Channel::Stored(_) => write!(f, "Stored({}.{})", unit, channel),
            Channel::Linked(c) => {
                write!(f, "Linked({}.{} -> {}.{})", c.owner, c.name, unit, channel)
            }
        }
    }
}

/// Result of a channel lookup: the channel, or the error that using it will raise.
///
/// Lookups never fail by themselves; the failure is deferred to the first publish,
/// subscribe or stream access so call sites need no special casing.
#[derive(Clone, Debug)]
pub enum ChannelHandle {
    Resolved(Channel),
    Poisoned(GraphError),
}

impl ChannelHandle {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ChannelHandle::Resolved(_))
    }

    pub fn channel(&self) -> GraphResult<&Channel> {
        match self {
            ChannelHandle::Resolved(channel) => Ok(channel),
            ChannelHandle::Poisoned(error) => Err(error.clone()),
        }
    }

    pub fn into_channel(self) -> GraphResult<Channel> {
        match self {
            ChannelHandle::Resolved(channel) => Ok(channel),
            ChannelHandle::Poisoned(error) => Err(error),
        }
    }

    pub fn publish(&self, message: impl Into<Message>) -> GraphResult<()> {
        self.channel()?.publish(message.into())
    }

    pub fn stream(&self) -> GraphResult<Stream<Message>> {
        Ok(self.channel()?.stream())
    }

    pub fn subscribe(
        &self,
        handler: impl Fn(Message) -> GraphResult<()> + 'static,
    ) -> GraphResult<Subscription> {
        self.channel()?.subscribe(handler)
    }
}
