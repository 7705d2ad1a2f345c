// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline stages that can be attached to a channel.
//!
//! A channel's effective stream is `raw.pipe(stage_1, ..., stage_n)`. The pipeline is built
//! once, when the channel is constructed; an absent stage becomes a stream that fails with
//! [`GraphError::InvalidPipe`] the first time anything subscribes through it.

use std::rc::Rc;

use crate::engine::Message;
use crate::errors::GraphError;
use crate::stream::Stream;

/// A stream-to-stream transformation over channel messages.
pub type Stage = Rc<dyn Fn(Stream<Message>) -> Stream<Message>>;

pub fn map(f: impl Fn(Message) -> Message + 'static) -> Stage {
    let f = Rc::new(f);
    Rc::new(move |stream: Stream<Message>| {
        let f = Rc::clone(&f);
        stream.map(move |message| f(message))
    })
}

pub fn filter(predicate: impl Fn(&Message) -> bool + 'static) -> Stage {
    let predicate = Rc::new(predicate);
    Rc::new(move |stream: Stream<Message>| {
        let predicate = Rc::clone(&predicate);
        stream.filter(move |message| predicate(message))
    })
}

pub fn tap(observer: impl Fn(&Message) + 'static) -> Stage {
    let observer = Rc::new(observer);
    Rc::new(move |stream: Stream<Message>| {
        let observer = Rc::clone(&observer);
        stream.tap(move |message| observer(message))
    })
}

/// Emit a [`Message::Batch`] for every `count` values.
///
/// A zero `count` gives no stage, which makes the channel fail with
/// [`GraphError::InvalidPipe`] when something subscribes.
pub fn buffer_count(count: usize) -> Option<Stage> {
    if count == 0 {
        return None;
    }
    let stage: Stage =
        Rc::new(move |stream: Stream<Message>| stream.buffer_count(count).map(Message::Batch));
    Some(stage)
}

pub fn take(count: usize) -> Stage {
    Rc::new(move |stream: Stream<Message>| stream.take(count))
}

pub fn skip(count: usize) -> Stage {
    Rc::new(move |stream: Stream<Message>| stream.skip(count))
}

/// Apply `stages` in order. A `None` entry is replaced by a stage that fails on first use.
pub fn apply(stream: Stream<Message>, stages: &[Option<Stage>], channel: &str) -> Stream<Message> {
    stages
        .iter()
        .enumerate()
        .fold(stream, |stream, (index, stage)| match stage {
            Some(stage) => stage(stream),
            None => Stream::failing(GraphError::InvalidPipe {
                channel: channel.to_string(),
                index,
            }),
        })
}
