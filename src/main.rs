// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use the_junction::config::consts::{ANSWERS_CHANNEL, INPUT_KEY, ROUTE_KEY};
use the_junction::config::{load_network, Registry};
use the_junction::engine::Message;
use tracing_subscriber::EnvFilter;

const EQUATIONS_CHANNEL: &str = "equations";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        bail!("usage: the-junction <network-config> <route> <input>");
    }
    let (path, route, raw) = (&args[1], &args[2], &args[3]);

    let network = load_network(path, &Registry::with_builtins())
        .with_context(|| format!("failed to load network from {}", path))?;
    network
        .start()
        .with_context(|| format!("failed to start network '{}'", network.name()))?;

    let _answers = network
        .subscribe(ANSWERS_CHANNEL, |message: Message| {
            match message.as_value() {
                Some(value) => println!("{}", value),
                None => println!("{:?}", message),
            }
            Ok(())
        })
        .with_context(|| format!("network has no '{}' channel", ANSWERS_CHANNEL))?;

    let input = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw.as_str()));
    network
        .publish_one(EQUATIONS_CHANNEL, json!({ INPUT_KEY: input, ROUTE_KEY: route }))
        .with_context(|| format!("route '{}' failed", route))?;

    network.stop();
    Ok(())
}
