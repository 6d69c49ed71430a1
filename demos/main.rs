// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use bytes::Bytes;
use corpc_client_rs::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    method::MethodDescriptor,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _init_logger = init_logger("demos/config_logger.yaml")?;

    let cfg = resolve_config_path("demos/config.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let first = cfg.channels.first().context("config has no channels")?;
    let (host, port, connect_num) = (first.host.clone(), first.port, first.connect_num);

    let client = corpc_client_rs::client::client::Client::new(cfg);
    let channel = client.register_channel(host, port, connect_num);

    // Service/method indices are generated from an external IDL in a real
    // deployment; here they are just illustrative constants.
    let echo = MethodDescriptor::new(0, 0);
    let request_body = Bytes::from_static(b"ping");

    let outcome = client.call(&channel, echo, request_body).await?;
    info!(?outcome, "echo call completed");

    Ok(())
}
