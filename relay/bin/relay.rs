#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = relay::config::Config::from_env()?;
    relay_common::logging::init_at(config.log_level.as_deref());

    relay::controller::Relay::new(config).run().await
}
