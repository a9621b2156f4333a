//! CLI command handlers.

use std::sync::Arc;

use tokio::net::TcpListener;

use super::{Cli, ServeArgs, SessionArgs};
use crate::audio::Transcoder;
use crate::config::RelayConfig;
use crate::error::Result;

/// Handle `voxrelay serve`.
pub async fn handle_serve(cli: &Cli, args: &ServeArgs) -> Result<()> {
    let config = resolve_config(cli, &args.session)?;
    config.validate()?;

    let transcoder = default_transcoder(config.sample_rate);
    let listener = TcpListener::bind(args.bind).await?;
    crate::server::serve(listener, Arc::new(config), transcoder).await
}

/// Handle `voxrelay config`.
pub fn handle_config(cli: &Cli, args: &SessionArgs) -> Result<()> {
    let config = resolve_config(cli, args)?;
    println!("{config:#?}");
    Ok(())
}

fn resolve_config(cli: &Cli, args: &SessionArgs) -> Result<RelayConfig> {
    let mut config = RelayConfig::load(cli.config.as_deref())?;
    args.apply(&mut config)?;
    Ok(config)
}

#[cfg(feature = "wav")]
fn default_transcoder(sample_rate: u32) -> Arc<dyn Transcoder> {
    Arc::new(crate::audio::WavTranscoder::new(sample_rate))
}

#[cfg(not(feature = "wav"))]
fn default_transcoder(_sample_rate: u32) -> Arc<dyn Transcoder> {
    Arc::new(crate::audio::PcmPassthrough)
}
