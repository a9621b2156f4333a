//! voxrelay: duplex voice/text relay for realtime conversational AI.
//!
//! A [`relay::DuplexRelay`] owns one participant session: it connects to the
//! realtime service, negotiates the session, then forwards participant input
//! upstream and service events back to the participant until either side
//! goes away.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use voxrelay::audio::PcmPassthrough;
//! use voxrelay::config::RelayConfig;
//! use voxrelay::participant::channel_participant;
//! use voxrelay::protocol::ParticipantInput;
//! use voxrelay::relay::DuplexRelay;
//!
//! # async fn example() -> voxrelay::error::Result<()> {
//! let config = Arc::new(RelayConfig::load(None)?);
//! config.validate()?;
//!
//! let (sink, source, mut handle) = channel_participant(32);
//! let mut relay = DuplexRelay::new(config, Arc::new(sink), Box::new(source), Arc::new(PcmPassthrough));
//! relay.connect().await?;
//!
//! handle.inputs.send(ParticipantInput::Text("Hola".into())).await.ok();
//! tokio::spawn(async move {
//!     while let Some(message) = handle.messages.recv().await {
//!         println!("{}", message.to_json().unwrap_or_default());
//!     }
//! });
//! let report = relay.run().await?;
//! println!("{} utterances", report.transcript.len());
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod participant;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod session;

#[cfg(feature = "cli")]
pub mod cli;
