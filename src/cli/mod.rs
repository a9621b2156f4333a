//! CLI entry point for voxrelay.

pub mod serve;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::RelayConfig;
use crate::error::Result;

/// voxrelay CLI
#[derive(Parser, Debug)]
#[command(name = "voxrelay", version, about = "Realtime voice/text relay")]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Accept participant WebSocket sessions
    Serve(ServeArgs),
    /// Print the resolved configuration (API key redacted)
    Config(SessionArgs),
}

/// Arguments for `voxrelay serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Per-session overrides shared by subcommands.
#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// Voice identifier
    #[arg(long)]
    pub voice: Option<String>,

    /// Conversation language substituted into the instructions template
    #[arg(long)]
    pub language: Option<String>,

    /// Instructions template file
    #[arg(long)]
    pub instructions_file: Option<PathBuf>,

    /// Disable server-side turn detection
    #[arg(long)]
    pub no_vad: bool,

    /// Skip the initial response.create sent at connect
    #[arg(long)]
    pub no_eager_response: bool,
}

impl SessionArgs {
    /// Overlay CLI flags, the last configuration layer.
    pub fn apply(&self, config: &mut RelayConfig) -> Result<()> {
        if let Some(voice) = &self.voice {
            config.voice = voice.clone();
        }
        if let Some(path) = &self.instructions_file {
            config.instructions =
                crate::config::load_instructions(path, self.language.as_deref())?;
        } else if self.language.is_some() {
            config.instructions =
                crate::config::render_instructions(&config.instructions, self.language.as_deref());
        }
        if self.no_vad {
            config.vad_enabled = false;
        }
        if self.no_eager_response {
            config.eager_response = false;
        }
        Ok(())
    }
}
