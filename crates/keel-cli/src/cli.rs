use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "keel",
    about = "Keel -- container manifest consistency tooling",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Decode a manifest and show its media type, digest and references
    Inspect(InspectArgs),
    /// Print the canonical digest of a manifest
    Digest(DigestArgs),
    /// Load a registry configuration file and print the effective settings
    CheckConfig(CheckConfigArgs),
    /// Push a manifest through the manifest service against in-memory stores
    Publish(PublishArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Decode as this media type instead of detecting it
    #[arg(long)]
    pub media_type: Option<String>,
}

#[derive(Args)]
pub struct DigestArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub media_type: Option<String>,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct PublishArgs {
    /// Registry configuration; defaults apply when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Target repository as namespace/name
    #[arg(long)]
    pub repo: String,
    #[arg(long)]
    pub tag: Option<String>,
    #[arg(long)]
    pub media_type: Option<String>,
    /// Blob files the manifest references (config and layers)
    #[arg(long = "blob")]
    pub blobs: Vec<PathBuf>,
    /// Publish into an existing collection instead of provisioning one
    #[arg(long)]
    pub precreate: bool,
    pub manifest: PathBuf,
}
