//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Scangate - resolve container image references for vulnerability scanning
#[derive(Parser, Debug)]
#[command(name = "scangate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to scangate.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse an image reference into registry, repository, tag and digest
    Parse(ParseArgs),

    /// Convert an image reference into the scanning service's registry name
    Convert(ConvertArgs),

    /// Resolve an image reference to its manifest and config digests
    Resolve(ResolveArgs),

    /// Compute request signature headers
    Sign(SignArgs),

    /// Verify a request signature
    Verify(VerifyArgs),
}

// Parse command
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Image reference (e.g. nginx:1.25, gcr.io/project/app@sha256:...)
    pub reference: String,

    /// Also show the reference after registry mirror substitution
    #[arg(long)]
    pub mirrored: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Image reference
    pub reference: String,

    /// Static registry name entry (HOST=NAME); skips the scanning service when given
    #[arg(long = "registry", value_name = "HOST=NAME")]
    pub registries: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Image reference
    pub reference: String,

    /// Platform to select from multi-arch images (os/arch[/variant])
    #[arg(long)]
    pub platform: Option<String>,

    /// Talk plain HTTP to the registry
    #[arg(long)]
    pub plain_http: bool,

    /// Deadline for the resolution in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Request fields shared by sign and verify
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Full request URL
    #[arg(long)]
    pub url: String,

    /// Request body
    #[arg(long, conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read the request body from a file
    #[arg(long)]
    pub body_file: Option<Utf8PathBuf>,

    /// Shared HMAC secret
    #[arg(long, env = "AQUA_HMAC_SECRET", hide_env_values = true)]
    pub secret: String,
}

// Sign command
#[derive(Args, Debug)]
pub struct SignArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// RFC3339 UTC timestamp to sign with (defaults to now)
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Timestamp the request was signed with
    #[arg(long)]
    pub timestamp: String,

    /// Hex signature to check
    #[arg(long)]
    pub signature: String,
}
