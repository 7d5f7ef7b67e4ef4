use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use parcel_types::PublisherId;

#[derive(Parser)]
#[command(name = "parcel", about = "Parcel content distribution node", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Keep node state in ./.parcel-node instead of the home directory
    #[arg(long, global = true)]
    pub local: bool,

    /// Config file to use instead of <app root>/parcel-node.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the node until Ctrl-C
    Node,
    /// Build, sign and publish files or a directory
    Publish(PublishArgs),
    /// Ask the tracker to forward a publisher's announcements to this node
    Subscribe(SubscribeArgs),
    /// Print this node's public key
    Keys,
}

#[derive(Args)]
pub struct PublishArgs {
    /// Comma-separated list of paths
    pub paths: String,
}

#[derive(Args)]
pub struct SubscribeArgs {
    /// Publisher public key, hex encoded
    pub public_key: PublisherId,
}
