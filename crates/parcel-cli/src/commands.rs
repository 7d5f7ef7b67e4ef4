use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use colored::Colorize;
use parcel_builder::parse_path_list;
use parcel_crypto::KeyPair;
use parcel_protocol::{PublishDataRequest, TrackerClient};
use parcel_server::{app_root, ctrl_c, NodeConfig, NodeServer};
use parcel_store::SledNodeStore;

use crate::cli::*;

struct Context {
    root: PathBuf,
    config: NodeConfig,
}

impl Context {
    fn load(cli: &Cli) -> anyhow::Result<Self> {
        let root = app_root(cli.local);
        let config = NodeConfig::load(&root, cli.config.as_deref())
            .with_context(|| format!("loading configuration for {}", root.display()))?;
        Ok(Self { root, config })
    }

    fn keys(&self) -> anyhow::Result<KeyPair> {
        Ok(KeyPair::load_or_generate(&self.config.keys_file)?)
    }

    fn tracker(&self) -> anyhow::Result<TrackerClient> {
        Ok(
            TrackerClient::new(self.config.tracker_url.clone(), self.config.request_timeout())?
                .with_address(self.config.advertised_address()),
        )
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::load(&cli)?;
    match cli.command {
        Command::Node => cmd_node(ctx).await,
        Command::Publish(args) => cmd_publish(&ctx, args, cli.verbose).await,
        Command::Subscribe(args) => cmd_subscribe(&ctx, args).await,
        Command::Keys => cmd_keys(&ctx),
    }
}

async fn cmd_node(ctx: Context) -> anyhow::Result<()> {
    let store = SledNodeStore::open(&ctx.config.data_dir)
        .with_context(|| format!("opening store at {}", ctx.config.data_dir.display()))?;

    println!("{} Parcel node starting", "✓".green().bold());
    println!("  Root:    {}", ctx.root.display());
    println!("  Tracker: {}", ctx.config.tracker_url.cyan());
    println!("  Notify:  {}", ctx.config.notify_bind.to_string().bold());
    println!("  Admin:   {}", ctx.config.admin_bind.to_string().bold());

    let server = NodeServer::new(ctx.config, Arc::new(store))?;
    server.serve(ctrl_c()).await?;
    println!("{} Node stopped.", "✓".green());
    Ok(())
}

async fn cmd_publish(ctx: &Context, args: PublishArgs, verbose: bool) -> anyhow::Result<()> {
    let paths = parse_path_list(&args.paths);
    if paths.is_empty() {
        bail!("no paths given");
    }
    let keys = ctx.keys()?;
    let tracker = ctx.tracker()?;
    let publisher = keys.publisher_id();

    let sequence = tracker
        .next_sequence(&publisher)
        .await
        .context("asking tracker for the next sequence")?;
    let (parcel, root_hash) = parcel_builder::build(&paths, keys.signing_key(), sequence)?;
    let headers = parcel.object_headers.len();
    let bytes = parcel.total_bytes();

    let request = PublishDataRequest {
        root_hash: root_hash.clone(),
        parcel,
    };
    if verbose {
        println!("{}", serde_json::to_string_pretty(&request)?);
    }
    tracker
        .publish(&request)
        .await
        .context("publishing to tracker")?;

    println!("{} Published {}", "✓".green().bold(), root_hash.key().to_string().yellow());
    println!("  Publisher: {}", publisher.to_hex().cyan());
    println!("  Sequence:  {}", sequence);
    println!("  Root:      {}", root_hash.object_header_hash.to_hex().dimmed());
    println!("  Headers:   {headers}, {bytes} bytes");
    Ok(())
}

async fn cmd_subscribe(ctx: &Context, args: SubscribeArgs) -> anyhow::Result<()> {
    ctx.tracker()?
        .subscribe(&args.public_key)
        .await
        .context("subscribing on tracker")?;
    println!(
        "{} Subscribed to {} (announcements to {})",
        "✓".green().bold(),
        args.public_key.short_id().cyan(),
        ctx.config.advertised_address().bold()
    );
    Ok(())
}

fn cmd_keys(ctx: &Context) -> anyhow::Result<()> {
    let keys = ctx.keys()?;
    println!("{}", keys.publisher_id().to_hex());
    Ok(())
}
