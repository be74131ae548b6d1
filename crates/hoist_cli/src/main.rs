mod console;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use console::ConsoleReporter;
use hoist_client::TokenApiClient;
use hoist_core::prelude::*;
use hoist_fs::FileSystemStorage;
use hoist_mock::StaticCredentials;
use hoist_s3::S3Storage;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Publish release binaries and their manifest to object storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AssetArgs {
    /// Build output directory holding the release binaries
    #[arg(long, env = "HOIST_DIST_DIR", default_value = DEFAULT_DIST_DIR)]
    dir: PathBuf,

    /// Only files named "<product>-*" are release assets
    #[arg(long, env = "HOIST_PRODUCT", default_value = DEFAULT_PRODUCT)]
    product: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Write <dir>/manifest.json locally without uploading anything
    Generate {
        #[command(flatten)]
        assets: AssetArgs,

        #[arg(long, env = "VERSION", default_value = "v0.0.1")]
        version: String,

        /// Base URL the binaries will be served from
        #[arg(long, env = "HOIST_PUBLIC_URL", default_value = DEFAULT_PUBLIC_URL)]
        public_url: String,
    },
    /// Upload every binary, then the manifest describing them
    Publish {
        #[command(flatten)]
        assets: AssetArgs,

        /// The version being released (e.g., "v0.0.2")
        #[arg(long, env = "VERSION")]
        version: Option<String>,

        #[arg(long, env = "API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Upload-token API base URL
        #[arg(long, env = "BASE_DOMAIN", default_value = DEFAULT_BASE_DOMAIN)]
        base_domain: String,

        /// Base URL uploaded objects are served from
        #[arg(long, env = "HOIST_PUBLIC_URL", default_value = DEFAULT_PUBLIC_URL)]
        public_url: String,

        /// URL or path of the currently published manifest; its releases are kept
        #[arg(long, env = "HOIST_PREVIOUS_MANIFEST")]
        previous_manifest: Option<String>,

        /// S3 endpoint template used when the token names none ("{region}" is substituted)
        #[arg(long, env = "HOIST_STORAGE_ENDPOINT")]
        storage_endpoint: Option<String>,

        /// Use path-style bucket addressing
        #[arg(long)]
        path_style: bool,

        /// Skip the token API and object storage; write objects under --mirror instead
        #[arg(long)]
        dry_run: bool,

        #[arg(long, default_value = "release_mirror")]
        mirror: PathBuf,
    },
    /// Write a .sha256 file next to every release binary
    Checksum {
        #[command(flatten)]
        assets: AssetArgs,
    },
    /// Show the latest download for a platform
    Resolve {
        /// Manifest URL or path
        #[arg(long)]
        manifest: String,

        /// "<os>-<arch>", defaults to this machine
        #[arg(long)]
        platform: Option<String>,
    },
    /// Check a downloaded binary against the manifest checksum
    Verify {
        /// Manifest URL or path
        #[arg(long)]
        manifest: String,

        #[arg(long)]
        file: PathBuf,

        /// "<os>-<arch>", defaults to this machine
        #[arg(long)]
        platform: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            assets,
            version,
            public_url,
        } => {
            let config = GenerateConfig {
                version,
                dist_dir: assets.dir,
                product: assets.product,
                public_base_url: public_url,
            };

            let manifest = generate_manifest(&config, &ConsoleReporter, Utc::now()).await?;
            let path = config.manifest_path();
            manifest.save(&path).await?;

            let platforms = manifest.latest_release()?.platforms.len();
            println!("✅ Manifest generated: {}", path.display());
            println!("Version: {}", config.version);
            println!("Platforms: {platforms}");
        }
        Commands::Publish {
            assets,
            version,
            api_key,
            base_domain,
            public_url,
            previous_manifest,
            storage_endpoint,
            path_style,
            dry_run,
            mirror,
        } => {
            let api_key = match (api_key, dry_run) {
                (Some(key), _) => key,
                (None, true) => "dry-run".to_string(),
                (None, false) => String::new(),
            };
            let config = PublishConfig {
                version: version.unwrap_or_default(),
                api_key,
                base_domain,
                dist_dir: assets.dir,
                product: assets.product,
                public_base_url: public_url,
            };
            config.validate()?;

            println!("🚀 Publishing version: {}", config.version);
            println!("API Domain: {}", config.base_domain);

            let client = TokenApiClient::from_config(&config);
            let prior = match &previous_manifest {
                Some(location) => {
                    let prior = client.load_manifest(location).await.with_context(|| {
                        format!("Failed to load previous manifest from {location}")
                    })?;
                    match &prior {
                        Some(m) => {
                            println!("Merging into manifest with {} release(s)", m.releases.len())
                        }
                        None => println!("No manifest published at {location} yet"),
                    }
                    prior
                }
                None => None,
            };

            let report = if dry_run {
                println!("Dry run: writing objects under {}", mirror.display());
                Publisher::new(
                    config,
                    StaticCredentials::new("dry-run", "releases/"),
                    FileSystemStorage::new(mirror),
                )
                .with_reporter(ConsoleReporter)
                .publish(prior, Utc::now())
                .await?
            } else {
                Publisher::new(config, client, S3Storage::new(storage_endpoint, path_style))
                    .with_reporter(ConsoleReporter)
                    .publish(prior, Utc::now())
                    .await?
            };

            if !report.skipped.is_empty() {
                println!("\n⚠️  Skipped {} file(s) without a platform:", report.skipped.len());
                for name in &report.skipped {
                    println!("   {name}");
                }
            }
            println!(
                "\n✅ Published {} file(s) for version {}. Manifest: {}",
                report.uploaded.len(),
                report.manifest.latest_version,
                report.manifest_url
            );
        }
        Commands::Checksum { assets } => {
            let found = discover_assets(&assets.dir, &assets.product)?;
            if found.is_empty() {
                bail!("No assets found in {}", assets.dir.display());
            }
            for asset in found {
                let digest = write_sidecar(&asset.path).await?;
                println!("{digest}  {}", asset.filename);
            }
        }
        Commands::Resolve { manifest, platform } => {
            let manifest = load_manifest(&manifest).await?;
            let platform = platform
                .as_deref()
                .map(PlatformKey::from)
                .unwrap_or_else(PlatformKey::current);

            let entry = manifest.binary_for_platform(&platform)?;
            println!("🔍 {} for {platform}:", manifest.latest_version);
            println!("{}", serde_json::to_string_pretty(entry)?);
        }
        Commands::Verify {
            manifest,
            file,
            platform,
        } => {
            let manifest = load_manifest(&manifest).await?;
            let platform = platform
                .as_deref()
                .map(PlatformKey::from)
                .unwrap_or_else(PlatformKey::current);

            let entry = manifest.binary_for_platform(&platform)?;
            verify_file(&file, &entry.checksum).await?;
            println!("✅ {} matches {} ({platform})", file.display(), entry.filename);
        }
    }

    Ok(())
}

async fn load_manifest(location: &str) -> anyhow::Result<Manifest> {
    // The token endpoint is not involved; only the plain HTTP client is used.
    let client = TokenApiClient::new(DEFAULT_BASE_DOMAIN, "");
    client
        .load_manifest(location)
        .await?
        .with_context(|| format!("No manifest found at {location}"))
}
