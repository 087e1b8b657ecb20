use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tooldrop::archive::ArchiveExtractorImpl;
use tooldrop::cleanup::SharedCleanupContext;
use tooldrop::config::InstallConfig;
use tooldrop::download::HttpDownloader;
use tooldrop::http::HttpClient;
use tooldrop::install::Installer;
use tooldrop::platform::supported_targets;
use tooldrop::release::ArtifactSource;

/// tooldrop - prebuilt tool installer
///
/// Download the release archive matching this machine's OS and CPU
/// architecture and install the executable it contains.
///
/// Examples:
///   tooldrop install 0.12.0                 # Install typst 0.12.0
///   tooldrop install 0.12.0 --dest ~/bin    # Install into ~/bin
///   tooldrop resolve 0.12.0 --os macos      # Show the URL that would be fetched
#[derive(Parser, Debug)]
#[command(author, version = env!("TOOLDROP_BUILD_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install a release into a destination directory
    Install(InstallArgs),

    /// Print the platform triple and archive URL for a release without downloading
    Resolve(ResolveArgs),

    /// List the supported platforms
    Platforms,
}

/// Options selecting which artifact to fetch.
#[derive(clap::Args, Debug)]
struct TargetArgs {
    /// Artifact name used in archive and executable names
    #[arg(long, value_name = "NAME", env = "TOOLDROP_NAME")]
    name: Option<String>,

    /// Base URL that release archives are published under
    #[arg(long = "base-url", value_name = "URL", env = "TOOLDROP_BASE_URL")]
    base_url: Option<String>,

    /// Target OS instead of the detected one
    #[arg(long, value_name = "OS")]
    os: Option<String>,

    /// Target architecture instead of the detected one
    #[arg(long, value_name = "ARCH")]
    arch: Option<String>,
}

#[derive(clap::Args, Debug)]
struct InstallArgs {
    /// Release version, e.g. 0.12.0 (a leading "v" is accepted)
    #[arg(value_name = "VERSION", env = "TOOLDROP_VERSION")]
    version: String,

    /// Directory to install the executable into
    #[arg(long = "dest", short = 'd', value_name = "DIR", env = "TOOLDROP_DEST")]
    destination: Option<PathBuf>,

    /// Expected SHA-256 of the release archive (hex, optional "sha256:" prefix)
    #[arg(long, value_name = "HEX")]
    sha256: Option<String>,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Directory holding install locks
    #[arg(long = "lock-dir", value_name = "DIR", env = "TOOLDROP_LOCK_DIR")]
    lock_dir: Option<PathBuf>,

    /// Parent directory for temporary download and extraction files
    #[arg(long = "work-dir", value_name = "DIR", env = "TOOLDROP_WORK_DIR")]
    work_dir: Option<PathBuf>,

    #[command(flatten)]
    target: TargetArgs,
}

#[derive(clap::Args, Debug)]
struct ResolveArgs {
    /// Release version, e.g. 0.12.0
    #[arg(value_name = "VERSION", env = "TOOLDROP_VERSION")]
    version: String,

    /// Print the release as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    target: TargetArgs,
}

fn base_config(version: String, target: TargetArgs) -> Result<InstallConfig> {
    Ok(InstallConfig {
        source: ArtifactSource::new(target.name, target.base_url)?,
        os: target.os,
        arch: target.arch,
        ..InstallConfig::new(version)
    })
}

impl InstallArgs {
    fn into_config(self) -> Result<InstallConfig> {
        Ok(InstallConfig {
            destination: self.destination,
            expected_sha256: self.sha256,
            timeout: self.timeout.map(Duration::from_secs),
            work_dir: self.work_dir,
            lock_dir: self.lock_dir,
            ..base_config(self.version, self.target)?
        })
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// On Ctrl-C, remove the run's temporary files and exit with status 130.
fn spawn_interrupt_handler(cleanup_ctx: SharedCleanupContext) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cleaning up...");
            if let Ok(ctx) = cleanup_ctx.lock() {
                ctx.cleanup();
            }
            std::process::exit(130);
        }
    })
}

async fn run(cli: Cli) -> Result<()> {
    let runtime = tooldrop::runtime::RealRuntime;

    match cli.command {
        Commands::Install(args) => {
            let config = args.into_config()?;
            let installer = Installer::new(
                runtime,
                HttpDownloader::new(HttpClient::with_defaults()?),
                ArchiveExtractorImpl::new(),
            );

            let ctrl_c_handler = spawn_interrupt_handler(installer.cleanup_context());
            let result = installer.install(&config).await;
            ctrl_c_handler.abort();

            println!("{}", result?.display());
        }
        Commands::Resolve(args) => {
            let json = args.json;
            let config = base_config(args.version, args.target)?;
            let release = tooldrop::resolve(&runtime, &config)?;
            if json {
                let output = serde_json::to_string_pretty(&release)
                    .context("Failed to serialize release")?;
                println!("{}", output);
            } else {
                println!("{} {} ({})", release.name, release.version, release.triple);
                println!("{}", release.url);
            }
        }
        Commands::Platforms => {
            for target in supported_targets() {
                println!(
                    "{:<8} {:<8} {}{}",
                    target.os.as_str(),
                    target.arch.as_str(),
                    target.triple,
                    target.archive_ext
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(tooldrop::error::exit_code(&err));
    }
}
