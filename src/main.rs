use clap::Parser;
use ghdeb::commands::{self, config::Config};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// ghdeb - install Debian packages from GitHub releases
///
/// Picks the .deb asset matching this machine, installs it with apt and
/// remembers where it came from so it can be upgraded later.
///
/// If the GITHUB_TOKEN environment variable is set, it will be used for authentication.
/// This is useful for accessing private repositories or avoiding rate limits.
///
/// Examples:
///   ghdeb install https://github.com/owner/repo
///   ghdeb install github.com/owner/repo --tag v1.2.0
///   ghdeb upgrade-all
#[derive(Parser, Debug)]
#[command(author, version = env!("GHDEB_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding config.toml and installed.toml (also via GHDEB_CONFIG_DIR)
    #[arg(
        long = "config-dir",
        env = "GHDEB_CONFIG_DIR",
        value_name = "PATH",
        global = true
    )]
    pub config_dir: Option<PathBuf>,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install a package from a GitHub release
    Install(InstallArgs),

    /// Remove an installed package, keeping its configuration files
    Remove(LinkArgs),

    /// Remove an installed package together with its configuration files
    Purge(LinkArgs),

    /// Upgrade the given packages to their latest release
    Upgrade(UpgradeArgs),

    /// Upgrade every installed package
    UpgradeAll,

    /// List installed packages
    List,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Repository link, e.g. https://github.com/owner/repo
    #[arg(value_name = "LINK")]
    pub link: String,

    /// Release tag to install
    #[arg(long, short = 't', default_value = "latest")]
    pub tag: String,
}

#[derive(clap::Args, Debug)]
pub struct LinkArgs {
    #[arg(value_name = "LINK")]
    pub link: String,
}

#[derive(clap::Args, Debug)]
pub struct UpgradeArgs {
    #[arg(value_name = "LINK", required = true)]
    pub links: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = Arc::new(ghdeb::runtime::RealRuntime);
    let config = Config::load(runtime.as_ref(), cli.config_dir, cli.api_url);

    let result = match cli.command {
        Commands::Install(args) => commands::install(runtime, &config, &args.link, &args.tag).await,
        Commands::Remove(args) => commands::remove(runtime, &config, &args.link, false).await,
        Commands::Purge(args) => commands::remove(runtime, &config, &args.link, true).await,
        Commands::Upgrade(args) => commands::upgrade(runtime, &config, &args.links).await,
        Commands::UpgradeAll => commands::upgrade_all(runtime, &config).await,
        Commands::List => commands::list(runtime.as_ref(), &config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
