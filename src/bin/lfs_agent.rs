use std::{
    error::Error,
    fs::OpenOptions,
    io,
    path::{self, PathBuf},
};

use clap::Parser;
use env_logger::{Builder, Target};
use lfs_agent::{Config, GitConfig, Overrides, ProtocolTransport, Session, serve};
use log::{LevelFilter, debug};

/// Git LFS standalone transfer agent.
///
/// Configure git-lfs with `lfs.standalonetransferagent` pointing at this binary; it then
/// speaks the custom transfer protocol on stdin/stdout.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Namespace URL objects are stored under (default: `lfs.url` from git config)
    #[arg(long, env = "LFS_AGENT_URL")]
    url: Option<String>,
    /// Backend project (default: `lfs-agent.project` from git config)
    #[arg(long, env = "LFS_AGENT_PROJECT")]
    project: Option<String>,
    /// Append debug logs to this file instead of writing them to stderr
    #[arg(long, env = "LFS_AGENT_LOG")]
    log_file: Option<PathBuf>,
    /// Directory downloads are written to (default: working directory)
    #[arg(long)]
    download_dir: Option<PathBuf>,
}

fn init_logging(log_file: Option<&PathBuf>) -> io::Result<()> {
    // stdout carries the protocol, logs must never go there.
    let mut builder = Builder::new();
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .filter_level(LevelFilter::Debug)
                .target(Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(Target::Stderr);
        }
    }
    builder.parse_default_env().init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let overrides = Overrides {
        url: cli.url,
        project: cli.project,
    };
    let download_dir = cli.download_dir.map(path::absolute).transpose()?;

    let mut transport = ProtocolTransport::new(io::stdin().lock(), io::stdout().lock());
    let served = serve(
        &mut transport,
        |init| -> Result<Session, Box<dyn Error + Send + Sync>> {
            debug!("git-lfs announced {:?} for remote {:?}", init.operation, init.remote);

            let config = Config::resolve(&overrides, &GitConfig::default())?;
            let session = match download_dir {
                Some(dir) => Session::open_in(&config, dir)?,
                None => Session::open(&config)?,
            };
            Ok(session)
        },
    )?;

    debug!("served {served} transfer requests");
    Ok(())
}
