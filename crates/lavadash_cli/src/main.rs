//! lava-dashboard CLI
//!
//! Command-line client for LAVA validation dashboards.
//!
//! # Commands
//!
//! - `auth-add` - Validate and store an authentication token
//! - `server-version`, `streams`, `bundles` - Inspect a dashboard
//! - `make-stream`, `put`, `get`, `deserialize` - Manage streams and bundles
//! - `pull`, `backup`, `restore` - Replicate bundles between dashboards and disk
//! - `data-views`, `query-data-view` - Run server-side reports

mod commands;
mod render;

use clap::{Parser, Subcommand};
use commands::{auth, bundle, data_views, replicate, safety_net, streams, Console, ServerArgs, Status};
use lavadash_engine::{AuthAddOptions, ClientConfig, EndpointStyle, EngineResult, KeyringTokenStore, UreqClient};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Command-line client for LAVA validation dashboards.
#[derive(Parser, Debug)]
#[command(name = "lava-dashboard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add an authentication token
    AuthAdd {
        /// Endpoint to add token for, in the form scheme://username@host
        #[arg(value_name = "HOST")]
        host_url: String,

        /// Read the secret from here rather than prompting for it
        #[arg(long, value_name = "FILE")]
        token_file: Option<PathBuf>,

        /// By default, a call to the remote server is made to check that
        /// the added token works before remembering it. Passing this option
        /// prevents this check
        #[arg(long)]
        no_check: bool,
    },

    /// Display dashboard server version
    ServerVersion {
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Show bundle streams you have access to
    Streams {
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Show bundles in the specified stream
    Bundles {
        #[command(flatten)]
        server: ServerArgs,

        /// Pathname of the bundle stream
        #[arg(value_name = "PATHNAME", default_value = "/anonymous/")]
        pathname: String,
    },

    /// Create a bundle stream
    MakeStream {
        #[command(flatten)]
        server: ServerArgs,

        /// Pathname of the bundle stream to create
        #[arg(value_name = "PATHNAME")]
        pathname: String,

        /// Name of the bundle stream (description)
        #[arg(long, default_value = "")]
        name: String,
    },

    /// Upload a bundle to the server
    Put {
        #[command(flatten)]
        server: ServerArgs,

        /// Local file to upload
        #[arg(value_name = "LOCAL")]
        local: PathBuf,

        /// Pathname of the bundle stream to store into
        #[arg(value_name = "REMOTE", default_value = "/anonymous/")]
        remote: String,
    },

    /// Download a bundle from the server
    Get {
        #[command(flatten)]
        server: ServerArgs,

        /// SHA1 of the bundle to download
        #[arg(value_name = "SHA1")]
        sha1: String,

        /// Overwrite files on the local disk
        #[arg(long)]
        overwrite: bool,

        /// Alternate name of the output file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Deserialize a bundle on the server
    Deserialize {
        #[command(flatten)]
        server: ServerArgs,

        /// SHA1 of the bundle to deserialize
        #[arg(value_name = "SHA1")]
        sha1: String,
    },

    /// Copy bundles and bundle streams from one dashboard to another
    Pull {
        #[command(flatten)]
        server: ServerArgs,

        /// URL of the remote dashboard to pull from
        #[arg(value_name = "FROM", env = "REMOTE_DASHBOARD_URL")]
        from: String,

        /// Streams to pull from (all by default)
        #[arg(value_name = "STREAM")]
        streams: Vec<String>,
    },

    /// Back up all bundles from the dashboard to a directory
    Backup {
        #[command(flatten)]
        server: ServerArgs,

        /// Directory to back up to
        #[arg(value_name = "BACKUP_DIR")]
        backup_dir: PathBuf,
    },

    /// Restore a dashboard from a backup directory
    Restore {
        #[command(flatten)]
        server: ServerArgs,

        /// Directory to restore from
        #[arg(value_name = "BACKUP_DIR")]
        backup_dir: PathBuf,
    },

    /// Show data views defined on the server
    DataViews {
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Invoke a specified data view
    QueryDataView {
        #[command(flatten)]
        server: ServerArgs,

        /// Name of the data view
        #[arg(value_name = "NAME")]
        name: String,

        /// Data view argument; repeat for several
        #[arg(long = "arg", value_name = "KEY=VALUE", value_parser = data_views::parse_key_value)]
        arguments: Vec<(String, String)>,
    },

    /// Show dashboard client version
    Version,
}

impl Commands {
    fn server_args(&self) -> Option<&ServerArgs> {
        match self {
            Commands::AuthAdd { .. } | Commands::Version => None,
            Commands::ServerVersion { server }
            | Commands::Streams { server }
            | Commands::Bundles { server, .. }
            | Commands::MakeStream { server, .. }
            | Commands::Put { server, .. }
            | Commands::Get { server, .. }
            | Commands::Deserialize { server, .. }
            | Commands::Pull { server, .. }
            | Commands::Backup { server, .. }
            | Commands::Restore { server, .. }
            | Commands::DataViews { server }
            | Commands::QueryDataView { server, .. } => Some(server),
        }
    }
}

fn dispatch(command: Commands, console: &mut Console<'_>) -> EngineResult<Status> {
    match command {
        Commands::AuthAdd {
            host_url,
            token_file,
            no_check,
        } => {
            let mut options = AuthAddOptions::new(host_url, whoami::username()).with_no_check(no_check);
            if let Some(path) = token_file {
                options = options.with_token_file(path);
            }
            let config = ClientConfig::new(EndpointStyle::Rpc2);
            auth::add_token(
                &options,
                &KeyringTokenStore::new(),
                UreqClient::new(&config),
                &config,
                auth::prompt_for_token,
                console,
            )
        }
        Commands::ServerVersion { server } => streams::server_version(&server.connect()?, console),
        Commands::Streams { server } => streams::streams(&server.connect()?, console),
        Commands::Bundles { server, pathname } => streams::bundles(&server.connect()?, &pathname, console),
        Commands::MakeStream { server, pathname, name } => {
            streams::make_stream(&server.connect()?, &pathname, &name, console)
        }
        Commands::Put { server, local, remote } => bundle::put(&server.connect()?, &local, &remote, console),
        Commands::Get {
            server,
            sha1,
            overwrite,
            output,
        } => bundle::get(&server.connect()?, &sha1, output.as_deref(), overwrite, console),
        Commands::Deserialize { server, sha1 } => bundle::deserialize(&server.connect()?, &sha1, console),
        Commands::Pull { server, from, streams } => {
            let remote = server.connect_to(&from)?;
            let local = server.connect()?;
            replicate::pull_streams(&remote, &local, &streams, console)
        }
        Commands::Backup { server, backup_dir } => replicate::backup_to(&server.connect()?, &backup_dir, console),
        Commands::Restore { server, backup_dir } => {
            replicate::restore_from(&server.connect()?, &backup_dir, console)
        }
        Commands::DataViews { server } => data_views::data_views(&server.connect()?, console),
        Commands::QueryDataView {
            server,
            name,
            arguments,
        } => data_views::query_data_view(&server.connect()?, &name, &arguments, console),
        Commands::Version => {
            console.line(format!("Dashboard client version: {}", env!("CARGO_PKG_VERSION")))?;
            Ok(Status::Success)
        }
    }
}

/// Runs one parsed command line, printing diagnostics for failures.
fn run(cli: Cli, console: &mut Console<'_>) -> Status {
    let status = match dispatch(cli.command, console) {
        Ok(status) => status,
        Err(err) => safety_net::report(&err, console),
    };
    tracing::debug!(code = status.code(), "command finished");
    status
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let verbose = cli.verbose || cli.command.server_args().is_some_and(|s| s.verbose_xml_rpc);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();
    run(cli, &mut Console::new(&mut out, &mut err)).into()
}
