//! Switchboard RPC server entry point.

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use switchboard_http::config::{ConfigOverrides, ServerConfig};
use switchboard_http::methods::{builtin_tree, default_filters};
use switchboard_http::protocol::RpcHandler;
use switchboard_http::transport::HttpTransport;

#[derive(Parser)]
#[command(
    name = "switchboard",
    about = "Single-endpoint JSON RPC server with negotiated response compression",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Listen address (host:port). Also reads SWITCHBOARD_ADDR.
    #[arg(long)]
    addr: Option<String>,

    /// Protocol version clients must send. Also reads SWITCHBOARD_API_VERSION.
    #[arg(long)]
    api_version: Option<String>,

    /// Runtime environment (development, production, test). Also reads SWITCHBOARD_ENV.
    #[arg(long = "env")]
    environment: Option<String>,

    /// Dispatch timeout in milliseconds, 0 to disable.
    /// Also reads SWITCHBOARD_DISPATCH_TIMEOUT_MS.
    #[arg(long)]
    dispatch_timeout_ms: Option<u64>,
}

impl From<ServeArgs> for ConfigOverrides {
    fn from(args: ServeArgs) -> Self {
        ConfigOverrides {
            addr: args.addr,
            api_version: args.api_version,
            environment: args.environment,
            dispatch_timeout_ms: args.dispatch_timeout_ms,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the RPC server (default).
    Serve(ServeArgs),

    /// Print registered method paths as JSON.
    Methods,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   switchboard completions bash > ~/.local/share/bash-completion/completions/switchboard
    ///   switchboard completions zsh > ~/.zfunc/_switchboard
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or_else(|| Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => {
            let config = ServerConfig::resolve(args.into())?;
            let tree = builtin_tree(&config.version, config.environment)?;

            tracing::info!("Switchboard RPC server");
            tracing::info!("API version: {}", config.version);
            tracing::info!("Environment: {}", config.environment);
            tracing::info!("Methods: {}", tree.paths().join(", "));

            let handler = RpcHandler::new(tree, default_filters(), config.handler_config());
            let transport = HttpTransport::new(handler);
            transport.run(&config.addr).await?;
        }

        Commands::Methods => {
            let config = ServerConfig::resolve(ConfigOverrides::default())?;
            let tree = builtin_tree(&config.version, config.environment)?;
            let info = serde_json::json!({
                "version": config.version,
                "methods": tree.paths(),
                "method_count": tree.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "switchboard", &mut std::io::stdout());
        }
    }

    Ok(())
}
