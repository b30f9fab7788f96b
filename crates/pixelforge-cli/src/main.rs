//! PixelForge CLI - Command-line client for the PixelForge image conversion API.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::Context;
use pixelforge_http::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use pixelforge_session::{guard, Navigation, Route, RouteAccess};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// PixelForge CLI - Convert images and manage conversion jobs.
#[derive(Parser)]
#[command(name = "pixelforge")]
#[command(about = "PixelForge CLI for authentication and image conversion jobs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL
    #[arg(long, env = "PIXELFORGE_API_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    api_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "PIXELFORGE_API_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT.as_secs(), global = true)]
    timeout_secs: u64,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with email and password
    Login,

    /// Create an account and login
    Register,

    /// Logout and clear session
    Logout,

    /// Check authentication status
    Status,

    /// List supported target formats
    Formats,

    /// Manage conversion jobs
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// List jobs
    List {
        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: u32,
        /// Jobs per page
        #[arg(short, long, default_value = "10")]
        size: u32,
    },
    /// Convert an image
    Convert {
        /// Image to convert
        file: PathBuf,
        /// Target format (see `pixelforge formats`)
        #[arg(short, long)]
        to: String,
        /// Poll until the job finishes
        #[arg(short, long)]
        wait: bool,
        /// Seconds between status polls
        #[arg(long, default_value = "2")]
        interval_secs: u64,
    },
    /// Show job status
    Status {
        /// Job ID
        id: i64,
    },
    /// Show download metadata
    Info {
        /// Job ID
        id: i64,
    },
    /// Download the converted image
    Download {
        /// Job ID
        id: i64,
        /// Directory to save into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// File name to save as (defaults to the server's name)
        #[arg(long)]
        filename: Option<String>,
    },
    /// Save the job preview
    Preview {
        /// Job ID
        id: i64,
        /// Directory to save into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

impl Commands {
    /// The shell route this command stands in for, if it is gated.
    fn route(&self) -> Option<Route> {
        match self {
            Commands::Login => Some(Route::SignIn),
            Commands::Register => Some(Route::SignUp),
            Commands::Formats | Commands::Jobs { .. } => Some(Route::Home),
            Commands::Logout | Commands::Status => None,
        }
    }

    fn access(&self) -> RouteAccess {
        self.route()
            .map(Route::access)
            .unwrap_or(RouteAccess::Public)
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ClientConfig::new(&cli.api_url)?
        .with_timeout(Duration::from_secs(cli.timeout_secs));
    let ctx = Context::connect(config, cli.format, cli.command.route()).await?;

    match guard(cli.command.access(), ctx.store.is_authenticated()) {
        Navigation::Proceed => {}
        Navigation::Redirect(Route::SignIn) => {
            anyhow::bail!("Not logged in. Run 'pixelforge login' first");
        }
        Navigation::Redirect(_) => {
            let who = ctx
                .store
                .user()
                .map(|user| user.email)
                .unwrap_or_else(|| "unknown".to_string());
            output::print_success(&format!("Already logged in as {}", who), &ctx.format);
            return Ok(());
        }
    }

    let result = match cli.command {
        Commands::Login => commands::login(&ctx).await,
        Commands::Register => commands::register(&ctx).await,
        Commands::Logout => commands::logout(&ctx).await,
        Commands::Status => commands::status(&ctx).await,
        Commands::Formats => commands::formats(&ctx).await,
        Commands::Jobs { command } => match command {
            JobCommands::List { page, size } => commands::jobs_list(&ctx, page, size).await,
            JobCommands::Convert {
                file,
                to,
                wait,
                interval_secs,
            } => {
                commands::jobs_convert(&ctx, &file, &to, wait, Duration::from_secs(interval_secs))
                    .await
            }
            JobCommands::Status { id } => commands::jobs_status(&ctx, id).await,
            JobCommands::Info { id } => commands::jobs_info(&ctx, id).await,
            JobCommands::Download {
                id,
                output,
                filename,
            } => commands::jobs_download(&ctx, id, &output, filename.as_deref()).await,
            JobCommands::Preview { id, output } => commands::jobs_preview(&ctx, id, &output).await,
        },
    };

    if ctx.redirected_to_sign_in() {
        debug!("Command ended by an expired session");
    }
    result
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging via observability crate
    observability::init_with_config(observability::LogConfig {
        service_name: "cli".into(),
        default_level: cli.log_level.clone(),
        output: observability::LogOutput::JsonFile,
        also_stderr: false,
        ..Default::default()
    });

    let format = cli.format;
    if let Err(e) = run(cli).await {
        output::print_error(&e.to_string(), &format);
        std::process::exit(1);
    }
}
