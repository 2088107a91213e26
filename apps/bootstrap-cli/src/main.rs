use clap::{Parser, Subcommand, ValueEnum};
use db_infra::config::db::{BootstrapConfig, ConnectionSpec, Variant};
use db_infra::infra::db::{
    inspect_bootstrap, orchestrate_bootstrap, orchestrate_inspect, run_bootstrap,
    BootstrapReport, BootstrapStatus, InMemoryEngine,
};
use db_infra::DbInfraError;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VariantArg {
    Basic,
    App,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Insert the marker document and create the application user (default)
    Init {
        /// Run against an in-process engine instead of MongoDB
        #[arg(long)]
        dry_run: bool,
    },
    /// Report whether the marker document and application user exist
    Status,
}

#[derive(Debug, Parser)]
#[command(name = "mongo-init")]
#[command(about = "MongoDB first-start bootstrap: marker document and scoped application user")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    #[arg(
        short,
        long,
        value_enum,
        default_value = "app",
        global = true,
        help = "Defaults profile: basic (mongo/mongo/mongo), app (appdb/appuser/apppass)"
    )]
    variant: VariantArg,
}

impl Args {
    /// `init` when no subcommand is given.
    fn command(&self) -> Command {
        self.command.unwrap_or(Command::Init { dry_run: false })
    }

    fn variant(&self) -> Variant {
        match self.variant {
            VariantArg::Basic => Variant::Basic,
            VariantArg::App => Variant::App,
        }
    }
}

/// Usage errors exit 2; `--help` and `--version` come through clap as errors too
/// but exit 0.
fn parse_error_code(e: &clap::Error) -> i32 {
    if e.use_stderr() {
        2
    } else {
        0
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mongo_init=info,db_infra=info,mongodb=warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_env_filter(filter)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(parse_error_code(&e));
        }
    };

    let command = args.command();
    let variant = args.variant();
    info!("mongo-init=start command={command:?} variant={variant:?}");

    let code = match BootstrapConfig::from_env(variant) {
        Ok(config) => match command {
            Command::Init { dry_run } => init(&config, dry_run).await,
            Command::Status => status(&config).await,
        },
        Err(e) => fail(e),
    };

    info!("mongo-init=exit code={code}");
    std::process::exit(code);
}

async fn init(config: &BootstrapConfig, dry_run: bool) -> i32 {
    let result = if dry_run {
        dry_run_bootstrap(config).await
    } else {
        match ConnectionSpec::from_env() {
            Ok(connection) => orchestrate_bootstrap(&connection, config).await,
            Err(e) => Err(e),
        }
    };

    match result {
        Ok(report) => {
            println!(
                "✅ Bootstrap complete: db={} user={} createdAt={}{}",
                report.db_name,
                report.user,
                report.created_at,
                if dry_run { " (dry run)" } else { "" }
            );
            0
        }
        Err(e) => fail(e),
    }
}

async fn status(config: &BootstrapConfig) -> i32 {
    let result = match ConnectionSpec::from_env() {
        Ok(connection) => orchestrate_inspect(&connection, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(status) => {
            print_status(&status);
            if status.is_complete() {
                0
            } else {
                1
            }
        }
        Err(e) => fail(e),
    }
}

fn print_status(status: &BootstrapStatus) {
    let marker = match (status.marker_present, status.marker_created_at) {
        (true, Some(created_at)) => format!("present (createdAt={created_at})"),
        (true, None) => "present (no createdAt)".to_string(),
        (false, _) => "missing".to_string(),
    };
    let user = if status.user_present { "present" } else { "missing" };

    let icon = if status.is_complete() { "✅" } else { "❌" };
    println!("{icon} db={}", status.db_name);
    println!("  • marker    - {marker}");
    println!("  • user {}   - {user}", status.user);
}

fn fail(e: DbInfraError) -> i32 {
    error!(step = ?e.step(), "mongo-init=failed");
    eprintln!("Bootstrap failed: {e}");
    1
}

async fn dry_run_bootstrap(config: &BootstrapConfig) -> Result<BootstrapReport, DbInfraError> {
    let engine = InMemoryEngine::new();
    let report = run_bootstrap(&engine, config).await?;
    print_status(&inspect_bootstrap(&engine, config).await?);
    Ok(report)
}
