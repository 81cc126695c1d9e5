//! Forum management interface

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use forum::Application;
use forum::conf::Settings;
use forum::server::{ShutdownCoordinator, serve_with_shutdown};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "manage")]
#[command(about = "Forum management interface", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Settings file (defaults to FORUM_SETTINGS_FILE, then built-in defaults)
	#[arg(long, global = true, value_name = "FILE")]
	settings: Option<PathBuf>,

	/// Verbosity level (can be repeated for more output)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	verbosity: u8,
}

#[derive(Debug, Clone, Subcommand)]
enum Commands {
	/// Apply pending migrations, then serve HTTP until Ctrl-C
	Runserver {
		/// Listener address (defaults to server.host:server.port)
		#[arg(value_name = "ADDRESS")]
		address: Option<String>,
	},

	/// Apply pending migrations
	Migrate {
		/// Show migration plan without applying
		#[arg(long)]
		plan: bool,
	},

	/// List every route with its name and methods
	Showurls,

	/// Validate settings, routes and the database connection
	Check,
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	if let Err(error) = run(cli).await {
		eprintln!("{} {:#}", style("Error:").red().bold(), error);
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> Result<()> {
	let settings = Settings::from_environment(cli.settings.as_deref()).context("failed to load settings")?;
	forum::init_logging(&settings, cli.verbosity);

	match cli.command {
		Commands::Runserver { address } => runserver(settings, address).await,
		Commands::Migrate { plan } => migrate(settings, plan).await,
		Commands::Showurls => showurls(settings).await,
		Commands::Check => check(settings).await,
	}
}

async fn runserver(settings: Settings, address: Option<String>) -> Result<()> {
	let address = address.unwrap_or_else(|| settings.server.address());
	let addr: SocketAddr = address
		.parse()
		.with_context(|| format!("invalid address '{}'", address))?;

	let app = Application::build(settings).await?;
	let applied = app.migrate().await?;
	if !applied.is_empty() {
		println!("{} {} migration(s)", style("Applied").green(), applied.len());
	}

	println!(
		"{} http://{}/ {}",
		style("Serving forum at").cyan().bold(),
		addr,
		style("(Ctrl-C to quit)").dim()
	);

	let coordinator = ShutdownCoordinator::new();
	coordinator.shutdown_on_ctrl_c();
	serve_with_shutdown(addr, app.handler(), coordinator)
		.await
		.map_err(|e| anyhow::anyhow!(e))?;

	app.database().close().await;
	println!("{}", style("Server stopped").dim());
	Ok(())
}

async fn migrate(settings: Settings, plan: bool) -> Result<()> {
	let app = Application::build(settings).await?;

	if plan {
		let pending = app.migrator().plan().await?;
		if pending.is_empty() {
			println!("{}", style("No planned migration operations.").dim());
		}
		for migration in pending {
			println!("  {}", migration.label());
		}
		return Ok(());
	}

	let applied = app.migrate().await?;
	if applied.is_empty() {
		println!("{}", style("No migrations to apply.").dim());
	}
	for migration in applied {
		println!("  Applying {}... {}", migration.label(), style("OK").green());
	}
	Ok(())
}

async fn showurls(settings: Settings) -> Result<()> {
	let app = Application::build(settings).await?;

	for route in app.router().routes() {
		let methods = route
			.allowed_methods()
			.map(|methods| methods.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(","))
			.unwrap_or_else(|| "*".to_string());
		println!(
			"{:<48} {:<24} {}",
			route.pattern().pattern(),
			style(route.route_name().unwrap_or("-")).cyan(),
			methods
		);
	}
	Ok(())
}

async fn check(settings: Settings) -> Result<()> {
	settings.validate().context("invalid settings")?;
	let app = Application::build(settings).await?;
	app.database().ping().await.context("database unreachable")?;

	let pending = app.migrator().plan().await?;
	if !pending.is_empty() {
		println!(
			"{} {} unapplied migration(s); run 'manage migrate'",
			style("Warning:").yellow().bold(),
			pending.len()
		);
	}
	println!("{}", style("System check identified no issues.").green());
	Ok(())
}
