// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use building_register::{logging, AppConfig};

/// Terminal form for building registry lookups
#[derive(Debug, Parser)]
#[command(name = "building-register", version, about)]
struct Args {
    /// TOML config file (defaults to building-register.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the CSV export is written to
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,

    /// Open with an empty form instead of the sample address
    #[arg(long)]
    empty: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;
    let _guard = logging::init_logging(&config.log_dir, "building-register", &config.log_level, false)?;

    tracing::info!(
        juso_key = config.juso_key().is_some(),
        service_key = config.service_key().is_some(),
        "starting terminal form"
    );

    run_ui_mode(&config, &args)
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig, args: &Args) -> Result<()> {
    use building_register::{FormState, Services};

    let runtime = tokio::runtime::Runtime::new()?;
    let services = Services::from_config(config);
    let form = if args.empty { FormState::empty() } else { FormState::new() };

    let mut app = ui::App::new(form, services, runtime.handle().clone(), args.export_dir.clone());
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig, _args: &Args) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the web form: cargo run --bin building-register-server --features server");
    std::process::exit(1);
}
