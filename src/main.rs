// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use std::env;
use tracing::error;

// Use library instead of local modules
use mdrm_explorer::{init_logging, run_analysis, AppConfig, Catalog};

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let config = AppConfig::from_env();

    if args.len() > 1 && args[1] == "analyze" {
        // mdrm analyze [CSV] [OUTPUT_DIR]
        let mut config = config;
        if let Some(path) = args.get(2) {
            config = config.with_catalog_path(path);
        }
        if let Some(dir) = args.get(3) {
            config = config.with_output_dir(dir);
        }
        run_analyze(&config)?;
    } else {
        // Explorer mode (default): mdrm [CSV]
        let config = match args.get(1) {
            Some(path) => config.with_catalog_path(path),
            None => config,
        };
        run_ui_mode(&config)?;
    }

    Ok(())
}

/// Load the catalog or stop the process; nothing downstream can run without it.
fn load_catalog(config: &AppConfig) -> Catalog {
    println!("📂 Loading MDRM data...");
    match Catalog::load(&config.catalog_path) {
        Ok(catalog) => {
            println!("✓ Loaded {} rows of data", catalog.len());
            catalog
        }
        Err(e) => {
            error!(error = %e, "Catalog load failed");
            eprintln!("❌ {}", e);
            eprintln!("   Set MDRM_CSV or pass the CSV path as an argument.");
            std::process::exit(1);
        }
    }
}

fn run_analyze(config: &AppConfig) -> Result<()> {
    println!("📊 MDRM Data Analysis");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let catalog = load_catalog(config);
    let outputs = run_analysis(&catalog, &config.output_dir)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Analysis complete!");
    println!("   Report: {}", outputs.summary.display());
    for chart in &outputs.charts {
        println!("   Chart:  {}", chart.display());
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    println!("🖥️  Loading MDRM Explorer...\n");

    let catalog = load_catalog(config);

    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(&catalog);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use web UI: cargo run --bin mdrm-server --features server");
    std::process::exit(1);
}
