//! `turret`: command-line front end for the sentry turret controller.
//!
//! Loads and validates the TOML config, installs logging and the interrupt
//! handler, then runs the control loop (or a self-check). Errors are printed
//! in human-readable form (or JSON with `--json`) and mapped to stable exit
//! codes.

mod cli;
mod error_fmt;
mod logging;
mod run;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE};

fn load_config(cli: &Cli) -> eyre::Result<turret_config::Config> {
    let cfg = turret_config::load_file(&cli.config)?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid configuration in {:?}", cli.config))?;
    Ok(cfg)
}

fn install_interrupt() -> eyre::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .map_err(|e| eyre::eyre!("install interrupt handler: {e}"))?;
    Ok(flag)
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli)?;
    logging::init(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::info!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            max_iterations,
            disable_turret,
            capture_dir,
            stats,
        } => {
            let shutdown = install_interrupt()?;
            let ov = run::RunOverrides {
                max_iterations,
                disable_turret,
                capture_dir,
            };
            run::run(&cfg, &ov, stats, shutdown)
        }
        Commands::SelfCheck => run::self_check(&cfg),
    }
}

fn main() {
    // Only the panic and error report hooks; errors are rendered by error_fmt.
    let _ = color_eyre::install();

    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        tracing::error!(error = %e, "turret exited with error");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
}
