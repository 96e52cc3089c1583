use std::process::ExitCode;

use clap::Parser;
use env_logger::{Builder, Target};
use log::LevelFilter;
use orderdesk_panel::AppConfig;
use orderdesk_panel::domains::notifications::{Toast, ToastKind};

mod cli;

use cli::Cli;

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    Builder::new()
        .target(Target::Stdout)
        .filter_level(LevelFilter::Warn)
        .filter_module("orderdesk_panel", level)
        .filter_module("orderdesk_config", level)
        .init();
}

fn print_toast(toast: &Toast) {
    match toast.kind {
        ToastKind::Success => println!("✓ {}", toast.message),
        ToastKind::Error => eprintln!("✗ {}", toast.message),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if std::env::var("RUST_LOG").is_err() {
        init_logger(cli.verbose);
    } else {
        env_logger::init();
    }

    let mut config = match AppConfig::from_environment() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(server) = &cli.server {
        config.panel = config.panel.with_server_url(server.clone());
    }
    if let Some(key) = &cli.api_key {
        config.panel = config.panel.with_api_key(key.clone());
    }
    let config = config.with_test_stubs(cli.stub);

    let panel = match config.build_panel() {
        Ok(panel) => panel,
        Err(err) => {
            eprintln!("Failed to start panel: {err}");
            return ExitCode::FAILURE;
        }
    };
    panel.start();

    let mut toasts = panel.notifications().subscribe();
    let command = cli::run(&panel, cli.command);
    tokio::pin!(command);

    let outcome = loop {
        tokio::select! {
            toast = toasts.recv() => {
                if let Ok(toast) = toast {
                    print_toast(&toast);
                }
            }
            result = &mut command => break result,
        }
    };
    while let Ok(toast) = toasts.try_recv() {
        print_toast(&toast);
    }
    panel.shutdown();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Component failures were already printed as toasts.
            log::debug!("Command failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
