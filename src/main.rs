//! idcontrol - Document verification back-office client
//!
//! Entry point for the idcontrol application.

use clap::Parser;
use idcontrol::api::ApiClient;
use idcontrol::cli::{
    ApplicationsArgs, Cli, Commands, ConfigCommands, RequestArgs, ReviewerRole, ServeArgs,
};
use idcontrol::client::HttpClient;
use idcontrol::config::{Config, LoggingConfig};
use idcontrol::error::{exit_code, IdControlError};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    // Invalid configuration still gets a logger so the error is reported.
    let mut logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    if let Some(level) = cli.log_level() {
        logging.level = level;
    }
    if let Err(e) = logging.init() {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(exit_code::GENERAL_ERROR as u8);
    }

    match run(&cli, config) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Main application logic. Returns the process exit code.
fn run(cli: &Cli, config: idcontrol::Result<Config>) -> idcontrol::Result<i32> {
    match &cli.command {
        Commands::Config(subcmd) => cmd_config(subcmd, config),
        Commands::Serve(args) => cmd_serve(args, config?),
        Commands::Request(args) => cmd_request(args, config?),
        Commands::Applications(args) => cmd_applications(args, config?),
    }
}

fn runtime() -> idcontrol::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        IdControlError::server_with_source("Failed to create async runtime".to_string(), e)
    })
}

/// Handle the `serve` command.
fn cmd_serve(args: &ServeArgs, mut config: Config) -> idcontrol::Result<i32> {
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!(
        service = %config.server.service_name,
        bind = %config.server.bind,
        port = %config.server.port,
        api = %config.client.base_url,
        "Starting idcontrol health server"
    );

    runtime()?.block_on(idcontrol::serve(&config))?;
    Ok(exit_code::SUCCESS)
}

/// Handle the `request` command.
fn cmd_request(args: &RequestArgs, config: Config) -> idcontrol::Result<i32> {
    let body = args
        .data
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .map_err(|e| IdControlError::config_with_source("Invalid JSON in --data", e))?;
    let headers = args.header_map();

    let response = runtime()?.block_on(async {
        let client = HttpClient::new(config.client.clone())?;
        if let Some(token) = &args.token {
            client.set_token(token.clone());
        }

        Ok::<_, IdControlError>(
            client
                .execute(args.method, &args.path, body.as_ref(), Some(&headers))
                .await,
        )
    })?;

    print_json(&response)?;
    Ok(outcome_code(response.is_success()))
}

/// Handle the `applications` command.
fn cmd_applications(args: &ApplicationsArgs, config: Config) -> idcontrol::Result<i32> {
    let response = runtime()?.block_on(async {
        let api = ApiClient::new(Arc::new(HttpClient::new(config.client.clone())?));
        if let Some(token) = &args.token {
            api.http().set_token(token.clone());
        }

        let search = args.search.as_deref();
        Ok::<_, IdControlError>(match args.role {
            ReviewerRole::Financier => api.financier_applications(args.status, search).await,
            ReviewerRole::Mvd => api.mvd_applications(args.status, search).await,
        })
    })?;

    print_json(&response)?;
    Ok(outcome_code(response.is_success()))
}

fn outcome_code(success: bool) -> i32 {
    if success {
        exit_code::SUCCESS
    } else {
        exit_code::REQUEST_FAILED
    }
}

/// Handle the `config` subcommand.
fn cmd_config(subcmd: &ConfigCommands, config: idcontrol::Result<Config>) -> idcontrol::Result<i32> {
    match subcmd {
        ConfigCommands::Validate => match config {
            Ok(config) => {
                println!("✓ Configuration is valid");
                tracing::debug!(?config, "Validated configuration");
                Ok(exit_code::SUCCESS)
            }
            Err(e) => {
                println!("✗ Configuration is invalid: {}", e);
                Err(e)
            }
        },
        ConfigCommands::Show => {
            let yaml = serde_yaml::to_string(&config?).map_err(|e| {
                IdControlError::config_with_source("Failed to serialize configuration", e)
            })?;
            println!("{}", yaml);
            Ok(exit_code::SUCCESS)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> idcontrol::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

