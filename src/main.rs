// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Entry point.
//!
//! ```text
//! cli::parse() --> askpass? --> Config --> Logging --> Command Dispatch
//!   Project (list, create, ...) | Vcs (status, pull, ...) | Config
//! ```

use std::process::ExitCode;

use flowvcs::cli::global::GlobalOptions;
use flowvcs::cli::{self, Command};
use flowvcs::cmd::Session;
use flowvcs::cmd::askpass::run_askpass_command;
use flowvcs::cmd::config::{run_configs_command, run_options_command, run_check_command};
use flowvcs::cmd::project::{
    run_activate_command, run_create_command, run_delete_command, run_flows_command,
    run_info_command, run_list_command, run_update_command,
};
use flowvcs::cmd::vcs::{
    run_abort_merge_command, run_branches_command, run_checkout_command, run_commit_command,
    run_diff_command, run_files_command, run_log_command, run_pull_command, run_push_command,
    run_remotes_command, run_resolve_command, run_revert_command, run_show_command,
    run_stage_command, run_status_command, run_unstage_command,
};
use flowvcs::config::{Config, ConfigLoader};
use flowvcs::error::{Result, VcsError};
use flowvcs::logging::{LogConfig, init_logging};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse();

    // Run by git mid-command: no config, no logging, nothing but the answer on stdout.
    if let Some(Command::Askpass { prompt }) = &cli.command {
        return match run_askpass_command(prompt).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("askpass: {e:#}");
                ExitCode::FAILURE
            }
        };
    }

    let loader = match build_config_loader(&cli.global) {
        Ok(loader) => loader,
        Err(e) => return report(&e),
    };
    let loaded_files = loader.format_loaded_files();
    let config = match loader.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(&build_log_config(&config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Dropping the command future kills git children and removes auth endpoints.
    let result = tokio::select! {
        result = dispatch_command(&cli, &config, &loaded_files) => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("Received Ctrl+C, interrupting...");
            Err(anyhow::anyhow!("Interrupted"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn build_log_config(config: &Config) -> LogConfig {
    LogConfig::builder()
        .with_console_level(config.global.output_log_level)
        .with_file_level(config.global.file_log_level)
        .maybe_with_log_file(
            config
                .global
                .log_file
                .as_ref()
                .map(|p| p.display().to_string()),
        )
        .with_json(config.global.json_logs)
        .build()
}

async fn dispatch_command(cli: &cli::Cli, config: &Config, loaded_files: &[String]) -> Result<()> {
    let Some(command) = &cli.command else {
        eprintln!("No command specified. Use --help for usage information.");
        return Err(anyhow::anyhow!("No command specified"));
    };

    match command {
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Options => {
            run_options_command(config);
            return Ok(());
        }
        Command::Configs => {
            run_configs_command(loaded_files);
            return Ok(());
        }
        Command::Check => return run_check_command(config).await,
        _ => {}
    }

    let session = Session::open(config, &cli.global).await?;
    match command {
        Command::List => run_list_command(&session).await,
        Command::Create(args) => run_create_command(&session, args).await,
        Command::Activate(args) => run_activate_command(&session, args).await,
        Command::Delete(args) => run_delete_command(&session, args).await,
        Command::Info(args) => run_info_command(&session, args).await,
        Command::Update(args) => run_update_command(&session, args).await,
        Command::Flows(args) => run_flows_command(&session, args).await,
        Command::Status(args) => run_status_command(&session, args).await,
        Command::Files => run_files_command(&session).await,
        Command::Branches(args) => run_branches_command(&session, args).await,
        Command::Checkout(args) => run_checkout_command(&session, args).await,
        Command::Log(args) => run_log_command(&session, args).await,
        Command::Show(args) => run_show_command(&session, args).await,
        Command::Stage(args) => run_stage_command(&session, args).await,
        Command::Unstage(args) => run_unstage_command(&session, args).await,
        Command::Commit(args) => run_commit_command(&session, args).await,
        Command::Diff(args) => run_diff_command(&session, args).await,
        Command::Revert(args) => run_revert_command(&session, args).await,
        Command::Remotes(args) => run_remotes_command(&session, args).await,
        Command::Pull(args) => run_pull_command(&session, args).await,
        Command::Push(args) => run_push_command(&session, args).await,
        Command::Resolve(args) => run_resolve_command(&session, args).await,
        Command::AbortMerge => run_abort_merge_command(&session).await,
        Command::Version
        | Command::Options
        | Command::Configs
        | Command::Check
        | Command::Askpass { .. } => Ok(()),
    }
}

/// Prints the error with its stable code when it carries one.
fn report(e: &anyhow::Error) -> ExitCode {
    match e.downcast_ref::<VcsError>() {
        Some(vcs) => eprintln!("Error[{}]: {e:#}", vcs.code()),
        None => eprintln!("Error: {e:#}"),
    }
    ExitCode::FAILURE
}

fn build_config_loader(global: &GlobalOptions) -> Result<ConfigLoader> {
    let mut loader = ConfigLoader::new();
    if !global.no_default_configs {
        if let Some(user_file) = Config::user_config_file() {
            loader = loader.add_toml_file_optional(user_file);
        }
        loader = loader.add_toml_file_optional("flowvcs.toml");
    }
    for path in &global.configs {
        loader = loader.add_toml_file(path);
    }
    loader = loader.with_env_prefix("FLOWVCS");
    for pair in global.to_config_overrides() {
        loader = loader.set_pair(&pair)?;
    }
    Ok(loader)
}
