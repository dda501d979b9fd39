// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use adsdesk_app::{AppState, Backend};
use adsdesk_remote::{Client, oauth};
use anyhow::{Context, Result};
use config::Config;
use runtime::RemoteRuntime;
use std::env;
use std::path::PathBuf;
use tracing::info;

const DEMO_SEED: u64 = 7;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    if let Some(callback) = &options.oauth_callback {
        println!("{}", oauth_callback_output(callback)?);
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `adsdesk --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    if options.demo {
        if options.check_only {
            return Ok(());
        }
        let _guard = logging::init(&config.log_level(), &config.log_file()?)?;
        info!(seed = DEMO_SEED, "starting with demo data");
        return launch(adsdesk_testkit::demo_backend(DEMO_SEED), &config);
    }

    let client = connect(&config).with_context(|| {
        format!(
            "invalid [backend] config in {}; fix url/api_key/timeout values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        client.ping()?;
        println!("ok: reached {}", client.base_url());
        return Ok(());
    }

    let _guard = logging::init(&config.log_level(), &config.log_file()?)?;
    info!(url = client.base_url(), "starting");
    launch(client, &config)
}

fn connect(config: &Config) -> Result<Client> {
    Client::new(
        config.backend_url()?,
        &config.api_key()?,
        config.backend_timeout()?,
    )
}

fn launch<B: Backend>(backend: B, config: &Config) -> Result<()> {
    let mut state = AppState::default();
    let mut runtime = RemoteRuntime::new(backend, config.function_names(), config.bucket());
    adsdesk_tui::run_app(&mut state, &mut runtime)
}

/// The message the OAuth popup posts back, plus the origin it may be posted to.
fn oauth_callback_output(callback: &str) -> Result<String> {
    let message = oauth::parse_callback(callback)?;
    let origin = oauth::target_origin(callback)?;
    Ok(format!("{}\n# target origin: {origin}", message.to_json()?))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    oauth_callback: Option<String>,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        demo: false,
        check_only: false,
        oauth_callback: None,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--oauth-callback" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--oauth-callback requires the callback URL"))?;
                options.oauth_callback = Some(value.as_ref().to_owned());
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("adsdesk");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch against seeded in-memory sample data");
    println!("  --check                  Validate config and reach the backend");
    println!("  --oauth-callback <url>   Print the OAuth popup message for a redirect URL");
    println!("  --help                   Show this help");
}
