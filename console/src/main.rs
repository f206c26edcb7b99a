//! Platform Console - Entry Point
//!
//! Drives the console core headlessly: sign in and out, inspect what a view
//! renders, and run the everyday actions (acknowledge or resolve an alert,
//! roll back a deployment, start a pipeline run).

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use platform_models::{Environment, RegisterRequest};
use tracing::{debug, error};

use opsconsole::app::console::Console;
use opsconsole::app::options::ConsoleOptions;
use opsconsole::guard::route::Navigation;
use opsconsole::logs::{init_logging, LogLevel, LogOptions};
use opsconsole::notify::ConsoleNotifier;
use opsconsole::storage::layout::StorageLayout;
use opsconsole::storage::settings::Settings;
use opsconsole::utils::version_info;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version: {}", e),
        }
        return;
    }

    if let Err(e) = run(&cli_args).await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli_args: &HashMap<String, String>) -> anyhow::Result<()> {
    let layout = match cli_args.get("dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    // Retrieve the settings file, falling back to defaults
    let settings_file = layout.settings_file();
    let mut settings = if settings_file.exists().await {
        settings_file
            .read_json::<Settings>()
            .await
            .with_context(|| format!("Unable to read {}", settings_file.path().display()))?
    } else {
        Settings::default()
    };
    if let Some(base_url) = cli_args.get("base-url") {
        settings.backend.base_url = base_url.clone();
    }
    if let Some(level) = cli_args.get("log-level") {
        settings.log_level = level.parse::<LogLevel>().map_err(|e| anyhow!(e))?;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings
            .log_to_file
            .then(|| layout.logs_dir().path().to_path_buf()),
        json_format: settings.json_logs,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = ConsoleOptions::from_settings(&settings, layout);
    debug!("Starting console with options: {:?}", options);
    let console = Console::open(&options, Arc::new(ConsoleNotifier)).await?;

    if cli_args.contains_key("register") {
        let request = RegisterRequest {
            username: required(cli_args, "username")?,
            email: required(cli_args, "email")?,
            password: required(cli_args, "password")?,
            full_name: cli_args.get("full-name").cloned(),
        };
        console.register(&request).await?;
        return Ok(());
    }

    if cli_args.contains_key("login") {
        let username = required(cli_args, "username")?;
        let password = required(cli_args, "password")?;
        let session = console.login(&username, &password).await?;
        println!("Signed in as {}", session.user.username.bold());
        return Ok(());
    }

    if cli_args.contains_key("logout") {
        if console.logout().await? {
            println!("Signed out");
        } else {
            println!("Not signed in");
        }
        return Ok(());
    }

    if cli_args.contains_key("whoami") {
        match console.whoami() {
            Some(session) => {
                let expires = session
                    .credential
                    .expires_at()
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string());
                println!(
                    "{} <{}> (token expires {})",
                    session.user.username.bold(),
                    session.user.email,
                    expires
                );
            }
            None => println!("Not signed in"),
        }
        return Ok(());
    }

    if let Some(path) = cli_args.get("view") {
        let (navigation, mut view) = console.open_view(path);
        if let Navigation::Redirect { from, to } = &navigation {
            bail!("{} is not reachable from here, redirected to {}", from, to);
        }
        if let Some(env) = cli_args.get("env") {
            let environment: Environment = serde_json::from_value(serde_json::Value::String(env.clone()))?;
            view.filter_environment(Some(environment));
        }
        let rendered = view.render().await;
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    let mutations = console.mutations();
    if let Some(id) = cli_args.get("ack-alert") {
        let alert = mutations.acknowledge_alert(parse_id(id)?).await?;
        println!("{} is now {:?}", alert.title, alert.status);
        return Ok(());
    }

    if let Some(id) = cli_args.get("resolve-alert") {
        let alert = mutations.resolve_alert(parse_id(id)?).await?;
        println!("{} is now {:?}", alert.title, alert.status);
        return Ok(());
    }

    if let Some(id) = cli_args.get("rollback") {
        let deployment = mutations.rollback_deployment(parse_id(id)?).await?;
        println!(
            "Deployment {} rolling back {} to {}",
            deployment.id, deployment.environment, deployment.version
        );
        return Ok(());
    }

    if let Some(id) = cli_args.get("run-pipeline") {
        let run = mutations
            .run_pipeline(parse_id(id)?, cli_args.get("branch").cloned())
            .await?;
        println!("Run #{} started ({:?})", run.run_number, run.status);
        return Ok(());
    }

    println!("Usage: opsconsole [--dir=<path>] [--base-url=<url>] <command>");
    println!("  --version");
    println!("  --register --username=<name> --email=<email> --password=<password> [--full-name=<name>]");
    println!("  --login --username=<name> --password=<password>");
    println!("  --logout | --whoami");
    println!("  --view=<path> [--env=<environment>]");
    println!("  --ack-alert=<id> | --resolve-alert=<id> | --rollback=<id>");
    println!("  --run-pipeline=<id> [--branch=<branch>]");
    Ok(())
}

fn required(cli_args: &HashMap<String, String>, key: &str) -> anyhow::Result<String> {
    cli_args
        .get(key)
        .cloned()
        .ok_or_else(|| anyhow!("--{} is required", key))
}

fn parse_id(value: &str) -> anyhow::Result<i64> {
    value
        .parse()
        .with_context(|| format!("Invalid id: {}", value))
}
