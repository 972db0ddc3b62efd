mod chain;
mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use lf_core::config::Config;
use lf_pipeline::{
    ActionRegistry, PipelineExecutor, ProgressSender, RunContext, RunOutcome, RunRequest,
    SessionDump,
};
use tokio_util::sync::CancellationToken;

/// Exit status of a run stopped by the user, as for SIGINT.
const EXIT_CANCELLED: u8 = 130;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref());

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise the verbose flag, then the config file
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "labelforge=trace,lf_pipeline=trace,lf_core=debug,lf_rules=debug".to_string()
        } else {
            config
                .logging
                .filter
                .clone()
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| "labelforge=info,lf_pipeline=info,lf_core=warn".to_string())
        }
    });

    // Logs go to stderr so a run can print the resulting session on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Actions => list_actions().map(|()| ExitCode::SUCCESS),
        Commands::Run {
            session,
            actions,
            from,
            to,
            filter,
            output,
        } => run_chain(
            &config,
            RunArgs {
                session,
                actions,
                from,
                to,
                filter,
                output,
            },
        ),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref()).map(|()| ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("labelforge {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn list_actions() -> Result<()> {
    let registry = ActionRegistry::new();

    for action in registry.list() {
        println!("{}", action.name());
        match action.parameters() {
            Some(schema) if !schema.is_empty() => {
                for (name, spec) in schema {
                    print!("  {name} ({}, default {:?})", spec.kind, spec.default);
                    if !spec.values.is_empty() {
                        print!(" [{}]", spec.values.join(", "));
                    }
                    println!();
                }
            }
            _ => println!("  (no parameters)"),
        }
    }

    Ok(())
}

struct RunArgs {
    session: PathBuf,
    actions: Vec<String>,
    from: u32,
    to: u32,
    filter: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn run_chain(config: &Config, args: RunArgs) -> Result<ExitCode> {
    let dump_json = std::fs::read_to_string(&args.session)
        .with_context(|| format!("Failed to read session {:?}", args.session))?;
    let dump = SessionDump::from_json(&dump_json)
        .with_context(|| format!("Invalid session dump {:?}", args.session))?;

    let filters = match &args.filter {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read filter {path:?}"))?;
            lf_rules::parse_filters(&json).with_context(|| format!("Invalid filter {path:?}"))?
        }
        None => Vec::new(),
    };

    let registry = ActionRegistry::new();
    let action_args = chain::parse_all(&args.actions)?;
    let names: Vec<&str> = action_args.iter().map(|a| a.name.as_str()).collect();
    let actions = registry.resolve_chain(names.as_slice())?;
    let parameters = action_args.into_iter().map(|a| a.parameters).collect();
    let executor =
        PipelineExecutor::new(actions, parameters)?.with_config(config.pipeline.clone());
    let request = RunRequest::new(args.from, args.to).with_filters(filters);

    let kind = dump.kind;
    let frames = dump.frames.clone();
    let (session, store) = dump.into_session()?;

    tracing::info!(
        "Running [{}] over frames {}..={} of {:?}",
        executor.chain_description(),
        args.from,
        args.to,
        args.session
    );

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async {
        let token = CancellationToken::new();
        let interrupt = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received; cancelling run");
                interrupt.cancel();
            }
        });

        let ctx = RunContext::new()
            .with_progress(ProgressSender::new(|pct, message| {
                eprintln!("[{pct:3.0}%] {message}");
            }))
            .with_cancellation(token);
        executor.execute(&session, &request, &ctx).await
    })?;

    match outcome {
        RunOutcome::Cancelled { at } => {
            eprintln!("Run cancelled during {at}; session left unchanged");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        RunOutcome::Committed {
            shapes,
            frames_processed,
        } => {
            let result = SessionDump {
                kind,
                collection: store.snapshot(),
                frames,
            };
            let json = result.to_json_pretty()?;
            match &args.output {
                Some(path) => {
                    std::fs::write(path, json)
                        .with_context(|| format!("Failed to write {path:?}"))?;
                    eprintln!("Wrote {path:?}");
                }
                None => println!("{json}"),
            }
            eprintln!("Processed {frames_processed} frames; session now holds {shapes} shapes");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config {p:?}"))?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Progress interval: {} ms", config.pipeline.progress_interval_ms);
    println!("  Init pause: {} ms", config.pipeline.init_pause_ms);
    println!("  Commit pause: {} ms", config.pipeline.commit_pause_ms);
    println!(
        "  Log filter: {}",
        config.logging.filter.as_deref().unwrap_or("(default)")
    );

    for warning in config.validate() {
        println!("  warning: {warning}");
    }

    Ok(())
}
