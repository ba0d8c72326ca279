//! cbuilder CLI entry point
//!
//! Usage:
//!   cbuilder run <url> [branch]   Fetch a repository and build it
//!   cbuilder detect [path]        Detect build system
//!   cbuilder doctor               Check installed tools
//!   cbuilder config               Show configuration

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cbuilder::buildsys::{detect_build_system, BuildSystemKind};
use cbuilder::cli::{
    commands::{ConfigArgs, DetectArgs, DoctorArgs, OutputFormat, RunArgs},
    Cli, Commands,
};
use cbuilder::config::{load_config, LoadedConfig};
use cbuilder::doctor::run_doctor;
use cbuilder::executor::PathLocator;
use cbuilder::fetch::{GitFetcher, LocalSource, SourceFetcher};
use cbuilder::orchestrator::{
    Orchestrator, ProcessStepRunner, EXIT_DETECTION_FAILURE, EXIT_ENVIRONMENT_FAILURE,
    EXIT_SUCCESS,
};
use cbuilder::pipeline::Pipeline;
use cbuilder::platform::PlatformCapabilities;
use cbuilder::report::build_report;
use cbuilder::workspace::Workspace;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let mut filter = EnvFilter::from_default_env();
    if std::env::var("RUST_LOG").is_err() {
        if let Ok(directive) = cli.log_directive().parse() {
            filter = filter.add_directive(directive);
        }
    }

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Run(args) => run_build(args, cli.config.as_deref(), cli.verbose).await,
        Commands::Detect(args) => detect(args),
        Commands::Doctor(args) => doctor(args, cli.config.as_deref()),
        Commands::Config(args) => show_config(args, cli.config.as_deref()),
    }
}

/// Fetch, detect, build and report
async fn run_build(args: RunArgs, config_path: Option<&str>, verbose: bool) -> Result<u8> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config);

    let platform = PlatformCapabilities::host();
    let workspace = Workspace::new(config.workspace_root());

    if verbose {
        eprintln!(
            "{}: {} on {}",
            "workspace".cyan(),
            workspace.root().display(),
            platform.os
        );
    }

    let fetcher: Box<dyn SourceFetcher> = if args.no_fetch {
        Box::new(LocalSource)
    } else {
        Box::new(GitFetcher::from_config(&config).with_stream(args.stream))
    };
    let runner = ProcessStepRunner::from_config(&config).with_stream(args.stream);
    let orchestrator = Orchestrator::new(platform, config.clone(), runner)
        .with_progress(!args.stream && args.format == OutputFormat::Text);
    let pipeline =
        Pipeline::new(workspace, fetcher, orchestrator).with_clean(config.workspace.clean);

    // Dropping the run on Ctrl-C kills the running tool's process group
    let run = tokio::select! {
        run = pipeline.run(&args.url, args.branch.as_deref()) => run,
        _ = tokio::signal::ctrl_c() => bail!("Interrupted"),
    };

    let options = run.report_options(pipeline.workspace().root(), config.report.tail_lines);
    let report = build_report(&run.outcome, &options);

    match args.format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Plain => println!("{}", report.summary),
        OutputFormat::Text => {
            if verbose {
                if let Some(ref project) = run.project {
                    eprintln!(
                        "{}: {}",
                        "output".cyan(),
                        project.output_dir.display()
                    );
                }
            }
            print!("{}", report.render_text());
        }
    }

    Ok(report.exit_code)
}

/// Detect the build system of a source tree
fn detect(args: DetectArgs) -> Result<u8> {
    let path = match args.path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    if !path.is_dir() {
        anyhow::bail!("Not a directory: {}", path.display());
    }

    let detection = detect_build_system(&path);

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&serde_json::json!({
                "path": path,
                "detection": detection,
            }))?;
            println!("{}", json);
        }
        OutputFormat::Plain => {
            println!("{}", detection.kind);
        }
        OutputFormat::Text => {
            println!("{}: {}", "Path".cyan(), path.display());
            if detection.kind == BuildSystemKind::Unknown {
                println!("{}: {}", "Detected".yellow(), "None");
            } else {
                println!("{}: {}", "Detected".green(), detection.kind);
            }
            if let Some(ref descriptor) = detection.descriptor {
                println!("{}: {}", "Descriptor".cyan(), descriptor);
            }

            let found = detection.files_found.names();
            println!();
            println!("{}:", "Files Found".cyan());
            if found.is_empty() {
                println!("  None");
            }
            for name in found {
                println!("  - {}", name);
            }
        }
    }

    Ok(if detection.kind == BuildSystemKind::Unknown {
        EXIT_DETECTION_FAILURE
    } else {
        EXIT_SUCCESS
    })
}

/// Check the build tools on this host
fn doctor(args: DoctorArgs, config_path: Option<&str>) -> Result<u8> {
    let config = load_config(config_path)?;
    let report = run_doctor(&config, &PlatformCapabilities::host(), &PathLocator);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => {
            for name in report.missing() {
                println!("{}", name);
            }
        }
        OutputFormat::Text => print!("{}", report.render_text()),
    }

    Ok(if report.is_healthy() {
        EXIT_SUCCESS
    } else {
        EXIT_ENVIRONMENT_FAILURE
    })
}

/// Show the resolved configuration
fn show_config(args: ConfigArgs, config_path: Option<&str>) -> Result<u8> {
    let LoadedConfig { config, sources } = LoadedConfig::load(config_path.map(Path::new))?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Plain => {
            for path in sources {
                println!("{}", path.display());
            }
        }
        OutputFormat::Text => {
            let toml = toml::to_string_pretty(&config).context("Failed to render configuration")?;
            print!("{}", toml);
        }
    }

    Ok(EXIT_SUCCESS)
}
