mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use sv_av::ToolRegistry;
use sv_core::config::Config;
use sv_pipeline::{AssemblyPipeline, PipelineSettings, Submission};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults based on the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "slopvid=trace,sv_core=debug,sv_av=trace,sv_pipeline=trace,sv_server=debug,tower_http=debug"
                .to_string()
        } else {
            "slopvid=info,sv_core=info,sv_av=info,sv_pipeline=info,sv_server=info,tower_http=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Assemble {
            metadata,
            images,
            audio,
            output,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(assemble(
                cli.config.as_deref(),
                &metadata,
                &images,
                &audio,
                output,
            ))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("slopvid {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load_or_default(config_path);

    // Override host/port from CLI if specified.
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting slopvid server");
    sv_server::start(config).await?;
    Ok(())
}

async fn assemble(
    config_path: Option<&Path>,
    metadata: &Path,
    images: &[PathBuf],
    audio: &[PathBuf],
    output: Option<PathBuf>,
) -> Result<()> {
    let config = match config_path {
        Some(p) => Config::load(p).with_context(|| format!("loading config {}", p.display()))?,
        None => Config::default(),
    };

    let submission = Submission {
        metadata: tokio::fs::read_to_string(metadata)
            .await
            .with_context(|| format!("reading metadata {}", metadata.display()))?,
        images: read_all(images).await?,
        audio: read_all(audio).await?,
    };

    let tools = ToolRegistry::discover(&config.tools);
    let engine = sv_server::build_engine(&config, &tools);
    let pipeline = AssemblyPipeline::new(engine, PipelineSettings::from(&config.assembly));

    let result = pipeline
        .run(submission)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;

    let output = output.unwrap_or_else(|| {
        PathBuf::from(sv_server::outcome::todays_filename(&config.assembly.filename_prefix))
    });
    tokio::fs::write(&output, &result.artifact)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Wrote {} ({:.2}s, {} bytes)",
        output.display(),
        result.duration_seconds,
        result.size_bytes
    );
    Ok(())
}

async fn read_all(paths: &[PathBuf]) -> Result<Vec<bytes::Bytes>> {
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        out.push(bytes::Bytes::from(data));
    }
    Ok(out)
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. ffmpeg is required to assemble videos.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let config = Config::load(p).with_context(|| format!("loading config {}", p.display()))?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!(
        "  Upload ceiling: {} bytes",
        config.assembly.max_upload_bytes
    );
    println!("  Deadline: {}s", config.assembly.timeout_secs);
    println!(
        "  Encoding: {} preset={} crf={}",
        config.encoding.video_codec, config.encoding.preset, config.encoding.crf
    );

    for warning in config.validate() {
        println!("  ⚠ {warning}");
    }

    Ok(())
}
