use anyhow::Context;
use binlog_capture::{Config, Replicator};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "binlog-capture")]
#[command(about = "Decodes a MySQL binary log into JSON change events", long_about = None)]
struct Args {
    /// Binlog file to decode, overriding `source.path` from the configuration
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,

    #[arg(long, help = "Ignore any saved checkpoint")]
    from_start: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    info!("Starting binlog-capture");

    let mut config = match (&args.config, &args.path) {
        (Some(file), _) => {
            info!("Loading configuration from {:?}", file);
            Config::from_file(file)
                .with_context(|| format!("failed to load configuration from {}", file.display()))?
        }
        (None, Some(path)) => Config::for_path(path),
        (None, None) => anyhow::bail!("either a binlog PATH or --config is required"),
    };

    if let Some(path) = args.path {
        config.source.path = path;
    }

    info!(
        source = %config.source.path.display(),
        verify_checksums = config.source.verify_checksums,
        output = ?config.output.path,
        on_error = ?config.replication.on_error,
        checkpoint_file = ?config.replication.checkpoint_file,
        "Configuration summary"
    );

    let mut replicator = Replicator::new(config).from_start(args.from_start);
    match replicator.run() {
        Ok(summary) => {
            info!(
                events = summary.events,
                rows = summary.rows,
                position = summary.last_position,
                "Decoding complete"
            );
            Ok(())
        }
        Err(e) => {
            error!("Decoding failed: {}", e);
            Err(e.into())
        }
    }
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("binlog_capture=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("binlog_capture=info"))
    };

    // Logs go to stderr so stdout stays free for change events.
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
