use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use teampick_api::InProcCatalog;
use teampick_filter::{build_catalog_filter, kind_restricted};
use teampick_picker::{
    normalize_input, option_label, AutocompleteEvent, CommitReason, FieldChange, FieldProps, LoadState,
    PickerOptions, TeamPickerField,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "teampickctl", version, about = "Team picker CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Picker ui:options as a JSON object
    #[arg(long = "ui-options", global = true)]
    ui_options: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the catalog filter built from ui:options and the query actually fetched
    Filter,
    /// Load the picker against a catalog file and list its options
    Options {
        /// Entity file (JSON or YAML)
        #[arg(long = "catalog", env = "TEAMPICK_CATALOG")]
        catalog: PathBuf,
        /// Rank options against this typed input
        #[arg(long = "query")]
        query: Option<String>,
        #[arg(long = "limit")]
        limit: Option<usize>,
    },
    /// Simulate one picker interaction and print the emitted changes
    Pick {
        #[arg(long = "catalog", env = "TEAMPICK_CATALOG")]
        catalog: PathBuf,
        /// Value already stored in the form
        #[arg(long = "value")]
        value: Option<String>,
        /// Select the option with this reference from the list
        #[arg(long = "select", conflicts_with_all = ["text", "clear"])]
        select: Option<String>,
        /// Type free text and blur the input
        #[arg(long = "type", conflicts_with = "clear")]
        text: Option<String>,
        /// Confirm typed text with "create option" instead of blur
        #[arg(long = "create", action = ArgAction::SetTrue, requires = "text")]
        create: bool,
        /// Clear the selection
        #[arg(long = "clear", action = ArgAction::SetTrue)]
        clear: bool,
    },
    /// Render the display label for a stored value
    Label {
        value: String,
        /// Namespace applied when normalizing the value (overrides ui:options)
        #[arg(long = "default-namespace")]
        default_namespace: Option<String>,
    },
}

fn init_tracing() {
    let env = std::env::var("TEAMPICK_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("TEAMPICK_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid TEAMPICK_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_timeout() -> Duration {
    let ms = std::env::var("TEAMPICK_LOAD_TIMEOUT_MS").ok().and_then(|s| s.parse::<u64>().ok()).unwrap_or(5000);
    Duration::from_millis(ms)
}

fn parse_options(raw: Option<&str>) -> Result<PickerOptions> {
    match raw {
        None => Ok(PickerOptions::default()),
        Some(s) => {
            let v: serde_json::Value = serde_json::from_str(s)?;
            Ok(PickerOptions::from_value(&v)?)
        }
    }
}

/// Mount a picker over the catalog file and wait for its load.
async fn mount_loaded(
    catalog: &Path,
    options: PickerOptions,
    stored: Option<String>,
) -> Result<(TeamPickerField, mpsc::UnboundedReceiver<FieldChange>)> {
    let api = Arc::new(InProcCatalog::from_path(catalog)?);
    let (tx, rx) = mpsc::unbounded_channel();
    let props = FieldProps { id: "cli".into(), form_data: stored, ui_options: options, ..Default::default() };
    let mut field = TeamPickerField::mount(api, props, tx);
    let timeout = load_timeout();
    match tokio::time::timeout(timeout, field.loaded()).await {
        Ok(LoadState::Failed(e)) => bail!("catalog load failed: {}", e),
        Ok(_) => {}
        Err(_) => bail!("catalog load did not finish within {} ms", timeout.as_millis()),
    }
    Ok((field, rx))
}

fn with_default_namespace(mut options: PickerOptions, namespace: Option<String>) -> PickerOptions {
    if namespace.is_some() {
        options.default_namespace = namespace;
    }
    options
}

fn print_change(output: Output, c: &FieldChange) {
    match output {
        Output::Human => match c {
            FieldChange::Set(v) => println!("set {}", v),
            FieldChange::Cleared => println!("cleared"),
        },
        Output::Json => println!("{}", serde_json::json!({ "value": c.value() })),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let options = parse_options(cli.ui_options.as_deref())?;

    match cli.command {
        Commands::Filter => {
            let built = build_catalog_filter(options.catalog_filter.as_ref());
            let fetched = kind_restricted(built.clone(), &[options.kind().to_string()]);
            match cli.output {
                Output::Human => {
                    match &built {
                        Some(b) => println!("filter: {}", serde_json::to_string(b)?),
                        None => println!("filter: (none)"),
                    }
                    println!("query:  {}", serde_json::to_string(&fetched)?);
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "filter": built, "query": fetched }))?),
            }
        }
        Commands::Options { catalog, query, limit } => {
            let (field, mut rx) = mount_loaded(&catalog, options, None).await?;
            let items = field.suggestions(query.as_deref().unwrap_or(""), limit);
            info!(options = items.len(), "options ready");
            match cli.output {
                Output::Human => {
                    for it in &items {
                        match &it.title {
                            Some(t) => println!("{} • {} • {}", it.label, it.value, t),
                            None => println!("{} • {}", it.label, it.value),
                        }
                    }
                }
                Output::Json => {
                    let rows: Vec<serde_json::Value> = items
                        .iter()
                        .map(|it| serde_json::json!({ "label": it.label, "value": it.value, "title": it.title }))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
            }
            while let Ok(c) = rx.try_recv() {
                println!("auto-selected: {}", c.value().unwrap_or(""));
            }
        }
        Commands::Pick { catalog, value, select, text, create, clear } => {
            let (mut field, mut rx) = mount_loaded(&catalog, options.clone(), value).await?;
            let event = if let Some(reference) = select {
                let wanted = normalize_input(&reference, &options).into_value();
                let entity = field
                    .state()
                    .entities()
                    .iter()
                    .find(|e| e.entity_ref().stringify() == wanted)
                    .cloned()
                    .ok_or_else(|| anyhow!("{} is not among the picker's options", wanted))?;
                Some(AutocompleteEvent::Selected(Some(entity)))
            } else if let Some(text) = text {
                let reason = if create { CommitReason::CreateOption } else { CommitReason::Blur };
                Some(AutocompleteEvent::InputCommitted { text, reason })
            } else if clear {
                Some(AutocompleteEvent::Selected(None))
            } else {
                None
            };
            if let Some(ev) = event {
                if field.is_disabled() {
                    warn!("single option was auto-selected; the field is read-only");
                }
                field.handle(ev);
            }
            let mut emitted = 0usize;
            while let Ok(c) = rx.try_recv() {
                print_change(cli.output, &c);
                emitted += 1;
            }
            if emitted == 0 && cli.output == Output::Human {
                println!("no change");
            }
        }
        Commands::Label { value, default_namespace } => {
            let options = with_default_namespace(options, default_namespace);
            let label = option_label(&value, &options);
            let normalized = normalize_input(&value, &options);
            let parsed = normalized.is_parsed();
            match cli.output {
                Output::Human => println!("{}", label),
                Output::Json => println!(
                    "{}",
                    serde_json::json!({ "label": label, "reference": parsed, "value": normalized.into_value() })
                ),
            }
        }
    }
    Ok(())
}
