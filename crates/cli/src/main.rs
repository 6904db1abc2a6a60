use crate::{
    commands::{Commands, StateCommand},
    env::{EnvManager, STRUCTR_PASSWORD, STRUCTR_URL, STRUCTR_USER},
    error::CliError,
};
use clap::Parser;
use connectors::{file::json::source::JsonFileTransport, rest::RestTransport, transport::Transport};
use model::pagination::{
    filter::{FilterControl, FilterValue},
    sort::SortOrder,
};
use pager_core::{
    pager::{Pager, PagerConfig},
    state::{
        paging::{DEFAULT_NAMESPACE, PagingStateStore},
        sled_store::SledBackend,
    },
};
use serde_json::Value;
use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod env;
mod error;
mod output;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "pager", version = "0.1.0", about = "Page through remote collections")]
struct Cli {
    #[arg(long, global = true, help = "Directory holding the stored view state")]
    state_dir: Option<String>,

    #[arg(long, global = true, help = "Env file to load instead of ./.env")]
    env_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// What `pager list` asks the pager to change before fetching.
struct ListRequest {
    page: Option<String>,
    page_size: Option<String>,
    sort: Option<String>,
    order: Option<SortOrder>,
    filters: Vec<String>,
    exact: Vec<String>,
    clear_filters: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut env = EnvManager::new();
    match &cli.env_file {
        Some(path) => env.load_from_file(path)?,
        None => {
            if env.load_if_present(".env")? {
                debug!("Loaded .env");
            }
        }
    }

    let state_dir = env.state_dir(cli.state_dir.as_deref())?;

    match cli.command {
        Commands::List {
            collection_type,
            id,
            url,
            file,
            page,
            page_size,
            sort,
            order,
            filters,
            exact,
            clear_filters,
            columns,
            json,
        } => {
            let transport = open_transport(&env, url, file)?;
            let store = open_state_store(&state_dir)?;
            let id = id.unwrap_or_else(|| collection_type.clone());
            let request = ListRequest {
                page,
                page_size,
                sort,
                order,
                filters,
                exact,
                clear_filters,
            };
            list(&id, &collection_type, transport, store, request, columns, json).await?;
        }
        Commands::State { command } => {
            let store = open_state_store(&state_dir)?;
            match command {
                StateCommand::List => {
                    let ids = store.ids()?;
                    output::print_ids(store.namespace(), &ids);
                }
                StateCommand::Show { id } => {
                    let record = store.load(&id)?;
                    output::print_record(&id, record.as_ref())?;
                }
                StateCommand::Clear { id } => {
                    store.forget(&id)?;
                    info!(pager_id = %id, "Cleared stored pager state");
                }
            }
        }
    }

    Ok(())
}

fn open_transport(
    env: &EnvManager,
    url: Option<String>,
    file: Option<String>,
) -> Result<Arc<dyn Transport>, CliError> {
    if let Some(path) = file {
        return Ok(Arc::new(JsonFileTransport::open(&path)?));
    }

    let url = url
        .or_else(|| env.get(STRUCTR_URL).map(String::from))
        .ok_or_else(|| {
            CliError::Config(format!("No data source: pass --url or --file, or set {STRUCTR_URL}"))
        })?;

    let mut transport = RestTransport::new(url.as_str());
    if let Some((user, password)) = env.credentials() {
        debug!(
            user = env.display_value(STRUCTR_USER).as_deref(),
            password = env.display_value(STRUCTR_PASSWORD).as_deref(),
            "Using REST credentials"
        );
        transport = transport.with_credentials(user, password);
    }
    Ok(Arc::new(transport))
}

fn open_state_store(dir: &Path) -> Result<Arc<PagingStateStore>, CliError> {
    std::fs::create_dir_all(dir)?;
    let backend = SledBackend::open(dir)?;
    Ok(Arc::new(PagingStateStore::new(
        DEFAULT_NAMESPACE,
        Arc::new(backend),
    )))
}

async fn list(
    id: &str,
    collection_type: &str,
    transport: Arc<dyn Transport>,
    store: Arc<PagingStateStore>,
    request: ListRequest,
    columns: Option<String>,
    as_json: bool,
) -> Result<(), CliError> {
    let items: Arc<Mutex<Vec<Value>>> = Arc::default();
    let sink = items.clone();

    // Paused while the requested changes are applied, so they cost one fetch
    let config = PagerConfig {
        start_paused: true,
        fetch_timeout: Some(FETCH_TIMEOUT),
        ..PagerConfig::default()
    };
    let mut pager = Pager::new(id, collection_type, transport, store, config).with_consumer(
        move |page: &[Value]| {
            if let Ok(mut items) = sink.lock() {
                *items = page.to_vec();
            }
        },
    );

    apply_filters(&mut pager, &request).await?;
    apply_sort(&mut pager, request.sort.as_deref(), request.order).await?;
    if let Some(size) = &request.page_size {
        pager.set_page_size_input(size).await?;
    }
    if let Some(page) = &request.page {
        pager.set_page_input(page).await?;
    }

    pager.set_is_paused(false);
    let outcome = pager.refresh().await?;
    let Some(summary) = outcome.summary() else {
        return Err(CliError::Unexpected(format!(
            "Pager returned {outcome:?} instead of a page"
        )));
    };

    let items = items
        .lock()
        .map(|items| items.clone())
        .map_err(|_| CliError::Unexpected("Result buffer lock poisoned".into()))?;

    if as_json {
        output::print_page_json(pager.state(), summary, &items)?;
    } else {
        output::print_page_table(pager.state(), summary, &items, columns.as_deref());
    }
    Ok(())
}

/// `--filter` declares the complete filter set; stored filters it does not
/// name are pruned.
async fn apply_filters(pager: &mut Pager, request: &ListRequest) -> Result<(), CliError> {
    if request.filters.is_empty() && !request.clear_filters {
        return Ok(());
    }

    let parsed = request
        .filters
        .iter()
        .map(String::as_str)
        .map(parse_filter)
        .collect::<Result<Vec<_>, _>>()?;

    let controls: Vec<FilterControl> = parsed
        .iter()
        .map(|(attribute, value)| {
            let control = match value {
                FilterValue::Bool(_) => FilterControl::boolean(attribute.as_str()),
                _ => FilterControl::text(attribute.as_str()),
            };
            if request.exact.contains(attribute) {
                control.exact()
            } else {
                control
            }
        })
        .collect();

    let activation = pager.activate_filter_elements(&controls).await?;
    if !activation.pruned.is_empty() {
        info!(removed = ?activation.pruned, "Dropped stored filters");
    }

    for (attribute, value) in parsed {
        pager.set_filter(&attribute, value).await?;
    }
    Ok(())
}

async fn apply_sort(
    pager: &mut Pager,
    sort: Option<&str>,
    order: Option<SortOrder>,
) -> Result<(), CliError> {
    if let Some(key) = sort {
        if pager.state().sort_key != key {
            pager.set_sort_key(key).await?;
        }
    }
    if let Some(order) = order {
        if pager.state().sort_order != order {
            let key = pager.state().sort_key.clone();
            let outcome = pager.set_sort_key(&key).await?;
            debug!(?outcome, "Sort order flipped");
        }
    }
    Ok(())
}

fn parse_filter(raw: &str) -> Result<(String, FilterValue), CliError> {
    match raw.split_once('=') {
        Some((attribute, value)) if !attribute.trim().is_empty() => Ok((
            attribute.trim().to_string(),
            FilterValue::parse_loose(value.trim()),
        )),
        _ => Err(CliError::InvalidArgument(format!(
            "filter '{raw}' is not of the form ATTR=VALUE"
        ))),
    }
}
