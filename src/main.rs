use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cellfinder::cache::CategoryCache;
use cellfinder::datatype::DataItem;
use cellfinder::finder::ResultFieldMatchFinder;
use cellfinder::persist::SqliteStore;
use cellfinder::settings::Settings;
use cellfinder::Result;

fn init_tracing(filter: &str) {
    let filter = EnvFilter::from_str(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

// Resolves every configured column for every configured subject and prints
// one tab separated line per subject.
fn run() -> Result<()> {
    let path = std::env::args().nth(1);
    let settings = Settings::load(path.as_deref())?;
    init_tracing(&settings.log.filter);

    let registry = settings.registry()?;
    let requests = settings.print_requests(&registry)?;
    let store = SqliteStore::new(settings.database.existing_file()?)?;
    let finder = ResultFieldMatchFinder::with_cache(
        &store,
        Arc::new(CategoryCache::new(settings.cache.capacity)),
    );
    info!(
        columns = requests.len(),
        subjects = settings.subjects.len(),
        "resolving result cells"
    );

    let header: Vec<String> = requests.iter().map(|r| r.to_string()).collect();
    println!("{}", header.join("\t"));
    for title in &settings.subjects {
        let subject = DataItem::page(title);
        let mut row = Vec::with_capacity(requests.len());
        for request in &requests {
            let cell = finder.results_for(&subject, request)?;
            debug!(subject = %subject, column = %request, values = cell.len(), "cell");
            let rendered: Vec<String> = cell.iter().map(|v| v.to_string()).collect();
            row.push(rendered.join(", "));
        }
        println!("{}", row.join("\t"));
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("cellfinder: {}", e);
        std::process::exit(1);
    }
}
