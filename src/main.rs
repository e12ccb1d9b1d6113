use clap::{Parser, Subcommand};
use horoscope_cards::cache::{CacheError, CacheStore, JsonStore, MemoryStore};
use horoscope_cards::config::{self, AppConfig};
use horoscope_cards::dates::{format_display_date, today_in};
use horoscope_cards::fetch::{Fetcher, SnapshotFetcher};
use horoscope_cards::imaging::{Compositor, FontLibrary};
use horoscope_cards::output;
use horoscope_cards::resolve::Resolver;
use horoscope_cards::translate::NoopTranslator;
use horoscope_cards::types::Language;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where readings come from when the cache can't answer.
#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Display date to resolve, e.g. "15 March 2026" (default: today)
    #[arg(long)]
    date: Option<String>,

    /// Language of the readings
    #[arg(long, default_value = "en")]
    lang: Language,

    /// Day offset to fetch on a cache miss (0 = today, 1 = tomorrow, -1 = yesterday)
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<i32>,

    /// JSON snapshot of source readings, keyed by day offset
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(clap::Args, Clone)]
struct LangArgs {
    /// Language namespace to operate on
    #[arg(long, default_value = "en")]
    lang: Language,
}

#[derive(Parser)]
#[command(name = "horoscope-cards")]
#[command(about = "Daily horoscope readings rendered as shareable cards")]
#[command(long_about = "\
Daily horoscope readings rendered as shareable cards

Readings for all twelve signs are resolved from the cache first, then by
translating cached English, and finally by fetching from the source when
an --offset is given. Each pair of readings becomes one 1080x1080 JPEG.

Assets layout:

  assets/
  ├── fonts/                              # Font files (also looked up in assets/)
  ├── final-template-without-para-date/   # Template 1
  │   ├── zodiac_sign_template_page-0001.jpg
  │   └── ...
  └── Template-2/                         # Template 2
      ├── 1.jpg
      └── ...

Missing backgrounds render on a plain dark canvas.

Run 'horoscope-cards gen-config' to generate a documented horoscope.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./horoscope.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep the cache in memory for this run only
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a day's readings and print them
    Fetch(SourceArgs),
    /// Resolve a day's readings and render them as cards
    Render {
        #[command(flatten)]
        source: SourceArgs,
        /// Template id (see `templates`)
        #[arg(long)]
        template: Option<String>,
    },
    /// Print the date the source reports for a day offset
    Probe {
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i32,
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// List cached dates
    Dates(LangArgs),
    /// Delete cached records older than the retention window
    Purge(LangArgs),
    /// List available card templates
    Templates,
    /// Print a stock horoscope.toml with all options documented
    GenConfig,
}

/// The cache backing this run.
enum Store {
    Json(JsonStore),
    Memory(MemoryStore),
}

impl Store {
    fn open(config: &AppConfig, no_cache: bool) -> Result<Self, CacheError> {
        if no_cache {
            return Ok(Store::Memory(MemoryStore::new()));
        }
        Ok(Store::Json(JsonStore::open(&config.cache_dir)?))
    }

    fn as_dyn(&mut self) -> &mut dyn CacheStore {
        match self {
            Store::Json(store) => store,
            Store::Memory(store) => store,
        }
    }

    fn close(self) -> Result<(), CacheError> {
        match self {
            Store::Json(store) => store.close(),
            Store::Memory(_) => Ok(()),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Command::Templates => {
            output::print_templates();
            return Ok(());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        _ => {}
    }

    let cwd = std::env::current_dir()?;
    let app = config::load_config(&cwd, cli.config.as_deref())?;
    let settings = app.resolver_settings()?;
    let mut store = Store::open(&app, cli.no_cache)?;
    let translator = NoopTranslator;

    match cli.command {
        Command::Fetch(args) => {
            let (date, fetcher) = source_for(&args, &app)?;
            let mut resolver = Resolver::new(store.as_dyn(), fetcher, &translator, settings);
            let resolved = resolver.resolve(&date, args.lang, args.offset)?;
            output::print_resolved(&resolved, resolver.stats());
        }
        Command::Render { source, template } => {
            let (date, fetcher) = source_for(&source, &app)?;
            let mut resolver = Resolver::new(store.as_dyn(), fetcher, &translator, settings);
            let resolved = resolver.resolve(&date, source.lang, source.offset)?;
            output::print_resolved(&resolved, resolver.stats());

            let fonts = FontLibrary::load(
                &app.assets_dir,
                &app.fonts.date,
                &app.fonts.body,
                &app.fonts.fallback,
            )?;
            let template_id = template.as_deref().unwrap_or(&app.default_template);
            let compositor = Compositor::new(&fonts, &app.assets_dir, app.layout.style());
            let cards = compositor.render(
                resolved.readings.readings(),
                &resolved.date,
                template_id,
                &app.output_dir,
            )?;
            output::print_cards(&cards);
        }
        Command::Probe { offset, snapshot } => {
            let fetcher: Arc<dyn Fetcher> = Arc::new(SnapshotFetcher::load(&snapshot)?);
            let resolver = Resolver::new(store.as_dyn(), fetcher, &translator, settings);
            println!("{}", resolver.probe_date(offset)?);
        }
        Command::Dates(args) => {
            let mut resolver = Resolver::new(
                store.as_dyn(),
                Arc::new(SnapshotFetcher::default()),
                &translator,
                settings,
            );
            let dates = resolver.available_dates(args.lang);
            output::print_dates(args.lang, &dates);
        }
        Command::Purge(args) => {
            let mut resolver = Resolver::new(
                store.as_dyn(),
                Arc::new(SnapshotFetcher::default()),
                &translator,
                settings,
            );
            let removed = resolver.purge_now(args.lang)?;
            println!("{}", output::format_purge(args.lang, removed));
        }
        Command::Templates | Command::GenConfig => unreachable!("handled before config load"),
    }

    store.close()?;
    Ok(())
}

/// Target date and fetcher for a resolve command.
///
/// Fetching needs a snapshot; without one only the cache can answer.
fn source_for(
    args: &SourceArgs,
    app: &AppConfig,
) -> Result<(String, Arc<dyn Fetcher>), Box<dyn std::error::Error>> {
    let date = match &args.date {
        Some(date) => date.clone(),
        None => format_display_date(today_in(app.cache.tz()?)),
    };
    let fetcher: Arc<dyn Fetcher> = match (&args.snapshot, args.offset) {
        (Some(path), _) => Arc::new(load_snapshot(path)?),
        (None, Some(_)) => return Err("--offset needs a --snapshot to fetch from".into()),
        (None, None) => Arc::new(SnapshotFetcher::default()),
    };
    Ok((date, fetcher))
}

fn load_snapshot(path: &Path) -> Result<SnapshotFetcher, Box<dyn std::error::Error>> {
    let snapshot = SnapshotFetcher::load(path)?;
    tracing::info!(
        path = %path.display(),
        offsets = ?snapshot.offsets().collect::<Vec<_>>(),
        "loaded source snapshot"
    );
    Ok(snapshot)
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default `info` level.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("horoscope_cards=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
