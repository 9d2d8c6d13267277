use clap::{Parser, Subcommand};
use impressions::config::{self, SiteConfig};
use impressions::discover::DiscoveryEvent;
use impressions::memo::{FileStore, Memo, MemoPolicy, SystemClock};
use impressions::session::Session;
use impressions::site::{self, SiteRoot};
use impressions::{generate, logging, output, pattern, probe, scan};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

/// Shared flags for commands that discover images.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Ignore the memo file: probe everything again and keep results in memory only
    #[arg(long)]
    no_cache: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("IMPRESSIONS_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("IMPRESSIONS_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "impressions")]
#[command(about = "Discover a site's banner images and generate the banner markup")]
#[command(long_about = "\
Discover a site's banner images and generate the banner markup

Images are found by probing predictable names under a base directory,
for increasing indices, until the sequence ends:

  assets/img/impressions/
  ├── impression-1.webp        # templates: impression-{i}, {i}
  ├── impression-2.webp        # extensions: jpg, jpeg, png, webp
  └── impression-3.webp        # stops after 4 misses in a row

  assets/img/galleries/
  ├── manifest.json            # optional: { \"galleries\": [ { \"id\": ... } ] }
  └── coast/
      ├── 1.jpg
      └── 2.jpg

The site can be a local directory or an http(s) URL. Results are memoized
in --cache-dir for a week (ten minutes when nothing was found).

Run 'impressions gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site root: a directory or an http(s) URL
    #[arg(long, default_value = ".", global = true)]
    site: String,

    /// Output directory for generated markup
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory holding the memo file
    #[arg(long, default_value = ".impressions-cache", global = true)]
    cache_dir: PathBuf,

    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover banner images and list them
    Discover(CacheArgs),
    /// Resolve every gallery of the manifest and list them
    Galleries(CacheArgs),
    /// Discover everything and write the markup to --output
    Build(CacheArgs),
    /// Compare a local site's banner directory with what discovery finds
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config_dir)?;
    let root = SiteRoot::parse(&cli.site)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match &cli.command {
        Command::Discover(cache_args) => {
            let (tx, printer) = progress_printer(cli.verbose);
            let mut session = open_session(&cli, root, config, cache_args.no_cache, tx)?;
            println!("==> Discovering on {}", session.root().display());
            let images = runtime.block_on(session.banner_images());
            let stats = session.stats().clone();
            drop(session);
            finish_printer(printer);
            output::print_discovery_output("Banner", &images);
            println!("Memo: {}", stats);
        }
        Command::Galleries(cache_args) => {
            let base = config.galleries.base.clone();
            let (tx, printer) = progress_printer(cli.verbose);
            let mut session = open_session(&cli, root, config, cache_args.no_cache, tx)?;
            let galleries = runtime.block_on(session.galleries());
            let stats = session.stats().clone();
            drop(session);
            finish_printer(printer);
            output::print_galleries_output(&galleries, &base);
            println!("Memo: {}", stats);
        }
        Command::Build(cache_args) => {
            let (tx, printer) = progress_printer(cli.verbose);
            let mut session = open_session(&cli, root, config, cache_args.no_cache, tx)?;

            println!("==> Discovering on {}", session.root().display());
            let banner = runtime.block_on(session.banner_images());
            let galleries = runtime.block_on(session.galleries());
            let stats = session.stats().clone();
            let config = session.config().clone();
            drop(session);
            finish_printer(printer);
            println!("Memo: {}", stats);

            println!("==> Generating markup → {}", cli.output.display());
            let summary = generate::generate(&cli.output, &banner, &galleries, &config)?;
            output::print_generate_output(&summary);
        }
        Command::Check => {
            let SiteRoot::Dir(dir) = &root else {
                return Err("check needs a local site directory".into());
            };
            let dir = dir.clone();
            let base = site::normalize_base(&config.discovery.base);
            let templates = pattern::parse_templates(&config.discovery.templates)?;
            let extensions = config.discovery.extensions.clone();

            println!("==> Checking {}", dir.join(&base).display());
            let mut session = open_session(&cli, root, config, true, None)?;
            let images = runtime.block_on(session.banner_images());
            let assets = scan::scan_assets(&dir.join(&base), &templates, &extensions)?;
            let report = scan::audit(&assets, &images, &base);
            output::print_audit_output(&report, &base);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn open_session(
    cli: &Cli,
    root: SiteRoot,
    config: SiteConfig,
    no_cache: bool,
    progress: Option<Sender<DiscoveryEvent>>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let memo = open_memo(&cli.cache_dir, &config, no_cache);
    let prober = probe::prober_for(&root, &config.probe);
    let session = Session::new(root, config, prober, memo)?;
    Ok(match progress {
        Some(tx) => session.with_progress(tx),
        None => session,
    })
}

fn open_memo(cache_dir: &Path, config: &SiteConfig, no_cache: bool) -> Memo {
    let policy = MemoPolicy::from_config(&config.memo);
    if no_cache {
        Memo::in_memory(policy)
    } else {
        Memo::new(
            Box::new(FileStore::open(cache_dir)),
            Box::new(SystemClock),
            policy,
        )
    }
}

/// With `-v`, print discovery progress as it happens.
fn progress_printer(verbose: u8) -> (Option<Sender<DiscoveryEvent>>, Option<JoinHandle<()>>) {
    if verbose == 0 {
        return (None, None);
    }
    let (tx, rx) = mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_discovery_event(&event);
        }
    });
    (Some(tx), Some(printer))
}

fn finish_printer(printer: Option<JoinHandle<()>>) {
    if let Some(printer) = printer {
        let _ = printer.join();
    }
}
