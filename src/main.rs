mod config;
mod contact;
mod controller;
mod dates;
mod formats;
mod languages;
mod logging;
mod model;
mod proxy;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, warn};

use config::{ConfigStore, Settings};
use controller::{AppContext, Controller, StartupOptions};
use formats::FormatRegistry;
use languages::{LanguageCatalog, SystemLocale};
use logging::LogTarget;
use model::{ContactModel, ViewMode};

const LANGUAGE_TABLE_FILE: &str = "iso639-1.utf8";

#[derive(Parser, Debug)]
#[command(name = "doublecontact", version, about = "Two-panel contact list editor")]
struct Cli {
    /// Start with a sample list instead of opening files
    #[arg(short = 'd', default_value_t = false)]
    test_data: bool,

    /// Do not open any list at startup
    #[arg(short = 'q', default_value_t = false)]
    quiet: bool,

    /// Settings file to use instead of the standard location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Tab-separated language table (code, English name, native name)
    #[arg(long, global = true, value_name = "PATH")]
    languages: Option<PathBuf>,

    /// trace, debug, info, warning or error
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Lists for the left and right panels
    #[arg(value_name = "FILE", num_args = 0..=2)]
    files: Vec<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two contact lists and print the matched records
    Compare(CompareArgs),
    /// Print the language catalog
    Languages,
}

#[derive(Args, Debug)]
struct CompareArgs {
    left: PathBuf,
    right: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_target = if cli.command.is_some() {
        LogTarget::Stderr
    } else {
        LogTarget::File(logging::default_log_file())
    };
    logging::init(&cli.log_level, &log_target)?;

    let mut ctx = build_context(&cli);

    if let Some(command) = cli.command {
        match command {
            Command::Compare(args) => handle_compare(args, &ctx)?,
            Command::Languages => handle_languages(&ctx),
        }
        return Ok(());
    }

    let options = StartupOptions {
        test_data: cli.test_data,
        quiet: cli.quiet,
        files: cli.files,
    };
    let mut controller = Controller::new(&ctx);
    let messages = controller.startup(&ctx, &options);

    let mut app = ui::app::App::new(&mut ctx, controller);
    app.show_startup_messages(messages);
    app.run()?;

    Ok(())
}

fn build_context(cli: &Cli) -> AppContext {
    let locale = SystemLocale::detect();
    let store = match cli.config.as_deref() {
        Some(path) => ConfigStore::at(path, locale.clone()),
        None => ConfigStore::prepare(&languages::executable_dir(), locale.clone()),
    };
    debug!(path = ?store.path(), "settings store");

    let mut settings = Settings::defaults_for(&locale);
    store.read(&mut settings);
    settings.update_formats(&locale);

    let table = cli
        .languages
        .clone()
        .unwrap_or_else(|| languages::translations_dir().join(LANGUAGE_TABLE_FILE));
    let mut catalog = LanguageCatalog::new();
    if let Err(err) = catalog.load(&table) {
        warn!(error = %err, "language table not loaded");
    }

    let registry = FormatRegistry::new(store.csv_config().unwrap_or_default());

    AppContext {
        settings,
        store,
        languages: catalog,
        registry,
    }
}

fn handle_compare(args: CompareArgs, ctx: &AppContext) -> Result<()> {
    let mut left = ContactModel::new(&ctx.settings.columns);
    let mut right = ContactModel::new(&ctx.settings.columns);
    for warning in left
        .open(&args.left, &ctx.registry, &ctx.settings)
        .with_context(|| format!("failed to open {}", args.left.display()))?
    {
        eprintln!("warning: {}", warning);
    }
    for warning in right
        .open(&args.right, &ctx.registry, &ctx.settings)
        .with_context(|| format!("failed to open {}", args.right.display()))?
    {
        eprintln!("warning: {}", warning);
    }

    left.set_view_mode(ViewMode::CompareMain, &mut right);

    let mut pairs = 0usize;
    for item in left.items() {
        let Some(other) = item.pair_index().and_then(|j| right.item(j)) else {
            continue;
        };
        pairs += 1;
        println!("{}\t{}", item.visible_name(), other.visible_name());
    }
    println!(
        "{} pair(s); {} unmatched on the left, {} on the right",
        pairs,
        left.row_count() - pairs,
        right.row_count() - pairs
    );
    Ok(())
}

fn handle_languages(ctx: &AppContext) {
    if ctx.languages.is_empty() {
        println!("No languages loaded");
        return;
    }
    for name in ctx.languages.native_names() {
        println!("{}\t{}", ctx.languages.native_name_to_code(&name), name);
    }
}
