use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config_center::client::ConfigClient;
use config_center::config::AppConfig;
use config_center::dashboard::Dashboard;
use config_center::models::PanelView;
use config_center::notify::ConsoleNotifier;
use config_center::store::FileStore;

#[derive(Parser)]
#[command(name = "ccenter")]
#[command(about = "Browse, annotate and hand-edit remote configuration modules")]
struct Cli {
    /// Service base URL (overrides config file and CONFIG_CENTER_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Locale used to order panels of equal size
    #[arg(long, global = true)]
    locale: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List panels in display order
    List {
        /// Only show panels whose name, path or tags contain this text
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Print a module's content
    Show {
        module: String,
        /// Show the raw text instead of the structured value
        #[arg(long)]
        raw: bool,
        /// Render structured values in the secondary format instead of JSON
        #[arg(long)]
        secondary: bool,
        /// Print highlighted markup
        #[arg(long)]
        markup: bool,
    },
    /// Replace a module's raw text and save it
    Edit {
        module: String,
        /// Read the new text from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print or set the local note of a module
    Note {
        module: String,
        /// New note text; an empty string removes the note
        text: Option<String>,
    },
    /// Move a panel to a position and remember the order
    Move { module: String, index: usize },
    /// Forget the remembered panel order
    ResetLayout,
    /// Ask the service to discover new modules
    Scan,
    /// Register a module by name and config file path
    Register { name: String, path: String },
    /// Print the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

/// Initialize tracing on stderr so stdout carries only command output
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "config_center=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_dashboard(config: &AppConfig) -> anyhow::Result<Dashboard> {
    let store = FileStore::open(&config.state_dir()).context("Failed to open local state")?;
    let api = Arc::new(ConfigClient::new(
        config.server_url.clone(),
        std::env::var("CONFIG_CENTER_API_KEY").ok(),
    ));
    tracing::debug!(store = %store.path().display(), server = api.base_url(), "opening dashboard");
    Ok(Dashboard::new(
        api,
        Box::new(store),
        Arc::new(ConsoleNotifier),
        config.dashboard_settings(),
    ))
}

fn print_panels(panels: &[PanelView]) {
    if panels.is_empty() {
        println!("No modules.");
        return;
    }
    for (i, panel) in panels.iter().enumerate() {
        let length = panel
            .length
            .map_or_else(|| "?".to_string(), |l| l.to_string());
        println!(
            "{:>3}  {:<24} {:>8}  [{}]  {}",
            i,
            panel.name,
            length,
            panel.tags.join(", "),
            panel.path
        );
        if !panel.note.is_empty() {
            println!("       note: {}", panel.note);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = AppConfig::load();
    if let Some(url) = cli.url {
        config.server_url = url;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }

    match cli.command {
        Some(Commands::List { query }) => {
            let dashboard = open_dashboard(&config)?;
            let mut panels = dashboard.bootstrap().await;
            if let Some(query) = query {
                panels = dashboard.set_query(&query).await;
            }
            print_panels(&panels);
        }
        Some(Commands::Show {
            module,
            raw,
            secondary,
            markup,
        }) => {
            config.view_json = !secondary;
            config.highlight = markup;
            let dashboard = open_dashboard(&config)?;
            let content = dashboard.set_raw(&module, raw).await;
            if content.is_failed() {
                anyhow::bail!("{}: {}", module, content.as_str());
            }
            println!("{}", content.as_str());
        }
        Some(Commands::Edit { module, file }) => {
            config.autosave = false;
            let dashboard = open_dashboard(&config)?;
            let current = dashboard.start_edit(&module).await;

            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            if text == current {
                dashboard.cancel_edit(&module);
                println!("{}: unchanged", module);
                return Ok(());
            }

            dashboard.update_text(&module, text)?;
            dashboard.save(&module).await?;
            println!("{}: saved", module);
        }
        Some(Commands::Note { module, text }) => {
            let dashboard = open_dashboard(&config)?;
            match text {
                Some(text) => dashboard.set_note(&module, &text)?,
                None => println!("{}", dashboard.note(&module)),
            }
        }
        Some(Commands::Move { module, index }) => {
            let dashboard = open_dashboard(&config)?;
            dashboard.bootstrap().await;
            if !dashboard.move_panel(&module, index)? {
                anyhow::bail!("{} is not a known panel", module);
            }
            print_panels(&dashboard.views());
        }
        Some(Commands::ResetLayout) => {
            let dashboard = open_dashboard(&config)?;
            let panels = dashboard.reset_layout().await?;
            print_panels(&panels);
        }
        Some(Commands::Scan) => {
            let dashboard = open_dashboard(&config)?;
            dashboard.bootstrap().await;
            let added = dashboard.rescan().await?;
            println!("{} new module(s), {} total", added, dashboard.modules().len());
        }
        Some(Commands::Register { name, path }) => {
            let dashboard = open_dashboard(&config)?;
            dashboard.register(&name, &path).await?;
            println!("{}: registered", name);
        }
        Some(Commands::Config { init }) => {
            if init {
                let path = config.save()?;
                println!("Wrote {}", path.display());
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        None => {
            let dashboard = open_dashboard(&config)?;
            let panels = dashboard.bootstrap().await;
            print_panels(&panels);
        }
    }

    Ok(())
}
