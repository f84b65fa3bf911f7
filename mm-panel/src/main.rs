//! mm-panel - Inspect and control the magic mount module

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::broadcast::error::TryRecvError;

use libmmpanel::api::{DeviceApi, MockApi, PanelApi};
use libmmpanel::draft::ConfigDraft;
use libmmpanel::events::EventReceiver;
use libmmpanel::executor::ShellExecutor;
use libmmpanel::prefs::FilePreferences;
use libmmpanel::{Config, PanelError, Store, StoreEvent};

#[derive(Parser, Debug)]
#[command(name = "mm-panel")]
#[command(version, about = "Inspect and control the magic mount module")]
#[command(long_about = r#"Inspect and control the magic mount module from a root shell.

Every invocation restores the saved preferences, loads the mount
configuration and queries the device before running the command.

EXAMPLES:
    # Device, storage and module overview
    mm-panel status

    # Installed modules as JSON
    mm-panel --format json modules | jq '.[] | select(.is_mounted) | .id'

    # Find a module by name or id
    mm-panel modules --search revanced

    # Show and edit the mount configuration
    mm-panel config show
    mm-panel config set verbose true
    mm-panel config set partitions "[product, vendor]"
    mm-panel config reset

    # Preferences
    mm-panel theme toggle
    mm-panel lang de
    mm-panel nav-fix

    # Try everything without a device
    mm-panel --mock status

CONFIG KEYS:
    moduledir, tempdir, mountsource, verbose, umount, partitions

EXIT CODES:
    0 - Success
    1 - Error (bad panel config, preferences unwritable, etc.)
    2 - The mount tool or a device command failed
    3 - Invalid input (unknown config key, relative module directory)
"#)]
struct Cli {
    /// Use built-in demo data instead of the device
    #[arg(long, global = true)]
    mock: bool,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT", global = true)]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Device, version, storage and mount overview
    Status,
    /// List installed modules
    Modules {
        /// Only show modules whose name or id contains this text
        #[arg(short, long, value_name = "TEXT")]
        search: Option<String>,
    },
    /// Show or change the mount configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Reboot the device
    Reboot,
    /// List available UI languages
    Languages,
    /// Show or cycle the theme
    #[command(subcommand)]
    Theme(ThemeCommand),
    /// Switch the UI language
    Lang {
        /// Language code, e.g. en, de, fr, zh
        code: String,
    },
    /// Toggle extra padding under the bottom navigation
    NavFix,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the current configuration
    Show,
    /// Change one key and save
    Set { key: String, value: String },
    /// Restore defaults and save
    Reset,
    /// Load the configuration again
    Reload,
}

#[derive(Subcommand, Debug)]
enum ThemeCommand {
    /// Print the applied theme
    Show,
    /// Advance auto -> light -> dark -> auto
    Toggle,
}

#[derive(Serialize)]
struct LangOutput {
    requested: String,
    active: Option<String>,
}

#[derive(Serialize)]
struct NavFixOutput {
    fix_bottom_nav: bool,
}

#[derive(Serialize)]
struct RebootOutput {
    requested: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = Config::load().context("Failed to load panel configuration");
    let logging = config.as_ref().map(|c| c.logging.clone()).unwrap_or_default();
    logging.with_env_overrides().init(cli.verbose);

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<PanelError>()
        .map(PanelError::exit_code)
        .unwrap_or(1)
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let prefs_path = config.preferences_path()?;
    tracing::debug!(path = %prefs_path.display(), "using preferences file");

    let api: Arc<dyn PanelApi> = if cli.mock {
        Arc::new(MockApi::new())
    } else {
        let executor = ShellExecutor::new(config.device.shell.clone());
        Arc::new(DeviceApi::new(executor, config.device.clone()))
    };
    let store = Store::new(api, Arc::new(FilePreferences::open(prefs_path)));
    let mut events = store.subscribe();

    store.init(None).await?;
    let result = execute(&store, &cli).await;
    forward_toasts(&mut events);
    result
}

async fn execute(store: &Store, cli: &Cli) -> Result<()> {
    let json = cli.format == "json";

    match &cli.command {
        Command::Status => {
            let status = store.status();
            if json {
                return print_json(&status);
            }
            println!("Device:     {}", status.device.model);
            println!("Android:    {}", status.device.android);
            println!("Kernel:     {}", status.device.kernel);
            println!("SELinux:    {}", status.device.selinux);
            println!("Version:    {}", status.version);
            println!(
                "Storage:    {} / {} ({})",
                status.storage.used, status.storage.size, status.storage.percent
            );
            println!(
                "Modules:    {} total, {} mounted, {} skipped",
                status.summary.total, status.summary.mounted, status.summary.skipped
            );
            println!("Partitions: {}", status.active_partitions.join(", "));
        }
        Command::Modules { search } => {
            let modules = match search {
                Some(query) => store.search_modules(query),
                None => store.modules(),
            };
            if json {
                return print_json(&modules);
            }
            if modules.is_empty() && search.is_some() {
                println!("No modules match");
            } else if modules.is_empty() {
                println!("{}", store.strings().modules.empty());
            }
            for module in modules {
                let marker = if module.is_mounted { "*" } else { " " };
                println!("{} {} {} ({})", marker, module.id, module.version, module.author);
                if !module.description.is_empty() {
                    println!("    {}", module.description);
                }
            }
        }
        Command::Config(command) => config_command(store, command, json).await?,
        Command::Reboot => {
            store.reboot_device().await?;
            if json {
                return print_json(&RebootOutput { requested: true });
            }
            println!("Reboot requested");
        }
        Command::Languages => {
            let languages = store.available_languages();
            if json {
                return print_json(&languages);
            }
            let active = store.active_lang();
            for language in languages {
                let marker = if active.as_deref() == Some(language.code.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{} {:<6} {}", marker, language.code, language.name);
            }
        }
        Command::Theme(command) => {
            if let ThemeCommand::Toggle = command {
                store.toggle_theme();
            }
            let applied = store.applied_theme();
            if json {
                return print_json(&applied);
            }
            println!("Mode:  {}", applied.mode);
            println!("Theme: {}", applied.data_theme());
            println!("Seed:  {}", applied.seed);
        }
        Command::Lang { code } => {
            let active = store.set_lang(code);
            if json {
                return print_json(&LangOutput {
                    requested: code.clone(),
                    active,
                });
            }
            match active {
                Some(active) if &active == code => println!("Language: {}", active),
                Some(active) => println!("Language {} not available, using {}", code, active),
                None => println!("No language bundles available"),
            }
        }
        Command::NavFix => {
            let enabled = store.toggle_bottom_nav_fix();
            if json {
                return print_json(&NavFixOutput {
                    fix_bottom_nav: enabled,
                });
            }
            println!(
                "Bottom navigation fix {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
    }

    Ok(())
}

async fn config_command(store: &Store, command: &ConfigCommand, json: bool) -> Result<()> {
    match command {
        ConfigCommand::Show => {}
        ConfigCommand::Set { key, value } => {
            // init already tried once, but its failure only raised a toast
            let mut draft = ConfigDraft::load(store).await?;
            let mut edited = store.config();
            if !edited.set_field(key, value) {
                return Err(PanelError::InvalidInput(format!(
                    "unknown config key or value: {} = {}",
                    key, value
                ))
                .into());
            }
            if !draft.commit(store, edited).await? {
                eprintln!("Configuration unchanged");
            }
        }
        ConfigCommand::Reset => store.reset_config().await?,
        ConfigCommand::Reload => store.load_config().await?,
    }

    let config = store.config();
    if json {
        return print_json(&config);
    }
    println!("{}", libmmpanel::mount_config::serialize(&config));
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", output);
    Ok(())
}

/// Print every toast raised so far to stderr
fn forward_toasts(events: &mut EventReceiver) {
    loop {
        match events.try_recv() {
            Ok(StoreEvent::ToastShown { toast }) => {
                eprintln!("[{}] {}", toast.severity, toast.text);
            }
            Ok(_) => {}
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "missed store events");
            }
            Err(_) => break,
        }
    }
}
