//! midclick - three-finger trackpad tap as middle click
//!
//! Emulates a middle mouse button on macOS: while three fingers rest on a
//! multitouch surface, left-button clicks are rewritten in flight to
//! middle-button clicks.

use midclick::app::cli::{Cli, Commands, ConfigAction};
use midclick::app::config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // Initialize tracing (--verbose enables debug-level output)
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Load config
    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    match cli.command {
        Commands::Run => run_session(&config)?,
        Commands::Check { prompt } => run_check(prompt)?,
        Commands::Init { force } => run_init(force, &config)?,
        Commands::Config { action } => run_config(action, &config)?,
    }

    Ok(())
}

#[cfg(target_os = "macos")]
fn run_session(config: &Config) -> anyhow::Result<()> {
    use midclick::session::macos_session;
    use midclick::tap::accessibility_trusted;
    use tracing::warn;

    if !accessibility_trusted() {
        warn!("Accessibility access not granted yet; the event tap will retry while the grant propagates");
        warn!("Enable it in System Settings > Privacy & Security > Accessibility");
    }

    let mut session = macos_session(config.tap.retry_policy());
    let handle = session.handle();

    ctrlc::set_handler(move || {
        info!("interrupt received, stopping");
        handle.stop();
    })?;

    info!("starting middle-click session; three-finger click maps to middle click");
    let result = session.run();
    session.cleanup();
    result?;
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run_session(_config: &Config) -> anyhow::Result<()> {
    anyhow::bail!("the middle-click session requires macOS (Quartz event taps and MultitouchSupport)")
}

#[cfg(target_os = "macos")]
fn run_check(prompt: bool) -> anyhow::Result<()> {
    use midclick::tap::{accessibility_trusted, request_accessibility_prompt};
    use midclick::touch::devices::macos::MacMultitouch;
    use midclick::touch::devices::MultitouchApi;
    use midclick::touch::state::TouchState;
    use std::sync::Arc;

    let trusted = if prompt && !accessibility_trusted() {
        request_accessibility_prompt()
    } else {
        accessibility_trusted()
    };

    let api = MacMultitouch::new(Arc::new(TouchState::new()));
    let devices = api.create_list().map(|set| set.len()).unwrap_or(0);

    println!(
        "accessibility: {}",
        if trusted { "granted" } else { "not granted" }
    );
    println!("multitouch devices: {devices}");

    if trusted && devices > 0 {
        println!("ready");
        Ok(())
    } else {
        anyhow::bail!("not ready to run")
    }
}

#[cfg(not(target_os = "macos"))]
fn run_check(_prompt: bool) -> anyhow::Result<()> {
    anyhow::bail!("device and permission checks require macOS")
}

fn run_init(force: bool, config: &Config) -> anyhow::Result<()> {
    let path = Config::default_path();
    if path.exists() && !force {
        anyhow::bail!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    config.save(&path)?;
    info!("wrote config to {}", path.display());
    Ok(())
}

fn run_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Reset { force } => {
            let path = Config::default_path();
            if path.exists() && !force {
                anyhow::bail!("refusing to reset {} without --force", path.display());
            }
            Config::default().save(&path)?;
            info!("reset config at {}", path.display());
        }
    }
    Ok(())
}
