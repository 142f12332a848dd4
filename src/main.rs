use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::style::Stylize;
use tracing::{debug, error, info, warn};

use meteo::alerts::AlertRules;
use meteo::app::MeteoApp;
use meteo::assets::{AssetCache, AssetRouter, HttpAssetFetcher};
use meteo::cli::{Args, Command, FavoritesCommand, NotificationsCommand, ThemeCommand};
use meteo::config::MeteoConfig;
use meteo::favorites::Favorites;
use meteo::notify::{
    BackgroundAgent, BannerBoard, DesktopNotifier, Dispatcher, EmailAgent, TerminalBanner,
};
use meteo::preferences::{Preferences, Theme};
use meteo::render::TerminalView;
use meteo::storage::Store;
use meteo::telemetry::init_tracing;
use meteo::weather::OpenMeteoClient;
use meteo::web::{self, Upstreams};

fn print_error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match MeteoConfig::load_from_path(args.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            print_error(&format!("{e:#}"));
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging, args.verbose);

    std::panic::set_hook(Box::new(|panic_info| {
        print_error(&panic_info.to_string());
        error!("Panic: {}", panic_info);
    }));

    match run(args, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, config: MeteoConfig) -> Result<ExitCode> {
    if let Command::Serve { listen } = &args.command {
        let listen = listen.clone().unwrap_or_else(|| config.assets.listen.clone());
        serve(&config, &listen).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let store = Arc::new(
        Store::open(config.storage.preferences_path(), "preferences")
            .context("Failed to open preferences store")?,
    );
    let preferences = Preferences::new(store.clone());
    let favorites = Favorites::new(store);

    let theme = preferences.theme().await.unwrap_or_else(|e| {
        warn!("Could not read theme, using default: {}", e);
        Theme::default()
    });
    let rules = AlertRules::from(&config.alerts);
    let view = Arc::new(TerminalView::new(theme, rules.clone()));

    let board = BannerBoard::from_config(&config.notifications);
    let background = EmailAgent::from_config(&config.notifications)
        .map(|agent| Arc::new(agent) as Arc<dyn BackgroundAgent>);
    let dispatcher = Dispatcher::new(
        Arc::new(preferences.clone()),
        background,
        Arc::new(DesktopNotifier::new(&config.notifications)),
        Arc::new(TerminalBanner::new(board)),
    );

    let client = Arc::new(OpenMeteoClient::new(&config.weather)?);
    let app = MeteoApp::new(
        client.clone(),
        client,
        view,
        dispatcher,
        preferences,
        favorites,
    )
    .with_rules(rules)
    .with_app_name(config.notifications.app_name.clone());

    if let Err(e) = app.restore_session().await {
        warn!("Could not restore last session: {}", e);
    }

    // The app has already shown any error on the view.
    let outcome = match args.command {
        Command::Search { query } => app.search(&Args::join_query(&query)).await.map(drop),
        Command::Show { name } => app.show_favorite(&name).await.map(drop),
        Command::Favorites(FavoritesCommand::List) => app.list_favorites().await.map(drop),
        Command::Favorites(FavoritesCommand::Add) => app.add_current_favorite().await.map(drop),
        Command::Favorites(FavoritesCommand::Remove { name }) => {
            app.remove_favorite(&name).await.map(|removed| {
                if !removed {
                    println!("No favorite named \"{name}\"");
                }
            })
        }
        Command::Theme { action } => {
            let theme = match action.unwrap_or(ThemeCommand::Show) {
                ThemeCommand::Show => app.theme().await,
                ThemeCommand::Toggle => app.toggle_theme().await,
                ThemeCommand::Dark => app.set_theme(Theme::Dark).await,
                ThemeCommand::Light => app.set_theme(Theme::Light).await,
            };
            theme.map(|theme| println!("Theme: {theme}"))
        }
        Command::Notifications(NotificationsCommand::Status) => app
            .notification_status()
            .await
            .map(|status| println!("Notifications: {status}")),
        Command::Notifications(NotificationsCommand::Enable) => app
            .enable_notifications()
            .await
            .map(|delivery| debug!("Welcome notification delivered via {}", delivery)),
        Command::Notifications(NotificationsCommand::Block) => app
            .block_notifications()
            .await
            .map(|()| println!("Notifications: denied")),
        Command::Notifications(NotificationsCommand::Reset) => app
            .reset_notifications()
            .await
            .map(|()| println!("Notifications: default")),
        Command::Serve { .. } => Ok(()),
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            debug!("Command failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn serve(config: &MeteoConfig, listen: &str) -> Result<()> {
    let cache = Arc::new(
        AssetCache::open(config.storage.assets_path(), &config.assets)
            .context("Failed to open asset cache")?,
    );
    let fetcher = Arc::new(HttpAssetFetcher::new(&config.weather.user_agent)?);

    match cache.install(fetcher.as_ref()).await {
        Ok(count) => info!("Installed {} assets into {}", count, cache.version()),
        Err(e) => warn!("Asset install failed, serving what is cached: {}", e),
    }
    let purged = cache.activate().await?;
    if !purged.is_empty() {
        info!("Purged old snapshots: {}", purged.join(", "));
    }

    let router = Arc::new(AssetRouter::new(cache, fetcher, &config.assets));
    let app = web::router(router, Upstreams::new(&config.weather, &config.assets));
    web::run(listen, app).await
}
