use std::path::PathBuf;

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};

const ABOUT: &str = "Weather lookup with rain and temperature alerts";

const LONG_ABOUT: &str = "
Look up the current weather and the next hours of forecast for a city.

Searches and favorites are checked against the alert rules: rain within the lookahead window or a
temperature above the threshold triggers a notification. Notifications go to the desktop once they
are enabled with `meteo notifications enable`, and to an in-terminal banner otherwise.

`meteo serve` runs an offline front for the web shell: static assets are served from a local
snapshot and weather API calls are passed through.
";

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug)]
#[command(name = "meteo", version, styles = STYLES, about = ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search a city and show its weather
    Search {
        /// City name, e.g. "Paris"
        query: Vec<String>,
    },
    /// Show the weather for a saved favorite
    Show {
        /// Exact favorite name, e.g. "Paris, France"
        name: String,
    },
    /// Manage favorite cities
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Show or change the color theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeCommand>,
    },
    /// Manage notification permission
    #[command(subcommand)]
    Notifications(NotificationsCommand),
    /// Run the offline front for the web shell
    Serve {
        /// Listen address, overrides the configured one
        #[arg(short, long)]
        listen: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum FavoritesCommand {
    /// List saved favorites
    List,
    /// Save the location currently on display
    Add,
    /// Remove a favorite by exact name
    Remove { name: String },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeCommand {
    /// Print the current theme
    Show,
    /// Switch between dark and light
    Toggle,
    Dark,
    Light,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationsCommand {
    /// Print the current permission
    Status,
    /// Grant permission and send a test notification
    Enable,
    /// Deny permission
    Block,
    /// Forget the decision
    Reset,
}

impl Args {
    /// Search query joined from its words
    #[must_use]
    pub fn join_query(words: &[String]) -> String {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_search_joins_words() {
        let args = Args::parse_from(["meteo", "search", "New", "York"]);
        match args.command {
            Command::Search { query } => assert_eq!(Args::join_query(&query), "New York"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_theme_without_action() {
        let args = Args::parse_from(["meteo", "theme"]);
        assert!(matches!(args.command, Command::Theme { action: None }));
    }

    #[test]
    fn test_global_flags() {
        let args = Args::parse_from(["meteo", "notifications", "status", "--verbose", "-c", "x.toml"]);
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(
            args.command,
            Command::Notifications(NotificationsCommand::Status)
        ));
    }
}
