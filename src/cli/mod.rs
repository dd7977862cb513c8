pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_MODULE_URL: &str = "https://trailhead.salesforce.com/content/learn/modules/starting_force_com";

#[derive(Parser)]
#[command(name = "trailbuster")]
#[command(about = "Log in to Trailhead and crawl modules, trails and lessons into JSON", long_about = None)]
pub struct Cli {
    /// Force a fresh login instead of reusing the saved session
    #[arg(long, global = true)]
    pub no_session: bool,

    /// Show the browser window
    #[arg(long, global = true)]
    pub headed: bool,

    /// Account email used to log in
    #[arg(long, env = "SALESFORCE_EMAIL", global = true)]
    pub email: Option<String>,

    /// Config file (default: ~/.config/trailbuster/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for crawl output and progress
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl a single module and its lessons
    Module {
        /// Module URL
        #[arg(default_value = DEFAULT_MODULE_URL)]
        url: String,
    },
    /// Crawl every module of a trail
    Trail {
        /// Trail URL
        url: String,
    },
    /// Crawl URLs listed in a file, one per line
    Batch {
        /// File with module or trail URLs; '#' starts a comment line
        file: PathBuf,
    },
    /// Show crawl statistics
    Stats,
    /// Delete the saved login session
    ClearSession,
    /// Parse a saved HTML page without a browser and print JSON
    Parse {
        /// Saved HTML file
        file: PathBuf,

        /// URL the page was saved from, used to resolve relative links
        #[arg(long)]
        url: String,

        /// Parse as a module page instead of a lesson
        #[arg(long)]
        module: bool,
    },
}

impl Commands {
    /// Whether the command needs a logged-in browser.
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            Commands::Module { .. } | Commands::Trail { .. } | Commands::Batch { .. }
        )
    }
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Module {
            url: DEFAULT_MODULE_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_is_default_command() {
        let cli = Cli::try_parse_from(["trailbuster"]).unwrap();
        assert!(cli.command.is_none());
        match cli.command.unwrap_or_default() {
            Commands::Module { url } => assert_eq!(url, DEFAULT_MODULE_URL),
            _ => panic!("expected module command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "trailbuster",
            "trail",
            "https://trailhead.salesforce.com/content/learn/trails/x",
            "--no-session",
            "--headed",
            "--email",
            "dev@example.com",
        ])
        .unwrap();
        assert!(cli.no_session);
        assert!(cli.headed);
        assert_eq!(cli.email.as_deref(), Some("dev@example.com"));
        assert!(cli.command.unwrap().needs_login());
    }

    #[test]
    fn test_parse_command() {
        let cli = Cli::try_parse_from([
            "trailbuster",
            "parse",
            "page.html",
            "--url",
            "https://a.example/modules/m",
            "--module",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Parse { file, url, module }) => {
                assert_eq!(file, PathBuf::from("page.html"));
                assert_eq!(url, "https://a.example/modules/m");
                assert!(module);
            }
            _ => panic!("expected parse command"),
        }
        assert!(!Commands::Stats.needs_login());
    }

    #[test]
    fn test_trail_requires_url() {
        assert!(Cli::try_parse_from(["trailbuster", "trail"]).is_err());
    }
}
