//! CLI commands.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};

use incognibro_core::activity::ActivityLog;
use incognibro_core::blocklist::{get_effective_blocklist, BUILT_IN_TRACKER_DOMAINS};
use incognibro_core::cache::QueryCache;
use incognibro_core::coordinator::{BlocklistCoordinator, MutationOutcome};
use incognibro_core::domain::parse_domain_input;
use incognibro_core::notices::{Notice, NoticeBoard};
use incognibro_core::profile::{ProfileManager, ProfileService};
use incognibro_core::scan::{scan_and_log, ScanReport};
use incognibro_core::settings::{BlocklistUpdateResult, SettingsService};
use incognibro_storage::Database;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the settings server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = incognibro_server::DEFAULT_HOST)]
        host: String,

        /// Port to bind to
        #[arg(long, default_value_t = incognibro_server::DEFAULT_PORT)]
        port: u16,
    },

    /// Scan domains or URLs for trackers
    Scan {
        /// Domains or URLs, separated by commas, semicolons or newlines.
        /// Reads stdin when omitted or "-".
        input: Vec<String>,

        /// Read input from a file
        #[arg(short, long, conflicts_with = "input")]
        file: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the custom block list
    #[command(subcommand)]
    Block(BlockCommand),

    /// Turn auto-stop tracking on or off
    AutoStop {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Show privacy settings
    Settings {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect the protection activity log
    #[command(subcommand)]
    Log(LogCommand),

    /// Show or set your display name
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum BlockCommand {
    /// Add a domain
    Add { domain: String },

    /// Remove a domain
    Remove { domain: String },

    /// List blocked domains
    List {
        /// Include the built-in tracker list
        #[arg(long)]
        effective: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum LogCommand {
    /// Show recent scans, newest first
    Show {
        /// Maximum number of entries
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Delete the activity log
    Clear,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProfileCommand {
    /// Show your profile
    Show,

    /// Set your display name
    Set { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

/// Everything a non-server command needs.
pub struct Session {
    pub coordinator: BlocklistCoordinator,
    pub profiles: ProfileManager,
    /// Local database holding the activity log.
    pub activity: Database,
}

impl Session {
    /// Builds a session over one settings backend. Settings and profile
    /// notices go to the same board.
    pub fn new<S>(service: Arc<S>, activity: Database) -> Self
    where
        S: SettingsService + ProfileService + 'static,
    {
        let notices = NoticeBoard::new();
        let settings: Arc<dyn SettingsService> = service.clone();
        let profiles: Arc<dyn ProfileService> = service;

        Self {
            coordinator: BlocklistCoordinator::with_cache(
                settings,
                Arc::new(QueryCache::new()),
                notices.clone(),
            ),
            profiles: ProfileManager::new(profiles, notices),
            activity,
        }
    }

    /// Runs a non-server command.
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Serve { .. } => bail!("serve is handled by the binary"),
            Command::Scan { input, file, json } => self.scan(input, file, json).await,
            Command::Block(BlockCommand::Add { domain }) => self.add(&domain).await,
            Command::Block(BlockCommand::Remove { domain }) => self.remove(&domain).await,
            Command::Block(BlockCommand::List { effective }) => self.list(effective).await,
            Command::AutoStop { state } => self.auto_stop(state.enabled()).await,
            Command::Settings { json } => self.settings(json).await,
            Command::Log(LogCommand::Show { limit }) => self.show_log(limit),
            Command::Log(LogCommand::Clear) => self.clear_log(),
            Command::Profile(ProfileCommand::Show) => self.show_profile().await,
            Command::Profile(ProfileCommand::Set { name }) => self.set_profile(&name).await,
        }
    }

    async fn scan(&self, input: Vec<String>, file: Option<PathBuf>, json: bool) -> Result<()> {
        let text = read_scan_input(input, file)?;

        // Scans still run with the built-in list when settings are unreachable.
        let settings = match self.coordinator.refresh().await {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!("Scanning without user settings: {}", e);
                None
            }
        };

        let Some(report) = scan_and_log(&text, settings.as_ref(), &self.activity)? else {
            println!("Nothing to scan.");
            return Ok(());
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }

    async fn add(&self, domain: &str) -> Result<()> {
        let domain = canonical_domain(domain)?;
        self.load().await?;

        let outcome = self.coordinator.add_block_entry(&domain).await;
        self.finish(outcome)
    }

    async fn remove(&self, domain: &str) -> Result<()> {
        self.load().await?;

        let outcome = self.coordinator.remove_block_entry(domain.trim()).await;
        self.finish(outcome)
    }

    async fn list(&self, effective: bool) -> Result<()> {
        let settings = self.load().await?;

        let entries = if effective {
            get_effective_blocklist(&settings.block_list)
        } else {
            settings.block_list
        };

        if entries.is_empty() {
            println!("No custom domains blocked.");
        }
        for entry in entries {
            println!("{}", entry);
        }
        Ok(())
    }

    async fn auto_stop(&self, enabled: bool) -> Result<()> {
        self.load().await?;

        match self.coordinator.set_auto_stop_tracking(enabled).await {
            MutationOutcome::Failed { .. } => {
                self.print_notices();
                bail!("auto-stop tracking was not updated")
            }
            _ => {
                println!(
                    "Auto-stop tracking {}.",
                    if enabled { "enabled" } else { "disabled" }
                );
                Ok(())
            }
        }
    }

    async fn settings(&self, json: bool) -> Result<()> {
        let settings = self.load().await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            return Ok(());
        }

        println!(
            "Auto-stop tracking: {}",
            if settings.auto_stop_tracking { "on" } else { "off" }
        );
        println!("Blocked domains: {}", blocklist_summary(settings.block_list.len()));
        for domain in &settings.block_list {
            println!("  {}", domain);
        }
        Ok(())
    }

    fn show_log(&self, limit: usize) -> Result<()> {
        let entries = self.activity.entries()?;
        if entries.is_empty() {
            println!("No activity yet.");
            return Ok(());
        }

        let now = Utc::now();
        for entry in entries.iter().take(limit) {
            println!(
                "{:<10}  detected {:>3}  blocked {:>3}  auto-stop {:<3}  {}",
                relative_time(entry.created_at, now),
                entry.detected_count,
                entry.blocked_count,
                if entry.auto_stop_enabled { "on" } else { "off" },
                entry.target.replace('\n', " "),
            );
        }
        Ok(())
    }

    fn clear_log(&self) -> Result<()> {
        self.activity.clear_log()?;
        println!("Activity log cleared.");
        Ok(())
    }

    async fn show_profile(&self) -> Result<()> {
        let profile = self
            .profiles
            .refresh()
            .await
            .context("Failed to load profile")?;

        match profile {
            Some(profile) => println!("Welcome, {}", profile.name),
            None => println!("No profile yet. Set one with `incognibro profile set <name>`."),
        }
        Ok(())
    }

    async fn set_profile(&self, name: &str) -> Result<()> {
        let outcome = self.profiles.save(name).await;
        self.print_notices();

        match outcome {
            MutationOutcome::Failed { error, .. } => Err(error.into()),
            _ => Ok(()),
        }
    }

    async fn load(&self) -> Result<incognibro_core::settings::PrivacySettings> {
        self.coordinator
            .refresh()
            .await
            .context("Failed to load privacy settings")
    }

    fn finish(&self, outcome: MutationOutcome<BlocklistUpdateResult>) -> Result<()> {
        self.print_notices();

        match outcome {
            MutationOutcome::Failed { error, .. } => Err(error.into()),
            _ => Ok(()),
        }
    }

    fn print_notices(&self) {
        for notice in self.coordinator.notices().drain() {
            print_notice(&notice);
        }
    }
}

/// Validates a domain typed on the command line and returns its normalized
/// form.
pub fn canonical_domain(input: &str) -> Result<String> {
    let mut parsed = parse_domain_input(input);
    if parsed.len() != 1 {
        bail!("expected a single domain, got {:?}", input);
    }

    let domain = parsed.remove(0);
    match domain.error {
        Some(error) => bail!("{}: {}", error, domain.original),
        None => Ok(domain.normalized),
    }
}

/// "N built-in + M custom = T" for a user list of `custom` entries.
pub fn blocklist_summary(custom: usize) -> String {
    let built_in = BUILT_IN_TRACKER_DOMAINS.len();
    format!("{} built-in + {} custom = {}", built_in, custom, built_in + custom)
}

/// Age of `then` as seen at `now`: "Just now", "5m ago", "3h ago", "2d ago",
/// or the date once a week has passed.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(then);

    if age.num_minutes() < 1 {
        "Just now".to_string()
    } else if age.num_minutes() < 60 {
        format!("{}m ago", age.num_minutes())
    } else if age.num_hours() < 24 {
        format!("{}h ago", age.num_hours())
    } else if age.num_days() < 7 {
        format!("{}d ago", age.num_days())
    } else {
        then.format("%Y-%m-%d").to_string()
    }
}

fn read_scan_input(input: Vec<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }

    if input.is_empty() || input == ["-"] {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }

    Ok(input.join("\n"))
}

fn print_notice(notice: &Notice) {
    if notice.is_error() {
        eprintln!("{}", notice.message);
    } else {
        println!("{}", notice.message);
    }
}

fn print_report(report: &ScanReport) {
    let result = &report.result;

    println!("Trackers ({}):", result.trackers.len());
    for domain in &result.trackers {
        println!("  x {}", domain);
    }

    println!("Clean ({}):", result.non_trackers.len());
    for domain in &result.non_trackers {
        println!("  - {}", domain);
    }

    if !result.invalid.is_empty() {
        println!("Invalid ({}):", result.invalid.len());
        for invalid in &result.invalid {
            println!("  ? {} ({})", invalid.domain, invalid.error);
        }
    }

    if report.auto_stop_enabled {
        println!(
            "Auto-stop is on: {} tracker(s) blocked.",
            report.activity.blocked_count
        );
    } else {
        println!(
            "Auto-stop is off: {} tracker(s) detected, none blocked.",
            report.activity.detected_count
        );
    }
}
