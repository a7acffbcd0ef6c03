//! Clap derive structures for the `autouni` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// autouni -- monitor and control campus smart-building devices
#[derive(Debug, Parser)]
#[command(
    name = "autouni",
    version,
    about = "Monitor and control AutoUni smart-building devices",
    long_about = "Command-line client for the AutoUni backend.\n\n\
        Lists and controls devices, reads building topology and energy data,\n\
        and follows live device events over the push channel.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "AUTOUNI_PROFILE", global = true)]
    pub profile: Option<String>,

    /// REST base URL (overrides profile)
    #[arg(long, env = "AUTOUNI_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Push channel URL (overrides profile; derived from the API URL otherwise)
    #[arg(long, env = "AUTOUNI_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "AUTOUNI_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates on REST calls (the push channel still verifies)
    #[arg(long, short = 'k', env = "AUTOUNI_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile and config defaults)
    #[arg(long, env = "AUTOUNI_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and persist the session for this profile
    Login(LoginArgs),

    /// End the session and clear it from disk
    Logout,

    /// Show the logged-in user
    Whoami,

    /// List, inspect, and control devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Browse buildings, floors, and rooms
    #[command(alias = "b")]
    Buildings(BuildingsArgs),

    /// Energy consumption statistics
    #[command(alias = "e")]
    Energy(EnergyArgs),

    /// Server-side notifications
    #[command(alias = "notif")]
    Notifications(NotificationsArgs),

    /// Follow live device events and notices
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Login email (defaults to the profile's email)
    #[arg(long, short = 'e')]
    pub email: Option<String>,

    /// Store the password in the system keyring for later logins
    #[arg(long)]
    pub save: bool,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List(DeviceFilterArgs),

    /// Fetch one device fresh from the backend
    Get {
        /// Device ID
        device: String,
    },

    /// Aggregate device counts by type and status
    Stats,

    /// Send a command to one device
    Control {
        /// Device ID
        device: String,

        /// on, off, toggle, standby, set_intensity, set_temperature, or a custom command
        command: String,

        /// Command value (parsed as JSON, falling back to a string)
        value: Option<String>,
    },

    /// Send one command to many devices
    Bulk {
        /// on, off, toggle, standby, or a custom command
        command: String,

        /// Device IDs
        #[arg(required = true, num_args = 1..)]
        devices: Vec<String>,
    },
}

/// Client-side filters for `devices list`.
#[derive(Debug, Args)]
pub struct DeviceFilterArgs {
    /// Only devices in this room
    #[arg(long, short = 'r')]
    pub room: Option<String>,

    /// Only devices with this status (ON, OFF, STANDBY, ERROR)
    #[arg(long, short = 's')]
    pub status: Option<String>,

    /// Only devices of this type (LIGHT, AC, PROJECTOR, ...)
    #[arg(long, short = 't')]
    pub kind: Option<String>,

    /// Only devices currently considered online
    #[arg(long, conflicts_with = "active")]
    pub online: bool,

    /// Only online devices that are switched on
    #[arg(long)]
    pub active: bool,
}

// ── Buildings ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BuildingsArgs {
    #[command(subcommand)]
    pub command: BuildingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum BuildingsCommand {
    /// List buildings
    #[command(alias = "ls")]
    List,

    /// Show a building with its floors and rooms
    Get {
        /// Building ID
        building: String,
    },
}

// ── Energy ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EnergyArgs {
    #[command(subcommand)]
    pub command: EnergyCommand,
}

#[derive(Debug, Subcommand)]
pub enum EnergyCommand {
    /// Aggregated consumption for a period
    Stats(EnergyScopeArgs),

    /// Raw meter readings for a period
    History(EnergyScopeArgs),
}

#[derive(Debug, Args)]
pub struct EnergyScopeArgs {
    /// Reporting period
    #[arg(long, default_value = "today")]
    pub period: PeriodArg,

    /// Aggregation level
    #[arg(long, default_value = "general")]
    pub level: LevelArg,

    /// Building, floor, or room ID (required for non-general levels)
    #[arg(long)]
    pub id: Option<String>,

    /// Start date for --period custom (YYYY-MM-DD)
    #[arg(long, required_if_eq("period", "custom"))]
    pub from: Option<String>,

    /// End date for --period custom (YYYY-MM-DD)
    #[arg(long, required_if_eq("period", "custom"))]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    Today,
    Week,
    Month,
    Custom,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LevelArg {
    General,
    Building,
    Floor,
    Room,
}

// ── Notifications ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// List notifications
    #[command(alias = "ls")]
    List {
        /// Only unread notifications
        #[arg(long, short = 'u')]
        unread: bool,
    },
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only show events for these device IDs
    #[arg(long, short = 'd')]
    pub device: Vec<String>,

    /// Stop after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile
    Init {
        /// Profile name (defaults to --profile, then "default")
        #[arg(long)]
        name: Option<String>,

        /// REST base URL
        #[arg(long)]
        api_url: Option<String>,

        /// Login email
        #[arg(long)]
        email: Option<String>,

        /// Make this the default profile
        #[arg(long)]
        set_default: bool,
    },

    /// Print the current configuration with secrets masked
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
