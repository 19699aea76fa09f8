//! Command-line interface for mongoport
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and flag overrides
//! - Connection URI resolution (flag, datasource, config default)
//! - Dispatching subcommands to the catalog and transfer engine

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use tracing::{debug, info};

use crate::config::{Config, LogLevel};
use crate::connection::ConnectionManager;
use crate::error::{ConfigError, MongoportError, Result};
use crate::transfer::{self, ProgressTracker, TransferOptions, TransferResult};
use crate::utils::uri::sanitize_uri;
use crate::utils::validate::is_valid_database_name;

pub mod completion;
pub mod output;

/// Copy MongoDB databases between clusters and directories
#[derive(Parser, Debug)]
#[command(
    name = "mongoport",
    version,
    about = "Clone, export and import MongoDB databases",
    long_about = "Copies every collection of a database, documents and secondary indexes, \
between live clusters and directories of line-delimited extended JSON."
)]
pub struct CliArgs {
    /// MongoDB connection URI
    ///
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    #[arg(long, global = true, value_name = "URI")]
    pub uri: Option<String>,

    /// Datasource name from config file
    #[arg(short = 'd', long, global = true, value_name = "NAME")]
    pub datasource: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Server selection timeout in seconds (at least 1)
    #[arg(
        long,
        global = true,
        value_name = "SECONDS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: Option<u64>,

    /// Quiet mode (errors only, no summaries)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Disable the progress bar
    #[arg(long = "no-progress", global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for mongoport
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List non-system databases with their size
    Databases,

    /// Show collection and document counts of a database
    Stats {
        #[arg(value_name = "DB")]
        db: String,
    },

    /// Copy a database into another database, on the same or another cluster
    Clone {
        #[arg(value_name = "DB")]
        db: String,

        #[arg(value_name = "TARGET_DB")]
        target_db: String,

        /// Cluster to clone into (defaults to the source cluster)
        #[arg(long, value_name = "URI")]
        target_uri: Option<String>,
    },

    /// Export a database to a directory
    Export {
        #[arg(value_name = "DB")]
        db: String,

        /// Output directory (defaults to a timestamped directory under
        /// `transfer.export_directory`)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Import a directory written by `export` into a database
    Import {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[arg(value_name = "TARGET_DB")]
        target_db: String,
    },

    /// Drop a database
    Drop {
        #[arg(value_name = "DB")]
        db: String,

        /// Confirm the drop
        #[arg(long)]
        yes: bool,
    },

    /// Generate shell completion script
    Completion {
        #[arg(value_enum, value_name = "SHELL")]
        shell: Shell,
    },

    /// Show, validate or initialize configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,

        /// Write the effective configuration to the config file if it does not exist
        #[arg(long)]
        init: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration with flag overrides applied
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and load configuration
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        let config = Self::load_config(&args)?;

        Ok(Self { args, config })
    }

    /// Load configuration from file and merge with arguments
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;

        if let Err(e) = config.validate() {
            eprintln!("Warning: Configuration validation failed: {}", e);
            eprintln!("Using default configuration instead.");
            config = Config::default();
        }

        Self::apply_args_to_config(&mut config, args);
        Ok(config)
    }

    /// Override configuration values with flags that were given
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };

        if let Some(timeout) = args.timeout {
            config.connection.server_selection_timeout = timeout;
        }

        if args.no_progress {
            config.transfer.show_progress = false;
        }
    }

    /// Get the MongoDB connection URI
    ///
    /// Priority:
    /// 1. Datasource named with -d/--datasource
    /// 2. Explicit --uri
    /// 3. Default datasource from config
    /// 4. `connection.default_uri`
    pub fn get_connection_uri(&self) -> Result<String> {
        if let Some(name) = &self.args.datasource {
            return self
                .config
                .connection
                .get_datasource(Some(name))
                .ok_or_else(|| {
                    ConfigError::InvalidValue {
                        field: "datasource".into(),
                        value: format!(
                            "{name} (available: {})",
                            self.config.connection.list_datasources().join(", ")
                        ),
                    }
                    .into()
                });
        }

        if let Some(uri) = &self.args.uri {
            return Ok(uri.clone());
        }

        if let Some(uri) = self.config.connection.get_datasource(None) {
            return Ok(uri);
        }

        Ok(self.config.connection.default_uri.clone())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Run the selected subcommand
    pub async fn execute(&self) -> Result<()> {
        match &self.args.command {
            Commands::Databases => self.list_databases().await,
            Commands::Stats { db } => self.show_stats(db).await,
            Commands::Clone {
                db,
                target_db,
                target_uri,
            } => self.clone_database(db, target_db, target_uri.as_deref()).await,
            Commands::Export { db, out } => self.export_database(db, out.as_deref()).await,
            Commands::Import { dir, target_db } => self.import_database(dir, target_db).await,
            Commands::Drop { db, yes } => self.drop_database(db, *yes).await,
            Commands::Completion { shell } => completion::generate_completion(*shell),
            Commands::Config {
                show,
                validate,
                init,
            } => self.handle_config_command(*show, *validate, *init),
        }
    }

    /// Open a connection to `uri`
    async fn connect(&self, uri: &str) -> Result<ConnectionManager> {
        let mut manager = ConnectionManager::new(uri.to_string(), self.config.connection.clone());
        manager.connect().await?;

        match manager.get_server_version().await {
            Ok(version) => info!("Connected to {} (MongoDB {})", manager.display_uri(), version),
            Err(e) => debug!("Could not read server version: {}", e),
        }
        Ok(manager)
    }

    async fn connect_default(&self) -> Result<ConnectionManager> {
        let uri = self.get_connection_uri()?;
        self.connect(&uri).await
    }

    async fn list_databases(&self) -> Result<()> {
        let mut conn = self.connect_default().await?;
        let databases = conn.list_databases().await?;
        conn.disconnect().await?;

        println!("{}", output::databases_table(&databases));
        Ok(())
    }

    async fn show_stats(&self, db: &str) -> Result<()> {
        let mut conn = self.connect_default().await?;
        let stats = conn.get_stats(db).await?;
        conn.disconnect().await?;

        println!("{}", output::stats_table(&stats));
        Ok(())
    }

    async fn clone_database(&self, db: &str, target_db: &str, target_uri: Option<&str>) -> Result<()> {
        check_database_name(target_db)?;

        let source_uri = self.get_connection_uri()?;
        let target_uri = target_uri.filter(|uri| *uri != source_uri);
        if target_uri.is_none() && db == target_db {
            return Err(MongoportError::Generic(format!(
                "source and target are the same database '{db}'"
            )));
        }

        let mut source = self.connect(&source_uri).await?;
        let mut target = match target_uri {
            Some(uri) => Some(self.connect(uri).await?),
            None => None,
        };

        info!(
            "Cloning '{}' from {} into '{}' on {}",
            db,
            sanitize_uri(&source_uri),
            target_db,
            sanitize_uri(target_uri.unwrap_or(&source_uri))
        );

        let started = Instant::now();
        let mut progress = self.progress();
        let result = transfer::clone_database(
            &source,
            db,
            target.as_ref().unwrap_or(&source),
            target_db,
            self.transfer_options(),
            &mut progress,
        )
        .await;

        if let Some(target) = target.as_mut() {
            target.disconnect().await?;
        }
        source.disconnect().await?;

        self.print_summary(&result?, started);
        Ok(())
    }

    async fn export_database(&self, db: &str, out: Option<&Path>) -> Result<()> {
        let out_dir = match out {
            Some(dir) => dir.to_path_buf(),
            None => transfer::default_export_dir(&self.config.transfer.export_directory, db),
        };
        debug!("Export directory: {}", out_dir.display());

        let mut conn = self.connect_default().await?;
        let started = Instant::now();
        let mut progress = self.progress();
        let result = transfer::export_database(&conn, db, &out_dir, &mut progress).await;
        conn.disconnect().await?;

        self.print_summary(&result?, started);
        Ok(())
    }

    async fn import_database(&self, dir: &Path, target_db: &str) -> Result<()> {
        check_database_name(target_db)?;
        if !dir.is_dir() {
            return Err(MongoportError::SourceNotFound(dir.to_path_buf()));
        }

        let mut conn = self.connect_default().await?;
        let started = Instant::now();
        let mut progress = self.progress();
        let result = transfer::import_database(
            dir,
            &conn,
            target_db,
            self.transfer_options(),
            &mut progress,
        )
        .await;
        conn.disconnect().await?;

        self.print_summary(&result?, started);
        Ok(())
    }

    async fn drop_database(&self, db: &str, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(MongoportError::Generic(format!(
                "refusing to drop '{db}' without --yes"
            )));
        }

        let mut conn = self.connect_default().await?;
        let result = conn.drop_database(db).await;
        conn.disconnect().await?;
        result?;

        if !self.args.quiet {
            println!("dropped: {db}");
        }
        Ok(())
    }

    fn transfer_options(&self) -> TransferOptions {
        TransferOptions::from(&self.config.transfer)
    }

    fn progress(&self) -> ProgressTracker {
        ProgressTracker::new(self.config.transfer.show_progress && !self.args.quiet)
    }

    fn print_summary(&self, result: &TransferResult, started: Instant) {
        if !self.args.quiet {
            println!("{}", output::transfer_summary(result, started.elapsed()));
        }
    }

    /// Handle config subcommand
    fn handle_config_command(&self, show: bool, validate: bool, init: bool) -> Result<()> {
        if init {
            self.init_config_file()?;
        }

        if validate {
            self.validate_config_file()?;
        }

        if show {
            self.show_config()?;
        }

        Ok(())
    }

    /// Validate the configuration file; a missing file is valid
    fn validate_config_file(&self) -> Result<()> {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("Configuration file does not exist, defaults apply");
            return Ok(());
        }

        let config = Config::load_from_file(Some(&path))?;
        config.validate()?;
        println!("Configuration is valid");
        Ok(())
    }

    /// Write the effective configuration unless a file is already there
    fn init_config_file(&self) -> Result<()> {
        let path = self.get_config_path();
        if path.exists() {
            return Err(MongoportError::Generic(format!(
                "configuration file {} already exists",
                path.display()
            )));
        }

        self.config.save(&path)?;
        println!("Configuration written to {}", path.display());
        Ok(())
    }

    /// Show effective configuration
    fn show_config(&self) -> Result<()> {
        println!("Configuration file: {}", self.get_config_path().display());
        println!();
        println!("{}", self.config.to_toml()?);
        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path)
    }
}

fn check_database_name(name: &str) -> Result<()> {
    if is_valid_database_name(name) {
        Ok(())
    } else {
        Err(MongoportError::Generic(format!("invalid database name '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn interface(argv: &[&str]) -> CliInterface {
        let args = CliArgs::try_parse_from(argv).unwrap();
        let mut config = Config::default();
        config
            .connection
            .datasources
            .insert("prod".into(), "mongodb://prod:27017".into());
        CliInterface::apply_args_to_config(&mut config, &args);
        CliInterface { args, config }
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(CliArgs::try_parse_from(["mongoport"]).is_err());
    }

    #[test]
    fn test_clone_args() {
        let args = CliArgs::try_parse_from([
            "mongoport",
            "clone",
            "shop",
            "shop_copy",
            "--target-uri",
            "mongodb://other:27017",
        ])
        .unwrap();

        match args.command {
            Commands::Clone {
                db,
                target_db,
                target_uri,
            } => {
                assert_eq!(db, "shop");
                assert_eq!(target_db, "shop_copy");
                assert_eq!(target_uri.as_deref(), Some("mongodb://other:27017"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            CliArgs::try_parse_from(["mongoport", "export", "shop", "--no-progress", "-q"]).unwrap();
        assert!(args.no_progress);
        assert!(args.quiet);
    }

    #[test]
    fn test_completion_shell_is_parsed() {
        let args = CliArgs::try_parse_from(["mongoport", "completion", "zsh"]).unwrap();
        assert!(matches!(args.command, Commands::Completion { shell: Shell::Zsh }));
        assert!(CliArgs::try_parse_from(["mongoport", "completion", "tcsh"]).is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(CliArgs::try_parse_from(["mongoport", "--timeout", "0", "databases"]).is_err());
        assert!(CliArgs::try_parse_from(["mongoport", "--timeout", "1", "databases"]).is_ok());
    }

    #[test]
    fn test_config_init_writes_file_once() {
        let dir = std::env::temp_dir().join(format!("mongoport-cli-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");
        let path_arg = path.to_string_lossy().into_owned();
        let cli = interface(&["mongoport", "-c", &path_arg, "--timeout", "9", "config", "--init"]);

        assert_ok!(cli.init_config_file());
        let saved = Config::load_from_file(Some(&path)).unwrap();
        assert_eq!(saved.connection.server_selection_timeout, 9);
        assert!(saved.connection.datasources.contains_key("prod"));

        assert_err!(cli.init_config_file());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = interface(&["mongoport", "--timeout", "12", "--no-progress", "-v", "databases"]);
        assert_eq!(cli.config().connection.server_selection_timeout, 12);
        assert!(!cli.config().transfer.show_progress);
        assert_eq!(cli.config().logging.level, LogLevel::Debug);

        let cli = interface(&["mongoport", "-q", "databases"]);
        assert_eq!(cli.config().logging.level, LogLevel::Error);

        let cli = interface(&["mongoport", "--vv", "-q", "databases"]);
        assert_eq!(cli.config().logging.level, LogLevel::Trace);
    }

    #[test]
    fn test_connection_uri_priority() {
        let cli_default = interface(&["mongoport", "databases"]);
        assert_eq!(
            cli_default.get_connection_uri().unwrap(),
            "mongodb://localhost:27017"
        );

        let explicit = interface(&["mongoport", "--uri", "mongodb://example:27017", "databases"]);
        assert_eq!(
            explicit.get_connection_uri().unwrap(),
            "mongodb://example:27017"
        );

        let named = interface(&[
            "mongoport",
            "--uri",
            "mongodb://example:27017",
            "-d",
            "prod",
            "databases",
        ]);
        assert_eq!(named.get_connection_uri().unwrap(), "mongodb://prod:27017");
    }

    #[test]
    fn test_default_datasource() {
        let mut cli = interface(&["mongoport", "databases"]);
        cli.config.connection.default_datasource = Some("prod".into());
        assert_eq!(cli.get_connection_uri().unwrap(), "mongodb://prod:27017");
    }

    #[test]
    fn test_unknown_datasource() {
        let cli = interface(&["mongoport", "-d", "staging", "databases"]);
        let err = cli.get_connection_uri().unwrap_err();
        assert!(err.to_string().contains("staging"));
        assert!(err.to_string().contains("prod"));
    }

    #[tokio::test]
    async fn test_drop_requires_confirmation() {
        let cli = interface(&["mongoport", "drop", "shop"]);
        let err = cli.execute().await.unwrap_err();
        assert!(err.to_string().contains("--yes"));
    }

    #[tokio::test]
    async fn test_clone_into_itself_is_rejected() {
        let cli = interface(&["mongoport", "clone", "shop", "shop"]);
        let err = cli.execute().await.unwrap_err();
        assert!(err.to_string().contains("same database"));
    }

    #[tokio::test]
    async fn test_import_missing_directory() {
        let dir = std::env::temp_dir().join(format!("mongoport-cli-{}", uuid::Uuid::new_v4()));
        let dir_arg = dir.to_string_lossy().into_owned();
        let cli = interface(&["mongoport", "import", &dir_arg, "shop"]);

        let err = cli.execute().await.unwrap_err();
        assert!(matches!(err, MongoportError::SourceNotFound(path) if path == dir));
    }

    #[tokio::test]
    async fn test_invalid_target_database_name() {
        let cli = interface(&["mongoport", "clone", "shop", "bad/name"]);
        assert!(cli.execute().await.is_err());
    }
}
