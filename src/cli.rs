//! Command-line argument parsing for pgframe.

use clap::Parser;
use pg_dataframe::config::DEFAULT_SECTION;
use pg_dataframe::path::DEFAULT_MOUNT_ROOT;
use pg_dataframe::{DriveMapping, PathNormalizer};

/// How the resulting table is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned text table.
    #[default]
    Text,
    /// JSON array of row objects.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Load a PostgreSQL query result into a table and print it.
#[derive(Parser, Debug)]
#[command(name = "pgframe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// INI credential file (Windows or POSIX path)
    #[arg(value_name = "CONFIG", env = "PGFRAME_CONFIG")]
    pub config: String,

    /// Literal SQL, or a path to a file containing it
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Output format: text or json
    #[arg(short = 'f', long, value_name = "FORMAT", default_value = "text")]
    pub format: OutputFormat,

    /// INI section holding the connection parameters
    #[arg(long, value_name = "NAME", default_value = DEFAULT_SECTION)]
    pub section: String,

    /// Directory under which Windows drives are mounted
    #[arg(long, value_name = "DIR", default_value = DEFAULT_MOUNT_ROOT)]
    pub mount_root: String,

    /// Map each drive to its own directory (D:\ -> /mnt/d) instead of always /mnt/c
    #[arg(long)]
    pub per_drive: bool,

    /// Use the in-memory mock database instead of PostgreSQL
    #[arg(long)]
    pub mock_db: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Builds the path normalizer described by the flags.
    pub fn normalizer(&self) -> PathNormalizer {
        let mapping = if self.per_drive {
            DriveMapping::PerDrive
        } else {
            DriveMapping::default()
        };
        PathNormalizer::new()
            .with_mount_root(&self.mount_root)
            .with_mapping(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    #[test]
    fn test_parse_positionals() {
        let cli = parse_args(&["pgframe", r"C:\creds\db.ini", "SELECT 1"]);
        assert_eq!(cli.config, r"C:\creds\db.ini");
        assert_eq!(cli.query, "SELECT 1");
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.section, "postgresql");
        assert!(!cli.mock_db);
    }

    #[test]
    fn test_parse_output_format() {
        let cli = parse_args(&["pgframe", "db.ini", "SELECT 1", "--format", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);

        let result = Cli::try_parse_from(["pgframe", "db.ini", "SELECT 1", "-f", "xml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_normalizer() {
        let cli = parse_args(&["pgframe", "db.ini", "SELECT 1"]);
        assert_eq!(cli.normalizer(), PathNormalizer::default());
    }

    #[test]
    fn test_per_drive_normalizer() {
        let cli = parse_args(&[
            "pgframe",
            "db.ini",
            "SELECT 1",
            "--per-drive",
            "--mount-root",
            "/media",
        ]);
        let normalizer = cli.normalizer();
        assert_eq!(normalizer.mapping(), DriveMapping::PerDrive);
        assert_eq!(normalizer.normalize(r"D:\q.sql"), "/media/d/q.sql");
    }

    #[test]
    fn test_parse_flags() {
        let cli = parse_args(&[
            "pgframe",
            "db.ini",
            "SELECT 1",
            "--mock-db",
            "--section",
            "warehouse",
            "-v",
        ]);
        assert!(cli.mock_db);
        assert!(cli.verbose);
        assert_eq!(cli.section, "warehouse");
    }
}
