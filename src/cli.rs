use clap::Parser;
use std::path::PathBuf;
use uuid::Uuid;

/// Ambient scene catalog and player
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// List the catalog (loads it first, seeding on first run)
    #[arg(short = 'L', long = "list")]
    pub list: bool,

    /// Start a scene by name or id
    #[arg(short = 'p', long = "play", value_name = "NAME|ID")]
    pub play: Option<String>,

    /// Print the recommended next scene
    #[arg(short = 'r', long = "recommend")]
    pub recommend: bool,

    /// Preferred scene id for --recommend (can be specified multiple times)
    #[arg(long = "prefer", value_name = "ID")]
    pub prefer: Vec<Uuid>,

    /// Print the scene scheduled for the current time
    #[arg(short = 's', long = "schedule")]
    pub schedule: bool,

    /// Hour of day (0-23) used by --schedule instead of the local clock
    #[arg(long = "hour", value_name = "H", value_parser = clap::value_parser!(u32).range(0..24))]
    pub hour: Option<u32>,

    /// Rewrite the stored catalog in the current format
    #[arg(long = "migrate")]
    pub migrate: bool,

    /// Snapshot the stored catalog into the backups directory
    #[arg(long = "backup")]
    pub backup: bool,

    /// Print the service state as JSON
    #[arg(long = "status")]
    pub status: bool,

    /// Enable debug logging to file (default: lull.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Args {
    /// True when no action flag was given
    pub fn no_action(&self) -> bool {
        !(self.list
            || self.play.is_some()
            || self.recommend
            || self.schedule
            || self.migrate
            || self.backup
            || self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_actions() {
        let id = Uuid::new_v4();
        let id_arg = id.to_string();
        let args =
            Args::try_parse_from(["lull", "-vv", "--recommend", "--prefer", id_arg.as_str(), "--hour", "23"]).unwrap();
        assert_eq!(args.verbosity, 2);
        assert!(args.recommend);
        assert_eq!(args.prefer, vec![id]);
        assert_eq!(args.hour, Some(23));
        assert!(!args.no_action());
    }

    #[test]
    fn test_hour_out_of_range_rejected() {
        assert!(Args::try_parse_from(["lull", "--schedule", "--hour", "24"]).is_err());
    }

    #[test]
    fn test_bare_invocation_has_no_action() {
        let args = Args::try_parse_from(["lull"]).unwrap();
        assert!(args.no_action());
        assert!(args.log_file.is_none());
    }
}
