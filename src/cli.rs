use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "jmodel")]
#[command(about = "Inspect Java sources through the element model: Javadoc, outlines and deltas")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Tags and problems of every documentation comment in a file.
    Javadoc {
        file: PathBuf,

        /// Keep text fragments and record invalid tags.
        #[arg(long)]
        dom: bool,
    },
    /// Element tree of a compilation unit.
    Outline {
        file: PathBuf,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Record the element tree of a compilation unit for a later diff.
    Snapshot { file: PathBuf },
    /// Delta between the recorded snapshot and the file as it is now.
    Diff {
        file: PathBuf,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Replace the recorded snapshot with the current tree.
        #[arg(long)]
        update: bool,
    },
    /// Open every compilation unit under a source folder.
    Index { dir: PathBuf },
    Stats,
    Clear,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_db_precedes_the_subcommand() {
        let cli = Cli::parse_from(["jmodel", "--db", "/tmp/s.lmdb", "diff", "A.java", "--update"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/s.lmdb")));
        match cli.command {
            Commands::Diff { file, format, update } => {
                assert_eq!(file, PathBuf::from("A.java"));
                assert_eq!(format, OutputFormat::Text);
                assert!(update);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn outline_defaults_to_json() {
        let cli = Cli::parse_from(["jmodel", "outline", "A.java", "-f", "text"]);
        assert!(matches!(
            cli.command,
            Commands::Outline {
                format: OutputFormat::Text,
                ..
            }
        ));
    }
}
