use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bnk",
    about = "SoundBank tool: list, extract, replace, and strip embedded .wem objects",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with bank settings (alignment, backups)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List objects contained in the bank
    List(ListArgs),
    /// Show the chunk layout of the bank
    Info(InfoArgs),
    /// Extract objects to <id>.wem files (no names = all)
    Extract(ExtractArgs),
    /// Replace objects with the contents of <id>.wem files
    Update(EditArgs),
    /// Replace objects with empty content
    Empty(EditArgs),
    /// Remove objects and their index records
    Delete(EditArgs),
}

#[derive(Args)]
pub struct ListArgs {
    pub bank: PathBuf,
}

#[derive(Args)]
pub struct InfoArgs {
    pub bank: PathBuf,
}

#[derive(Args)]
pub struct ExtractArgs {
    pub bank: PathBuf,
    /// Object names (`123`, `123.wem`) or `[file]` with one name per word
    pub names: Vec<String>,
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct EditArgs {
    pub bank: PathBuf,
    /// Object names (`123.wem`) or `[file]` with one name per word
    #[arg(required = true)]
    pub names: Vec<String>,
    /// Write the edited bank here instead of in place
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list() {
        let cli = Cli::try_parse_from(["bnk", "list", "sb.bnk"]).unwrap();
        if let Command::List(args) = cli.command {
            assert_eq!(args.bank, PathBuf::from("sb.bnk"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_extract_all() {
        let cli = Cli::try_parse_from(["bnk", "extract", "sb.bnk"]).unwrap();
        if let Command::Extract(args) = cli.command {
            assert!(args.names.is_empty());
            assert_eq!(args.output, PathBuf::from("."));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_extract_names_and_dir() {
        let cli = Cli::try_parse_from([
            "bnk", "extract", "sb.bnk", "1.wem", "[list.txt]", "-o", "out",
        ])
        .unwrap();
        if let Command::Extract(args) = cli.command {
            assert_eq!(args.names, vec!["1.wem", "[list.txt]"]);
            assert_eq!(args.output, PathBuf::from("out"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_update_requires_names() {
        assert!(Cli::try_parse_from(["bnk", "update", "sb.bnk"]).is_err());
    }

    #[test]
    fn parse_empty_with_output() {
        let cli =
            Cli::try_parse_from(["bnk", "empty", "sb.bnk", "42", "--output", "new.bnk"]).unwrap();
        if let Command::Empty(args) = cli.command {
            assert_eq!(args.names, vec!["42"]);
            assert_eq!(args.output, Some(PathBuf::from("new.bnk")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_delete() {
        let cli = Cli::try_parse_from(["bnk", "delete", "sb.bnk", "7.wem"]).unwrap();
        assert!(matches!(cli.command, Command::Delete(_)));
    }

    #[test]
    fn parse_globals() {
        let cli = Cli::try_parse_from([
            "bnk", "list", "sb.bnk", "-v", "--format", "json", "--config", "bnk.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.config, Some(PathBuf::from("bnk.toml")));
    }
}
