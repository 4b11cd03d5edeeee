use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tiki",
    about = concat!("tiki v", env!("CARGO_PKG_VERSION"), " - tickets as markdown, boards in the terminal"),
    version,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Markdown file to open in the document viewer
    #[arg(value_name = "FILE|URL")]
    pub target: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create .doc/tiki with a default workflow and config
    Init(InitArgs),
    /// Print version, platform, paths and repository details
    Sysinfo,
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing workflow.yaml and config.yaml
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn no_arguments_launches_board() {
        let cli = Cli::try_parse_from(["tiki"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.target.is_none());
    }

    #[test]
    fn positional_file() {
        let cli = Cli::try_parse_from(["tiki", "notes.md"]).unwrap();
        assert_eq!(cli.target.as_deref(), Some("notes.md"));
    }

    #[test]
    fn init_with_force() {
        let cli = Cli::try_parse_from(["tiki", "init", "--force"]).unwrap();
        match cli.command {
            Some(Commands::Init(args)) => assert!(args.force),
            _ => panic!("expected init"),
        }
    }

    #[test]
    fn positional_with_subcommand_is_usage_error() {
        let err = Cli::try_parse_from(["tiki", "notes.md", "sysinfo"])
            .err()
            .unwrap();
        assert_ne!(err.kind(), ErrorKind::DisplayHelp);
        assert_eq!(err.exit_code(), 2);
    }
}
