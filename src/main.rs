use clap::Parser;
use tiki::cli::commands::Cli;
use tiki::cli::handlers;

fn main() {
    // Usage errors exit with status 2 from inside clap
    let cli = Cli::parse();

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
