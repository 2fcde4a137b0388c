use clap::Parser;
use env_logger::{Builder, Env};
use spytrader::cli::{run, Cli};

fn init_logging() {
    // RUST_LOG overrides the default level, e.g. RUST_LOG=debug to log fills.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() -> std::process::ExitCode {
    init_logging();
    run(Cli::parse())
}
