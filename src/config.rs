//! Process configuration (SPEC_FULL.md §C12): CLI flags per role, parsed
//! with `clap` the way a small standalone binary would, plus the
//! `tracing-subscriber` setup shared by all three `bin/`s.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Runs one role of the promise/puzzle protocol")]
pub struct BobArgs {
    /// Address the Tumbler is listening on.
    #[arg(long, default_value = "127.0.0.1:7001")]
    pub tumbler_addr: String,

    /// Address Alice is listening on.
    #[arg(long, default_value = "127.0.0.1:7002")]
    pub alice_addr: String,

    /// Address to listen on for Alice's puzzle solution.
    #[arg(long, default_value = "127.0.0.1:7003")]
    pub listen_addr: String,

    /// Path to this role's persisted key bundle (spec §6).
    #[arg(long)]
    pub keyfile: PathBuf,

    /// Transaction hash this session's promise is bound to, hex-encoded.
    #[arg(long)]
    pub tx: String,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Parser, Debug)]
#[command(about = "Runs the Tumbler's promise-phase server")]
pub struct TumblerArgs {
    #[arg(long, default_value = "127.0.0.1:7001")]
    pub listen_addr: String,

    #[arg(long)]
    pub keyfile: PathBuf,

    /// Transaction hash this session's promise is bound to, hex-encoded;
    /// shared config agreed with Bob out of band, never sent over the wire.
    #[arg(long)]
    pub tx: String,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Parser, Debug)]
#[command(about = "Runs Alice's puzzle-randomization server")]
pub struct AliceArgs {
    #[arg(long, default_value = "127.0.0.1:7002")]
    pub listen_addr: String,

    #[arg(long)]
    pub keyfile: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Installs a `tracing-subscriber` filter keyed off `-v`/`-vv`/`-vvv`,
/// falling back to `RUST_LOG` when set (spec's ambient logging stack).
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
