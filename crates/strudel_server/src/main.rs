use std::path::PathBuf;

use clap::{Arg, Command, value_parser};
use strudel_server::{ServerConfig, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let defaults = ServerConfig::default();

    let matches = Command::new("Strudel")
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("HTTP server for the ambient pattern player and its change queue")
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_name("PORT")
                .env("STRUDEL_PORT")
                .value_parser(value_parser!(u16))
                .default_value("8080")
                .num_args(1),
        )
        .arg(
            Arg::new("pattern-file")
                .long("pattern-file")
                .short('f')
                .value_name("PATH")
                .env("STRUDEL_PATTERN_FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value("patterns.js")
                .num_args(1),
        )
        .arg(
            Arg::new("static-dir")
                .long("static-dir")
                .value_name("DIR")
                .env("STRUDEL_STATIC_DIR")
                .value_parser(value_parser!(PathBuf))
                .default_value(".")
                .num_args(1),
        )
        .arg(
            Arg::new("agent-command")
                .long("agent-command")
                .value_name("COMMAND")
                .env("STRUDEL_AGENT_COMMAND")
                .help("Program that receives instructions on stdin when a change's text is missing")
                .num_args(1),
        )
        .get_matches();

    let config = ServerConfig {
        port: matches.get_one::<u16>("port").copied().unwrap_or(defaults.port),
        pattern_file: matches
            .get_one::<PathBuf>("pattern-file")
            .cloned()
            .unwrap_or(defaults.pattern_file),
        static_dir: matches
            .get_one::<PathBuf>("static-dir")
            .cloned()
            .unwrap_or(defaults.static_dir),
        agent_command: matches.get_one::<String>("agent-command").cloned(),
    };

    run_server(config).await
}
