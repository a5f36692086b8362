use std::{env, io, process};

use split_ledger::csv::{read_commands, write_balances};
use split_ledger::{Registry, RegistryConfig};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: split-ledger <commands.csv>");
        process::exit(2);
    };

    if !path.ends_with(".csv") {
        warn!(path, "input file seems to not be a csv file");
    }

    let config = match RegistryConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            process::exit(2);
        }
    };

    let commands = match read_commands(path) {
        Ok(commands) => commands,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    let registry = Registry::new(config);
    let (command_sender, command_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in commands {
            match result {
                Ok(command) => {
                    if command_sender.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    registry.run(ReceiverStream::new(command_receiver)).await;

    if let Err(e) = write_balances(io::stdout().lock(), &registry) {
        error!("{e}");
        process::exit(1);
    }
}
