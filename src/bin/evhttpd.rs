// Copyright 2025 jonefeewang@gmail.com
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::Parser;
use dotenv::dotenv;
use evhttpd::{
    global_config, setup_tracing, AppError, AppResult, Server, ServerConfig, GLOBAL_CONFIG,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(version)]
pub struct CommandLine {
    /// path to config file
    #[arg(short, long)]
    pub conf: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
    /// log level when RUST_LOG is unset (default: info, v: debug, vv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Parser)]
pub enum Command {
    /// print the effective configuration and exit
    PrintConfig,
}

fn main() -> AppResult<()> {
    // load .env file
    dotenv().ok();

    //setup config
    let commandline: CommandLine = CommandLine::parse();
    let config_path = commandline.conf.as_ref().map_or_else(
        || {
            let mut path = PathBuf::from("./");
            path.push("conf.toml");
            path
        },
        PathBuf::from,
    );
    let server_config = ServerConfig::set_up_config(config_path)?;

    if let Some(Command::PrintConfig) = commandline.command {
        println!("{:#?}", server_config);
        return Ok(());
    }

    // keep the guard alive, it flushes the log file on exit
    let _log_guard = setup_tracing(commandline.verbose, &server_config.log)?;

    GLOBAL_CONFIG
        .set(server_config)
        .map_err(|_| AppError::IllegalStateError("server config set twice".to_string()))?;

    let server = Server::new(global_config());
    // ctrl-c and SIGTERM end the loop through the normal cleanup path
    server.shutdown_handle().register_signals()?;
    server.run()?;

    info!("server shutdown complete");
    Ok(())
}
