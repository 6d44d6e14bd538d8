pub mod chat;
pub mod completion;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod providers;
pub mod repl;

use anyhow::{Context, Result};
use reqwest::Client;
use std::env;
use std::io;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

use chat::ChatSession;
use completion::HttpCompleter;
use config::Config;
use repl::run_repl;

pub async fn run() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cfg = Config::from_env()
        .inspect_err(|err| error!(error = %err, "invalid runtime configuration"))?;
    info!(
        model = %cfg.model,
        model_base_url = %cfg.model_base_url,
        model_timeout_secs = cfg.model_timeout_secs,
        temperature = cfg.temperature,
        max_tokens = cfg.max_tokens,
        token_limit = ?cfg.token_limit,
        context_window = ?cfg.context_window,
        has_system_prompt = cfg.system_prompt.is_some(),
        on_remote_error = cfg.on_remote_error.as_str(),
        "loaded runtime configuration"
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.model_timeout_secs))
        .build()
        .context("Failed to initialize HTTP client")?;

    let mut session =
        ChatSession::new(HttpCompleter::new(&client, &cfg)).with_context_window(cfg.context_window);
    if let Some(prompt) = &cfg.system_prompt {
        session = session.with_system_prompt(prompt.clone());
    }

    let args: Vec<String> = env::args().skip(1).collect();
    if !args.is_empty() {
        let prompt = args.join(" ");
        let answer = session.send(&prompt).await?;
        println!("{}", answer.trim());
        return Ok(ExitCode::SUCCESS);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let exit = run_repl(&mut session, cfg.on_remote_error, stdin.lock(), &mut stdout).await?;
    info!(exit = ?exit, "chat loop finished");

    if exit.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
