// rtc-chat: interactive terminal client for the chat session layer.
//
// Reads credentials and prompts from config.json / questions.json (assets/ in
// development, next to the executable otherwise). Lines typed on stdin are
// sent as user messages; lines starting with '/' are commands.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use rtc_chat_session::{ChatSession, FileConfigSource, SessionEvent, SessionOptions, Sender};

const HELP: &str = "\
commands:
  /start            start sending queued prompts
  /stop             stop sending queued prompts
  /cadence <ms>     set the delay between prompts
  /select <index>   move the cursor to a prompt
  /reconnect        reopen the connection
  /reload           reload config.json and questions.json
  /history          print the conversation so far
  /status           print connection and scheduler state
  /quit             exit
anything else is sent as a message";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let source = FileConfigSource::detect().context("cannot locate config directory")?;
    source.ensure_files();
    log::info!(
        "using config in {} ({})",
        source.dir().display(),
        if source.is_dev() { "development" } else { "production" }
    );

    let options = SessionOptions {
        endpoint: std::env::var("RTC_CHAT_ENDPOINT").ok(),
        ..SessionOptions::default()
    };

    let session = ChatSession::builder(options).config_source(source).spawn();
    if !session.snapshot().config_ready {
        log::warn!("config.json is missing credentials; edit it and run /reload");
    }

    let printer = tokio::spawn(print_events(session.clone()));

    if let Err(e) = session.ensure_open().await {
        log::warn!("{e}");
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !run_command(&session, line).await? {
            break;
        }
    }

    session.shutdown().await;
    let _ = printer.await;
    Ok(())
}

/// Handle one input line; returns `false` to exit
async fn run_command(session: &ChatSession, line: &str) -> Result<bool> {
    let (command, arg) = line
        .split_once(' ')
        .map_or((line, ""), |(c, a)| (c, a.trim()));

    match command {
        "/quit" | "/exit" => return Ok(false),
        "/help" => println!("{HELP}"),
        "/start" => match session.start().await {
            Ok(true) => {}
            Ok(false) => println!("nothing to start (already running or no prompts)"),
            Err(e) => println!("cannot start: {e}"),
        },
        "/stop" => {
            if !session.stop().await? {
                println!("scheduler is not running");
            }
        }
        "/cadence" => match arg.parse::<u64>() {
            Ok(ms) => session.set_cadence(Duration::from_millis(ms)).await?,
            Err(_) => println!("usage: /cadence <milliseconds>"),
        },
        "/select" => match arg.parse::<usize>() {
            Ok(index) => match session.select_prompt(index).await? {
                Some(prompt) => println!("selected [{index}] {prompt}"),
                None => println!("no prompt at index {index}"),
            },
            Err(_) => println!("usage: /select <index>"),
        },
        "/reconnect" => {
            if let Err(e) = session.reconnect().await {
                println!("reconnect failed: {e}");
            }
        }
        "/reload" => {
            let config = session.reload_config().await?;
            let prompts = session.reload_prompt_queue().await?;
            println!("config ready: {config}, prompts ready: {prompts}");
        }
        "/history" => {
            for message in session.history() {
                println!(
                    "[{}] {}: {}",
                    message.finalized_at.format("%H:%M:%S"),
                    message.sender.as_str(),
                    message.text
                );
            }
        }
        "/status" => {
            let snapshot = session.snapshot();
            let window = snapshot.prompt_window();
            println!(
                "connection: {}, scheduler: {}, cadence: {:?}, cursor: {}/{}",
                snapshot.status,
                if snapshot.scheduler_running { "running" } else { "idle" },
                snapshot.cadence,
                snapshot.cursor,
                snapshot.prompts.len()
            );
            println!("  prev: {}\n  now:  {}\n  next: {}", window.previous, window.current, window.next);
        }
        other if other.starts_with('/') => println!("unknown command {other}; try /help"),
        _ => {
            if let Err(e) = session.submit_user_message(line).await {
                println!("not sent: {e}");
            }
        }
    }
    Ok(true)
}

async fn print_events(session: ChatSession) {
    let mut events = Box::pin(session.events());
    drop(session);
    while let Some(event) = events.next().await {
        match event {
            SessionEvent::Message(message) if message.sender == Sender::Agent => {
                println!("agent: {}", message.text);
            }
            SessionEvent::Dispatched { index, .. } => log::info!("prompt {index} sent"),
            SessionEvent::StatusChanged(status) => log::info!("connection {status}"),
            SessionEvent::ConnectionFailed { reason } => log::warn!("connection failed: {reason}"),
            SessionEvent::ConnectionLost { reason } => {
                log::warn!("connection lost: {}", reason.as_deref().unwrap_or("closed by peer"));
            }
            SessionEvent::SchedulerStopped { reason } => log::info!("scheduler stopped: {reason:?}"),
            _ => {}
        }
    }
}
