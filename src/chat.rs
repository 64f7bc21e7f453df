//! Interactive terminal chat against a running server.

use anyhow::{Context, Result};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::mode::Mode;
use crate::render::render_message;
use crate::session::ChatSession;
use crate::transport::HttpChatTransport;

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Text(&'a str),
    SetMode(Result<Mode, String>),
    Reset,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Text(line.trim_end_matches(['\r', '\n']));
    };

    let mut parts = command.splitn(2, char::is_whitespace);
    match (parts.next().unwrap_or_default(), parts.next().map(str::trim)) {
        ("mode", Some(value)) => Input::SetMode(value.parse().map_err(|_| value.to_string())),
        ("mode", None) => Input::SetMode(Err(String::new())),
        ("reset", _) => Input::Reset,
        ("help", _) => Input::Help,
        ("quit" | "exit", _) => Input::Quit,
        (other, _) => Input::Unknown(other),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /mode <generative|retrieval|rag>  switch mode for the next message");
    println!("  /reset                            clear the conversation");
    println!("  /help                             show this help");
    println!("  /quit                             leave the chat");
}

pub async fn run_chat(server_url: &str, mode: Mode, timeout: Option<Duration>) -> Result<()> {
    let transport = HttpChatTransport::new(server_url, timeout)
        .context("Failed to create HTTP client")?;
    info!(url = transport.url(), "Starting chat session");

    let mut session = ChatSession::new(transport);
    if let Some(timeout) = timeout {
        session = session.with_timeout(timeout);
    }
    session.set_mode(mode);

    println!("Chatting with {} in {} mode. Type /help for commands.", server_url, mode);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("[{}] > ", session.mode());
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match parse_input(&line) {
            Input::Empty => {}
            Input::Text(text) => {
                println!("(thinking...)");
                let before = session.messages().len();
                if session.submit(text).await {
                    for message in &session.messages()[before..] {
                        if message.is_bot() {
                            println!("{}\n", render_message(message, session.mode()));
                        }
                    }
                }
            }
            Input::SetMode(Ok(mode)) => {
                session.set_mode(mode);
                println!("Mode set to {}", mode);
            }
            Input::SetMode(Err(value)) => {
                println!("Unknown mode '{}'. Use generative, retrieval or rag.", value);
            }
            Input::Reset => {
                session.reset();
                println!("Conversation cleared.");
            }
            Input::Help => print_help(),
            Input::Quit => break,
            Input::Unknown(command) => println!("Unknown command: /{}", command),
        }
    }

    info!(messages = session.messages().len(), "Chat session ended");
    Ok(())
}
