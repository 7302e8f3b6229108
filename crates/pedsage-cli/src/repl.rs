//! Subcommand: `pedsage chat` -- interactive REPL.
//!
//! Plain lines are recorded as user messages; slash commands record
//! assistant turns and inspect memory.

use std::io::{self, Write as _};

use anyhow::Result;
use pedsage_memory::{MemoryManager, Role};
use tracing::info;

use crate::config::PedsageConfig;
use crate::helpers::{print_history, print_scored, print_stats};

const HELP: &str = "\
  <text>              record a user message
  /assistant <text>   record an assistant reply
  /recall <question>  show the context sent with a question
  /search <query>     rank stored memories
  /stats              memory counts
  /history            sessions, most recent first
  /new                start a new session
  /clear              delete all memories and sessions
  /help               this list
  quit                exit";

/// One parsed REPL input line.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand<'a> {
    Empty,
    Quit,
    Help,
    User(&'a str),
    Assistant(&'a str),
    Recall(&'a str),
    Search(&'a str),
    Stats,
    History,
    New,
    Clear,
    /// A slash command that is unknown or missing its argument.
    Invalid(&'a str),
}

pub fn parse_line(line: &str) -> ReplCommand<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Empty;
    }
    if trimmed == "quit" || trimmed == "exit" {
        return ReplCommand::Quit;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return ReplCommand::User(trimmed);
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match (name, arg.is_empty()) {
        ("assistant", false) => ReplCommand::Assistant(arg),
        ("recall", false) => ReplCommand::Recall(arg),
        ("search", false) => ReplCommand::Search(arg),
        ("stats", _) => ReplCommand::Stats,
        ("history", _) => ReplCommand::History,
        ("new", _) => ReplCommand::New,
        ("clear", _) => ReplCommand::Clear,
        ("help", _) => ReplCommand::Help,
        ("quit" | "exit", _) => ReplCommand::Quit,
        _ => ReplCommand::Invalid(trimmed),
    }
}

/// Run the interactive REPL until `quit` or end of input.
pub async fn cmd_chat(config: &PedsageConfig, mut memory: MemoryManager) -> Result<()> {
    println!();
    println!("  pedsage v{}", env!("CARGO_PKG_VERSION"));
    match memory.current_session() {
        Some(session) => println!(
            "  Resuming session {} ({} messages).",
            session.session_id,
            session.messages.len()
        ),
        None => println!("  A new session starts with your first message."),
    }
    println!("  Type /help for commands, or 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut line_buf = String::new();

    loop {
        print!("> ");
        io::stdout().flush().ok();

        line_buf.clear();
        match stdin.read_line(&mut line_buf) {
            Ok(0) => {
                println!();
                info!("EOF received, exiting");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("  Error reading input: {e}");
                continue;
            }
        }

        match parse_line(&line_buf) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => {
                info!("user requested exit");
                break;
            }
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::User(text) => record(&mut memory, Role::User, text).await,
            ReplCommand::Assistant(text) => record(&mut memory, Role::Assistant, text).await,
            ReplCommand::Recall(question) => {
                let context =
                    memory.build_context(question, Vec::new(), config.memory.context_window);
                if context.is_empty() {
                    println!("  (no context)");
                } else {
                    println!("{}", context.render());
                }
            }
            ReplCommand::Search(query) => {
                print_scored(&memory.search_scored(query, config.memory.search_limit));
            }
            ReplCommand::Stats => print_stats(&memory.get_memory_stats())?,
            ReplCommand::History => {
                print_history(&memory.get_conversation_history(), memory.current_session_id());
            }
            ReplCommand::New => {
                let id = memory.start_session().await;
                println!("  Started session {id}.");
            }
            ReplCommand::Clear => {
                memory.clear_memories().await;
                println!("  All memories and sessions deleted.");
            }
            ReplCommand::Invalid(line) => {
                println!("  Unrecognized command: {line} (try /help)");
            }
        }
        println!();
    }

    info!("shutting down");
    Ok(())
}

async fn record(memory: &mut MemoryManager, role: Role, text: &str) {
    let ids = memory.add_message(role, text).await;
    match ids.len() {
        0 => println!("  ({role} message recorded)"),
        1 => println!("  ({role} message recorded, 1 memory extracted)"),
        n => println!("  ({role} message recorded, {n} memories extracted)"),
    }
}
