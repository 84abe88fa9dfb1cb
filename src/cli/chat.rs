// src/cli/chat.rs — Interactive REPL over a single session

use crate::chat::{Session, Speaker, Submission, Transcript, Turn};
use crate::infra::config::Config;

use super::Wiring;

/// Run the interactive chat REPL.
pub async fn run_chat(wiring: Wiring, config: &Config) -> anyhow::Result<()> {
    eprintln!(
        "banter v{} | {} | persona: {} ({})",
        env!("CARGO_PKG_VERSION"),
        wiring.client.model(),
        wiring.persona.name,
        wiring.persona.source,
    );
    eprintln!("Type /help for commands, quit to leave.\n");

    let new_session = || {
        Session::new(wiring.client.clone(), wiring.options)
            .with_fallback_message(config.chat.fallback_message.clone())
    };
    let mut session = new_session();

    while let Some(input) = read_input() {
        let trimmed = input.trim();

        if trimmed == "quit" || trimmed == "exit" || trimmed == "/quit" {
            break;
        }

        if trimmed.starts_with('/') {
            match trimmed {
                "/clear" => {
                    session.close();
                    session = new_session();
                    eprintln!("  Started a new conversation.");
                }
                other => handle_slash_command(other, &session, &wiring.persona.name),
            }
            continue;
        }

        // Submit the line as typed (minus the newline); blank lines are ignored.
        let line = input.trim_end_matches(['\r', '\n']);
        match session.submit(line).await {
            Ok(Submission::Ignored) => {}
            Ok(submission) => {
                if let Some(turn) = session.reply(&submission) {
                    println!("{}\n", format_turn(turn, &wiring.persona.name));
                }
            }
            Err(e) => {
                eprintln!("[error] {e}");
                break;
            }
        }
    }

    session.close();
    eprintln!("\nSession total: {} turn(s)", session.transcript().len());
    Ok(())
}

fn read_input() -> Option<String> {
    use std::io::{self, BufRead, Write};

    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
        Ok(0) => None, // EOF
        Ok(_) => Some(line),
        Err(_) => None,
    }
}

fn handle_slash_command(input: &str, session: &Session, assistant_name: &str) {
    let cmd = input.split_whitespace().next().unwrap_or(input);

    match cmd {
        "/history" => {
            if session.transcript().is_empty() {
                eprintln!("  No messages in this conversation yet.");
            } else {
                print!("{}", format_transcript(session.transcript(), assistant_name));
            }
        }
        "/status" => {
            let options = session.options();
            eprintln!("  Session: {}", session.id());
            eprintln!("  State: {:?}", session.state());
            eprintln!("  Turns: {}", session.transcript().len());
            eprintln!(
                "  Temperature: {} | Max output tokens: {}",
                options.temperature(),
                options.max_output_tokens()
            );
        }
        "/help" => {
            eprintln!("  /history   Reprint the conversation");
            eprintln!("  /clear     Start a new conversation");
            eprintln!("  /status    Show session details");
            eprintln!("  quit       Leave");
        }
        _ => eprintln!("  Unknown command: {cmd} (try /help)"),
    }
}

/// One turn as printed in the terminal.
pub fn format_turn(turn: &Turn, assistant_name: &str) -> String {
    match turn.speaker() {
        Speaker::User => format!("you: {}", turn.text()),
        Speaker::Assistant => format!("{}: {}", assistant_name.to_lowercase(), turn.text()),
    }
}

/// The whole transcript, one turn per paragraph, in order.
pub fn format_transcript(transcript: &Transcript, assistant_name: &str) -> String {
    transcript
        .all()
        .map(|t| format!("{}\n\n", format_turn(t, assistant_name)))
        .collect()
}
