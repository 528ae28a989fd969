//! Headless mode for the oracle.
//!
//! A line-oriented interface for running consultations without a TUI,
//! suitable for scripting and automated testing.

use std::io::{self, BufRead, Write};

use portals_core::{LogEntry, LogKind, RunOutcome, Session};

fn tag(kind: LogKind) -> &'static str {
    match kind {
        LogKind::Draw => "[DRAW]",
        LogKind::Verse => "[VERSE]",
        LogKind::Analysis => "[ANALYSIS]",
        LogKind::Chart => "[CHART]",
        LogKind::Inspiration => "[INSPIRATION]",
        LogKind::Success => "[SUCCESS]",
        LogKind::Silence => "[SILENCE]",
        LogKind::Error => "[ERROR]",
    }
}

fn print_entries(entries: &[LogEntry]) {
    for entry in entries {
        println!("{} {}", tag(entry.kind), entry.text);
    }
}

fn print_help() {
    println!("  #connect [model]  - Connect to an Ollama model");
    println!("  #models           - List models on the Ollama server");
    println!("  #consult [line]   - Consult the oracle (optionally with a fixed draw)");
    println!("  #date YYYY-MM-DD  - Set the chart date");
    println!("  #chronicle        - Print the story, newest chapter first");
    println!("  #log              - Print the last run's messages");
    println!("  #status           - Show session status");
    println!("  #help             - Show this help");
    println!("  #quit             - Exit");
}

fn print_status(session: &Session) {
    println!("[STATUS]");
    println!("  Backend: {}", session.model_name().unwrap_or("not connected"));
    println!("  Oracle: {}", session.variant());
    println!("  Chart date: {}", session.chart_date());
    println!("  Story: {} ({} chapters)", session.story().title, session.story().len());
    println!("  Can consult: {}", session.can_consult());
}

fn print_chronicle(session: &Session) {
    let story = session.story();
    println!("[CHRONICLE] {}", story.title);
    for chapter in story.chapters.iter().rev() {
        println!();
        println!("Chapter {}", chapter.chapter_num);
        println!("{}", chapter.content);
    }
}

/// Run the oracle in headless mode.
///
/// Lines starting with `#` are commands; `default_model` is used by a bare
/// `#connect`.
pub async fn run_headless(mut session: Session, default_model: &str) -> anyhow::Result<()> {
    println!("=== Portals Headless Mode ===");
    println!("Story: {} ({} chapters)", session.story().title, session.story().len());
    println!("Oracle: {}", session.variant());
    println!();
    println!("Commands:");
    print_help();
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(command) = line.strip_prefix('#') else {
            println!("[ERROR] Unknown input. Type #help for help.");
            continue;
        };

        let parts: Vec<&str> = command.split_whitespace().collect();
        match parts.first().copied() {
            Some("quit") | Some("exit") => {
                println!("Goodbye!");
                break;
            }
            Some("connect") => {
                let model = if parts.len() > 1 {
                    parts[1..].join(" ")
                } else {
                    default_model.to_string()
                };
                println!("[CONNECTING] {model}");
                stdout.flush().ok();
                match session.connect(&model).await {
                    Ok(()) => println!(
                        "[CONNECTED] Successfully connected to Ollama with model '{model}'."
                    ),
                    Err(e) => println!(
                        "[ERROR] Failed to connect to Ollama. Ensure Ollama is running and the model is downloaded. Error: {e}"
                    ),
                }
            }
            Some("models") => {
                let mut client = ollama::Ollama::new(default_model);
                if let Some(host) = session.config().host.as_deref() {
                    client = client.with_host(host);
                }
                match client.list_models().await {
                    Ok(models) if models.is_empty() => println!("[MODELS] none installed"),
                    Ok(models) => {
                        println!("[MODELS]");
                        for model in models {
                            println!("  {} ({:.1} GB)", model.name, model.size as f64 / 1e9);
                        }
                    }
                    Err(e) => println!("[ERROR] {e}"),
                }
            }
            Some("consult") => {
                let fixed = match parts.get(1).map(|s| s.parse::<u32>()) {
                    None => None,
                    Some(Ok(draw)) => Some(draw),
                    Some(Err(_)) => {
                        println!("[ERROR] Usage: #consult [line]");
                        continue;
                    }
                };

                print!("[PROCESSING]");
                stdout.flush().ok();

                let result = match session.begin_run() {
                    Ok(ticket) => {
                        let draw = fixed.unwrap_or_else(|| ticket.draw(&mut rand::thread_rng()));
                        let report = ticket.execute(draw, None).await;
                        Ok(session.finish_run(report))
                    }
                    Err(e) => Err(e),
                };

                print!("\r            \r");
                stdout.flush().ok();

                match result {
                    Ok(outcome) => {
                        print_entries(session.log());
                        if let RunOutcome::ChapterWritten(run) = &outcome {
                            if let Some(chapter) = &run.chapter {
                                println!("[CHAPTER {}]", chapter.chapter_num);
                                println!("{}", chapter.content);
                            }
                        }
                    }
                    Err(e) => println!("[ERROR] {e}"),
                }
            }
            Some("date") => match parts.get(1).and_then(|s| crate::app::parse_date(s)) {
                Some(date) => {
                    session.set_chart_date(date);
                    println!("[DATE] {date}");
                }
                None => println!("[ERROR] Usage: #date YYYY-MM-DD"),
            },
            Some("chronicle") => print_chronicle(&session),
            Some("log") => print_entries(session.log()),
            Some("status") => print_status(&session),
            Some("help") => {
                println!("[HELP]");
                print_help();
            }
            _ => println!("[ERROR] Unknown command. Type #help for help."),
        }
        stdout.flush().ok();
    }

    Ok(())
}
