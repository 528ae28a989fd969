//! Tests against a real Ollama server.
//!
//! Run with: `cargo test -p portals-core --test live_backend -- --ignored --nocapture`
//!
//! These tests need a reachable server (`OLLAMA_HOST`, default
//! `http://localhost:11434`) with `OLLAMA_MODEL` pulled.

use portals_core::testing::numbered_corpus;
use portals_core::{LogKind, RunOutcome, Session, SessionConfig, Variant};
use tempfile::TempDir;

fn setup() {
    let _ = dotenvy::dotenv();
}

fn model_name() -> String {
    std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3".to_string())
}

async fn server_is_up() -> bool {
    ollama::Ollama::from_env().list_models().await.is_ok()
}

#[tokio::test]
#[ignore]
async fn test_connect_and_consult() {
    setup();
    if !server_is_up().await {
        eprintln!("Skipping test: no Ollama server reachable");
        return;
    }

    let dir = TempDir::new().expect("Failed to create temp dir");
    let corpus = dir.path().join("NumBible.TXT");
    std::fs::write(&corpus, numbered_corpus(200)).unwrap();

    let mut config = SessionConfig::new(&corpus, dir.path().join("campaign.json"))
        .with_variant(Variant::Celestial);
    if let Ok(host) = std::env::var("OLLAMA_HOST") {
        config = config.with_host(host);
    }

    let mut session = Session::open(config).await.expect("Failed to open session");
    session
        .connect(&model_name())
        .await
        .expect("Failed to connect to model");

    let outcome = session.consult_with_draw(100).await.expect("Run should start");
    for entry in session.log() {
        println!("[{:?}] {}", entry.kind, entry.text);
    }

    match outcome {
        RunOutcome::ChapterWritten(run) => {
            let chapter = run.chapter.expect("chapter recorded");
            assert_eq!(chapter.chapter_num, 1);
            assert!(!chapter.content.contains("<think>"));
        }
        RunOutcome::Failed { reason } => panic!("run failed: {reason}"),
        other => panic!("empty story should always write a chapter, got {other:?}"),
    }
    assert!(session.log().iter().any(|e| e.kind == LogKind::Chart));
}

#[tokio::test]
#[ignore]
async fn test_connect_to_unknown_model_fails() {
    setup();
    if !server_is_up().await {
        eprintln!("Skipping test: no Ollama server reachable");
        return;
    }

    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("NumBible.TXT");
    std::fs::write(&corpus, numbered_corpus(10)).unwrap();
    let mut config = SessionConfig::new(&corpus, dir.path().join("campaign.json"));
    if let Ok(host) = std::env::var("OLLAMA_HOST") {
        config = config.with_host(host);
    }
    let mut session = Session::open(config).await.unwrap();

    let result = session.connect("definitely-not-a-real-model:0b").await;
    assert!(result.is_err());
    assert!(!session.is_configured());
}
