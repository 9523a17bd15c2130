//! `docchat chat` and `docchat ask`.
//!
//! Answers go to stdout; progress, warnings and errors go to stderr so a
//! transcript can be piped elsewhere.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::ingest::UploadedDocument;
use crate::session::{Session, UploadOutcome};

/// Read the given files into upload payloads.
pub fn read_uploads(files: &[PathBuf]) -> Result<Vec<UploadedDocument>> {
    files
        .iter()
        .map(|path| {
            UploadedDocument::from_path(path)
                .with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect()
}

/// Upload `docs` and print what was indexed to stderr.
pub async fn upload_and_report(session: &mut Session, docs: &[UploadedDocument]) -> Result<()> {
    eprintln!("Indexing {} document(s)...", docs.len());
    match session.upload(docs).await? {
        UploadOutcome::Built(report) => {
            for doc in &report.documents {
                eprintln!("  {}  {} chars, {} chunks", doc.name, doc.chars, doc.chunks);
            }
            for name in &report.duplicates {
                eprintln!("  {}  skipped (duplicate)", name);
            }
            eprintln!(
                "Ready: {} chunks indexed in {} ms.",
                report.chunks, report.elapsed_ms
            );
        }
        UploadOutcome::AlreadyIndexed => {
            eprintln!("Documents are already indexed for this session; upload ignored.");
        }
        UploadOutcome::NoDocuments => bail!("No documents to index"),
    }
    Ok(())
}

/// One-shot: index `files`, answer `question`, exit.
pub async fn run_ask(config: &Config, files: &[PathBuf], question: &str) -> Result<()> {
    let docs = read_uploads(files)?;
    let mut session = Session::from_config(config)?;
    upload_and_report(&mut session, &docs).await?;
    let answer = session.ask(question).await?;
    println!("{}", answer);
    Ok(())
}

/// Interactive chat over `files` on stdin/stdout.
pub async fn run_chat(config: &Config, files: &[PathBuf], transcript: Option<&Path>) -> Result<()> {
    let docs = read_uploads(files)?;
    let mut session = Session::from_config(config)?;
    upload_and_report(&mut session, &docs).await?;

    let interactive = atty::is(atty::Stream::Stdin);
    if interactive {
        eprintln!("Ask a question about your documents. Commands: /history /sources /reset /quit");
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_repl(&mut session, &docs, stdin, &mut stdout, interactive).await?;

    if let Some(path) = transcript {
        let json = session.transcript_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write transcript: {}", path.display()))?;
        eprintln!("Transcript written to {}", path.display());
    }
    Ok(())
}

/// Line-oriented chat loop.
///
/// `docs` are re-uploaded on `/reset`. Failed questions are reported and
/// the loop continues; only I/O errors end it early.
pub async fn run_repl<R, W>(
    session: &mut Session,
    docs: &[UploadedDocument],
    input: R,
    out: &mut W,
    show_prompt: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        if show_prompt {
            write!(out, "> ")?;
            out.flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/history" => {
                if session.history().is_empty() {
                    writeln!(out, "(no questions yet)")?;
                }
                for (i, turn) in session.history().iter().enumerate() {
                    writeln!(
                        out,
                        "[{}] {}\nQ: {}\nA: {}\n",
                        i + 1,
                        turn.completed_at.format("%H:%M:%S"),
                        turn.query,
                        turn.answer
                    )?;
                }
            }
            "/sources" => {
                for doc in session.sources() {
                    writeln!(
                        out,
                        "{}  id={}  {} chars  {} chunks",
                        doc.name, doc.id, doc.chars, doc.chunks
                    )?;
                }
            }
            "/reset" => {
                session.reset();
                if let Err(e) = upload_and_report(session, docs).await {
                    eprintln!("error: {e:#}");
                }
            }
            cmd if cmd.starts_with('/') => {
                eprintln!("Unknown command: {cmd}. Commands: /history /sources /reset /quit");
            }
            question => match session.ask(question).await {
                Ok(answer) => writeln!(out, "{}\n", answer)?,
                Err(e) => eprintln!("error: {e}"),
            },
        }
    }
    Ok(())
}
