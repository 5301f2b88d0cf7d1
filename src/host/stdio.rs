//! Stdin/stdout bridge for driving an update session from another process.
//!
//! Reads one command word per line from stdin, forwards it to the session
//! and writes [`HostMessage`] JSON lines to stdout: a reply per command and
//! a snapshot whenever the session changes.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use crate::config::UpdateConfig;
use crate::error::{Result, UpdateError};
use crate::host::contract::{HostCommand, HostMessage};
use crate::update::controller::{UpdateHandle, update_session};
use crate::update::provider::UpdateProvider;
use crate::update::state::CheckMode;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;

type SharedWriter<W> = Arc<Mutex<BufWriter<W>>>;

/// Run a session for `provider` on stdin/stdout until stdin closes or a
/// `quit` command is received.
pub async fn run_stdio_host<P: UpdateProvider>(provider: Arc<P>, config: UpdateConfig) -> Result<()> {
    let (handle, controller) = update_session(provider, config)?;
    let controller_task = controller.spawn();

    let result = run_host(
        handle.clone(),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    handle.shutdown();
    let _ = controller_task.await;
    result
}

/// Drive `handle` from `reader`, writing protocol lines to `writer`.
///
/// Two tasks run side by side:
///
/// 1. **Reader** -- parses command lines, forwards them to the session and
///    writes a reply for each.
/// 2. **Snapshot forwarder** -- writes a snapshot line every time the
///    session publishes a change.
///
/// Returns when the reader finishes. The forwarder is stopped then.
pub async fn run_host<R, W>(handle: UpdateHandle, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer: SharedWriter<W> = Arc::new(Mutex::new(BufWriter::new(writer)));

    let forward_writer = Arc::clone(&writer);
    let mut snapshots = handle.subscribe();
    let forwarder = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            let mut w = forward_writer.lock().await;
            if let Err(e) = write_message(&mut *w, &HostMessage::snapshot(snapshot)).await {
                tracing::warn!(
                    error = %e,
                    "failed to write snapshot; stopping snapshot forwarder"
                );
                break;
            }
        }
        tracing::debug!("snapshot forwarder stopped");
    });

    let result = run_reader(&handle, reader, &writer).await;

    forwarder.abort();
    let _ = forwarder.await;
    result
}

async fn run_reader<R, W>(handle: &UpdateHandle, mut reader: R, writer: &SharedWriter<W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| UpdateError::Channel(format!("failed to read command: {e}")))?;

        if bytes_read == 0 {
            tracing::info!("input closed (EOF); shutting down update host");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some(command) = HostCommand::parse(trimmed) else {
            tracing::warn!(raw_line = %trimmed, "unknown host command");
            let reply = HostMessage::error(trimmed, format!("unknown command: {trimmed}"));
            write_message(&mut *writer.lock().await, &reply).await?;
            continue;
        };

        let outcome = match command {
            HostCommand::Check => handle.check_for_updates(CheckMode::Manual).await,
            HostCommand::CheckSilent => handle.check_for_updates(CheckMode::Silent).await,
            HostCommand::Download => handle.request_download().await,
            HostCommand::Install => handle.request_install().await,
            HostCommand::Status => {
                let status = HostMessage::snapshot(handle.snapshot());
                write_message(&mut *writer.lock().await, &status).await?;
                continue;
            }
            HostCommand::Quit => {
                handle.shutdown();
                Ok(())
            }
        };

        let reply = match outcome {
            Ok(()) => HostMessage::ok(command),
            Err(e) => {
                tracing::error!(error = %e, command = command.as_str(), "host command failed");
                HostMessage::error(command.as_str(), e.to_string())
            }
        };
        write_message(&mut *writer.lock().await, &reply).await?;

        if command == HostCommand::Quit {
            tracing::info!("quit received; shutting down update host");
            break;
        }
    }

    Ok(())
}

/// Write a single JSON line to the buffered writer and flush.
async fn write_message<W>(writer: &mut BufWriter<W>, message: &HostMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)
        .map_err(|e| UpdateError::Channel(format!("failed to serialize host message: {e}")))?;
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| UpdateError::Channel(format!("failed to write to output: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| UpdateError::Channel(format!("failed to write newline to output: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| UpdateError::Channel(format!("failed to flush output: {e}")))?;
    Ok(())
}
