use crate::prelude::{eprintln, *};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::ServerContext;

pub async fn run_stdio(context: ServerContext) -> Result<()> {
    if context.global.verbose {
        eprintln!("Starting raindrop MCP server with stdio transport...");
        eprintln!();
    }

    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = tokio::select! {
            _ = context.cancel.cancelled() => {
                log::info!("shutting down stdio transport");
                break;
            }
            read = reader.read_line(&mut line) => read?,
        };

        if bytes_read == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if context.global.verbose {
            eprintln!("Received: {trimmed}");
        }

        let Some(response) = super::handle_request(trimmed, &context).await else {
            continue;
        };
        let response_json = serde_json::to_string(&response)?;

        if context.global.verbose {
            eprintln!("Sending: {response_json}");
        }

        stdout.write_all(response_json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
