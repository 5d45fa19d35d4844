//! # Atelier Workbench
//!
//! Reads one JSON request per line on stdin and writes one JSON reply per
//! line on stdout.
//!
//! ```bash
//! ATELIER_USER_ROLE=admin atelier-workbench < commands.jsonl
//! echo '{"id":1,"command":{"type":"ListEntries","payload":{"group":"pending"}}}' \
//!     | atelier-workbench
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (stderr)
//! 2. Load configuration from `ATELIER_*`
//! 3. Connect to database & run migrations
//! 4. Serve stdin until EOF

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use atelier_workbench::{handle_line, init_tracing, Workbench, WorkbenchConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = WorkbenchConfig::from_env()?;
    info!(
        database = %config.database_path.display(),
        tax_rate = %config.tax_rate.percentage(),
        "Starting Atelier workbench"
    );

    let workbench = Workbench::open(config).await?;
    let session = workbench.default_session();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut handled = 0usize;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(&workbench, &session, &line).await;
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        handled += 1;
    }

    info!(requests = handled, "Input closed, shutting down");
    workbench.db().close().await;
    Ok(())
}
