use anyhow::Result;
use clap::Parser;
use tracing::info;

use fdfs_client::{Args, Client, Command, init_logging, load_config};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref());

    let config = load_config(&args.config)?;
    info!(
        trackers = config.tracker_addrs.len(),
        max_connections = config.max_connections,
        "Loaded configuration from {}",
        args.config.display()
    );

    let client = Client::new(config).await?;
    let outcome = run(&client, args.command).await;
    client.close().await;
    outcome
}

async fn run(client: &Client, command: Command) -> Result<()> {
    match command {
        Command::Upload { path } => {
            let file_id = client.upload_file(&path).await?;
            println!("{file_id}");
        }
        Command::Download {
            file_id,
            dest,
            offset,
            length,
        } => {
            let written = client
                .download_to_file(&file_id, &dest, offset, length)
                .await?;
            info!(file_id = %file_id, bytes = written, "Downloaded to {}", dest.display());
        }
        Command::Delete { file_id } => {
            client.delete_file(&file_id).await?;
            info!(file_id = %file_id, "Deleted");
        }
    }
    Ok(())
}
