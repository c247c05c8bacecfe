use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = newsdesk_editor::cli::Cli::parse();
    newsdesk_editor::run(cli).await?;
    Ok(())
}
