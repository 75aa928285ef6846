use anyhow::Result;
use debug_llm::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
