use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    buddy::run().await
}
