use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    sign_detection::run().await
}
