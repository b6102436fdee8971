use items_api::types::Result;

#[tokio::main]
async fn main() -> Result<()> {
    items_api::start().await
}
