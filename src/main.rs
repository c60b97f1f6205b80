#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bid_box_lib::run().await
}
