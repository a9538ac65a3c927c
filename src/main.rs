#[tokio::main]
async fn main() -> anyhow::Result<()> {
    classwatch_lib::run().await
}
