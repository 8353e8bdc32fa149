#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    beach_flow_agenda::run().await
}
