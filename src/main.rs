#[tokio::main]
async fn main() {
    bagan_bracket::run().await;
}
