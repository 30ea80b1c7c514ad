#[tokio::main]
async fn main() {
    let code = topicbroker::app::startup::startup().await;
    std::process::exit(code);
}
