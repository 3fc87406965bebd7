//! Command-line entry point for `wsclient`.

#[tokio::main]
async fn main() -> anyhow::Result<()> { wsclient::cli::run().await }
