//! Lantern world server binary entry point.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lib_lantern::init().await
}
