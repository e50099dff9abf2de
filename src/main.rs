// Konsolen-Frontend, die eigentliche Logik liegt in der Library
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dealsmart_voice_lib::run().await
}
