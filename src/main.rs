use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    meteo_core::init()?;

    let config = meteo_core::Config::load_validated()?;
    let app = meteo::App::build(config).await?;

    tracing::info!("meteo service started");

    app.run().await
}
