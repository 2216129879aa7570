use cirrus_server::{ServerConfig, StartupError};

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;
    let _guard = config.log_config().init();

    cirrus_server::run(config).await
}
