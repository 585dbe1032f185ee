use metafield::FieldConfig;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("metafield=info")),
        )
        .init();

    // Optional JSON config as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => match FieldConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => FieldConfig::default(),
    };

    if let Err(e) = metafield::run(config) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
