pub mod config;
pub mod draft;
pub mod models;

use tracing_subscriber::EnvFilter;

pub use config::DraftConfig;
pub use draft::{ConsultationDraft, DraftError, RemoteApis};

/// Install the fmt subscriber. Filter comes from `RUST_LOG`, falling back to
/// `config::default_log_filter()`. Safe to call more than once.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} v{} tracing ready", config::APP_NAME, config::APP_VERSION);
    }
}
