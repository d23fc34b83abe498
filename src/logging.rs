//
// logging.rs
// Dicom-Deid-rs
//
// Installs the tracing subscriber used by the binary; the library only emits events.
//
// Thales Matheus Mendonça Santos - November 2025

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map the repeat count of `-v` to a level; `RUST_LOG` still overrides it.
pub fn level_for_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn init(verbosity: u8) -> anyhow::Result<()> {
    let default_level = level_for_verbosity(verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(level_for_verbosity(0), Level::WARN);
        assert_eq!(level_for_verbosity(1), Level::INFO);
        assert_eq!(level_for_verbosity(5), Level::TRACE);
    }
}
