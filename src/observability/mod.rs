//! Process-wide logging setup.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Map a configured level name to a `tracing` level. Case-insensitive;
/// `warning` is accepted as `warn`.
pub fn parse_level(name: &str) -> Option<Level> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("warning") {
        return Some(Level::WARN);
    }
    name.parse().ok()
}

/// Install the global fmt subscriber. Returns `false` if one was already
/// installed, in which case the call has no effect.
pub fn init_logging(level: &str) -> bool {
    let level = parse_level(level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).is_ok()
}
