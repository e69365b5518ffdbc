use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let tree = HierarchicalLayer::default()
        .with_indent_amount(2)
        .with_indent_lines(true)
        .with_targets(true)
        .with_deferred_spans(true);
    // A subscriber may already be installed by an embedding process.
    let _ = Registry::default().with(filter).with(tree).try_init();
}
