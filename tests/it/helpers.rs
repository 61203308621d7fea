use std::sync::{Arc, Once};
use trellis::Trellis;
use trellis::events::BufferingNotifier;
use trellis::item::Item;
use trellis::path::AccountId;
use trellis::store::InMemoryStore;

/// Installs a tracing subscriber once for the whole test binary, honoring
/// `RUST_LOG`, so the diagnostics the library emits (mutator phases,
/// cascade counts, consistency violations) are visible under
/// `cargo test -- --nocapture`.
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Creates a facade over a fresh in-memory store, plus an owner account.
pub fn setup_facade() -> (Trellis, AccountId) {
    init_tracing();
    let trellis = Trellis::new(Box::new(InMemoryStore::new()));
    (trellis, AccountId::new())
}

/// Creates a facade wired to a buffering notifier so tests can observe the
/// emitted tree events.
pub fn setup_facade_with_events() -> (Trellis, Arc<BufferingNotifier>, AccountId) {
    init_tracing();
    let notifier = Arc::new(BufferingNotifier::new());
    let trellis =
        Trellis::with_notifier(Box::new(InMemoryStore::new()), notifier.clone());
    (trellis, notifier, AccountId::new())
}

/// Creates the root, child, and grandchild fixture, all owned by `owner`.
pub fn setup_chain(trellis: &Trellis, owner: AccountId) -> (Item, Item, Item) {
    let root = trellis
        .create_root("root", owner)
        .expect("Failed to create root");
    let child = trellis
        .create_child(&root.id, "child", owner)
        .expect("Failed to create child");
    let grandchild = trellis
        .create_child(&child.id, "grandchild", owner)
        .expect("Failed to create grandchild");
    (root, child, grandchild)
}
