//! Unique identifier generation.

use std::sync::Arc;

/// Function producing a probabilistically-unique identifier.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Random UUID v4 in its hyphenated string form.
pub fn uuid_v4() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn default_generator() -> IdGenerator {
    Arc::new(uuid_v4)
}
