pub mod replay;
pub mod resolve;
pub mod window;

use feedsync_core::Sequence;

/// Build a snapshot from `--items`, reporting duplicates as a CLI error.
pub fn sequence_from_args(items: Vec<String>) -> Sequence {
    match Sequence::from_ids(items) {
        Ok(sequence) => sequence,
        Err(e) => crate::output::output_error(&e.to_string()),
    }
}
