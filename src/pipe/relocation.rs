//! Selection relocation after a structural edit.
//!
//! When encoders are added or removed, buckets starting at the change index
//! are spliced. The selected bucket must keep pointing at the content the user
//! was looking at, and propagation must start from the side that did not
//! change.

/// Which neighbours of a bucket re-run after its content changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Both,
    /// Only the encoder above the bucket encodes.
    Forward,
    /// Only the encoder below the bucket decodes.
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationCase {
    /// Selection lies before the changed region.
    BeforeChange,
    /// A single encoder was swapped right below the selection.
    Replaced,
    /// The selected bucket was removed.
    InsideRemoved,
    /// Selection lies after the changed region.
    AfterChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub selected_bucket: usize,
    /// Bucket propagation starts from.
    pub origin: usize,
    pub direction: Propagation,
    pub case: RelocationCase,
    /// Write the removed bucket's old content into the new one before propagating.
    pub seed_with_removed: bool,
}

/// Resolve the new selection after `removed` buckets at `change_index` were
/// replaced by `inserted` empty ones.
///
/// `change_index` is at least 1: bucket 0 sits before every encoder and is
/// never spliced.
pub fn relocate_selection(
    selected: usize,
    change_index: usize,
    inserted: usize,
    removed: usize,
) -> Relocation {
    debug_assert!(change_index >= 1);

    if inserted == 1 && removed == 1 && selected == change_index {
        return Relocation {
            selected_bucket: selected,
            origin: change_index,
            direction: Propagation::Backward,
            case: RelocationCase::Replaced,
            seed_with_removed: true,
        };
    }

    if selected < change_index {
        Relocation {
            selected_bucket: selected,
            origin: change_index - 1,
            direction: Propagation::Forward,
            case: RelocationCase::BeforeChange,
            seed_with_removed: false,
        }
    } else if selected < change_index + removed {
        Relocation {
            selected_bucket: change_index - 1,
            origin: change_index - 1,
            direction: Propagation::Forward,
            case: RelocationCase::InsideRemoved,
            seed_with_removed: false,
        }
    } else {
        Relocation {
            selected_bucket: selected + inserted - removed,
            origin: change_index + inserted,
            direction: Propagation::Backward,
            case: RelocationCase::AfterChange,
            seed_with_removed: false,
        }
    }
}
