use sha2::{Digest, Sha256};

use crate::domain::{Numbering, prefix};

/// Width of content-hash identifiers, in hex characters.
const HASH_ID_WIDTH: usize = 5;

/// Errors raised when an explicit identifier is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A sequentially numbered module was given a non-numeric local id.
    #[error("explicit id '{id}' is not numeric in a sequentially numbered module")]
    NonNumeric {
        /// The rejected identifier.
        id: String,
    },

    /// An explicit identifier ends in `_` and so has no local part.
    #[error("explicit id '{id}' has an empty local part")]
    EmptyLocal {
        /// The rejected identifier.
        id: String,
    },

    /// An explicit identifier does not belong to the module's namespace.
    #[error("explicit id '{id}' does not contain the module prefix '{prefix}'")]
    ForeignPrefix {
        /// The rejected identifier.
        id: String,
        /// The module's full prefix.
        prefix: String,
    },
}

/// Per-module allocator of collision-free local identifiers.
///
/// Local identifiers are never reused: every allocated or validated id
/// lands in the append-only used set, which outlives the nodes it named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocator {
    numbering: Numbering,
    next_id: u64,
    used: Vec<String>,
}

impl Allocator {
    /// Creates an allocator for a fresh module.
    #[must_use]
    pub const fn new(numbering: Numbering) -> Self {
        Self {
            numbering,
            next_id: 1,
            used: Vec::new(),
        }
    }

    /// Restores an allocator from descriptor state.
    #[must_use]
    pub const fn restore(numbering: Numbering, next_id: u64, used: Vec<String>) -> Self {
        Self {
            numbering,
            next_id,
            used,
        }
    }

    /// The numbering strategy.
    #[must_use]
    pub const fn numbering(&self) -> Numbering {
        self.numbering
    }

    /// The next sequential counter value.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Every local identifier this module has ever handed out.
    #[must_use]
    pub fn used(&self) -> &[String] {
        &self.used
    }

    /// Allocates or validates a local identifier.
    ///
    /// An empty `explicit` id allocates a fresh one: the post-incremented
    /// counter under [`Numbering::Sequential`], or a fixed-width value
    /// hashed from a changing seed (retried until unused) under
    /// [`Numbering::ContentHash`]. A non-empty `explicit` id is the full,
    /// prefix-qualified identifier; its last `_` segment is the local id.
    ///
    /// Either way the resulting local id is appended to the used set.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if an explicit local id is empty or,
    /// under sequential numbering, not numeric, or if the explicit id does
    /// not contain `full_prefix`.
    pub fn allocate(
        &mut self,
        explicit: &str,
        full_prefix: &str,
    ) -> Result<String, ValidationError> {
        if explicit.is_empty() {
            return Ok(self.fresh());
        }

        let local = prefix::local_part(explicit);
        if local.is_empty() {
            return Err(ValidationError::EmptyLocal {
                id: explicit.to_owned(),
            });
        }
        if self.numbering == Numbering::Sequential {
            if !local.chars().all(|c| c.is_ascii_digit()) {
                return Err(ValidationError::NonNumeric {
                    id: explicit.to_owned(),
                });
            }
            // Never hand the same number out again later.
            if let Ok(number) = local.parse::<u64>() {
                self.next_id = self.next_id.max(number + 1);
            }
        }
        if !prefix::belongs_to(explicit, full_prefix) {
            return Err(ValidationError::ForeignPrefix {
                id: explicit.to_owned(),
                prefix: full_prefix.to_owned(),
            });
        }

        let local = local.to_owned();
        self.record(&local);
        Ok(local)
    }

    fn fresh(&mut self) -> String {
        match self.numbering {
            Numbering::Sequential => {
                let id = self.next_id.to_string();
                self.next_id += 1;
                self.record(&id);
                id
            }
            Numbering::ContentHash => {
                let mut attempt: u64 = 0;
                loop {
                    let seed = format!(
                        "{}:{attempt}",
                        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
                    );
                    let digest = Sha256::digest(seed.as_bytes());
                    let id = format!("{digest:x}")[..HASH_ID_WIDTH].to_owned();
                    if !self.used.contains(&id) {
                        self.record(&id);
                        return id;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Appends a local identifier to the used set without validation.
    ///
    /// Used when replaying a module's own allocation history.
    pub(crate) fn record(&mut self, local: &str) {
        if !self.used.iter().any(|u| u == local) {
            self.used.push(local.to_owned());
        }
    }
}
