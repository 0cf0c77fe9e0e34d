// Leaderkey Sequence Registry
// Per-position lookup table of configured sequences, priority ordered

use std::cmp::Ordering;

use smallvec::SmallVec;

use crate::sequence::SequenceDefinition;
use crate::KeyPosition;

/// Maximum number of keys in one sequence
pub const MAX_KEYS_PER_SEQUENCE: usize = 4;

/// Maximum number of sequences that may contain the same key position
pub const MAX_SEQUENCES_PER_KEY: usize = 5;

/// Largest keymap a registry accepts
pub const MAX_KEYMAP_LEN: u32 = 1024;

/// Index of a definition inside its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(usize);

impl SequenceId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Sequences sharing one key position, in priority order.
pub type Bucket = SmallVec<[SequenceId; MAX_SEQUENCES_PER_KEY]>;

/// Errors raised while building the registry.
///
/// All of them are configuration errors: start-up must not continue
/// with a registry that silently dropped a sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Key position {position} does not exist (keymap has {keymap_len} positions)")]
    InvalidPosition { position: KeyPosition, keymap_len: u32 },

    #[error("Too many sequences for key position {position}, maximum is {max}")]
    CapacityExceeded { position: KeyPosition, max: usize },

    #[error("Keymap of {keymap_len} positions is too large, maximum is {max}")]
    KeymapTooLarge { keymap_len: u32, max: u32 },

    #[error("Sequence has no keys")]
    EmptySequence,

    #[error("Sequence has {len} keys, maximum is {max}")]
    SequenceTooLong { len: usize, max: usize },

    #[error("Virtual position {position} overlaps the keymap ({keymap_len} positions)")]
    InvalidVirtualPosition { position: KeyPosition, keymap_len: u32 },

    #[error("Virtual position {0} is already used by another sequence")]
    DuplicateVirtualPosition(KeyPosition),
}

/// Immutable-after-init table mapping every physical key position to the
/// sequences that contain it.
///
/// Within a bucket sequences are sorted shortest-first, then by ascending
/// virtual position. That order is the only priority rule the matcher uses.
#[derive(Debug, Clone)]
pub struct Registry {
    keymap_len: u32,
    definitions: Vec<SequenceDefinition>,
    buckets: Vec<Bucket>,
}

impl Registry {
    /// Create an empty registry for a keymap of `keymap_len` positions
    pub fn new(keymap_len: u32) -> Result<Self, RegistryError> {
        if keymap_len > MAX_KEYMAP_LEN {
            log::error!(
                "Unable to create leader registry for {} key positions",
                keymap_len
            );
            return Err(RegistryError::KeymapTooLarge {
                keymap_len,
                max: MAX_KEYMAP_LEN,
            });
        }
        Ok(Self {
            keymap_len,
            definitions: Vec::new(),
            buckets: vec![Bucket::new(); keymap_len as usize],
        })
    }

    /// Build a registry from a list of definitions, failing on the first error
    pub fn from_definitions(
        keymap_len: u32,
        definitions: impl IntoIterator<Item = SequenceDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new(keymap_len)?;
        for def in definitions {
            registry.register(def)?;
        }
        Ok(registry)
    }

    /// Number of physical key positions
    pub fn keymap_len(&self) -> u32 {
        self.keymap_len
    }

    /// Number of registered sequences
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Get a definition by id
    pub fn get(&self, id: SequenceId) -> Option<&SequenceDefinition> {
        self.definitions.get(id.0)
    }

    /// Definition behind an id handed out by this registry
    pub(crate) fn definition(&self, id: SequenceId) -> &SequenceDefinition {
        &self.definitions[id.0]
    }

    /// Iterate over all definitions in registration order
    pub fn iter(&self) -> impl Iterator<Item = (SequenceId, &SequenceDefinition)> {
        self.definitions
            .iter()
            .enumerate()
            .map(|(i, def)| (SequenceId(i), def))
    }

    /// Register a sequence in the bucket of every position it contains.
    ///
    /// The definition is validated completely before any bucket is touched,
    /// so a failed registration leaves the registry unchanged. A key repeated
    /// within the sequence is inserted into its bucket once, not per occurrence.
    pub fn register(&mut self, def: SequenceDefinition) -> Result<SequenceId, RegistryError> {
        if let Err(e) = self.validate(&def) {
            log::error!("Unable to register leader sequence {}: {}", def, e);
            return Err(e);
        }

        let id = SequenceId(self.definitions.len());
        let mut positions: SmallVec<[KeyPosition; MAX_KEYS_PER_SEQUENCE]> = def.keys.clone();
        positions.sort();
        positions.dedup();

        for position in positions {
            let bucket = &mut self.buckets[position.index() as usize];
            let slot = bucket.partition_point(|existing| {
                self.definitions[existing.0].priority_cmp(&def) == Ordering::Less
            });
            bucket.insert(slot, id);
        }

        log::debug!("Registered leader sequence {}", def);
        self.definitions.push(def);
        Ok(id)
    }

    fn validate(&self, def: &SequenceDefinition) -> Result<(), RegistryError> {
        if def.keys.is_empty() {
            return Err(RegistryError::EmptySequence);
        }
        if def.keys.len() > MAX_KEYS_PER_SEQUENCE {
            return Err(RegistryError::SequenceTooLong {
                len: def.keys.len(),
                max: MAX_KEYS_PER_SEQUENCE,
            });
        }
        if def.virtual_position.is_physical(self.keymap_len) {
            return Err(RegistryError::InvalidVirtualPosition {
                position: def.virtual_position,
                keymap_len: self.keymap_len,
            });
        }
        if self
            .definitions
            .iter()
            .any(|existing| existing.virtual_position == def.virtual_position)
        {
            return Err(RegistryError::DuplicateVirtualPosition(def.virtual_position));
        }

        for &position in &def.keys {
            if !position.is_physical(self.keymap_len) {
                return Err(RegistryError::InvalidPosition {
                    position,
                    keymap_len: self.keymap_len,
                });
            }
            if self.buckets[position.index() as usize].len() >= MAX_SEQUENCES_PER_KEY {
                return Err(RegistryError::CapacityExceeded {
                    position,
                    max: MAX_SEQUENCES_PER_KEY,
                });
            }
        }
        Ok(())
    }

    /// Ids of all sequences containing `position`, in priority order.
    ///
    /// Positions outside the keymap have an empty bucket.
    pub fn bucket(&self, position: KeyPosition) -> &[SequenceId] {
        self.buckets
            .get(position.index() as usize)
            .map(|bucket| bucket.as_slice())
            .unwrap_or(&[])
    }

    /// All sequences containing `position`, in priority order
    pub fn lookup(
        &self,
        position: KeyPosition,
    ) -> impl Iterator<Item = (SequenceId, &SequenceDefinition)> + '_ {
        self.bucket(position)
            .iter()
            .map(move |&id| (id, &self.definitions[id.0]))
    }
}
