//! Duplikat-Erkennung fuer geflutete Nachrichten
//!
//! Begrenzter Speicher der zuletzt gesehenen Message-IDs (Ringpuffer aus
//! `VecDeque` fuer die Reihenfolge plus `HashSet` fuer den Lookup). Ist die
//! Kapazitaet erreicht, wird die aelteste ID verdraengt.

use duckfed_core::MessageId;
use std::collections::{HashSet, VecDeque};
use std::time::Instant;

/// Standard-Kapazitaet des Duplikat-Speichers
pub const STANDARD_KAPAZITAET: usize = 100;

#[derive(Debug)]
pub struct DuplicateCache {
    kapazitaet: usize,
    reihenfolge: VecDeque<(MessageId, Instant)>,
    gesehen: HashSet<MessageId>,
}

impl DuplicateCache {
    pub fn neu(kapazitaet: usize) -> Self {
        let kapazitaet = kapazitaet.max(1);
        Self {
            kapazitaet,
            reihenfolge: VecDeque::with_capacity(kapazitaet),
            gesehen: HashSet::with_capacity(kapazitaet),
        }
    }

    /// Prueft, ob `id` bereits gesehen wurde, und merkt sie sich andernfalls
    ///
    /// Ein Treffer veraendert den Speicher nicht.
    pub fn is_duplicate_and_record(&mut self, id: MessageId, now: Instant) -> bool {
        if self.gesehen.contains(&id) {
            return true;
        }
        // Eintraege kommen in Zeitreihenfolge hinzu, vorne steht der aelteste
        if self.reihenfolge.len() >= self.kapazitaet {
            if let Some((aelteste, _)) = self.reihenfolge.pop_front() {
                self.gesehen.remove(&aelteste);
            }
        }
        self.reihenfolge.push_back((id, now));
        self.gesehen.insert(id);
        false
    }

    pub fn enthaelt(&self, id: MessageId) -> bool {
        self.gesehen.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.reihenfolge.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reihenfolge.is_empty()
    }
}

impl Default for DuplicateCache {
    fn default() -> Self {
        Self::neu(STANDARD_KAPAZITAET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zweites_mal_ist_duplikat() {
        let mut cache = DuplicateCache::default();
        let jetzt = Instant::now();
        assert!(!cache.is_duplicate_and_record(MessageId(42), jetzt));
        assert!(cache.is_duplicate_and_record(MessageId(42), jetzt));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn aelteste_id_wird_verdraengt() {
        let mut cache = DuplicateCache::neu(3);
        let jetzt = Instant::now();
        for id in 1..=3 {
            cache.is_duplicate_and_record(MessageId(id), jetzt);
        }
        assert!(!cache.is_duplicate_and_record(MessageId(4), jetzt));

        assert_eq!(cache.len(), 3);
        assert!(!cache.enthaelt(MessageId(1)));
        assert!(cache.enthaelt(MessageId(2)));
        assert!(cache.enthaelt(MessageId(4)));
    }

    #[test]
    fn treffer_verlaengert_nicht() {
        let mut cache = DuplicateCache::neu(2);
        let jetzt = Instant::now();
        cache.is_duplicate_and_record(MessageId(1), jetzt);
        cache.is_duplicate_and_record(MessageId(2), jetzt);
        // Treffer auf 1 aendert die Reihenfolge nicht
        assert!(cache.is_duplicate_and_record(MessageId(1), jetzt));
        cache.is_duplicate_and_record(MessageId(3), jetzt);
        assert!(!cache.enthaelt(MessageId(1)));
    }

    #[test]
    fn standard_kapazitaet_100() {
        let mut cache = DuplicateCache::default();
        let jetzt = Instant::now();
        for id in 0..150 {
            cache.is_duplicate_and_record(MessageId(id), jetzt);
        }
        assert_eq!(cache.len(), STANDARD_KAPAZITAET);
        assert!(!cache.enthaelt(MessageId(49)));
        assert!(cache.enthaelt(MessageId(50)));
    }
}
