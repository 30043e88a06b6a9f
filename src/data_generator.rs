use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::model::NewRecord;

const GIVEN_NAMES: &[&str] = &[
    "Ada", "Alan", "Amara", "Aiko", "Bram", "Carmen", "Chidi", "Dmitri", "Elena", "Farai",
    "Grace", "Hamid", "Ines", "Ivan", "Jun", "Kaveh", "Lena", "Lucia", "Mateo", "Mei",
    "Nadia", "Noah", "Olga", "Priya", "Quinn", "Rafael", "Sanne", "Tendai", "Uma", "Viktor",
    "Wanjiru", "Xavier", "Yara", "Yusuf", "Zanele", "Zoe",
];

const FAMILY_NAMES: &[&str] = &[
    "Abe", "Banda", "Costa", "Dembaremba", "Eriksen", "Fischer", "Garcia", "Hopper",
    "Ibrahim", "Jansen", "Kowalski", "Lovelace", "Moyo", "Nakamura", "Okafor", "Petrov",
    "Quispe", "Rossi", "Silva", "Turing", "Ueda", "Varga", "Wagner", "Xu", "Yilmaz", "Zulu",
];

/// Source of records for the seeding path.
pub trait RecordGenerator {
    /// Produces `count` fresh records.
    fn generate(&mut self, count: usize) -> Vec<NewRecord>;
}

/// Random person names drawn from built-in lists.
pub struct DataGenerator {
    rng: ChaCha8Rng,
}

impl DataGenerator {
    /// Generator seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Deterministic generator; the same seed always yields the same records.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, names: &[&'static str]) -> &'static str {
        names.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

impl RecordGenerator for DataGenerator {
    fn generate(&mut self, count: usize) -> Vec<NewRecord> {
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.pick(GIVEN_NAMES);
            let surname = self.pick(FAMILY_NAMES);
            records.push(NewRecord::new(name, surname));
        }
        records
    }
}

impl Default for DataGenerator {
    fn default() -> Self {
        Self::new()
    }
}
