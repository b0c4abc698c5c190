use super::{EmbedError, Embedder};

const MODEL_NAME: &str = "trigram-hash";

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic embedder that hashes character trigrams into a fixed number
/// of buckets.
///
/// Texts sharing words or word fragments land close together, which is enough
/// to rank stack traces offline without downloading a model. Each word is
/// lowercased and padded with a space on both sides before trigrams are taken,
/// so `null` and `NullPointerException` share their leading trigrams.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let padded: Vec<char> = std::iter::once(' ')
                .chain(word.chars().flat_map(char::to_lowercase))
                .chain(std::iter::once(' '))
                .collect();
            for gram in padded.windows(3) {
                let bucket = (fnv1a(gram) % self.dimensions as u64) as usize;
                vector[bucket] += 1.0;
            }
        }
        vector
    }
}

fn fnv1a(chars: &[char]) -> u64 {
    let mut hash = FNV_OFFSET;
    for c in chars {
        let mut buf = [0u8; 4];
        for byte in c.encode_utf8(&mut buf).bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

impl Embedder for HashEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn provider_type(&self) -> &str {
        "hash"
    }
}
