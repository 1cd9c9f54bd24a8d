/// Domain-separated BLAKE3 hasher over a sequence of fields.
///
/// Each hasher carries a domain tag that is prepended to every computation,
/// so digests produced for different purposes never collide. Every field is
/// length-prefixed before it is fed to the hasher: `("ab", "c")` and
/// `("a", "bc")` hash differently.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for mirror directory names.
    pub const WORKDIR: Self = Self {
        domain: "gbs-workdir-v1",
    };
    /// Hasher for pull idempotency hashes.
    pub const IDEMPOTENCY: Self = Self {
        domain: "gbs-idempotency-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash the given fields.
    pub fn hash_fields(&self, fields: &[&[u8]]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for field in fields {
            hasher.update(&(field.len() as u64).to_be_bytes());
            hasher.update(field);
        }
        *hasher.finalize().as_bytes()
    }

    /// Hash the given string fields and render the digest as lowercase hex.
    pub fn hash_hex(&self, fields: &[&str]) -> String {
        let fields: Vec<&[u8]> = fields.iter().map(|f| f.as_bytes()).collect();
        hex::encode(self.hash_fields(&fields))
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
