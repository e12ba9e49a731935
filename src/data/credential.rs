use crypto::bcrypt::bcrypt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Work factor for bcrypt. The cost is not recorded next to the digest, so
/// changing this value invalidates every stored hash.
const BCRYPT_COST: u32 = 12;

/// Salted password hash. Passwords are pre-digested with SHA-256 so inputs
/// longer than bcrypt's 72-byte limit still hash in full, then run through
/// bcrypt with a per-account random salt.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PasswordHash {
    salt: [u8; 16],
    digest: [u8; 24],
}

impl PasswordHash {
    pub fn new(password: impl AsRef<str>) -> PasswordHash {
        let salt: [u8; 16] = rand::random();

        PasswordHash {
            salt,
            digest: digest_with(&salt, password.as_ref()),
        }
    }

    /// Constant-time comparison against a candidate password. Wrong
    /// passwords yield `false`, never an error.
    pub fn verify(&self, password: impl AsRef<str>) -> bool {
        let candidate = digest_with(&self.salt, password.as_ref());

        self.digest
            .iter()
            .zip(candidate.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

fn digest_with(salt: &[u8; 16], password: &str) -> [u8; 24] {
    let mut digest: [u8; 24] = [0; 24];

    let mut sha = Sha256::new();
    sha2::Digest::update(&mut sha, password.as_bytes());

    bcrypt(BCRYPT_COST, salt, sha.finalize().as_slice(), &mut digest);

    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_matching_password() {
        for password in ["hunter2secret", "mật khẩu dài hơn", "a"] {
            let hash = PasswordHash::new(password);
            assert!(hash.verify(password), "rejected own password");
        }
    }

    #[test]
    fn verify_rejects_other_passwords() {
        let hash = PasswordHash::new("correct horse battery staple");

        assert!(!hash.verify("correct horse battery stapl"));
        assert!(!hash.verify(""));
        assert!(!hash.verify("CORRECT HORSE BATTERY STAPLE"));
    }

    #[test]
    fn salts_are_per_account() {
        let a = PasswordHash::new("same password");
        let b = PasswordHash::new("same password");

        assert_ne!(a, b, "two accounts should never share a salt");
        assert!(a.verify("same password"));
        assert!(b.verify("same password"));
    }

    #[test]
    fn hash_round_trips_through_bson() {
        let hash = PasswordHash::new("round trip");

        let doc = bson::to_bson(&hash).expect("hash must be serializable to BSON");
        let back: PasswordHash = bson::from_bson(doc).expect("hash must deserialize");

        assert_eq!(hash, back);
        assert!(back.verify("round trip"));
    }
}
