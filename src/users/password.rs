use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::PasswordConfig;

/// Argon2id with configured costs. Hashes are salted PHC strings carrying
/// their own parameters, so raising the costs does not break older hashes.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    params: Params,
}

impl PasswordPolicy {
    pub fn new(config: &PasswordConfig) -> anyhow::Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        Ok(Self { params })
    }

    /// Cheapest costs argon2 accepts; keeps test suites fast.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::new(&PasswordConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// `Ok(false)` on a mismatch; `Err` only when the stored hash is unreadable.
    pub fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        // costs come from `parsed`, not from self
        Ok(self
            .argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_costs_land_in_phc_string() {
        let policy = PasswordPolicy::new(&PasswordConfig {
            memory_kib: 4096,
            iterations: 3,
            parallelism: 2,
        })
        .unwrap();
        let hash = policy.hash("Secur3P@ssw0rd!").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=4096,t=3,p=2$"), "{hash}");
        assert!(policy.verify("Secur3P@ssw0rd!", &hash).unwrap());
    }

    #[test]
    fn hashes_from_older_costs_still_verify() {
        let old = PasswordPolicy::for_tests().hash("pw").unwrap();
        let current = PasswordPolicy::new(&PasswordConfig {
            memory_kib: 64,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(current.verify("pw", &old).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let policy = PasswordPolicy::for_tests();
        assert_ne!(policy.hash("pw").unwrap(), policy.hash("pw").unwrap());
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let policy = PasswordPolicy::for_tests();
        let hash = policy.hash("correct-horse-battery-staple").unwrap();
        assert!(!policy.verify("wrong-password", &hash).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        assert!(PasswordPolicy::for_tests().verify("anything", "not-a-valid-hash").is_err());
    }

    #[test]
    fn invalid_costs_are_rejected() {
        let res = PasswordPolicy::new(&PasswordConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(res.is_err());
    }
}
