//! A [`StarkConfig`] defines all the parameters to be used when proving a
//! [`Stark`][crate::stark::Stark].
//!
//! The default configuration is the small demonstration instance over BabyBear: a trace of
//! length 1024 extended to 2048 points and three FRI queries, hashed with Poseidon. It targets
//! speed, not soundness; raise `fri_query_count` for real use.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, warn};
use num::{BigUint, One};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zkstark::field::prime::is_probable_prime;
use zkstark::field::zero_poly_coset::ZeroPolyOnCoset;
use zkstark::field::{FieldElement, PrimeField};
use zkstark::fri::FriConfig;
use zkstark::hash::hashing::Hasher;
use zkstark::hash::keccak::KeccakHash;
use zkstark::hash::poseidon::PoseidonHash;
use zkstark::hash::poseidon2::Poseidon2Hash;
use zkstark::hash::sha256::Sha256Hash;
use zkstark_util::{is_power_of_two, log2_strict};

/// The BabyBear prime `15 * 2^27 + 1`.
pub const BABY_BEAR_MODULUS: u64 = 2013265921;

pub const MIN_SECURITY_BITS: usize = 80;
pub const MAX_SECURITY_BITS: usize = 256;

/// A malformed [`StarkConfig`]. One variant per validation rule.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("field modulus {0} is not an odd prime")]
    InvalidModulus(BigUint),

    #[error("security level of {0} bits is outside [80, 256]")]
    SecurityBits(usize),

    #[error("trace length {0} is not a power of two of at least 4")]
    TraceLength(usize),

    #[error("evaluation domain size {size} is not a power of two of at least twice the trace length {trace_length}")]
    EvaluationDomainSize { size: usize, trace_length: usize },

    #[error("blow-up factor {blowup} differs from evaluation domain size / trace length = {expected}")]
    BlowupFactor { blowup: usize, expected: usize },

    #[error("FRI query count {queries} is outside [1, {domain_size}]")]
    QueryCount { queries: usize, domain_size: usize },

    #[error("field has no two-adic subgroup of order {0}")]
    NoRootOfUnity(usize),

    #[error("the coset shift lies in the evaluation subgroup")]
    CosetShiftInSubgroup,
}

/// Hash function selector for commitments and the Fiat-Shamir channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HashChoice {
    /// general-purpose-A
    Sha256,
    /// general-purpose-B
    Keccak256,
    /// algebraic-sponge-variant-1
    Poseidon,
    /// algebraic-sponge-variant-2
    Poseidon2,
}

impl HashChoice {
    pub fn name(&self) -> &'static str {
        match self {
            HashChoice::Sha256 => "sha256",
            HashChoice::Keccak256 => "keccak256",
            HashChoice::Poseidon => "poseidon",
            HashChoice::Poseidon2 => "poseidon2",
        }
    }

    /// Parses a selector name, case-insensitively. Unknown names select SHA-256.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!("Unknown hash function {:?}, falling back to sha256", name);
            HashChoice::Sha256
        })
    }

    /// Instantiates the hasher. The algebraic sponges are parameterized by the field and the
    /// security level.
    pub fn hasher(&self, field: &PrimeField, security_bits: usize) -> Result<Arc<dyn Hasher>> {
        Ok(match self {
            HashChoice::Sha256 => Arc::new(Sha256Hash),
            HashChoice::Keccak256 => Arc::new(KeccakHash),
            HashChoice::Poseidon => Arc::new(PoseidonHash::poseidon(field, security_bits)?),
            HashChoice::Poseidon2 => Arc::new(Poseidon2Hash::poseidon2(field, security_bits)?),
        })
    }
}

impl FromStr for HashChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" | "general-purpose-a" => Ok(HashChoice::Sha256),
            "keccak256" | "keccak-256" | "keccak" | "general-purpose-b" => {
                Ok(HashChoice::Keccak256)
            }
            "poseidon" | "algebraic-sponge-variant-1" => Ok(HashChoice::Poseidon),
            "poseidon2" | "algebraic-sponge-variant-2" => Ok(HashChoice::Poseidon2),
            other => Err(format!("unknown hash function {:?}", other)),
        }
    }
}

impl From<String> for HashChoice {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<HashChoice> for String {
    fn from(choice: HashChoice) -> Self {
        choice.name().to_string()
    }
}

impl fmt::Display for HashChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A configuration containing the different parameters used by the STARK prover.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StarkConfig {
    /// The prime defining the base field.
    pub field_modulus: BigUint,

    /// The targeted security level. Also selects the Poseidon parameters.
    pub security_bits: usize,

    /// Size of the trace subgroup. The trace itself may use fewer rows.
    pub trace_length: usize,

    /// Size of the coset the trace and the constraints are evaluated on.
    pub evaluation_domain_size: usize,

    /// `evaluation_domain_size / trace_length`.
    pub blowup_factor: usize,

    /// The number of FRI query rounds.
    pub fri_query_count: usize,

    pub hash_function: HashChoice,
}

impl Default for StarkConfig {
    fn default() -> Self {
        Self::standard_config()
    }
}

impl StarkConfig {
    /// BabyBear, 80 bits, a trace of 1024 on 2048 points, 3 queries and Poseidon.
    pub fn standard_config() -> Self {
        Self {
            field_modulus: BigUint::from(BABY_BEAR_MODULUS),
            security_bits: MIN_SECURITY_BITS,
            trace_length: 1024,
            evaluation_domain_size: 2048,
            blowup_factor: 2,
            fri_query_count: 3,
            hash_function: HashChoice::Poseidon,
        }
    }

    pub fn fri_config(&self) -> FriConfig {
        FriConfig {
            rate_bits: log2_strict(self.blowup_factor),
            num_query_rounds: self.fri_query_count,
        }
    }

    /// Checks every rule that does not need a field: primality, security range, sizes, blow-up,
    /// query count and the two-adicity of `p - 1`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.field_modulus;
        if p <= &BigUint::from(2u32) || !is_probable_prime(p) {
            return Err(ConfigError::InvalidModulus(p.clone()));
        }
        if !(MIN_SECURITY_BITS..=MAX_SECURITY_BITS).contains(&self.security_bits) {
            return Err(ConfigError::SecurityBits(self.security_bits));
        }
        if !is_power_of_two(self.trace_length) || self.trace_length < 4 {
            return Err(ConfigError::TraceLength(self.trace_length));
        }
        let size = self.evaluation_domain_size;
        if !is_power_of_two(size) || size / 2 < self.trace_length {
            return Err(ConfigError::EvaluationDomainSize {
                size,
                trace_length: self.trace_length,
            });
        }
        let expected = size / self.trace_length;
        if self.blowup_factor != expected {
            return Err(ConfigError::BlowupFactor {
                blowup: self.blowup_factor,
                expected,
            });
        }
        if self.fri_query_count == 0 || self.fri_query_count > size {
            return Err(ConfigError::QueryCount {
                queries: self.fri_query_count,
                domain_size: size,
            });
        }
        let two_adicity = (p - BigUint::one()).trailing_zeros().unwrap_or(0) as usize;
        if log2_strict(size) > two_adicity {
            return Err(ConfigError::NoRootOfUnity(size));
        }

        let fri_security_bits = self.fri_config().conjectured_security_bits();
        if fri_security_bits < self.security_bits {
            warn!(
                "FRI params fall short of target security {}, reaching only {}",
                self.security_bits, fri_security_bits
            );
        }
        Ok(())
    }

    /// Validates the configuration and builds the field, the hasher and the domains.
    pub fn build(&self) -> Result<StarkContext> {
        self.validate()?;
        let field = PrimeField::new(self.field_modulus.clone())?;
        let hasher = self.hash_function.hasher(&field, self.security_bits)?;

        let degree_bits = log2_strict(self.trace_length);
        let rate_bits = log2_strict(self.blowup_factor);
        let shift = field.coset_shift();
        let zero_poly = ZeroPolyOnCoset::new(&field, &shift, degree_bits, rate_bits)
            .map_err(|_| ConfigError::CosetShiftInSubgroup)?;
        let trace_generator = field.primitive_root_of_unity(degree_bits)?;
        let evaluation_domain = field.two_adic_coset(&shift, degree_bits + rate_bits)?;
        debug!(
            "STARK context over {}: trace length {}, evaluation domain {}, hash {}",
            field,
            self.trace_length,
            self.evaluation_domain_size,
            hasher.name()
        );

        Ok(StarkContext {
            config: self.clone(),
            fri_config: self.fri_config(),
            field,
            hasher,
            shift,
            trace_generator,
            evaluation_domain,
            zero_poly,
        })
    }
}

/// Everything derived from a validated [`StarkConfig`]. Read-only for the rest of a run and
/// shared by the prover and the verifier.
#[derive(Clone, Debug)]
pub struct StarkContext {
    pub config: StarkConfig,
    pub fri_config: FriConfig,
    pub field: PrimeField,
    pub hasher: Arc<dyn Hasher>,
    /// Shift of the evaluation coset.
    pub shift: FieldElement,
    /// Generator `g` of the trace subgroup.
    pub trace_generator: FieldElement,
    /// `shift * h^i` for `h` of order `evaluation_domain_size`, with `h^blowup = g`.
    pub evaluation_domain: Vec<FieldElement>,
    /// `x^trace_length - 1` on the evaluation domain.
    pub zero_poly: ZeroPolyOnCoset,
}

impl StarkContext {
    pub fn trace_length(&self) -> usize {
        self.config.trace_length
    }

    pub fn degree_bits(&self) -> usize {
        log2_strict(self.config.trace_length)
    }

    pub fn lde_size(&self) -> usize {
        self.config.evaluation_domain_size
    }

    pub fn blowup(&self) -> usize {
        self.config.blowup_factor
    }

    /// `g^i`.
    pub fn trace_point(&self, i: usize) -> FieldElement {
        self.trace_generator.exp_u64(i as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() -> Result<()> {
        let config = StarkConfig::standard_config();
        config.validate()?;
        let ctx = config.build()?;
        assert_eq!(ctx.evaluation_domain.len(), 2048);
        assert_eq!(ctx.hasher.name(), "poseidon");
        // h^blowup = g
        let h = &ctx.evaluation_domain[1] * ctx.shift.inverse()?;
        assert_eq!(h.exp_u64(2), ctx.trace_generator);
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        let base = StarkConfig::standard_config();
        let check = |f: &dyn Fn(&mut StarkConfig), expected: ConfigError| {
            let mut config = base.clone();
            f(&mut config);
            assert_eq!(config.validate(), Err(expected));
        };

        check(
            &|c| c.field_modulus = BigUint::from(2013265923u64),
            ConfigError::InvalidModulus(BigUint::from(2013265923u64)),
        );
        check(
            &|c| c.field_modulus = BigUint::from(2u32),
            ConfigError::InvalidModulus(BigUint::from(2u32)),
        );
        check(&|c| c.security_bits = 79, ConfigError::SecurityBits(79));
        check(&|c| c.security_bits = 257, ConfigError::SecurityBits(257));
        check(&|c| c.trace_length = 1000, ConfigError::TraceLength(1000));
        check(&|c| c.trace_length = 2, ConfigError::TraceLength(2));
        check(
            &|c| c.evaluation_domain_size = 1024,
            ConfigError::EvaluationDomainSize {
                size: 1024,
                trace_length: 1024,
            },
        );
        check(
            &|c| c.blowup_factor = 4,
            ConfigError::BlowupFactor {
                blowup: 4,
                expected: 2,
            },
        );
        check(
            &|c| c.fri_query_count = 0,
            ConfigError::QueryCount {
                queries: 0,
                domain_size: 2048,
            },
        );
        check(
            &|c| {
                // 2^31 - 1: p - 1 = 2 * odd.
                c.field_modulus = BigUint::from(2147483647u64);
            },
            ConfigError::NoRootOfUnity(2048),
        );
    }

    #[test]
    fn build_rejects_invalid_config() {
        let config = StarkConfig {
            fri_query_count: 0,
            ..StarkConfig::standard_config()
        };
        let err = config.build().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::QueryCount { .. })
        ));
    }

    #[test]
    fn hash_choice_names() {
        assert_eq!(HashChoice::from_name("Poseidon"), HashChoice::Poseidon);
        assert_eq!(HashChoice::from_name("KECCAK256"), HashChoice::Keccak256);
        assert_eq!(
            HashChoice::from_name("algebraic-sponge-variant-2"),
            HashChoice::Poseidon2
        );
        assert_eq!(
            HashChoice::from_name("general-purpose-a"),
            HashChoice::Sha256
        );
        assert_eq!(HashChoice::from_name("blake3"), HashChoice::Sha256);
        assert!("blake3".parse::<HashChoice>().is_err());
    }

    #[test]
    fn every_hash_choice_builds() -> Result<()> {
        for choice in [
            HashChoice::Sha256,
            HashChoice::Keccak256,
            HashChoice::Poseidon,
            HashChoice::Poseidon2,
        ] {
            let config = StarkConfig {
                hash_function: choice,
                trace_length: 16,
                evaluation_domain_size: 64,
                blowup_factor: 4,
                ..StarkConfig::standard_config()
            };
            let ctx = config.build()?;
            assert_eq!(ctx.hasher.name(), choice.name());
        }
        Ok(())
    }

    #[test]
    fn json_round_trip() -> Result<()> {
        let config = StarkConfig {
            hash_function: HashChoice::Keccak256,
            ..StarkConfig::standard_config()
        };
        let json = serde_json::to_string(&config)?;
        assert!(json.contains("\"keccak256\""));
        let parsed: StarkConfig = serde_json::from_str(&json)?;
        assert_eq!(parsed, config);

        // Unknown selector names fall back instead of failing.
        let json = json.replace("keccak256", "whirlpool");
        let parsed: StarkConfig = serde_json::from_str(&json)?;
        assert_eq!(parsed.hash_function, HashChoice::Sha256);
        Ok(())
    }
}
