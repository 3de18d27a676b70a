/////////////////////////////////////////////////////////////////////////////////////
//
// Rumor model
//
// utilities module
//
// various functions that can be of use across the app
//
////////////////////////////////////////////////////////////////////////////////////

use crate::error::{Result, SimError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;

// Seed ---------------------------------------------------------------------------------------------
// Every random stream in the model starts from a Seed.  Seeds are either plain numbers or
// labels such as "nsll"; labels are hashed with 64 bit FNV-1a so a label always yields the
// same stream on every platform.
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub struct Seed(u64);

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl Seed {
    pub const fn new(value: u64) -> Seed {
        Seed(value)
    }

    pub fn from_label(label: &str) -> Seed {
        let hash = label.bytes().fold(FNV_OFFSET, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        });
        Seed(hash)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    // a fresh generator positioned at the start of this seed's stream
    pub fn rng(self) -> StdRng {
        StdRng::seed_from_u64(self.0)
    }

    // seed for the index-th sample of a sweep
    pub const fn offset(self, index: usize) -> Seed {
        Seed(self.0.wrapping_add(index as u64))
    }

    /// Replicate seeds `label`, `label1`, `label2`, ... used to average network statistics.
    pub fn replicates(label: &str, count: usize) -> Vec<Seed> {
        (0..count)
            .map(|index| match index {
                0 => Seed::from_label(label),
                _ => Seed::from_label(&format!("{}{}", label, index)),
            })
            .collect()
    }
}

impl Default for Seed {
    fn default() -> Seed {
        Seed::from_label("nsll")
    }
}

impl From<u64> for Seed {
    fn from(value: u64) -> Seed {
        Seed::new(value)
    }
}

impl From<&str> for Seed {
    fn from(label: &str) -> Seed {
        Seed::from_label(label)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

// count equally spaced values from lo to hi, both ends included
pub fn linspace(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let last = count - 1;
            let width = (hi - lo) / last as f64;
            (0..count)
                .map(|index| {
                    if index == last {
                        hi
                    } else {
                        lo + index as f64 * width
                    }
                })
                .collect()
        }
    }
}

// rejects NaN and values outside [0, 1]
pub fn check_unit_interval(name: &'static str, value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(SimError::invalid(
            name,
            format!("must lie in [0, 1], got {}", value),
        ))
    }
}

// rejects NaN, infinities and negative values
pub fn check_coefficient(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SimError::invalid(
            name,
            format!("must be finite and non-negative, got {}", value),
        ))
    }
}
