use std::fmt;
use std::ops::RangeInclusive;

use crate::domain::errors::{DomainError, Result};

/// Inclusive range of ports a pool may lease from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    min: u16,
    max: u16,
}

impl PortRange {
    pub fn new(min: u16, max: u16) -> Result<Self> {
        if min == 0 {
            return Err(DomainError::InvalidPort);
        }
        if min > max {
            return Err(DomainError::InvalidPortRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u16 {
        self.min
    }

    pub fn max(&self) -> u16 {
        self.max
    }

    pub fn contains(&self, port: u16) -> bool {
        self.ports().contains(&port)
    }

    /// Ports in ascending order, the first-fit scan order
    pub fn ports(&self) -> RangeInclusive<u16> {
        self.min..=self.max
    }

    pub fn exhausted(&self) -> DomainError {
        DomainError::PortExhausted {
            min: self.min,
            max: self.max,
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}
