//! Session parameters.

use crate::errors::ParametersError;
use crate::{Error, Result};
use hbmpc_math::eval_point::EvalPoint;
use hbmpc_math::field::{Field, FieldElement, GOLDILOCKS};
use hbmpc_math::rs::RsCodec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Parameters shared by every party of an MPC session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MpcParameters {
    /// Number of parties.
    n: usize,

    /// Maximal number of corrupted parties.
    t: usize,

    field: Field,
    eval_points: EvalPoint,
    reconstruction_timeout: Option<Duration>,
}

impl MpcParameters {
    /// Returns the number of parties.
    pub const fn n(&self) -> usize {
        self.n
    }

    /// Returns the threshold.
    pub const fn t(&self) -> usize {
        self.t
    }

    /// Returns the field.
    pub const fn field(&self) -> Field {
        self.field
    }

    /// Returns the evaluation point scheme.
    pub fn eval_points(&self) -> &EvalPoint {
        &self.eval_points
    }

    /// Returns the evaluation point of party `i`.
    pub fn point(&self, i: usize) -> Result<FieldElement> {
        self.eval_points
            .point(i)
            .filter(|_| i < self.n)
            .ok_or(Error::InvalidParty(i))
    }

    /// Returns the timeout of a single reconstruction, if any.
    pub const fn reconstruction_timeout(&self) -> Option<Duration> {
        self.reconstruction_timeout
    }

    /// A Reed-Solomon code of length n and dimension `k` over the evaluation
    /// points of this session.
    pub fn codec(&self, k: usize) -> Result<RsCodec> {
        Ok(RsCodec::new(self.n, k, &self.eval_points)?)
    }

    #[cfg(test)]
    #[allow(missing_docs)]
    pub fn default_arc(n: usize, t: usize) -> Arc<Self> {
        MpcParametersBuilder::new()
            .set_parties(n)
            .set_threshold(t)
            .build_arc()
            .unwrap()
    }
}

/// Builder for parameters of an MPC session.
#[derive(Debug)]
pub struct MpcParametersBuilder {
    n: usize,
    t: usize,
    modulus: u64,
    omega_points: bool,
    reconstruction_timeout: Option<Duration>,
}

impl MpcParametersBuilder {
    /// Creates a new instance of the builder
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            n: Default::default(),
            t: Default::default(),
            modulus: GOLDILOCKS,
            omega_points: false,
            reconstruction_timeout: None,
        }
    }

    /// Sets the number of parties.
    pub fn set_parties(&mut self, n: usize) -> &mut Self {
        self.n = n;
        self
    }

    /// Sets the threshold, i.e. the maximal number of corrupted parties.
    pub fn set_threshold(&mut self, t: usize) -> &mut Self {
        self.t = t;
        self
    }

    /// Sets the prime modulus of the field. Defaults to the Goldilocks prime.
    pub fn set_modulus(&mut self, modulus: u64) -> &mut Self {
        self.modulus = modulus;
        self
    }

    /// Evaluate shares at powers of a root of unity instead of `1..=n`.
    pub fn use_omega_powers(&mut self, omega_points: bool) -> &mut Self {
        self.omega_points = omega_points;
        self
    }

    /// Bound the duration of every reconstruction. By default a
    /// reconstruction waits for as long as it takes.
    pub fn set_reconstruction_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.reconstruction_timeout = Some(timeout);
        self
    }

    /// Build a new `MpcParameters` inside an `Arc`.
    pub fn build_arc(&self) -> Result<Arc<MpcParameters>> {
        self.build().map(Arc::new)
    }

    /// Build a new `MpcParameters`.
    pub fn build(&self) -> Result<MpcParameters> {
        validate_threshold_config(self.n, self.t)?;
        let field = Field::new(self.modulus)?;
        if self.n as u64 >= field.modulus() {
            return Err(ParametersError::TooManyParties(self.n, field.modulus()).into());
        }
        let eval_points = EvalPoint::new(field, self.n, self.omega_points)?;
        Ok(MpcParameters {
            n: self.n,
            t: self.t,
            field,
            eval_points,
            reconstruction_timeout: self.reconstruction_timeout,
        })
    }
}

/// Validates the number of parties and the threshold.
///
/// Robust reconstruction and RanDouSha checking need `n >= 3t + 1`.
pub fn validate_threshold_config(n: usize, t: usize) -> Result<()> {
    if n == 0 {
        return Err(ParametersError::InvalidPartyCount(n).into());
    }
    if t == 0 || n < 3 * t + 1 {
        return Err(ParametersError::InvalidThreshold(t, n).into());
    }
    Ok(())
}

fn default_modulus() -> u64 {
    GOLDILOCKS
}

/// Plain, serializable session configuration.
///
/// Loading it from a file is left to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpcConfig {
    /// Number of parties.
    pub n: usize,
    /// Threshold.
    pub t: usize,
    /// Prime modulus of the field.
    #[serde(default = "default_modulus")]
    pub modulus: u64,
    /// Whether to use powers of a root of unity as evaluation points.
    #[serde(default)]
    pub omega_points: bool,
    /// Reconstruction timeout in milliseconds.
    #[serde(default)]
    pub reconstruction_timeout_ms: Option<u64>,
}

impl TryFrom<&MpcConfig> for MpcParameters {
    type Error = Error;

    fn try_from(config: &MpcConfig) -> Result<Self> {
        let mut builder = MpcParametersBuilder::new();
        builder
            .set_parties(config.n)
            .set_threshold(config.t)
            .set_modulus(config.modulus)
            .use_omega_powers(config.omega_points);
        if let Some(ms) = config.reconstruction_timeout_ms {
            builder.set_reconstruction_timeout(Duration::from_millis(ms));
        }
        builder.build()
    }
}
