//! The capability contract consumed by the operator catalogue.
//!
//! Operators are written against concrete families where the math is
//! family-specific, and against [`Belief`] where it is not (damping,
//! sparse-list lifting, evidence plumbing). The [`Message`] enum is the
//! closed tagged union a scheduler dispatches over once per factor
//! argument.

use ff_common::{OpResult, OperatorError};
use serde::{Deserialize, Serialize};

use crate::{Bernoulli, Beta, Dirichlet, Discrete, Gamma, Gaussian};

/// Message algebra every scalar family supports.
pub trait Belief: Clone + PartialEq {
    /// The multiplicative identity with the same shape as `self`.
    fn uniform_like(&self) -> Self;
    fn is_uniform(&self) -> bool;
    fn is_point_mass(&self) -> bool;
    fn is_proper(&self) -> bool;
    fn product(&self, other: &Self) -> OpResult<Self>;
    fn ratio(&self, other: &Self, force_proper: bool) -> OpResult<Self>;
    fn power(&self, exponent: f64) -> OpResult<Self>;
    /// log of the expectation of `other`'s density under `self`.
    fn log_average_of(&self, other: &Self) -> f64;
}

macro_rules! impl_belief {
    ($ty:ty, $uniform:expr) => {
        impl Belief for $ty {
            fn uniform_like(&self) -> Self {
                $uniform(self)
            }
            fn is_uniform(&self) -> bool {
                <$ty>::is_uniform(self)
            }
            fn is_point_mass(&self) -> bool {
                <$ty>::is_point_mass(self)
            }
            fn is_proper(&self) -> bool {
                <$ty>::is_proper(self)
            }
            fn product(&self, other: &Self) -> OpResult<Self> {
                <$ty>::product(self, other)
            }
            fn ratio(&self, other: &Self, force_proper: bool) -> OpResult<Self> {
                <$ty>::ratio(self, other, force_proper)
            }
            fn power(&self, exponent: f64) -> OpResult<Self> {
                <$ty>::power(self, exponent)
            }
            fn log_average_of(&self, other: &Self) -> f64 {
                <$ty>::log_average_of(self, other)
            }
        }
    };
}

impl_belief!(Gaussian, |_: &Gaussian| Gaussian::uniform());
impl_belief!(Beta, |_: &Beta| Beta::uniform());
impl_belief!(Gamma, |_: &Gamma| Gamma::uniform());
impl_belief!(Bernoulli, |_: &Bernoulli| Bernoulli::uniform());
impl_belief!(Discrete, |d: &Discrete| Discrete::uniform(d.len()));
impl_belief!(Dirichlet, |d: &Dirichlet| Dirichlet::uniform(d.len()));

/// Tagged union over the scalar message families.
///
/// A scheduler resolves each factor argument to one variant once, then
/// calls the matching operator overload; the enum also lets generic
/// plumbing (damping, buffers) hold heterogeneous messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Gaussian(Gaussian),
    Beta(Beta),
    Gamma(Gamma),
    Bernoulli(Bernoulli),
    Discrete(Discrete),
    Dirichlet(Dirichlet),
}

macro_rules! message_delegate {
    ($self:ident, $other:ident, $method:ident $(, $arg:expr)*) => {
        match ($self, $other) {
            (Message::Gaussian(a), Message::Gaussian(b)) => Ok(Message::Gaussian(a.$method(b $(, $arg)*)?)),
            (Message::Beta(a), Message::Beta(b)) => Ok(Message::Beta(a.$method(b $(, $arg)*)?)),
            (Message::Gamma(a), Message::Gamma(b)) => Ok(Message::Gamma(a.$method(b $(, $arg)*)?)),
            (Message::Bernoulli(a), Message::Bernoulli(b)) => Ok(Message::Bernoulli(a.$method(b $(, $arg)*)?)),
            (Message::Discrete(a), Message::Discrete(b)) => Ok(Message::Discrete(a.$method(b $(, $arg)*)?)),
            (Message::Dirichlet(a), Message::Dirichlet(b)) => Ok(Message::Dirichlet(a.$method(b $(, $arg)*)?)),
            _ => Err(OperatorError::DomainMismatch {
                argument: "message",
                message: "mismatched distribution families".to_string(),
            }),
        }
    };
}

impl Message {
    pub fn family_name(&self) -> &'static str {
        match self {
            Message::Gaussian(_) => "gaussian",
            Message::Beta(_) => "beta",
            Message::Gamma(_) => "gamma",
            Message::Bernoulli(_) => "bernoulli",
            Message::Discrete(_) => "discrete",
            Message::Dirichlet(_) => "dirichlet",
        }
    }

    pub fn is_point_mass(&self) -> bool {
        match self {
            Message::Gaussian(d) => d.is_point_mass(),
            Message::Beta(d) => d.is_point_mass(),
            Message::Gamma(d) => d.is_point_mass(),
            Message::Bernoulli(d) => d.is_point_mass(),
            Message::Discrete(d) => Discrete::is_point_mass(d),
            Message::Dirichlet(_) => false,
        }
    }

    pub fn is_uniform(&self) -> bool {
        match self {
            Message::Gaussian(d) => d.is_uniform(),
            Message::Beta(d) => d.is_uniform(),
            Message::Gamma(d) => d.is_uniform(),
            Message::Bernoulli(d) => d.is_uniform(),
            Message::Discrete(d) => d.is_uniform(),
            Message::Dirichlet(d) => d.is_uniform(),
        }
    }

    pub fn product(&self, other: &Message) -> OpResult<Message> {
        message_delegate!(self, other, product)
    }

    pub fn ratio(&self, other: &Message, force_proper: bool) -> OpResult<Message> {
        message_delegate!(self, other, ratio, force_proper)
    }

    pub fn log_average_of(&self, other: &Message) -> OpResult<f64> {
        match (self, other) {
            (Message::Gaussian(a), Message::Gaussian(b)) => Ok(a.log_average_of(b)),
            (Message::Beta(a), Message::Beta(b)) => Ok(a.log_average_of(b)),
            (Message::Gamma(a), Message::Gamma(b)) => Ok(a.log_average_of(b)),
            (Message::Bernoulli(a), Message::Bernoulli(b)) => Ok(a.log_average_of(b)),
            (Message::Discrete(a), Message::Discrete(b)) => Ok(a.log_average_of(b)),
            (Message::Dirichlet(a), Message::Dirichlet(b)) => Ok(a.log_average_of(b)),
            _ => Err(OperatorError::DomainMismatch {
                argument: "message",
                message: "mismatched distribution families".to_string(),
            }),
        }
    }
}
