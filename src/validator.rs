//! Structural validation collaborator.
//!
//! The router never knows what "valid" means. It holds an optional
//! [`Validator`] and hands every body decoded through
//! [`Ctx::validate_body`](crate::Ctx::validate_body) to it. No validator is a
//! supported configuration: validation is then skipped.
//!
//! ```rust
//! use waypost::{BoxError, Router, Rules, Validate};
//!
//! #[derive(serde::Deserialize)]
//! struct NewUser { name: String }
//!
//! impl Validate for NewUser {
//!     fn validate(&self) -> Result<(), BoxError> {
//!         if self.name.is_empty() {
//!             return Err("name is required".into());
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let app = Router::with_validator(Rules::new().check::<NewUser>());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::error::BoxError;

/// Validates a decoded value of any type.
///
/// Implemented for closures, so `|value: &dyn Any| …` works as a validator.
pub trait Validator: Send + Sync + 'static {
    fn validate(&self, value: &dyn Any) -> Result<(), BoxError>;
}

impl<F> Validator for F
where
    F: Fn(&dyn Any) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn validate(&self, value: &dyn Any) -> Result<(), BoxError> {
        self(value)
    }
}

/// A payload type that knows its own rules.
pub trait Validate {
    fn validate(&self) -> Result<(), BoxError>;
}

type Rule = Box<dyn Fn(&dyn Any) -> Result<(), BoxError> + Send + Sync>;

/// A [`Validator`] holding one rule per payload type.
///
/// Types without a registered rule pass.
#[derive(Default)]
pub struct Rules {
    rules: HashMap<TypeId, Rule>,
}

impl Rules {
    pub fn new() -> Self { Self::default() }

    /// Registers `rule` for values of type `T`, replacing any earlier rule.
    pub fn rule<T, F>(mut self, rule: F) -> Self
    where
        T: 'static,
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let erased: Rule = Box::new(move |value| match value.downcast_ref::<T>() {
            Some(value) => rule(value),
            None => Ok(()),
        });
        self.rules.insert(TypeId::of::<T>(), erased);
        self
    }

    /// Registers `T`'s own [`Validate`] impl as its rule.
    pub fn check<T: Validate + 'static>(self) -> Self {
        self.rule::<T, _>(T::validate)
    }
}

impl Validator for Rules {
    fn validate(&self, value: &dyn Any) -> Result<(), BoxError> {
        match self.rules.get(&value.type_id()) {
            Some(rule) => rule(value),
            None => Ok(()),
        }
    }
}
