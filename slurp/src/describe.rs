use serde::{Deserialize, Serialize};

/// Human readable identity of a registered capability.
///
/// Analysts and producers must implement it to be registered, loaders get it through
/// [`crate::loader::InstrumentedDataLoader`].
pub trait Describe {
    fn name(&self) -> &str;

    fn description(&self) -> &str;
}

/// Owned name and description pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub name: String,
    pub description: String,
}

impl Description {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Captures the current name and description of `describer`.
    pub fn of<D: Describe + ?Sized>(describer: &D) -> Self {
        Self::new(describer.name(), describer.description())
    }

    /// Description used for capabilities that do not describe themselves.
    pub fn anonymous(type_name: &str) -> Self {
        Self::new("Anonymous", format!("Anonymous {type_name}"))
    }
}

impl Describe for Description {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }
}
