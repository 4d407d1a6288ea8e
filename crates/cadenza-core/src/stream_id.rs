use std::fmt;

use crate::{Adaptation, Period, Representation};

/// Stable key for a (period, adaptation, representation) triple.
///
/// The three identifiers are kept apart rather than joined into one string,
/// so two distinct triples can never map to the same key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId {
    period: String,
    adaptation: String,
    representation: String,
}

impl StreamId {
    pub fn new(period: &Period, adaptation: &Adaptation, representation: &Representation) -> Self {
        Self::from_parts(&period.id, &adaptation.id, &representation.id)
    }

    pub fn from_parts(period: &str, adaptation: &str, representation: &str) -> Self {
        Self {
            period: period.to_owned(),
            adaptation: adaptation.to_owned(),
            representation: representation.to_owned(),
        }
    }

    pub fn period(&self) -> &str {
        &self.period
    }

    pub fn adaptation(&self) -> &str {
        &self.adaptation
    }

    pub fn representation(&self) -> &str {
        &self.representation
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.period, self.adaptation, self.representation
        )
    }
}
