// src/check/compare.rs

use crate::search::Entry;

/// Decides whether two successful result sets differ.
pub trait Compare: Send {
    fn changed(&self, previous: &[Entry], current: &[Entry]) -> bool;
}

impl<F> Compare for F
where
    F: Fn(&[Entry], &[Entry]) -> bool + Send,
{
    fn changed(&self, previous: &[Entry], current: &[Entry]) -> bool {
        self(previous, current)
    }
}

/// Built-in comparison strategies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Comparison {
    /// Same entries regardless of order. Duplicate DNs count as separate
    /// entries.
    #[default]
    Structural,
    /// Same number of entries, same DNs in the same order, and equal values
    /// for each listed attribute. Other attributes are ignored.
    Attributes(Vec<String>),
}

impl Comparison {
    pub fn attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Comparison::Attributes(names.into_iter().map(Into::into).collect())
    }
}

impl Compare for Comparison {
    fn changed(&self, previous: &[Entry], current: &[Entry]) -> bool {
        if previous.len() != current.len() {
            return true;
        }

        match self {
            Comparison::Structural => sorted(previous) != sorted(current),
            Comparison::Attributes(names) => {
                previous.iter().zip(current).any(|(prev, next)| {
                    prev.dn != next.dn
                        || names.iter().any(|name| prev.values(name) != next.values(name))
                })
            }
        }
    }
}

fn sorted(entries: &[Entry]) -> Vec<&Entry> {
    let mut sorted: Vec<&Entry> = entries.iter().collect();
    sorted.sort_unstable();
    sorted
}
