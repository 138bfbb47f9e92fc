use serde::{Deserialize, Deserializer};

/// A field of a partial update: either left alone or overwritten with a value.
///
/// Absent keys and JSON `null` both deserialize to [`Patch::Unset`]; any other
/// value (an empty string or empty list included) is [`Patch::Set`]. Use with
/// `#[serde(default)]` so missing keys resolve to `Unset`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unset,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Unset => Patch::Unset,
            Patch::Set(v) => Patch::Set(f(v)),
        }
    }

    /// Overwrites `slot` when set.
    pub fn apply_to(self, slot: &mut T) {
        if let Patch::Set(v) = self {
            *slot = v;
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Patch::Set(v),
            None => Patch::Unset,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}
