//! Purity characteristics of compiled expressions.

use bitflags::bitflags;

bitflags! {
    /// What the compiler knows about an expression's evaluation.
    ///
    /// The empty set is the default: not constant, deterministic, free of
    /// side effects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Characteristic: u8 {
        /// Can be evaluated at compile time.
        const CONSTANT = 1 << 0;
        /// May yield different results for the same inputs.
        const NON_DETERMINISTIC = 1 << 1;
        /// Changes state visible outside the expression.
        const SIDE_EFFECTUAL = 1 << 2;
    }
}

impl Characteristic {
    /// Combine the characteristics of two sub-expressions.
    ///
    /// The result is constant only if both are; non-determinism and side
    /// effects propagate from either. `CONSTANT` is the identity.
    #[must_use]
    pub fn merge(self, other: Characteristic) -> Characteristic {
        let mut merged = (self | other) - Characteristic::CONSTANT;
        if self.is_constant() && other.is_constant() {
            merged |= Characteristic::CONSTANT;
        }
        merged
    }

    /// Merge any number of characteristics; the empty merge is `CONSTANT`.
    pub fn merge_all<I: IntoIterator<Item = Characteristic>>(items: I) -> Characteristic {
        items
            .into_iter()
            .fold(Characteristic::CONSTANT, Characteristic::merge)
    }

    pub fn is_constant(self) -> bool {
        self.contains(Characteristic::CONSTANT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> Vec<Characteristic> {
        (0..8).map(Characteristic::from_bits_truncate).collect()
    }

    #[test]
    fn constant_only_if_both() {
        let c = Characteristic::CONSTANT;
        assert!(c.merge(c).is_constant());
        assert!(!c.merge(Characteristic::default()).is_constant());
        assert!(!Characteristic::default().merge(c).is_constant());
    }

    #[test]
    fn flags_propagate_from_either() {
        let merged = (Characteristic::CONSTANT | Characteristic::SIDE_EFFECTUAL)
            .merge(Characteristic::CONSTANT | Characteristic::NON_DETERMINISTIC);
        assert!(merged.is_constant());
        assert!(merged.contains(Characteristic::SIDE_EFFECTUAL));
        assert!(merged.contains(Characteristic::NON_DETERMINISTIC));
    }

    #[test]
    fn merge_is_commutative_and_associative() {
        for a in all() {
            for b in all() {
                assert_eq!(a.merge(b), b.merge(a));
                for c in all() {
                    assert_eq!(a.merge(b).merge(c), a.merge(b.merge(c)));
                }
            }
        }
    }

    #[test]
    fn constant_is_identity() {
        for a in all() {
            assert_eq!(Characteristic::CONSTANT.merge(a), a);
        }
        assert_eq!(Characteristic::merge_all([]), Characteristic::CONSTANT);
    }
}
