//! Per-dimension optimization sense.

use crate::error::Error;

/// An `M`-bit direction vector: `true` means "minimize this dimension",
/// `false` means "maximize this dimension".
///
/// Set at front/archive construction time and immutable thereafter (§3 of
/// the spec this crate implements).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Direction<const M: usize> {
    minimize: [bool; M],
}

impl<const M: usize> Direction<M> {
    /// every dimension minimized
    pub fn all_minimize() -> Self {
        Self { minimize: [true; M] }
    }

    /// every dimension maximized (the default per §6)
    pub fn all_maximize() -> Self {
        Self { minimize: [false; M] }
    }

    /// `true` iff `all_minimize` should be used, else `all_maximize`
    pub fn all(minimize: bool) -> Self {
        Self { minimize: [minimize; M] }
    }

    /// builds a direction vector from explicit per-dimension booleans
    pub fn from_bools(minimize: [bool; M]) -> Self {
        Self { minimize }
    }

    /// builds a direction vector from the recognized textual tokens
    /// (`"min"`, `"minimization"`, `"max"`, `"maximization"`, case-sensitive)
    pub fn from_tokens(tokens: [&str; M]) -> Result<Self, Error> {
        let mut minimize = [false; M];
        for (i, token) in tokens.iter().enumerate() {
            minimize[i] = match *token {
                "min" | "minimization" => true,
                "max" | "maximization" => false,
                other => return Err(Error::InvalidDirectionToken(other.to_string())),
            };
        }
        Ok(Self { minimize })
    }

    /// `true` iff dimension `i` is minimized
    pub fn minimizes(&self, i: usize) -> bool {
        self.minimize[i]
    }

    /// number of dimensions in this direction vector
    pub fn dimensions(&self) -> usize {
        M
    }

    /// flips every dimension's sense (used by the directional-symmetry test)
    pub fn negated(&self) -> Self {
        let mut minimize = self.minimize;
        for m in minimize.iter_mut() {
            *m = !*m;
        }
        Self { minimize }
    }
}

impl<const M: usize> Default for Direction<M> {
    /// the spec's default constructor: maximize every dimension
    fn default() -> Self {
        Self::all_maximize()
    }
}
