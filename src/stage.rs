//! Pipeline stages as a typed enum.

use std::fmt;

/// Where a request currently is in the fixed six-stage sequence.
///
/// The order of the variants is the execution order, so stages compare with
/// `<` the way they run: `Stage::Front < Stage::Back`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Stage {
    Before,
    Front,
    Middle,
    Core,
    Back,
    After,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::Front  => "front",
            Self::Middle => "middle",
            Self::Core   => "core",
            Self::Back   => "back",
            Self::After  => "after",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Stage;

    #[test]
    fn variants_order_as_they_execute() {
        let order = [Stage::Before, Stage::Front, Stage::Middle, Stage::Core, Stage::Back, Stage::After];
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }
}
