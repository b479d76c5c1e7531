//! Data description of combination formulas.
//!
//! Formulas are plain data (loaded from class files or built by the equipment
//! system) that an [`AttributeSystem`](crate::AttributeSystem) compiles into
//! combined value elements. Attributes are referenced by designation and
//! resolved against the catalog at compile time.
//!
//! ## Examples
//!
//! ```
//! # use attribute_core::Formula;
//! // TotalDamage = Strength × 2
//! let damage = Formula::product([Formula::attribute("Strength"), Formula::Constant(2.0)]);
//!
//! // 25% of Energy + 10 flat
//! let mana = Formula::sum([
//!     Formula::percentage(25.0, Formula::attribute("Energy")),
//!     Formula::Constant(10.0),
//! ]);
//! # assert_eq!(damage.attributes(), vec!["Strength"]);
//! # assert_eq!(mana.attributes(), vec!["Energy"]);
//! ```

/// Formula for calculating an attribute contribution.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Formula {
    /// Fixed constant value.
    Constant(f32),

    /// Current total of the named attribute.
    Attribute(String),

    /// Sum of multiple formulas.
    Sum(Vec<Formula>),

    /// Product of multiple formulas.
    Product(Vec<Formula>),

    /// Minimum of multiple formulas.
    Min(Vec<Formula>),

    /// Maximum of multiple formulas.
    Max(Vec<Formula>),

    /// `percent`% of another formula.
    Percentage { percent: f32, of: Box<Formula> },
}

impl Formula {
    pub fn attribute(designation: impl Into<String>) -> Self {
        Formula::Attribute(designation.into())
    }

    pub fn sum(terms: impl Into<Vec<Formula>>) -> Self {
        Formula::Sum(terms.into())
    }

    pub fn product(terms: impl Into<Vec<Formula>>) -> Self {
        Formula::Product(terms.into())
    }

    pub fn percentage(percent: f32, of: Formula) -> Self {
        Formula::Percentage {
            percent,
            of: Box::new(of),
        }
    }

    /// Designations of every attribute the formula reads, in order of appearance.
    pub fn attributes(&self) -> Vec<&str> {
        let mut found = Vec::new();
        self.collect_attributes(&mut found);
        found
    }

    fn collect_attributes<'a>(&'a self, found: &mut Vec<&'a str>) {
        match self {
            Formula::Constant(_) => {}
            Formula::Attribute(designation) => found.push(designation),
            Formula::Sum(terms)
            | Formula::Product(terms)
            | Formula::Min(terms)
            | Formula::Max(terms) => {
                for term in terms {
                    term.collect_attributes(found);
                }
            }
            Formula::Percentage { of, .. } => of.collect_attributes(found),
        }
    }
}
