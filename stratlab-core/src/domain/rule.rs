//! Rules — a single field/operator/value condition.
//!
//! Rules are immutable once added to a strategy. Each rule category (scanner,
//! buy, sell) has its own field and operator vocabulary; the rule shape is the
//! same for all three.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::ids::RuleId;

/// Instrument attribute a rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Price,
    Volume,
    MarketCap,
    PeRatio,
    Rsi,
    Sector,
    ProfitPercentage,
    LossPercentage,
    Time,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Price,
        Field::Volume,
        Field::MarketCap,
        Field::PeRatio,
        Field::Rsi,
        Field::Sector,
        Field::ProfitPercentage,
        Field::LossPercentage,
        Field::Time,
    ];

    /// Wire key, as stored in serialized strategies.
    pub fn key(self) -> &'static str {
        match self {
            Field::Price => "price",
            Field::Volume => "volume",
            Field::MarketCap => "marketCap",
            Field::PeRatio => "peRatio",
            Field::Rsi => "rsi",
            Field::Sector => "sector",
            Field::ProfitPercentage => "profitPercentage",
            Field::LossPercentage => "lossPercentage",
            Field::Time => "time",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Price => "Price",
            Field::Volume => "Volume",
            Field::MarketCap => "Market Cap",
            Field::PeRatio => "P/E Ratio",
            Field::Rsi => "RSI (14)",
            Field::Sector => "Sector",
            Field::ProfitPercentage => "Profit %",
            Field::LossPercentage => "Loss %",
            Field::Time => "Time Held",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RuleError::UnknownField(s.to_string()))
    }
}

/// Comparison applied between the field and the rule value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startsWith")]
    StartsWith,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Gt,
        Operator::Lt,
        Operator::Eq,
        Operator::Gte,
        Operator::Lte,
        Operator::Contains,
        Operator::StartsWith,
    ];

    pub const COMPARISONS: [Operator; 5] = [
        Operator::Gt,
        Operator::Lt,
        Operator::Eq,
        Operator::Gte,
        Operator::Lte,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Eq => "=",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
        }
    }

    /// Shell-friendly alias, accepted by `FromStr` alongside the symbol.
    pub fn alias(self) -> &'static str {
        match self {
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Eq => "eq",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::Contains => "contains",
            Operator::StartsWith => "startswith",
        }
    }

    /// Ordering comparisons only make sense against a number.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte
        )
    }

    /// Whether this operator can be applied to `value`.
    ///
    /// Text operators compare the value's text form, so they accept both kinds.
    pub fn accepts(self, value: &RuleValue) -> bool {
        !self.is_ordering() || value.is_numeric()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.symbol() == s || op.alias().eq_ignore_ascii_case(s))
            .ok_or_else(|| RuleError::UnknownOperator(s.to_string()))
    }
}

/// Rule value: a number or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Numeric(f64),
    Text(String),
}

impl RuleValue {
    /// Coerce raw user input into a rule value.
    ///
    /// Blank input yields `None`. Input that parses as a finite number becomes
    /// `Numeric`; anything else is kept verbatim as `Text`.
    pub fn coerce(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Some(RuleValue::Numeric(n)),
            _ => Some(RuleValue::Text(raw.to_string())),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, RuleValue::Numeric(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RuleValue::Numeric(n) => Some(*n),
            RuleValue::Text(_) => None,
        }
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Numeric(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            RuleValue::Numeric(n) => write!(f, "{n}"),
            RuleValue::Text(s) => f.write_str(s),
        }
    }
}

/// Which rule list of a strategy a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Scanner,
    Buy,
    Sell,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 3] = [
        RuleCategory::Scanner,
        RuleCategory::Buy,
        RuleCategory::Sell,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RuleCategory::Scanner => "Scanner",
            RuleCategory::Buy => "Buy",
            RuleCategory::Sell => "Sell",
        }
    }

    /// Fields selectable for this category.
    pub fn fields(self) -> &'static [Field] {
        match self {
            RuleCategory::Scanner => &[
                Field::Price,
                Field::Volume,
                Field::MarketCap,
                Field::PeRatio,
                Field::Rsi,
                Field::Sector,
            ],
            RuleCategory::Buy => &[Field::Price, Field::Volume, Field::Rsi],
            RuleCategory::Sell => &[
                Field::Price,
                Field::ProfitPercentage,
                Field::LossPercentage,
                Field::Rsi,
                Field::Volume,
                Field::Time,
            ],
        }
    }

    /// Operators selectable for this category.
    pub fn operators(self) -> &'static [Operator] {
        match self {
            RuleCategory::Scanner => &Operator::ALL,
            RuleCategory::Buy | RuleCategory::Sell => &Operator::COMPARISONS,
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RuleCategory {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleCategory::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RuleError::UnknownCategory(s.to_string()))
    }
}

/// Why a rule could not be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("rule value is empty")]
    EmptyValue,

    #[error("field '{field}' is not available for {category} rules")]
    FieldNotAllowed { field: Field, category: RuleCategory },

    #[error("operator '{operator}' is not available for {category} rules")]
    OperatorNotAllowed {
        operator: Operator,
        category: RuleCategory,
    },

    #[error("operator '{operator}' needs a numeric value, got '{value}'")]
    NonNumericComparison { operator: Operator, value: String },

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("unknown rule category '{0}'")]
    UnknownCategory(String),
}

/// A rule as entered by the user, before it is given an id.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDraft {
    pub field: Field,
    pub operator: Operator,
    /// Raw input; coerced with [`RuleValue::coerce`].
    pub value: String,
}

impl RuleDraft {
    pub fn new(field: Field, operator: Operator, value: impl ToString) -> Self {
        Self {
            field,
            operator,
            value: value.to_string(),
        }
    }

    /// Check the draft against `category`'s vocabulary and coerce the value.
    pub fn validate(&self, category: RuleCategory) -> Result<RuleValue, RuleError> {
        let value = RuleValue::coerce(&self.value).ok_or(RuleError::EmptyValue)?;
        if !category.fields().contains(&self.field) {
            return Err(RuleError::FieldNotAllowed {
                field: self.field,
                category,
            });
        }
        if !category.operators().contains(&self.operator) {
            return Err(RuleError::OperatorNotAllowed {
                operator: self.operator,
                category,
            });
        }
        if !self.operator.accepts(&value) {
            return Err(RuleError::NonNumericComparison {
                operator: self.operator,
                value: value.to_string(),
            });
        }
        Ok(value)
    }

    /// Build the rule, assigning `id`.
    pub fn into_rule(self, id: RuleId, category: RuleCategory) -> Result<Rule, RuleError> {
        let value = self.validate(category)?;
        Ok(Rule {
            id,
            field: self.field,
            operator: self.operator,
            value,
        })
    }
}

/// A single filter or trigger condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub field: Field,
    pub operator: Operator,
    pub value: RuleValue,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}
