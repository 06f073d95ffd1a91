//! Column descriptors (§3): a tagged record of `(name, kind, flags)`.

use crate::schema::json_shape::JsonShape;
use crate::value::LogicalValue;

/// The storage kind of a column, with kind-specific sub-attributes.
///
/// This is the Rust sum-type rendering of the source's structural/string
/// discriminants, per Design Note §9 ("express columns as a sum type over
/// `{Int,Real,Text,Date,Bool,Json}` with kind-specific attributes").
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Int {
        auto_increment: bool,
        union: Option<Vec<i64>>,
        default: Option<i64>,
    },
    Real {
        union: Option<Vec<f64>>,
        default: Option<f64>,
    },
    Text {
        union: Option<Vec<String>>,
        default: Option<String>,
    },
    Date {
        default: Option<i64>,
    },
    Bool {
        default: Option<bool>,
    },
    Json {
        shape: JsonShape,
        default: Option<serde_json::Value>,
    },
}

impl ColumnKind {
    /// The SQLite storage-type affinity for this kind (§4.1).
    #[must_use]
    pub const fn storage_type(&self) -> &'static str {
        match self {
            Self::Int { .. } | Self::Bool { .. } | Self::Date { .. } => "INTEGER",
            Self::Real { .. } => "REAL",
            Self::Text { .. } | Self::Json { .. } => "TEXT",
        }
    }

    /// The column's declared default as a [`LogicalValue`], if any.
    #[must_use]
    pub fn default_value(&self) -> Option<LogicalValue> {
        match self {
            Self::Int { default, .. } => default.map(LogicalValue::Int),
            Self::Real { default, .. } => default.map(LogicalValue::Real),
            Self::Text { default, .. } => default.clone().map(LogicalValue::Text),
            Self::Date { default } => default.map(crate::value::millis_to_datetime).map(LogicalValue::Date),
            Self::Bool { default } => default.map(LogicalValue::Bool),
            Self::Json { default, .. } => default.clone().map(LogicalValue::Json),
        }
    }

    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int { .. })
    }

    #[must_use]
    pub const fn auto_increment(&self) -> bool {
        matches!(self, Self::Int { auto_increment: true, .. })
    }

    /// Validate `value` against this kind's union constraint, if any.
    /// Returns `true` when there is no constraint or the value satisfies it.
    #[must_use]
    pub fn satisfies_union(&self, value: &LogicalValue) -> bool {
        match (self, value) {
            (Self::Int { union: Some(allowed), .. }, LogicalValue::Int(v)) => allowed.contains(v),
            (Self::Real { union: Some(allowed), .. }, LogicalValue::Real(v)) => {
                allowed.iter().any(|a| (a - v).abs() < f64::EPSILON)
            }
            (Self::Text { union: Some(allowed), .. }, LogicalValue::Text(v)) => {
                allowed.contains(v)
            }
            (Self::Json { shape, .. }, LogicalValue::Json(v)) => shape.matches(v),
            // No union constraint declared for this kind, or the value is a
            // type mismatch the codec will already have rejected upstream.
            _ => true,
        }
    }
}

/// Column-level modifiers, each valid at most once per column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnFlags {
    pub primary: bool,
    pub unique: bool,
    pub nullable: bool,
}

/// A single column descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub flags: ColumnFlags,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: ColumnFlags::default(),
        }
    }

    #[must_use]
    pub const fn primary(mut self) -> Self {
        self.flags.primary = true;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.flags.unique = true;
        self
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.flags.nullable = true;
        self
    }

    #[must_use]
    pub const fn is_primary(&self) -> bool {
        self.flags.primary
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.flags.nullable && !self.flags.primary
    }

    /// Whether this column is optional on insert (§3 Row shape): it has
    /// `autoIncrement`, a `default`, or is `nullable`.
    #[must_use]
    pub fn optional_on_insert(&self) -> bool {
        self.kind.auto_increment() || self.kind.default_value().is_some() || self.is_nullable()
    }
}
