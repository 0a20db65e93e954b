//! The clinical feature table shared by the encoder, the sampler and the interactive prompt.
//!
//! The order of [`FEATURES`] is the order of the encoded vector, changing it invalidates every
//! trained model.

/// How a single field is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// An integer in `[0, choices)`, one-hot encoded.
    Categorical { choices: usize },
    /// A real number, passed through as is.
    Continuous,
}

impl FieldKind {
    /// Returns the amount of encoded values this kind takes.
    pub const fn width(&self) -> usize {
        match self {
            FieldKind::Categorical { choices } => *choices,
            FieldKind::Continuous => 1,
        }
    }
}

/// A named clinical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FeatureSpec {
    const fn categorical(name: &'static str, choices: usize) -> Self {
        Self {
            name,
            kind: FieldKind::Categorical { choices },
        }
    }

    const fn continuous(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Continuous,
        }
    }

    pub const fn width(&self) -> usize {
        self.kind.width()
    }
}

pub const GENDER: &str = "gender";
pub const AGE: &str = "age";
pub const CONTACT_HISTORY: &str = "contact_history";
pub const ACID_TEST: &str = "acid_test";
pub const X_RAY: &str = "x_ray";
pub const WBC: &str = "wbc";
pub const RBC: &str = "rbc";
pub const HGB: &str = "hgb";

/// Every clinical field, in encoding order.
pub const FEATURES: [FeatureSpec; 8] = [
    FeatureSpec::categorical(GENDER, 2),
    FeatureSpec::continuous(AGE),
    FeatureSpec::categorical(CONTACT_HISTORY, 2),
    FeatureSpec::categorical(ACID_TEST, 2),
    FeatureSpec::categorical(X_RAY, 2),
    FeatureSpec::continuous(WBC),
    FeatureSpec::continuous(RBC),
    FeatureSpec::continuous(HGB),
];

/// The length of an encoded record.
pub const ENCODED_WIDTH: usize = encoded_width(&FEATURES);

const fn encoded_width(features: &[FeatureSpec]) -> usize {
    let mut width = 0;
    let mut i = 0;

    while i < features.len() {
        width += features[i].width();
        i += 1;
    }

    width
}

/// Looks a field up by name.
pub fn feature(name: &str) -> Option<&'static FeatureSpec> {
    FEATURES.iter().find(|spec| spec.name == name)
}
