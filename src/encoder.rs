use std::{error::Error, fmt};

use crate::{
    record::PatientRecord,
    schema::{ENCODED_WIDTH, FEATURES, FieldKind},
};

/// A patient record turned into the network's input vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedFeature([f32; ENCODED_WIDTH]);

impl EncodedFeature {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn as_array(&self) -> &[f32; ENCODED_WIDTH] {
        &self.0
    }
}

impl AsRef<[f32]> for EncodedFeature {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// A record that can't be encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeErr {
    MissingField(&'static str),
    UnknownField(String),
    NotInteger {
        field: &'static str,
        value: f64,
    },
    OutOfRange {
        field: &'static str,
        value: f64,
        choices: usize,
    },
    NotFinite {
        field: &'static str,
    },
}

impl fmt::Display for EncodeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeErr::MissingField(field) => write!(f, "missing field `{field}`"),
            EncodeErr::UnknownField(field) => write!(f, "unknown field `{field}`"),
            EncodeErr::NotInteger { field, value } => {
                write!(f, "field `{field}` must be an integer, got {value}")
            }
            EncodeErr::OutOfRange {
                field,
                value,
                choices,
            } => write!(
                f,
                "field `{field}` must be >= 0 and < {choices}, got {value}"
            ),
            EncodeErr::NotFinite { field } => write!(f, "field `{field}` must be finite"),
        }
    }
}

impl Error for EncodeErr {}

/// Encodes `record` following the feature table: one-hot vectors for categorical fields and the
/// raw value for continuous ones, concatenated in table order.
///
/// # Returns
/// The encoded vector or the first problem found walking the table.
pub fn encode(record: &PatientRecord) -> Result<EncodedFeature, EncodeErr> {
    if let Some((name, _)) = record
        .iter()
        .find(|(name, _)| FEATURES.iter().all(|spec| spec.name != *name))
    {
        return Err(EncodeErr::UnknownField(name.to_string()));
    }

    let mut encoded = [0.; ENCODED_WIDTH];
    let mut offset = 0;

    for spec in &FEATURES {
        let field = spec.name;
        let value = record.get(field).ok_or(EncodeErr::MissingField(field))?;

        match spec.kind {
            FieldKind::Categorical { choices } => {
                let index = category(field, value, choices)?;
                encoded[offset + index] = 1.;
            }
            FieldKind::Continuous => encoded[offset] = continuous(field, value)?,
        }

        offset += spec.width();
    }

    Ok(EncodedFeature(encoded))
}

/// Narrows a continuous value to the network's precision, rejecting anything that does not stay
/// finite once narrowed.
pub fn continuous(field: &'static str, value: f64) -> Result<f32, EncodeErr> {
    let narrowed = value as f32;
    if !narrowed.is_finite() {
        return Err(EncodeErr::NotFinite { field });
    }

    Ok(narrowed)
}

/// Validates a categorical value, returning it as an index in `[0, choices)`.
pub fn category(field: &'static str, value: f64, choices: usize) -> Result<usize, EncodeErr> {
    if !value.is_finite() {
        return Err(EncodeErr::NotFinite { field });
    }

    if value.fract() != 0. {
        return Err(EncodeErr::NotInteger { field, value });
    }

    if value < 0. || value >= choices as f64 {
        return Err(EncodeErr::OutOfRange {
            field,
            value,
            choices,
        });
    }

    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;

    fn record() -> PatientRecord {
        PatientRecord::new()
            .with(GENDER, 1.)
            .with(AGE, 42.)
            .with(CONTACT_HISTORY, 0.)
            .with(ACID_TEST, 1.)
            .with(X_RAY, 0.)
            .with(WBC, 7.5)
            .with(RBC, 4.25)
            .with(HGB, 133.)
    }

    #[test]
    fn layout_follows_the_table() {
        let encoded = encode(&record()).unwrap();
        assert_eq!(
            encoded.as_slice(),
            [0., 1., 42., 1., 0., 0., 1., 1., 0., 7.5, 4.25, 133.]
        );
    }

    #[test]
    fn one_hot_segments_sum_to_one() {
        let encoded = encode(&record()).unwrap();
        let mut offset = 0;

        for spec in &FEATURES {
            if let FieldKind::Categorical { choices } = spec.kind {
                let segment = &encoded.as_slice()[offset..offset + choices];
                assert_eq!(segment.iter().sum::<f32>(), 1.);
            }
            offset += spec.width();
        }

        assert_eq!(offset, ENCODED_WIDTH);
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(encode(&record()), encode(&record()));
    }

    #[test]
    fn boundary_categories_are_accepted() {
        assert!(encode(&record().with(GENDER, 0.)).is_ok());
        assert!(encode(&record().with(GENDER, 1.)).is_ok());
    }

    #[test]
    fn out_of_range_categories_are_rejected() {
        assert_eq!(
            encode(&record().with(X_RAY, 2.)),
            Err(EncodeErr::OutOfRange {
                field: X_RAY,
                value: 2.,
                choices: 2
            })
        );
        assert!(matches!(
            encode(&record().with(GENDER, -1.)),
            Err(EncodeErr::OutOfRange { .. })
        ));
        assert!(matches!(
            encode(&record().with(ACID_TEST, 0.5)),
            Err(EncodeErr::NotInteger { .. })
        ));
    }

    #[test]
    fn incomplete_or_foreign_records_are_rejected() {
        let missing: PatientRecord = record().iter().filter(|(name, _)| *name != HGB).collect();
        assert_eq!(encode(&missing), Err(EncodeErr::MissingField(HGB)));

        let foreign = record().with("country", 1.);
        assert_eq!(
            encode(&foreign),
            Err(EncodeErr::UnknownField("country".to_string()))
        );

        assert_eq!(
            encode(&record().with(WBC, f64::NAN)),
            Err(EncodeErr::NotFinite { field: WBC })
        );
    }

    #[test]
    fn values_beyond_f32_range_are_rejected() {
        assert_eq!(
            encode(&record().with(WBC, 1e300)),
            Err(EncodeErr::NotFinite { field: WBC })
        );
        assert_eq!(
            encode(&record().with(HGB, -1e300)),
            Err(EncodeErr::NotFinite { field: HGB })
        );
        assert_eq!(continuous(RBC, 3.5), Ok(3.5));
    }
}
