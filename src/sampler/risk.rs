use crate::{encoder::EncodeErr, record::PatientRecord, schema::*};

/// The clinical fields of one patient, in table order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Vitals {
    pub gender: f64,
    pub age: f64,
    pub contact_history: f64,
    pub acid_test: f64,
    pub x_ray: f64,
    pub wbc: f64,
    pub rbc: f64,
    pub hgb: f64,
}

impl Vitals {
    fn from_record(record: &PatientRecord) -> Result<Self, EncodeErr> {
        let field = |name: &'static str| record.get(name).ok_or(EncodeErr::MissingField(name));

        Ok(Self {
            gender: field(GENDER)?,
            age: field(AGE)?,
            contact_history: field(CONTACT_HISTORY)?,
            acid_test: field(ACID_TEST)?,
            x_ray: field(X_RAY)?,
            wbc: field(WBC)?,
            rbc: field(RBC)?,
            hgb: field(HGB)?,
        })
    }

    pub fn to_record(self) -> PatientRecord {
        PatientRecord::new()
            .with(GENDER, self.gender)
            .with(AGE, self.age)
            .with(CONTACT_HISTORY, self.contact_history)
            .with(ACID_TEST, self.acid_test)
            .with(X_RAY, self.x_ray)
            .with(WBC, self.wbc)
            .with(RBC, self.rbc)
            .with(HGB, self.hgb)
    }

    pub fn score(&self) -> f64 {
        let flag = |v: f64, on: f64, off: f64| if v == 1. { on } else { off };

        let gender = if self.gender == 0. { 0.1 } else { -0.1 };
        let age = (self.age - 30.) / 300.;
        let contact_history = flag(self.contact_history, 0.5, -0.2);
        let acid_test = flag(self.acid_test, 10., -0.5);
        let x_ray = flag(self.x_ray, 100., -1.);
        let wbc = (4. - self.wbc) * 0.3;
        let rbc = (4. - self.rbc) * 0.2;
        let hgb = (140. - self.hgb) * 0.2;

        gender + age + contact_history + acid_test + x_ray + wbc + rbc + hgb
    }

    pub fn probability(&self) -> f64 {
        1. / (1. + (-self.score()).exp())
    }
}

/// Computes the latent linear infection score of a patient.
///
/// The weights are fixed by hand. `x_ray` and `acid_test` dominate, the rest only nudge the score.
///
/// # Returns
/// The score, or `MissingField` if the record lacks any clinical field.
pub fn risk_score(record: &PatientRecord) -> Result<f64, EncodeErr> {
    Vitals::from_record(record).map(|vitals| vitals.score())
}

/// The ground truth probability of infection, `sigmoid(risk_score)`.
pub fn infection_probability(record: &PatientRecord) -> Result<f64, EncodeErr> {
    Vitals::from_record(record).map(|vitals| vitals.probability())
}
