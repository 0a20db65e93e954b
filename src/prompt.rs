use std::io::{self, BufRead, Write};

use log::debug;

use crate::{
    encoder::{EncodeErr, category, continuous},
    record::PatientRecord,
    schema::{FEATURES, FeatureSpec, FieldKind},
};

/// Asks for every clinical field in table order, repeating a question until its answer is valid.
///
/// # Returns
/// The completed record, or `None` if `input` ends before every field was answered.
pub fn read_record<R, W>(input: &mut R, output: &mut W) -> io::Result<Option<PatientRecord>>
where
    R: BufRead,
    W: Write,
{
    let mut record = PatientRecord::new();

    for spec in &FEATURES {
        let Some(value) = read_field(spec, input, output)? else {
            return Ok(None);
        };
        record = record.with(spec.name, value);
    }

    Ok(Some(record))
}

fn read_field<R, W>(spec: &FeatureSpec, input: &mut R, output: &mut W) -> io::Result<Option<f64>>
where
    R: BufRead,
    W: Write,
{
    let mut line = String::new();

    loop {
        write!(output, "{}: ", spec.name)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        match parse(spec, line.trim()) {
            Ok(value) => return Ok(Some(value)),
            Err(complaint) => {
                debug!("rejected {:?} for {}", line.trim(), spec.name);
                writeln!(output, "{complaint}")?;
            }
        }
    }
}

fn parse(spec: &FeatureSpec, answer: &str) -> Result<f64, String> {
    let value = match answer.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => return Err("Incorrect format.".to_string()),
    };

    let FieldKind::Categorical { choices } = spec.kind else {
        return match continuous(spec.name, value) {
            Ok(_) => Ok(value),
            Err(_) => Err("Incorrect format.".to_string()),
        };
    };

    match category(spec.name, value, choices) {
        Ok(_) => Ok(value),
        Err(EncodeErr::NotInteger { .. }) => Err("Must be integer.".to_string()),
        Err(_) => Err(format!("Must >= 0 and < {choices}")),
    }
}
