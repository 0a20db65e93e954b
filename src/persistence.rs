//! Model artifacts: the classifier parameters and the optimizer state in one safetensors file.
//!
//! Tensors (all `F32`, little endian):
//! `layer1.weight [12, H]`, `layer1.bias [H]`, `layer2.weight [H, 1]`, `layer2.bias [1]`,
//! `adam.v [P]` and `adam.s [P]`, where `P` is the parameter count. The header metadata holds the
//! format version, both layer widths and the Adam scalars.

use std::{
    collections::HashMap, error::Error, fmt, fs, io, io::Write, num::NonZeroUsize, ops::Range,
    path::Path, str::FromStr,
};

use log::info;
use machine_learning::optimization::{Adam, AdamState};
use safetensors::{Dtype, SafeTensors, tensor::TensorView};
use tempfile::NamedTempFile;

use crate::{classifier::Classifier, schema::ENCODED_WIDTH};

/// Bumped whenever the tensor layout or the metadata keys change.
pub const FORMAT_VERSION: u32 = 1;

const FORMAT_VERSION_KEY: &str = "format_version";
const INPUT_SIZE_KEY: &str = "input_size";
const HIDDEN_SIZE_KEY: &str = "hidden_size";
const ADAM_V: &str = "adam.v";
const ADAM_S: &str = "adam.s";

#[derive(Debug)]
pub enum ArtifactErr {
    Io(io::Error),
    Malformed(String),
    UnsupportedVersion(String),
    /// The artifact was built for a differently shaped classifier.
    SchemaMismatch {
        what: String,
        found: String,
        expected: String,
    },
}

impl ArtifactErr {
    fn malformed<E: fmt::Display>(e: E) -> Self {
        Self::Malformed(e.to_string())
    }

    fn mismatch<F, E>(what: impl Into<String>, found: F, expected: E) -> Self
    where
        F: fmt::Debug,
        E: fmt::Debug,
    {
        Self::SchemaMismatch {
            what: what.into(),
            found: format!("{found:?}"),
            expected: format!("{expected:?}"),
        }
    }
}

impl fmt::Display for ArtifactErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactErr::Io(e) => write!(f, "io error: {e}"),
            ArtifactErr::Malformed(reason) => write!(f, "malformed artifact: {reason}"),
            ArtifactErr::UnsupportedVersion(version) => write!(
                f,
                "unsupported artifact version {version}, expected {FORMAT_VERSION}"
            ),
            ArtifactErr::SchemaMismatch {
                what,
                found,
                expected,
            } => write!(
                f,
                "schema mismatch in {what}: found {found}, expected {expected}"
            ),
        }
    }
}

impl Error for ArtifactErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ArtifactErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ArtifactErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// A named slice of the flat parameter vector.
struct Section {
    name: &'static str,
    shape: Vec<usize>,
    range: Range<usize>,
}

fn layout(hidden_size: NonZeroUsize) -> [Section; 4] {
    let h = hidden_size.get();
    let l1w = ENCODED_WIDTH * h;
    let l1b = l1w + h;
    let l2w = l1b + h;

    [
        Section {
            name: "layer1.weight",
            shape: vec![ENCODED_WIDTH, h],
            range: 0..l1w,
        },
        Section {
            name: "layer1.bias",
            shape: vec![h],
            range: l1w..l1b,
        },
        Section {
            name: "layer2.weight",
            shape: vec![h, 1],
            range: l1b..l2w,
        },
        Section {
            name: "layer2.bias",
            shape: vec![1],
            range: l2w..l2w + 1,
        },
    ]
}

fn f32_tensor(shape: Vec<usize>, values: &[f32]) -> Result<TensorView<'_>, ArtifactErr> {
    TensorView::new(Dtype::F32, shape, bytemuck::cast_slice(values)).map_err(ArtifactErr::malformed)
}

/// Serializes a classifier and its optimizer.
pub fn to_bytes(classifier: &Classifier, optimizer: &Adam) -> Result<Vec<u8>, ArtifactErr> {
    let params = classifier.params();
    let state = optimizer.state();

    if state.v.len() != params.len() {
        return Err(ArtifactErr::mismatch(
            "optimizer state length",
            state.v.len(),
            params.len(),
        ));
    }

    let mut tensors = Vec::with_capacity(6);
    for Section { name, shape, range } in layout(classifier.hidden_size()) {
        tensors.push((name, f32_tensor(shape, &params[range])?));
    }
    tensors.push((ADAM_V, f32_tensor(vec![state.v.len()], &state.v)?));
    tensors.push((ADAM_S, f32_tensor(vec![state.s.len()], &state.s)?));

    let metadata: HashMap<String, String> = [
        (FORMAT_VERSION_KEY, FORMAT_VERSION.to_string()),
        (INPUT_SIZE_KEY, ENCODED_WIDTH.to_string()),
        (HIDDEN_SIZE_KEY, classifier.hidden_size().to_string()),
        ("adam.learning_rate", state.learning_rate.to_string()),
        ("adam.beta1", state.beta1.to_string()),
        ("adam.beta2", state.beta2.to_string()),
        ("adam.epsilon", state.epsilon.to_string()),
        ("adam.beta1_t", state.beta1_t.to_string()),
        ("adam.beta2_t", state.beta2_t.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let views = tensors.iter().map(|(name, view)| (*name, view));
    safetensors::serialize(views, &Some(metadata)).map_err(ArtifactErr::malformed)
}

/// Rebuilds a classifier of `hidden_size` hidden units and its optimizer from serialized bytes.
///
/// # Returns
/// `SchemaMismatch` if the artifact describes a different network, `UnsupportedVersion` if it
/// was written by an incompatible format.
pub fn from_bytes(
    bytes: &[u8],
    hidden_size: NonZeroUsize,
) -> Result<(Classifier, Adam), ArtifactErr> {
    let (_, header) = SafeTensors::read_metadata(bytes).map_err(ArtifactErr::malformed)?;
    let metadata = header
        .metadata()
        .as_ref()
        .ok_or_else(|| ArtifactErr::Malformed("missing header metadata".to_string()))?;

    let version = metadata
        .get(FORMAT_VERSION_KEY)
        .ok_or_else(|| ArtifactErr::Malformed(format!("missing `{FORMAT_VERSION_KEY}`")))?;
    if version.parse::<u32>().ok() != Some(FORMAT_VERSION) {
        return Err(ArtifactErr::UnsupportedVersion(version.clone()));
    }

    let input_size: usize = field(metadata, INPUT_SIZE_KEY)?;
    if input_size != ENCODED_WIDTH {
        return Err(ArtifactErr::mismatch(INPUT_SIZE_KEY, input_size, ENCODED_WIDTH));
    }

    let stored_hidden: usize = field(metadata, HIDDEN_SIZE_KEY)?;
    if stored_hidden != hidden_size.get() {
        return Err(ArtifactErr::mismatch(
            HIDDEN_SIZE_KEY,
            stored_hidden,
            hidden_size.get(),
        ));
    }

    let tensors = SafeTensors::deserialize(bytes).map_err(ArtifactErr::malformed)?;
    let read = |name: &str, shape: &[usize]| -> Result<Vec<f32>, ArtifactErr> {
        let tensor = tensors.tensor(name).map_err(ArtifactErr::malformed)?;

        if tensor.dtype() != Dtype::F32 {
            return Err(ArtifactErr::mismatch(
                format!("{name} dtype"),
                tensor.dtype(),
                Dtype::F32,
            ));
        }

        if tensor.shape() != shape {
            return Err(ArtifactErr::mismatch(
                format!("{name} shape"),
                tensor.shape(),
                shape,
            ));
        }

        Ok(bytemuck::pod_collect_to_vec(tensor.data()))
    };

    let param_count = Classifier::param_count(hidden_size);
    let mut params = Vec::with_capacity(param_count);
    for Section { name, shape, .. } in layout(hidden_size) {
        params.extend(read(name, &shape)?);
    }

    let state = AdamState {
        learning_rate: field(metadata, "adam.learning_rate")?,
        beta1: field(metadata, "adam.beta1")?,
        beta2: field(metadata, "adam.beta2")?,
        epsilon: field(metadata, "adam.epsilon")?,
        beta1_t: field(metadata, "adam.beta1_t")?,
        beta2_t: field(metadata, "adam.beta2_t")?,
        v: read(ADAM_V, &[param_count])?,
        s: read(ADAM_S, &[param_count])?,
    };

    let classifier = Classifier::from_params(hidden_size, params).map_err(ArtifactErr::malformed)?;
    let optimizer = Adam::from_state(state).map_err(ArtifactErr::malformed)?;

    Ok((classifier, optimizer))
}

fn field<T>(metadata: &HashMap<String, String>, key: &str) -> Result<T, ArtifactErr>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = metadata
        .get(key)
        .ok_or_else(|| ArtifactErr::Malformed(format!("missing `{key}`")))?;

    raw.parse()
        .map_err(|e| ArtifactErr::Malformed(format!("bad `{key}` value {raw:?}: {e}")))
}

/// Writes the artifact to `path`, replacing any previous file only once the new one is complete.
pub fn save<P: AsRef<Path>>(
    path: P,
    classifier: &Classifier,
    optimizer: &Adam,
) -> Result<(), ArtifactErr> {
    let path = path.as_ref();
    let bytes = to_bytes(classifier, optimizer)?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(&bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    info!(bytes = bytes.len(); "saved model to {}", path.display());
    Ok(())
}

/// Reads an artifact written by [`save`].
pub fn load<P: AsRef<Path>>(
    path: P,
    hidden_size: NonZeroUsize,
) -> Result<(Classifier, Adam), ArtifactErr> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let loaded = from_bytes(&bytes, hidden_size)?;

    info!("loaded model from {}", path.display());
    Ok(loaded)
}
