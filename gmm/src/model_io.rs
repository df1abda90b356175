use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use crate::error::GmmError;
use crate::model::GmmModel;

/// Binary format magic and version for persisted mixture models.
const SVGMM_MAGIC: [u8; 8] = [b'S', b'V', b'G', b'M', b'M', 0, 0, 0];
const SVGMM_VERSION: u32 = 1;

// Caps capacity hints taken from header fields, so a corrupt count fails
// as a truncated read instead of a giant allocation.
const MAX_PREALLOC: usize = 1 << 16;

fn write_err(e: std::io::Error) -> GmmError {
    GmmError::Io(e.to_string())
}

fn read_err(e: std::io::Error) -> GmmError {
    if e.kind() == ErrorKind::UnexpectedEof {
        GmmError::CorruptFile("truncated read".into())
    } else {
        GmmError::Io(e.to_string())
    }
}

fn read_u32(r: &mut impl Read) -> Result<u32, GmmError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(read_err)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(r: &mut impl Read) -> Result<u64, GmmError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(read_err)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64(r: &mut impl Read) -> Result<f64, GmmError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(read_err)?;
    Ok(f64::from_le_bytes(buf))
}

/// Serializes a mixture model to a writer.
///
/// ```text
/// [8B magic "SVGMM\0\0\0"] [4B version=1]
/// [8B K] [8B D]
/// [K x 8B f64 weights]
/// [K x D x 8B f64 means, row-major by component]
/// [K x D x 8B f64 variances, row-major by component]
/// ```
///
/// All multi-byte values are little-endian. The model is shape-validated
/// before anything is written.
pub fn save_model(w: &mut dyn Write, model: &GmmModel) -> Result<(), GmmError> {
    model.validate()?;

    let mut bw = BufWriter::new(w);

    bw.write_all(&SVGMM_MAGIC).map_err(write_err)?;
    bw.write_all(&SVGMM_VERSION.to_le_bytes()).map_err(write_err)?;
    bw.write_all(&(model.num_components as u64).to_le_bytes()).map_err(write_err)?;
    bw.write_all(&(model.dim as u64).to_le_bytes()).map_err(write_err)?;

    for &w_k in &model.weights {
        bw.write_all(&w_k.to_le_bytes()).map_err(write_err)?;
    }
    for row in &model.means {
        for &v in row {
            bw.write_all(&v.to_le_bytes()).map_err(write_err)?;
        }
    }
    for row in &model.vars {
        for &v in row {
            bw.write_all(&v.to_le_bytes()).map_err(write_err)?;
        }
    }

    bw.flush().map_err(write_err)?;
    Ok(())
}

/// Deserializes a mixture model from a reader.
///
/// Fails with [`GmmError::CorruptFile`] on bad magic, a zero K or D, or a
/// truncated stream, and [`GmmError::UnsupportedVersion`] on a version the
/// reader does not understand. The returned model is shape-validated.
pub fn load_model(r: &mut dyn Read) -> Result<GmmModel, GmmError> {
    let mut br = BufReader::new(r);

    let mut magic = [0u8; 8];
    br.read_exact(&mut magic).map_err(read_err)?;
    if magic != SVGMM_MAGIC {
        return Err(GmmError::CorruptFile(format!("bad magic {magic:?}")));
    }

    let version = read_u32(&mut br)?;
    if version != SVGMM_VERSION {
        return Err(GmmError::UnsupportedVersion {
            got: version,
            want: SVGMM_VERSION,
        });
    }

    let k_len = read_u64(&mut br)? as usize;
    let d_len = read_u64(&mut br)? as usize;
    if k_len == 0 || d_len == 0 {
        return Err(GmmError::CorruptFile(format!(
            "invalid model shape K={k_len} D={d_len}"
        )));
    }

    let mut model = GmmModel {
        num_components: k_len,
        dim: d_len,
        weights: Vec::with_capacity(k_len.min(MAX_PREALLOC)),
        means: Vec::with_capacity(k_len.min(MAX_PREALLOC)),
        vars: Vec::with_capacity(k_len.min(MAX_PREALLOC)),
    };

    for _ in 0..k_len {
        model.weights.push(read_f64(&mut br)?);
    }
    for _ in 0..k_len {
        let mut row = Vec::with_capacity(d_len.min(MAX_PREALLOC));
        for _ in 0..d_len {
            row.push(read_f64(&mut br)?);
        }
        model.means.push(row);
    }
    for _ in 0..k_len {
        let mut row = Vec::with_capacity(d_len.min(MAX_PREALLOC));
        for _ in 0..d_len {
            row.push(read_f64(&mut br)?);
        }
        model.vars.push(row);
    }

    model.validate()?;
    Ok(model)
}

/// Saves a model to a file, creating parent directories as needed.
pub fn save_model_file(path: &Path, model: &GmmModel) -> Result<(), GmmError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut file = File::create(path)
        .map_err(|e| GmmError::Io(format!("cannot open {} for write: {e}", path.display())))?;
    save_model(&mut file, model)
}

/// Loads a model from a file.
pub fn load_model_file(path: &Path) -> Result<GmmModel, GmmError> {
    let mut file = File::open(path)
        .map_err(|e| GmmError::Io(format!("cannot open {} for read: {e}", path.display())))?;
    load_model(&mut file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> GmmModel {
        GmmModel {
            num_components: 2,
            dim: 3,
            weights: vec![0.25, 0.75],
            means: vec![vec![-1.5, 0.0, 2.25], vec![4.0, -3.5, 0.125]],
            vars: vec![vec![1.0, 0.5, 2.0], vec![0.75, 1.25, 3.0]],
        }
    }

    #[test]
    fn roundtrip_bit_identical() {
        let model = sample_model();

        let mut buf = Vec::new();
        save_model(&mut buf, &model).unwrap();

        let loaded = load_model(&mut buf.as_slice()).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn rejects_empty_model_on_save() {
        let mut buf = Vec::new();
        assert!(matches!(
            save_model(&mut buf, &GmmModel::default()),
            Err(GmmError::EmptyModel)
        ));
    }

    #[test]
    fn rejects_misshapen_model_on_save() {
        let mut model = sample_model();
        model.means[0].pop();
        let mut buf = Vec::new();
        assert!(matches!(
            save_model(&mut buf, &model),
            Err(GmmError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn rejects_bad_magic() {
        let bad = b"GARBAGE!and then some";
        assert!(matches!(
            load_model(&mut bad.as_slice()),
            Err(GmmError::CorruptFile(_))
        ));
    }

    #[test]
    fn rejects_bad_version() {
        let mut buf = Vec::new();
        save_model(&mut buf, &sample_model()).unwrap();
        buf[8..12].copy_from_slice(&42u32.to_le_bytes());

        assert!(matches!(
            load_model(&mut buf.as_slice()),
            Err(GmmError::UnsupportedVersion { got: 42, want: 1 })
        ));
    }

    #[test]
    fn rejects_zero_shape() {
        let mut buf = Vec::new();
        save_model(&mut buf, &sample_model()).unwrap();
        // Zero out the component count field.
        buf[12..20].copy_from_slice(&0u64.to_le_bytes());

        assert!(matches!(
            load_model(&mut buf.as_slice()),
            Err(GmmError::CorruptFile(_))
        ));
    }

    #[test]
    fn rejects_huge_declared_component_count() {
        let mut buf = Vec::new();
        save_model(&mut buf, &sample_model()).unwrap();
        buf[12..20].copy_from_slice(&u64::MAX.to_le_bytes());

        assert!(matches!(
            load_model(&mut buf.as_slice()),
            Err(GmmError::CorruptFile(_))
        ));
    }

    #[test]
    fn rejects_truncated() {
        let mut buf = Vec::new();
        save_model(&mut buf, &sample_model()).unwrap();
        buf.truncate(buf.len() - 3);

        assert!(matches!(
            load_model(&mut buf.as_slice()),
            Err(GmmError::CorruptFile(_))
        ));
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("ubm.bin");

        let model = sample_model();
        save_model_file(&path, &model).unwrap();
        let loaded = load_model_file(&path).unwrap();
        assert_eq!(loaded, model);
    }
}
