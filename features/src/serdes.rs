use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use crate::error::FeatureError;
use crate::feature::{CepstralType, Feature, FeatureOptions, VadState, is_rectangular};

/// Binary format magic and version for `.lvf` feature files.
const LVF_MAGIC: [u8; 8] = [b'L', b'V', b'F', b'E', b'A', b'T', 0, 0];
const LVF_VERSION: u32 = 1;

// Caps capacity hints taken from header fields, so a corrupt count fails
// as a truncated read instead of a giant allocation.
const MAX_PREALLOC: usize = 1 << 16;

fn write_err(e: std::io::Error) -> FeatureError {
    FeatureError::Io(e.to_string())
}

// A short read means the file ends mid-record, which is corruption
// rather than an I/O fault.
fn read_err(e: std::io::Error) -> FeatureError {
    if e.kind() == ErrorKind::UnexpectedEof {
        FeatureError::CorruptFile("truncated read".into())
    } else {
        FeatureError::Io(e.to_string())
    }
}

fn read_u8(r: &mut impl Read) -> Result<u8, FeatureError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf).map_err(read_err)?;
    Ok(buf[0])
}

fn read_u32(r: &mut impl Read) -> Result<u32, FeatureError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(read_err)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32(r: &mut impl Read) -> Result<i32, FeatureError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(read_err)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f32(r: &mut impl Read) -> Result<f32, FeatureError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(read_err)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_f64(r: &mut impl Read) -> Result<f64, FeatureError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(read_err)?;
    Ok(f64::from_le_bytes(buf))
}

fn write_options(w: &mut impl Write, o: &FeatureOptions) -> Result<(), FeatureError> {
    w.write_all(&o.sample_rate.to_le_bytes()).map_err(write_err)?;
    w.write_all(&o.num_filters.to_le_bytes()).map_err(write_err)?;
    w.write_all(&o.num_coeffs.to_le_bytes()).map_err(write_err)?;
    w.write_all(&o.min_freq.to_le_bytes()).map_err(write_err)?;
    w.write_all(&o.max_freq.to_le_bytes()).map_err(write_err)?;
    w.write_all(&[u8::from(o.include_energy)]).map_err(write_err)?;
    w.write_all(&o.filterbank.to_le_bytes()).map_err(write_err)?;
    w.write_all(&o.mel_scale.to_le_bytes()).map_err(write_err)?;
    w.write_all(&o.compression.to_le_bytes()).map_err(write_err)?;
    Ok(())
}

fn read_options(r: &mut impl Read) -> Result<FeatureOptions, FeatureError> {
    Ok(FeatureOptions {
        sample_rate: read_i32(r)?,
        num_filters: read_i32(r)?,
        num_coeffs: read_i32(r)?,
        min_freq: read_f64(r)?,
        max_freq: read_f64(r)?,
        include_energy: read_u8(r)? != 0,
        filterbank: read_u32(r)?,
        mel_scale: read_u32(r)?,
        compression: read_u32(r)?,
    })
}

/// Serializes a feature to a writer in the `.lvf` binary format.
///
/// ```text
/// [8B magic "LVFEAT\0\0"] [4B version=1]
/// [4B cepstral type]
/// [options: 3 x i32, 2 x f64, 1B energy flag, 3 x u32]
/// [4B rows] [4B cols] [rows x cols x 4B f32, row-major]
/// [4B flag count] [flag count x 1B VAD state]
/// ```
///
/// All multi-byte values are little-endian. The matrix is checked for
/// rectangularity before anything is written.
pub fn save_feature(w: &mut dyn Write, feat: &Feature) -> Result<(), FeatureError> {
    if !is_rectangular(&feat.matrix) {
        return Err(FeatureError::NonRectangular);
    }

    let mut bw = BufWriter::new(w);

    bw.write_all(&LVF_MAGIC).map_err(write_err)?;
    bw.write_all(&LVF_VERSION.to_le_bytes()).map_err(write_err)?;
    bw.write_all(&(feat.cepstral_type as u32).to_le_bytes()).map_err(write_err)?;

    write_options(&mut bw, &feat.options)?;

    let rows = feat.matrix.len() as u32;
    let cols = feat.matrix.first().map_or(0, Vec::len) as u32;
    bw.write_all(&rows.to_le_bytes()).map_err(write_err)?;
    bw.write_all(&cols.to_le_bytes()).map_err(write_err)?;
    for row in &feat.matrix {
        for &v in row {
            bw.write_all(&v.to_le_bytes()).map_err(write_err)?;
        }
    }

    bw.write_all(&(feat.vad.len() as u32).to_le_bytes()).map_err(write_err)?;
    for &st in &feat.vad {
        bw.write_all(&[st as u8]).map_err(write_err)?;
    }

    bw.flush().map_err(write_err)?;
    Ok(())
}

/// Deserializes a feature from a reader.
///
/// The binary format must match what [`save_feature`] produces. Fails with
/// [`FeatureError::CorruptFile`] on magic mismatch or truncation and
/// [`FeatureError::UnsupportedVersion`] on a version the reader does not
/// understand.
pub fn load_feature(r: &mut dyn Read) -> Result<Feature, FeatureError> {
    let mut br = BufReader::new(r);

    let mut magic = [0u8; 8];
    br.read_exact(&mut magic).map_err(read_err)?;
    if magic != LVF_MAGIC {
        return Err(FeatureError::CorruptFile(format!("bad magic {magic:?}")));
    }

    let version = read_u32(&mut br)?;
    if version != LVF_VERSION {
        return Err(FeatureError::UnsupportedVersion {
            got: version,
            want: LVF_VERSION,
        });
    }

    let cepstral_type = CepstralType::from_u32(read_u32(&mut br)?)?;
    let options = read_options(&mut br)?;

    let rows = read_u32(&mut br)? as usize;
    let cols = read_u32(&mut br)? as usize;

    let mut matrix = Vec::with_capacity(rows.min(MAX_PREALLOC));
    for _ in 0..rows {
        let mut row = Vec::with_capacity(cols.min(MAX_PREALLOC));
        for _ in 0..cols {
            row.push(read_f32(&mut br)?);
        }
        matrix.push(row);
    }

    let n_flags = read_u32(&mut br)? as usize;
    let mut vad = Vec::with_capacity(n_flags.min(MAX_PREALLOC));
    for _ in 0..n_flags {
        vad.push(VadState::from_u8(read_u8(&mut br)?)?);
    }

    Ok(Feature {
        cepstral_type,
        options,
        matrix,
        vad,
    })
}

/// Saves a feature to a file, creating parent directories as needed.
pub fn save_feature_file(path: &Path, feat: &Feature) -> Result<(), FeatureError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut file = File::create(path)
        .map_err(|e| FeatureError::Io(format!("cannot open {} for write: {e}", path.display())))?;
    save_feature(&mut file, feat)
}

/// Loads a feature from a file.
pub fn load_feature_file(path: &Path) -> Result<Feature, FeatureError> {
    let mut file = File::open(path)
        .map_err(|e| FeatureError::Io(format!("cannot open {} for read: {e}", path.display())))?;
    load_feature(&mut file)
}
