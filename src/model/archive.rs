//! NPZ weight archive reading and writing.
//!
//! The archive is a ZIP container with one NPY entry per tensor. Entries are
//! unordered on disk; every key embeds a numeric ordinal
//! (`<name>_<ordinal>[_suffix]`) that fixes the tensor's position in the
//! architecture. Keys that do not follow the convention fail the whole
//! archive rather than risking a silently mis-ordered assignment.

use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
    sync::LazyLock,
};

use regex::Regex;

use super::errors::ModelError;
use super::tensor::WeightTensor;

static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*_([0-9]+)(?:_[A-Za-z0-9_]+)?$")
        .expect("weight key pattern compiles")
});

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// Read every tensor in the archive, sorted by embedded key ordinal.
///
/// Ordering is numeric, not lexicographic: `w_10` sorts after `w_9`.
pub fn read_weight_archive(path: &Path) -> Result<Vec<WeightTensor>, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|err| ModelError::Decode {
        path: path.to_path_buf(),
        detail: format!("not a readable ZIP container: {err}"),
    })?;

    let mut tensors: Vec<(u64, WeightTensor)> = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|err| ModelError::Decode {
            path: path.to_path_buf(),
            detail: format!("unreadable archive entry {index}: {err}"),
        })?;
        let name = entry.name().to_string();
        let mut raw = Vec::new();
        entry.read_to_end(&mut raw).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let key = name.strip_suffix(".npy").unwrap_or(&name).to_string();
        let ordinal = key_ordinal(&key)?;
        let (shape, data) = parse_npy(path, &key, &raw)?;
        tensors.push((ordinal, WeightTensor::new(key, shape, data)));
    }
    tensors.sort_by_key(|(ordinal, _)| *ordinal);
    Ok(tensors.into_iter().map(|(_, tensor)| tensor).collect())
}

/// Write tensors as an NPZ archive, one NPY entry per tensor.
///
/// Counterpart of [`read_weight_archive`] used by export tooling and test
/// fixtures. Entry order on disk is irrelevant; readers sort by ordinal.
pub fn write_weight_archive(path: &Path, tensors: &[WeightTensor]) -> Result<(), ModelError> {
    let file = File::create(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for tensor in tensors {
        writer
            .start_file(format!("{}.npy", tensor.name), options)
            .map_err(|err| ModelError::Decode {
                path: path.to_path_buf(),
                detail: format!("failed to start entry '{}': {err}", tensor.name),
            })?;
        let bytes = encode_npy(&tensor.shape, &tensor.data);
        writer.write_all(&bytes).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    writer.finish().map_err(|err| ModelError::Decode {
        path: path.to_path_buf(),
        detail: format!("failed to finalize archive: {err}"),
    })?;
    Ok(())
}

/// Extract the position ordinal embedded in an archive key.
pub(crate) fn key_ordinal(key: &str) -> Result<u64, ModelError> {
    let captures = KEY_PATTERN
        .captures(key)
        .ok_or_else(|| ModelError::KeyPattern {
            key: key.to_string(),
        })?;
    captures[1].parse::<u64>().map_err(|_| ModelError::KeyPattern {
        key: key.to_string(),
    })
}

fn parse_npy(path: &Path, key: &str, raw: &[u8]) -> Result<(Vec<usize>, Vec<f32>), ModelError> {
    let decode = |detail: String| ModelError::Decode {
        path: path.to_path_buf(),
        detail,
    };
    if raw.len() < NPY_MAGIC.len() + 4 || &raw[..NPY_MAGIC.len()] != NPY_MAGIC {
        return Err(decode(format!("entry '{key}' is not an NPY tensor")));
    }
    let major = raw[6];
    let (header_start, header_len) = match major {
        1 => {
            let len = u16::from_le_bytes([raw[8], raw[9]]) as usize;
            (10usize, len)
        }
        2 => {
            if raw.len() < 12 {
                return Err(decode(format!("entry '{key}' has a truncated header")));
            }
            let len = u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]) as usize;
            (12usize, len)
        }
        other => {
            return Err(decode(format!(
                "entry '{key}' uses unsupported NPY version {other}"
            )));
        }
    };
    let data_start = header_start + header_len;
    if raw.len() < data_start {
        return Err(decode(format!("entry '{key}' has a truncated header")));
    }
    let header = std::str::from_utf8(&raw[header_start..data_start])
        .map_err(|_| decode(format!("entry '{key}' has a non-ASCII header")))?;
    if !header.contains("<f4") {
        return Err(decode(format!(
            "entry '{key}' has a dtype other than little-endian f32"
        )));
    }
    if header.contains("'fortran_order': True") {
        return Err(decode(format!(
            "entry '{key}' is Fortran-ordered; expected C order"
        )));
    }
    let shape = parse_shape(header)
        .ok_or_else(|| decode(format!("entry '{key}' has an unparseable shape")))?;
    let count: usize = shape.iter().product();
    let data_bytes = &raw[data_start..];
    if data_bytes.len() != count * 4 {
        return Err(decode(format!(
            "entry '{key}' carries {} bytes for shape {shape:?}",
            data_bytes.len()
        )));
    }
    let data = data_bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Ok((shape, data))
}

fn parse_shape(header: &str) -> Option<Vec<usize>> {
    let open = header.find('(')?;
    let close = header[open..].find(')')? + open;
    let inner = &header[open + 1..close];
    let mut shape = Vec::new();
    for token in inner.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        shape.push(token.parse::<usize>().ok()?);
    }
    Some(shape)
}

fn encode_npy(shape: &[usize], data: &[f32]) -> Vec<u8> {
    let dims: Vec<String> = shape.iter().map(usize::to_string).collect();
    let shape_text = match dims.len() {
        1 => format!("({},)", dims[0]),
        _ => format!("({})", dims.join(", ")),
    };
    let mut header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': {shape_text}, }}");
    // Total header size padded to a multiple of 64, newline-terminated.
    let unpadded = NPY_MAGIC.len() + 4 + header.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    header.push_str(&" ".repeat(padding));
    header.push('\n');
    let mut out = Vec::with_capacity(NPY_MAGIC.len() + 4 + header.len() + data.len() * 4);
    out.extend_from_slice(NPY_MAGIC);
    out.push(1);
    out.push(0);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in data {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn keys_sort_by_embedded_ordinal_not_lexicographically() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("weights.npz");
        let tensors = vec![
            WeightTensor::new("w_2", vec![2], vec![2.0, 2.0]),
            WeightTensor::new("w_10", vec![2], vec![10.0, 10.0]),
            WeightTensor::new("w_1", vec![2], vec![1.0, 1.0]),
        ];
        write_weight_archive(&path, &tensors).expect("write archive");
        let loaded = read_weight_archive(&path).expect("read archive");
        let names: Vec<&str> = loaded.iter().map(|tensor| tensor.name.as_str()).collect();
        assert_eq!(names, vec!["w_1", "w_2", "w_10"]);
        assert_eq!(loaded[2].data, vec![10.0, 10.0]);
    }

    #[test]
    fn round_trip_preserves_shape_and_values() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("weights.npz");
        let tensors = vec![WeightTensor::new(
            "layer_0_kernel",
            vec![2, 3],
            vec![0.5, -1.5, 2.0, 0.0, 3.25, -0.125],
        )];
        write_weight_archive(&path, &tensors).expect("write archive");
        let loaded = read_weight_archive(&path).expect("read archive");
        assert_eq!(loaded, tensors);
    }

    #[test]
    fn nonconforming_key_fails_the_archive() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("weights.npz");
        let tensors = vec![WeightTensor::new("weights", vec![1], vec![1.0])];
        write_weight_archive(&path, &tensors).expect("write archive");
        let err = read_weight_archive(&path).unwrap_err();
        match err {
            ModelError::KeyPattern { key } => assert_eq!(key, "weights"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ordinal_comes_from_the_second_token() {
        assert_eq!(key_ordinal("w_7").expect("ordinal"), 7);
        assert_eq!(key_ordinal("layer_12_kernel").expect("ordinal"), 12);
        assert!(key_ordinal("conv_weight_3").is_err());
        assert!(key_ordinal("_3").is_err());
    }

    #[test]
    fn missing_file_reports_not_found() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("absent.npz");
        let err = read_weight_archive(&path).unwrap_err();
        assert!(matches!(err, ModelError::NotFound { .. }));
    }

    #[test]
    fn garbage_entry_reports_decode_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("weights.npz");
        let file = File::create(&path).expect("create file");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("w_0.npy", options).expect("start entry");
        writer.write_all(b"not an npy payload").expect("write entry");
        writer.finish().expect("finish archive");
        let err = read_weight_archive(&path).unwrap_err();
        assert!(matches!(err, ModelError::Decode { .. }));
    }
}
