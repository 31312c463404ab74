// src/column.rs

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use npyz::{DType, NpyFile, WriterBuilder};
use std::io::{self, Cursor, Read, Seek, Write};
use std::sync::Arc;

/// One decoded table column. Narrow numeric dtypes are widened on load so the
/// rest of the pipeline only deals with these four shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Boolean(Vec<bool>),
    Utf8(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Utf8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arrow type this column maps to in the table view.
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Int64(_) => DataType::Int64,
            ColumnData::Float64(_) => DataType::Float64,
            ColumnData::Boolean(_) => DataType::Boolean,
            ColumnData::Utf8(_) => DataType::Utf8,
        }
    }

    /// Build the Arrow array backing this column.
    pub fn to_arrow(&self) -> ArrayRef {
        match self {
            ColumnData::Int64(v) => Arc::new(Int64Array::from(v.clone())),
            ColumnData::Float64(v) => Arc::new(Float64Array::from(v.clone())),
            ColumnData::Boolean(v) => Arc::new(BooleanArray::from(v.clone())),
            ColumnData::Utf8(v) => Arc::new(StringArray::from(v.clone())),
        }
    }

    /// Decode a single NPY payload into a column.
    ///
    /// Accepts 1-D arrays of integers, floats, booleans, byte strings and
    /// unicode strings. Integers and floats widen to 64 bit; byte strings
    /// decode lossily to UTF-8. Anything else (object/pickle payloads,
    /// datetimes, record dtypes, multi-dimensional arrays) is an error, which
    /// the packer treats as a per-file failure.
    pub fn from_npy_bytes(bytes: &[u8]) -> Result<ColumnData> {
        let npy = NpyFile::new(bytes).context("parsing NPY header")?;
        if npy.shape().len() != 1 {
            bail!("expected a 1-D column array, got shape {:?}", npy.shape());
        }
        let dtype = npy.dtype();
        let descr = match &dtype {
            DType::Plain(ts) => ts.to_string(),
            other => bail!("unsupported structured dtype {:?}", other),
        };

        // descr looks like "<i8", "|b1", "<U5": endianness byte, type code,
        // item size.
        let code = &descr[1..];
        let col = if code == "i1" {
            ColumnData::Int64(read_all::<i8, _>(npy)?.into_iter().map(i64::from).collect())
        } else if code == "i2" {
            ColumnData::Int64(read_all::<i16, _>(npy)?.into_iter().map(i64::from).collect())
        } else if code == "i4" {
            ColumnData::Int64(read_all::<i32, _>(npy)?.into_iter().map(i64::from).collect())
        } else if code == "i8" {
            ColumnData::Int64(read_all::<i64, _>(npy)?)
        } else if code == "u1" {
            ColumnData::Int64(read_all::<u8, _>(npy)?.into_iter().map(i64::from).collect())
        } else if code == "u2" {
            ColumnData::Int64(read_all::<u16, _>(npy)?.into_iter().map(i64::from).collect())
        } else if code == "u4" {
            ColumnData::Int64(read_all::<u32, _>(npy)?.into_iter().map(i64::from).collect())
        } else if code == "u8" {
            let raw = read_all::<u64, _>(npy)?;
            let mut vals = Vec::with_capacity(raw.len());
            for v in raw {
                vals.push(
                    i64::try_from(v)
                        .map_err(|_| anyhow!("u64 value {} does not fit in i64", v))?,
                );
            }
            ColumnData::Int64(vals)
        } else if code == "f4" {
            ColumnData::Float64(read_all::<f32, _>(npy)?.into_iter().map(f64::from).collect())
        } else if code == "f8" {
            ColumnData::Float64(read_all::<f64, _>(npy)?)
        } else if code == "b1" {
            ColumnData::Boolean(read_all::<bool, _>(npy)?)
        } else if code.starts_with('U') {
            let vals = read_all::<String, _>(npy)?
                .into_iter()
                .map(|s| s.trim_end_matches('\0').to_string())
                .collect();
            ColumnData::Utf8(vals)
        } else if code.starts_with('S') || code.starts_with('a') {
            let vals = read_all::<Vec<u8>, _>(npy)?
                .into_iter()
                .map(|mut b| {
                    while b.last() == Some(&0) {
                        b.pop();
                    }
                    String::from_utf8_lossy(&b).into_owned()
                })
                .collect();
            ColumnData::Utf8(vals)
        } else {
            bail!("unsupported dtype {}", descr);
        };
        Ok(col)
    }

    /// Encode this column as a 1-D NPY payload with a canonical dtype
    /// (`<i8`, `<f8`, `|b1`, or `<U{width}` sized to the widest value).
    pub fn to_npy_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            ColumnData::Int64(v) => {
                write_all(Cursor::new(&mut buf), "<i8", v.iter().copied())?
            }
            ColumnData::Float64(v) => {
                write_all(Cursor::new(&mut buf), "<f8", v.iter().copied())?
            }
            ColumnData::Boolean(v) => {
                write_all(Cursor::new(&mut buf), "|b1", v.iter().copied())?
            }
            ColumnData::Utf8(v) => {
                let width = v
                    .iter()
                    .map(|s| s.chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(1);
                write_all(Cursor::new(&mut buf), &format!("<U{}", width), v.iter().cloned())?
            }
        }
        Ok(buf)
    }
}

fn read_all<T: npyz::Deserialize, R: Read>(npy: NpyFile<R>) -> Result<Vec<T>> {
    let data = npy.data::<T>().map_err(|e| anyhow!("{}", e))?;
    Ok(data.collect::<io::Result<Vec<T>>>()?)
}

fn write_all<T, W>(writer: W, descr: &str, values: impl IntoIterator<Item = T>) -> Result<()>
where
    T: npyz::Serialize,
    W: Write + Seek,
{
    let ts = descr
        .parse()
        .map_err(|e| anyhow!("invalid dtype descriptor {}: {}", descr, e))?;
    let mut npy = npyz::WriteOptions::new()
        .dtype(DType::Plain(ts))
        .writer(writer)
        .begin_1d()?;
    npy.extend(values)?;
    npy.finish()?;
    Ok(())
}
