//! Typed views into shared byte storage.
//!
//! A [`Data`] is the unit of buffer exchange between the loader, the
//! resolver and the geometry builders: a reference-counted byte arena plus
//! a byte offset, an item count and an item type. Views never own a private
//! copy of their bytes unless they were built from owned values, so slicing
//! a mesh buffer into time steps costs nothing and keeps the arena alive
//! exactly as long as something still looks at it.

use std::fmt;
use std::sync::Arc;

use bytemuck::{AnyBitPattern, NoUninit};
use mosaic_math::Vec3;
use thiserror::Error;

/// Element type of a data array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    UInt,
    Int3,
    UInt3,
    Int4,
    UInt4,
    Float,
    Float2,
    Float3,
    /// Three floats padded to 16 bytes
    Float3A,
    Float4,
}

impl DataType {
    /// Size of one item in bytes.
    pub fn size(self) -> usize {
        match self {
            DataType::Int | DataType::UInt | DataType::Float => 4,
            DataType::Float2 => 8,
            DataType::Int3 | DataType::UInt3 | DataType::Float3 => 12,
            DataType::Int4 | DataType::UInt4 | DataType::Float3A | DataType::Float4 => 16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::UInt => "uint",
            DataType::Int3 => "vec3i",
            DataType::UInt3 => "vec3ui",
            DataType::Int4 => "vec4i",
            DataType::UInt4 => "vec4ui",
            DataType::Float => "float",
            DataType::Float2 => "vec2f",
            DataType::Float3 => "vec3f",
            DataType::Float3A => "vec3fa",
            DataType::Float4 => "vec4f",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised when creating or combining views.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("{count} x {ty} at byte offset {offset} exceeds buffer of {available} bytes")]
    OutOfRange {
        offset: usize,
        count: usize,
        ty: DataType,
        available: usize,
    },

    #[error("cannot combine {0} data with {1} data")]
    TypeMismatch(DataType, DataType),

    #[error("no data to combine")]
    Empty,
}

pub type DataResult<T> = Result<T, DataError>;

/// A typed, read-only view into shared bytes.
#[derive(Clone)]
pub struct Data {
    storage: Arc<[u8]>,
    offset: usize,
    len: usize,
    ty: DataType,
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("ty", &self.ty)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

impl Data {
    /// Create a view of `len` items starting at byte `offset`.
    pub fn new(storage: Arc<[u8]>, offset: usize, len: usize, ty: DataType) -> DataResult<Self> {
        let end = len
            .checked_mul(ty.size())
            .and_then(|bytes| bytes.checked_add(offset));

        match end {
            Some(end) if end <= storage.len() => Ok(Self {
                storage,
                offset,
                len,
                ty,
            }),
            _ => Err(DataError::OutOfRange {
                offset,
                count: len,
                ty,
                available: storage.len(),
            }),
        }
    }

    /// Copy plain values into fresh storage.
    ///
    /// The byte length of `items` must be a multiple of `ty.size()`.
    pub fn from_pod<T: NoUninit>(ty: DataType, items: &[T]) -> Self {
        Self::from_bytes(bytemuck::cast_slice(items).to_vec(), ty)
    }

    /// Copy positions or normals into fresh `Float3` storage.
    pub fn from_vec3s(values: &[Vec3]) -> Self {
        let flat: Vec<[f32; 3]> = values.iter().map(|v| v.to_array()).collect();
        Self::from_pod(DataType::Float3, &flat)
    }

    fn from_bytes(bytes: Vec<u8>, ty: DataType) -> Self {
        debug_assert_eq!(bytes.len() % ty.size(), 0);
        let len = bytes.len() / ty.size();
        Self {
            storage: Arc::from(bytes),
            offset: 0,
            len,
            ty,
        }
    }

    pub fn ty(&self) -> DataType {
        self.ty
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_bytes(&self) -> usize {
        self.len * self.ty.size()
    }

    /// Byte offset of the first item inside the shared storage.
    pub fn byte_offset(&self) -> usize {
        self.offset
    }

    pub fn bytes(&self) -> &[u8] {
        &self.storage[self.offset..self.offset + self.num_bytes()]
    }

    /// True if both views look into the same storage.
    pub fn shares_storage(&self, other: &Data) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Sub-view of `count` items starting at item `first`. Never copies.
    pub fn items(&self, first: usize, count: usize) -> DataResult<Data> {
        let out_of_range = || DataError::OutOfRange {
            offset: self.offset + first.saturating_mul(self.ty.size()),
            count,
            ty: self.ty,
            available: self.storage.len(),
        };
        let end = first.checked_add(count).ok_or_else(out_of_range)?;
        if end > self.len {
            return Err(out_of_range());
        }
        Ok(Data {
            storage: Arc::clone(&self.storage),
            offset: self.offset + first * self.ty.size(),
            len: count,
            ty: self.ty,
        })
    }

    /// Decode every item (or every component, for scalar types) as `T`.
    pub fn to_vec<T: AnyBitPattern + NoUninit>(&self) -> Vec<T> {
        bytemuck::pod_collect_to_vec(self.bytes())
    }

    /// Read the first three floats of each record of `components` floats.
    pub fn iter_vec3(&self, components: usize) -> impl Iterator<Item = Vec3> + '_ {
        let stride = components * std::mem::size_of::<f32>();
        self.bytes()
            .chunks_exact(stride)
            .map(|record| Vec3::from_array(bytemuck::pod_read_unaligned::<[f32; 3]>(&record[..12])))
    }

    /// Join views of the same type into one buffer.
    ///
    /// Adjacent views of the same storage are merged without copying;
    /// anything else is copied into fresh storage.
    pub fn concat(parts: &[Data]) -> DataResult<Data> {
        let first = parts.first().ok_or(DataError::Empty)?;
        if let Some(other) = parts.iter().find(|p| p.ty != first.ty) {
            return Err(DataError::TypeMismatch(first.ty, other.ty));
        }
        if parts.len() == 1 {
            return Ok(first.clone());
        }

        let contiguous = parts.windows(2).all(|pair| {
            pair[0].shares_storage(&pair[1])
                && pair[0].offset + pair[0].num_bytes() == pair[1].offset
        });
        let len = parts.iter().map(Data::len).sum();

        if contiguous {
            return Ok(Data {
                storage: Arc::clone(&first.storage),
                offset: first.offset,
                len,
                ty: first.ty,
            });
        }

        let mut bytes = Vec::with_capacity(len * first.ty.size());
        for part in parts {
            bytes.extend_from_slice(part.bytes());
        }
        Ok(Data::from_bytes(bytes, first.ty))
    }
}
