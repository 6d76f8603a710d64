//! Image model used by the image comparator
//!
//! An [`Image`] is an [`ImageDescriptor`] (geometry and pixel type) plus a
//! dense buffer of samples widened to `f64`. Only enough of the MetaImage
//! format is implemented to observe what the executable produces.

pub mod metaimage;

use serde::Serialize;
use std::fmt;

pub use metaimage::{read_image, write_image};

/// Scalar element type of the stored pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementType {
    UChar,
    Char,
    UShort,
    Short,
    UInt,
    Int,
    ULong,
    Long,
    ULongLong,
    LongLong,
    Float,
    Double,
}

impl ElementType {
    /// Parse a MetaImage `ElementType` value such as `MET_SHORT`
    pub fn from_met(name: &str) -> Option<Self> {
        let t = match name {
            "MET_UCHAR" => Self::UChar,
            "MET_CHAR" => Self::Char,
            "MET_USHORT" => Self::UShort,
            "MET_SHORT" => Self::Short,
            "MET_UINT" => Self::UInt,
            "MET_INT" => Self::Int,
            "MET_ULONG" => Self::ULong,
            "MET_LONG" => Self::Long,
            "MET_ULONG_LONG" => Self::ULongLong,
            "MET_LONG_LONG" => Self::LongLong,
            "MET_FLOAT" => Self::Float,
            "MET_DOUBLE" => Self::Double,
            _ => return None,
        };
        Some(t)
    }

    /// The MetaImage spelling of this type
    pub fn met_name(self) -> &'static str {
        match self {
            Self::UChar => "MET_UCHAR",
            Self::Char => "MET_CHAR",
            Self::UShort => "MET_USHORT",
            Self::Short => "MET_SHORT",
            Self::UInt => "MET_UINT",
            Self::Int => "MET_INT",
            Self::ULong => "MET_ULONG",
            Self::Long => "MET_LONG",
            Self::ULongLong => "MET_ULONG_LONG",
            Self::LongLong => "MET_LONG_LONG",
            Self::Float => "MET_FLOAT",
            Self::Double => "MET_DOUBLE",
        }
    }

    /// Size in bytes of one stored sample
    ///
    /// MetaIO writes `MET_LONG`/`MET_ULONG` as 4 bytes.
    pub fn size(self) -> usize {
        match self {
            Self::UChar | Self::Char => 1,
            Self::UShort | Self::Short => 2,
            Self::UInt | Self::Int | Self::ULong | Self::Long | Self::Float => 4,
            Self::ULongLong | Self::LongLong | Self::Double => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.met_name())
    }
}

/// Geometric and type metadata of an image, independent of pixel values
///
/// Equality is exact on every field; there is deliberately no tolerance here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDescriptor {
    /// Number of spatial axes
    pub dimension: usize,
    /// Number of pixels along each axis
    pub size: Vec<usize>,
    /// Physical distance between pixel centres along each axis
    pub spacing: Vec<f64>,
    /// Physical position of the first pixel
    pub origin: Vec<f64>,
    /// Direction cosines, row-major `dimension x dimension`
    pub direction: Vec<f64>,
    /// Stored pixel type
    pub element_type: ElementType,
    /// Samples per pixel
    pub components: usize,
}

impl ImageDescriptor {
    /// Descriptor with unit spacing, zero origin and identity direction
    pub fn new(size: Vec<usize>, element_type: ElementType) -> Self {
        let dimension = size.len();
        Self {
            dimension,
            spacing: vec![1.0; dimension],
            origin: vec![0.0; dimension],
            direction: identity(dimension),
            size,
            element_type,
            components: 1,
        }
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.size.iter().product()
    }

    /// Number of scalar samples (pixels times components)
    pub fn sample_count(&self) -> usize {
        self.pixel_count() * self.components
    }

    /// Names of the fields that differ from `other`, with both values
    pub fn differences(&self, other: &ImageDescriptor) -> Vec<String> {
        let mut diffs = Vec::new();
        if self.dimension != other.dimension {
            diffs.push(format!("dimension: {} vs {}", self.dimension, other.dimension));
        }
        if self.size != other.size {
            diffs.push(format!("size: {:?} vs {:?}", self.size, other.size));
        }
        if self.spacing != other.spacing {
            diffs.push(format!("spacing: {:?} vs {:?}", self.spacing, other.spacing));
        }
        if self.origin != other.origin {
            diffs.push(format!("origin: {:?} vs {:?}", self.origin, other.origin));
        }
        if self.direction != other.direction {
            diffs.push(format!(
                "direction: {:?} vs {:?}",
                self.direction, other.direction
            ));
        }
        if self.element_type != other.element_type {
            diffs.push(format!(
                "pixel type: {} vs {}",
                self.element_type, other.element_type
            ));
        }
        if self.components != other.components {
            diffs.push(format!(
                "components: {} vs {}",
                self.components, other.components
            ));
        }
        diffs
    }

    /// Linear index of a pixel given per-axis indices (x fastest)
    pub fn linear_index(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.dimension {
            return None;
        }
        let mut linear = 0;
        let mut stride = 1;
        for (axis, &i) in index.iter().enumerate() {
            if i >= self.size[axis] {
                return None;
            }
            linear += i * stride;
            stride *= self.size[axis];
        }
        Some(linear)
    }

    /// Per-axis indices of a linear pixel index (x fastest)
    pub fn grid_index(&self, mut linear: usize) -> Vec<usize> {
        self.size
            .iter()
            .map(|&n| {
                let i = linear % n.max(1);
                linear /= n.max(1);
                i
            })
            .collect()
    }
}

/// Row-major identity matrix
pub fn identity(dimension: usize) -> Vec<f64> {
    let mut m = vec![0.0; dimension * dimension];
    for i in 0..dimension {
        m[i * dimension + i] = 1.0;
    }
    m
}

/// A decoded image
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub descriptor: ImageDescriptor,
    /// Samples in file order (x fastest, components interleaved)
    pub pixels: Vec<f64>,
}

impl Image {
    /// Image filled with zeros
    pub fn zeros(descriptor: ImageDescriptor) -> Self {
        let n = descriptor.sample_count();
        Self {
            descriptor,
            pixels: vec![0.0; n],
        }
    }

    /// Set a scalar pixel, returning false when out of bounds
    pub fn set(&mut self, index: &[usize], value: f64) -> bool {
        match self.descriptor.linear_index(index) {
            Some(i) if self.descriptor.components == 1 => {
                self.pixels[i] = value;
                true
            }
            _ => false,
        }
    }

    /// Read a scalar pixel
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if self.descriptor.components != 1 {
            return None;
        }
        self.descriptor
            .linear_index(index)
            .map(|i| self.pixels[i])
    }
}
