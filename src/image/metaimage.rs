//! MetaImage (`.mhd` / `.mha`) reading and writing
//!
//! The header is a list of `Key = Value` lines terminated by
//! `ElementDataFile`. Pixel data is either appended to the header (`LOCAL`)
//! or stored in a separate file next to it. ITK stores `TransformMatrix`
//! column by column, so it is transposed into the row-major direction
//! matrix of [`ImageDescriptor`].

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;

use super::{identity, ElementType, Image, ImageDescriptor};
use crate::common::{Error, Result};

/// Parsed header fields
#[derive(Debug)]
struct Header {
    fields: HashMap<String, String>,
    /// Byte offset of the first data byte when the data is `LOCAL`
    data_offset: usize,
}

impl Header {
    fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    fn flag(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| {
            self.get(k)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        })
    }
}

/// Read a MetaImage file
pub fn read_image(path: &Path) -> Result<Image> {
    let bytes = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
    let header = parse_header(path, &bytes)?;
    let descriptor = descriptor_from_header(path, &header)?;

    let data_file = header
        .get("ElementDataFile")
        .ok_or_else(|| Error::image_header(path, "missing ElementDataFile"))?;

    let raw: Vec<u8> = if data_file.eq_ignore_ascii_case("LOCAL") {
        bytes[header.data_offset..].to_vec()
    } else if data_file.starts_with("LIST") || data_file.contains('%') {
        return Err(Error::image_header(
            path,
            format!("multi-file ElementDataFile '{}' is not supported", data_file),
        ));
    } else {
        let data_path = data_path(path, data_file);
        std::fs::read(&data_path).map_err(|e| Error::file_read(&data_path, e))?
    };

    let pixels = decode_pixels(path, &header, &descriptor, raw)?;
    tracing::debug!(
        path = %path.display(),
        size = ?descriptor.size,
        element_type = %descriptor.element_type,
        "Read image"
    );

    Ok(Image { descriptor, pixels })
}

/// Write an image as `<name>.mhd` plus `<name>.raw` next to it
///
/// Samples are stored little-endian in the descriptor's element type.
pub fn write_image(path: &Path, image: &Image) -> Result<()> {
    let d = &image.descriptor;
    if image.pixels.len() != d.sample_count() {
        return Err(Error::image_data(
            path,
            format!(
                "buffer holds {} samples, descriptor needs {}",
                image.pixels.len(),
                d.sample_count()
            ),
        ));
    }

    let raw_path = path.with_extension("raw");
    let raw_name = raw_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Internal(format!("Invalid image path '{}'", path.display())))?;

    let join = |v: &[f64]| v.iter().map(|x| format_number(*x)).collect::<Vec<_>>().join(" ");
    let matrix = transpose(&d.direction, d.dimension);

    let mut header = String::new();
    header.push_str("ObjectType = Image\n");
    header.push_str(&format!("NDims = {}\n", d.dimension));
    header.push_str("BinaryData = True\n");
    header.push_str("BinaryDataByteOrderMSB = False\n");
    header.push_str("CompressedData = False\n");
    header.push_str(&format!("TransformMatrix = {}\n", join(&matrix)));
    header.push_str(&format!("Offset = {}\n", join(&d.origin)));
    header.push_str(&format!(
        "CenterOfRotation = {}\n",
        join(&vec![0.0; d.dimension])
    ));
    header.push_str(&format!("ElementSpacing = {}\n", join(&d.spacing)));
    header.push_str(&format!(
        "DimSize = {}\n",
        d.size
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    ));
    if d.components != 1 {
        header.push_str(&format!("ElementNumberOfChannels = {}\n", d.components));
    }
    header.push_str(&format!("ElementType = {}\n", d.element_type));
    header.push_str(&format!("ElementDataFile = {}\n", raw_name));

    let data = encode_pixels(d.element_type, &image.pixels);
    std::fs::write(&raw_path, data)?;
    std::fs::write(path, header)?;
    Ok(())
}

fn format_number(x: f64) -> String {
    if x == x.trunc() && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

fn data_path(header_path: &Path, data_file: &str) -> PathBuf {
    let file = Path::new(data_file);
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        header_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(file)
    }
}

fn parse_header(path: &Path, bytes: &[u8]) -> Result<Header> {
    let mut fields = HashMap::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let end = bytes[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| pos + i + 1)
            .unwrap_or(bytes.len());
        let line = std::str::from_utf8(&bytes[pos..end])
            .map_err(|_| Error::image_header(path, "header is not valid text"))?;
        pos = end;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| Error::image_header(path, format!("malformed line '{}'", line)))?;
        let key = key.trim().to_string();
        let is_last = key == "ElementDataFile";
        fields.insert(key, value.trim().to_string());

        if is_last {
            return Ok(Header {
                fields,
                data_offset: pos,
            });
        }
    }

    Err(Error::image_header(path, "missing ElementDataFile"))
}

fn parse_list<T: std::str::FromStr>(path: &Path, key: &str, value: &str) -> Result<Vec<T>> {
    value
        .split_whitespace()
        .map(|tok| {
            tok.parse::<T>().map_err(|_| {
                Error::image_header(path, format!("{}: cannot parse '{}'", key, tok))
            })
        })
        .collect()
}

fn expect_len<T>(path: &Path, key: &str, values: Vec<T>, len: usize) -> Result<Vec<T>> {
    if values.len() != len {
        return Err(Error::image_header(
            path,
            format!("{} has {} values, expected {}", key, values.len(), len),
        ));
    }
    Ok(values)
}

fn first_of<'a>(header: &'a Header, keys: &[&'static str]) -> Option<(&'static str, &'a str)> {
    keys.iter()
        .find_map(|k| header.get(k).map(|v| (*k, v)))
}

fn descriptor_from_header(path: &Path, header: &Header) -> Result<ImageDescriptor> {
    if let Some(object_type) = header.get("ObjectType") {
        if object_type != "Image" {
            return Err(Error::image_header(
                path,
                format!("ObjectType '{}' is not an image", object_type),
            ));
        }
    }

    let dimension: usize = header
        .get("NDims")
        .ok_or_else(|| Error::image_header(path, "missing NDims"))?
        .parse()
        .map_err(|_| Error::image_header(path, "NDims is not an integer"))?;
    if dimension == 0 {
        return Err(Error::image_header(path, "NDims must be positive"));
    }

    let size = header
        .get("DimSize")
        .ok_or_else(|| Error::image_header(path, "missing DimSize"))?;
    let size = expect_len(path, "DimSize", parse_list::<usize>(path, "DimSize", size)?, dimension)?;

    let spacing = match first_of(header, &["ElementSpacing", "ElementSize"]) {
        Some((key, v)) => expect_len(path, key, parse_list::<f64>(path, key, v)?, dimension)?,
        None => vec![1.0; dimension],
    };

    let origin = match first_of(header, &["Offset", "Origin", "Position"]) {
        Some((key, v)) => expect_len(path, key, parse_list::<f64>(path, key, v)?, dimension)?,
        None => vec![0.0; dimension],
    };

    let direction = match first_of(header, &["TransformMatrix", "Rotation", "Orientation"]) {
        Some((key, v)) => {
            let m = expect_len(
                path,
                key,
                parse_list::<f64>(path, key, v)?,
                dimension * dimension,
            )?;
            transpose(&m, dimension)
        }
        None => identity(dimension),
    };

    let element_type = header
        .get("ElementType")
        .ok_or_else(|| Error::image_header(path, "missing ElementType"))?;
    let element_type = ElementType::from_met(element_type).ok_or_else(|| {
        Error::image_header(path, format!("unsupported ElementType '{}'", element_type))
    })?;

    let components = match header.get("ElementNumberOfChannels") {
        Some(v) => v
            .parse::<usize>()
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| Error::image_header(path, "invalid ElementNumberOfChannels"))?,
        None => 1,
    };

    // Pixel arithmetic downstream relies on the byte count fitting in usize
    size.iter()
        .try_fold(components, |acc, &s| acc.checked_mul(s))
        .and_then(|n| n.checked_mul(element_type.size()))
        .ok_or_else(|| Error::image_header(path, "DimSize overflows the addressable size"))?;

    Ok(ImageDescriptor {
        dimension,
        size,
        spacing,
        origin,
        direction,
        element_type,
        components,
    })
}

fn transpose(m: &[f64], n: usize) -> Vec<f64> {
    let mut t = vec![0.0; m.len()];
    for r in 0..n {
        for c in 0..n {
            t[c * n + r] = m[r * n + c];
        }
    }
    t
}

fn decode_pixels(
    path: &Path,
    header: &Header,
    descriptor: &ImageDescriptor,
    raw: Vec<u8>,
) -> Result<Vec<f64>> {
    let count = descriptor.sample_count();
    let binary = header
        .get("BinaryData")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(true);

    if !binary {
        let text = String::from_utf8(raw)
            .map_err(|_| Error::image_data(path, "ASCII pixel data is not valid text"))?;
        let pixels = parse_list::<f64>(path, "pixel data", &text)?;
        if pixels.len() < count {
            return Err(Error::image_data(
                path,
                format!("found {} samples, expected {}", pixels.len(), count),
            ));
        }
        return Ok(pixels[..count].to_vec());
    }

    let raw = if header.flag(&["CompressedData"]) {
        let mut out = Vec::new();
        ZlibDecoder::new(raw.as_slice())
            .read_to_end(&mut out)
            .map_err(|e| Error::image_data(path, format!("zlib: {}", e)))?;
        out
    } else {
        raw
    };

    let width = descriptor.element_type.size();
    let needed = count * width;

    let data: &[u8] = match header.get("HeaderSize").map(str::parse::<i64>) {
        Some(Ok(-1)) if raw.len() >= needed => &raw[raw.len() - needed..],
        Some(Ok(skip)) if skip > 0 => raw.get(skip as usize..).unwrap_or(&[]),
        Some(Err(_)) => return Err(Error::image_header(path, "HeaderSize is not an integer")),
        _ => &raw[..],
    };

    if data.len() < needed {
        return Err(Error::image_data(
            path,
            format!("found {} bytes, expected {}", data.len(), needed),
        ));
    }

    let big_endian = header.flag(&["BinaryDataByteOrderMSB", "ElementByteOrderMSB"]);
    Ok(data[..needed]
        .chunks_exact(width)
        .map(|chunk| decode_sample(descriptor.element_type, chunk, big_endian))
        .collect())
}

macro_rules! sample {
    ($t:ty, $chunk:expr, $be:expr) => {{
        let mut buf = [0u8; std::mem::size_of::<$t>()];
        buf.copy_from_slice($chunk);
        (if $be {
            <$t>::from_be_bytes(buf)
        } else {
            <$t>::from_le_bytes(buf)
        }) as f64
    }};
}

fn decode_sample(element_type: ElementType, chunk: &[u8], big_endian: bool) -> f64 {
    match element_type {
        ElementType::UChar => chunk[0] as f64,
        ElementType::Char => chunk[0] as i8 as f64,
        ElementType::UShort => sample!(u16, chunk, big_endian),
        ElementType::Short => sample!(i16, chunk, big_endian),
        ElementType::UInt | ElementType::ULong => sample!(u32, chunk, big_endian),
        ElementType::Int | ElementType::Long => sample!(i32, chunk, big_endian),
        ElementType::ULongLong => sample!(u64, chunk, big_endian),
        ElementType::LongLong => sample!(i64, chunk, big_endian),
        ElementType::Float => sample!(f32, chunk, big_endian),
        ElementType::Double => sample!(f64, chunk, big_endian),
    }
}

fn encode_pixels(element_type: ElementType, pixels: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() * element_type.size());
    for &v in pixels {
        match element_type {
            ElementType::UChar => out.push(v as u8),
            ElementType::Char => out.push(v as i8 as u8),
            ElementType::UShort => out.extend_from_slice(&(v as u16).to_le_bytes()),
            ElementType::Short => out.extend_from_slice(&(v as i16).to_le_bytes()),
            ElementType::UInt | ElementType::ULong => {
                out.extend_from_slice(&(v as u32).to_le_bytes())
            }
            ElementType::Int | ElementType::Long => {
                out.extend_from_slice(&(v as i32).to_le_bytes())
            }
            ElementType::ULongLong => out.extend_from_slice(&(v as u64).to_le_bytes()),
            ElementType::LongLong => out.extend_from_slice(&(v as i64).to_le_bytes()),
            ElementType::Float => out.extend_from_slice(&(v as f32).to_le_bytes()),
            ElementType::Double => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
    out
}
