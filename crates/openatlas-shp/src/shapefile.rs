///! ESRI shapefile (.shp) binary parser.
///!
///! A .shp stream is a 100-byte fixed header followed by variable-length
///! records. Header fields are a mix of big-endian (file length) and
///! little-endian (version, shape type, bounding box); record headers are
///! big-endian, record contents little-endian.
///!
///! ## Record Structure
///! `[BE i32 record number][BE i32 content length in 16-bit words][LE i32 shape type][payload]`
///!
///! The scan is length-directed: after each record the cursor is forced to
///! `record start + content length`, so malformed or unsupported records
///! never desynchronize the stream. No checksum exists in the format; the
///! declared lengths are trusted.
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;

use openatlas_core::geometry::{Envelope, Point};

// ── Shape Type Codes ──────────────────────────────────────────────────

#[allow(dead_code)]
mod shape_type {
    pub const NULL: i32 = 0;
    pub const POINT: i32 = 1;
    pub const POLYLINE: i32 = 3;
    pub const POLYGON: i32 = 5;
    pub const MULTIPOINT: i32 = 8;
    pub const POINT_Z: i32 = 11;
    pub const POLYLINE_Z: i32 = 13;
    pub const POLYGON_Z: i32 = 15;
}

/// Fixed header length in bytes.
const HEADER_LEN: u64 = 100;

/// Offset a Point record is nudged by to synthesize a drawable segment.
const POINT_SEGMENT_OFFSET: f64 = 1e-5;

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ShpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Stream of {len} bytes is shorter than the 100-byte shapefile header")]
    TruncatedHeader { len: u64 },
}

// ── Decoded Geometry ──────────────────────────────────────────────────

/// The decoded contents of a .shp stream: a bounding envelope and a
/// sequence of parts, each an ordered point sequence. Built once at load
/// time and immutable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeGeometry {
    pub envelope: Envelope,
    pub parts: Vec<Vec<Point>>,
}

impl ShapeGeometry {
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn point_count(&self) -> usize {
        self.parts.iter().map(Vec::len).sum()
    }
}

// ── Shapefile Reader ──────────────────────────────────────────────────

pub struct ShpReader<R: Read + Seek> {
    reader: R,
}

impl<R: Read + Seek> ShpReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the entire .shp stream into a [`ShapeGeometry`].
    ///
    /// Fails only when the stream cannot hold the fixed header. Individual
    /// records that are truncated or carry unsupported shape types are
    /// skipped; a record declaring a non-positive content length ends the
    /// scan (corrupt trailer).
    pub fn read(&mut self) -> Result<ShapeGeometry, ShpError> {
        let stream_len = self.reader.seek(SeekFrom::End(0))?;
        if stream_len < HEADER_LEN {
            return Err(ShpError::TruncatedHeader { len: stream_len });
        }

        let envelope = self.read_header()?;
        let mut parts: Vec<Vec<Point>> = Vec::new();

        self.reader.seek(SeekFrom::Start(HEADER_LEN))?;
        loop {
            // The forced seek after a truncated record can land past the
            // end of the stream.
            let position = self.reader.stream_position()?;
            if stream_len.saturating_sub(position) < 8 {
                break;
            }

            let _record_number = self.read_i32_be()?;
            let content_len_words = self.read_i32_be()?;
            let record_start = self.reader.stream_position()?;
            if content_len_words <= 0 {
                log::warn!(
                    "record at offset {record_start} declares content length \
                     {content_len_words} words; stopping scan"
                );
                break;
            }

            if let Err(err) = self.read_record(&mut parts) {
                match err {
                    ShpError::Io(ref io_err) if io_err.kind() == io::ErrorKind::UnexpectedEof => {
                        log::warn!("record at offset {record_start} is truncated; skipping");
                    }
                    other => return Err(other),
                }
            }

            // Length-directed resynchronization: trust the declared length,
            // not the number of bytes the record body consumed.
            let target = record_start + (content_len_words as u64) * 2;
            self.reader.seek(SeekFrom::Start(target))?;
        }

        log::debug!(
            "decoded shapefile: {} parts, {} points",
            parts.len(),
            parts.iter().map(Vec::len).sum::<usize>()
        );
        Ok(ShapeGeometry { envelope, parts })
    }

    fn read_header(&mut self) -> Result<Envelope, ShpError> {
        self.reader.seek(SeekFrom::Start(24))?;
        let _file_len_words = self.read_i32_be()?;
        let version = self.read_i32_le()?;
        let shape_type = self.read_i32_le()?;
        log::debug!("shapefile version {version}, declared shape type {shape_type}");

        let min_x = self.read_f64_le()?;
        let min_y = self.read_f64_le()?;
        let max_x = self.read_f64_le()?;
        let max_y = self.read_f64_le()?;
        Ok(Envelope::new(min_x, min_y, max_x, max_y))
    }

    fn read_record(&mut self, parts: &mut Vec<Vec<Point>>) -> Result<(), ShpError> {
        let record_shape = self.read_i32_le()?;
        match record_shape {
            shape_type::POINT => {
                let x = self.read_f64_le()?;
                let y = self.read_f64_le()?;
                // A point has no extent; synthesize a tiny segment so it
                // round-trips through the polyline rendering path.
                parts.push(vec![
                    Point::new(x, y),
                    Point::new(x + POINT_SEGMENT_OFFSET, y + POINT_SEGMENT_OFFSET),
                ]);
            }
            shape_type::POLYLINE | shape_type::POLYGON => {
                self.read_polyline_or_polygon(parts)?;
            }
            other => {
                log::debug!("skipping unsupported shape type {other}");
            }
        }
        Ok(())
    }

    fn read_polyline_or_polygon(&mut self, parts: &mut Vec<Vec<Point>>) -> Result<(), ShpError> {
        // Per-record bounding box, unused.
        for _ in 0..4 {
            self.read_f64_le()?;
        }

        let num_parts = self.read_i32_le()?.max(0) as usize;
        let num_points = self.read_i32_le()?.max(0) as usize;

        let mut part_starts = Vec::with_capacity(num_parts);
        for _ in 0..num_parts {
            part_starts.push(self.read_i32_le()?.max(0) as usize);
        }

        let mut points = Vec::with_capacity(num_points);
        for _ in 0..num_points {
            let x = self.read_f64_le()?;
            let y = self.read_f64_le()?;
            points.push(Point::new(x, y));
        }

        for i in 0..num_parts {
            let start = part_starts[i].min(num_points);
            let end = if i == num_parts - 1 {
                num_points
            } else {
                part_starts[i + 1].min(num_points)
            };
            if start < end {
                parts.push(points[start..end].to_vec());
            }
        }
        Ok(())
    }

    // ── Primitive readers ────────────────────────────────────────────

    fn read_i32_be(&mut self) -> Result<i32, ShpError> {
        let mut buf = [0u8; 4];
        self.reader.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    fn read_i32_le(&mut self) -> Result<i32, ShpError> {
        let mut buf = [0u8; 4];
        self.reader.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_f64_le(&mut self) -> Result<f64, ShpError> {
        let mut buf = [0u8; 8];
        self.reader.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Incrementally builds .shp byte streams for tests.
    struct ShpBuilder {
        bytes: Vec<u8>,
        record_number: i32,
    }

    impl ShpBuilder {
        fn new(bbox: (f64, f64, f64, f64)) -> Self {
            let mut bytes = vec![0u8; 24];
            bytes.extend_from_slice(&0i32.to_be_bytes()); // file length, unused
            bytes.extend_from_slice(&1000i32.to_le_bytes()); // version
            bytes.extend_from_slice(&3i32.to_le_bytes()); // declared shape type
            bytes.extend_from_slice(&bbox.0.to_le_bytes());
            bytes.extend_from_slice(&bbox.1.to_le_bytes());
            bytes.extend_from_slice(&bbox.2.to_le_bytes());
            bytes.extend_from_slice(&bbox.3.to_le_bytes());
            bytes.resize(100, 0); // Z/M ranges, unused
            Self {
                bytes,
                record_number: 1,
            }
        }

        fn record_header(&mut self, content_len_words: i32) {
            self.bytes
                .extend_from_slice(&self.record_number.to_be_bytes());
            self.record_number += 1;
            self.bytes
                .extend_from_slice(&content_len_words.to_be_bytes());
        }

        fn point_record(&mut self, x: f64, y: f64) -> &mut Self {
            // shape type + 2 doubles = 20 bytes = 10 words
            self.record_header(10);
            self.bytes.extend_from_slice(&1i32.to_le_bytes());
            self.bytes.extend_from_slice(&x.to_le_bytes());
            self.bytes.extend_from_slice(&y.to_le_bytes());
            self
        }

        fn poly_record(&mut self, shape: i32, parts: &[&[(f64, f64)]]) -> &mut Self {
            let num_parts = parts.len() as i32;
            let num_points: i32 = parts.iter().map(|p| p.len() as i32).sum();
            // shape(4) + bbox(32) + counts(8) + starts(4n) + points(16m)
            let content_bytes = 44 + 4 * num_parts + 16 * num_points;
            self.record_header(content_bytes / 2);

            self.bytes.extend_from_slice(&shape.to_le_bytes());
            for _ in 0..4 {
                self.bytes.extend_from_slice(&0f64.to_le_bytes());
            }
            self.bytes.extend_from_slice(&num_parts.to_le_bytes());
            self.bytes.extend_from_slice(&num_points.to_le_bytes());
            let mut start = 0i32;
            for part in parts {
                self.bytes.extend_from_slice(&start.to_le_bytes());
                start += part.len() as i32;
            }
            for part in parts {
                for (x, y) in *part {
                    self.bytes.extend_from_slice(&x.to_le_bytes());
                    self.bytes.extend_from_slice(&y.to_le_bytes());
                }
            }
            self
        }

        /// A record carrying a shape type the decoder does not interpret.
        fn unsupported_record(&mut self) -> &mut Self {
            self.record_header(12);
            self.bytes.extend_from_slice(&shape_type::MULTIPOINT.to_le_bytes());
            self.bytes.extend_from_slice(&[0xAB; 20]);
            self
        }

        fn raw(&mut self, bytes: &[u8]) -> &mut Self {
            self.bytes.extend_from_slice(bytes);
            self
        }

        fn read(&self) -> Result<ShapeGeometry, ShpError> {
            ShpReader::new(Cursor::new(self.bytes.clone())).read()
        }
    }

    #[test]
    fn test_truncated_header_is_fatal() {
        let result = ShpReader::new(Cursor::new(vec![0u8; 50])).read();
        assert!(matches!(result, Err(ShpError::TruncatedHeader { len: 50 })));
    }

    #[test]
    fn test_header_only_stream() {
        let geometry = ShpBuilder::new((0.0, 0.0, 10.0, 10.0)).read().unwrap();
        assert_eq!(geometry.envelope, Envelope::new(0.0, 0.0, 10.0, 10.0));
        assert!(geometry.parts.is_empty());
    }

    #[test]
    fn test_polyline_with_two_parts() {
        let part_a: &[(f64, f64)] = &[(0.0, 0.0), (2.0, 2.0), (4.0, 1.0)];
        let part_b: &[(f64, f64)] = &[(5.0, 5.0), (10.0, 10.0)];
        let mut builder = ShpBuilder::new((0.0, 0.0, 10.0, 10.0));
        builder.poly_record(shape_type::POLYLINE, &[part_a, part_b]);

        let geometry = builder.read().unwrap();
        assert_eq!(geometry.part_count(), 2);
        assert_eq!(geometry.point_count(), 5);
        assert_eq!(geometry.parts[0].len(), 3);
        assert_eq!(geometry.parts[1].len(), 2);
        assert_eq!(geometry.parts[1][1], Point::new(10.0, 10.0));
        assert_eq!(geometry.envelope, Envelope::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_polygon_record_uses_same_path() {
        let ring: &[(f64, f64)] = &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)];
        let mut builder = ShpBuilder::new((0.0, 0.0, 4.0, 4.0));
        builder.poly_record(shape_type::POLYGON, &[ring]);

        let geometry = builder.read().unwrap();
        assert_eq!(geometry.part_count(), 1);
        assert_eq!(geometry.parts[0].len(), 5);
    }

    #[test]
    fn test_point_record_synthesizes_segment() {
        let mut builder = ShpBuilder::new((0.0, 0.0, 10.0, 10.0));
        builder.point_record(3.0, 4.0);

        let geometry = builder.read().unwrap();
        assert_eq!(geometry.part_count(), 1);
        let part = &geometry.parts[0];
        assert_eq!(part.len(), 2);
        assert_eq!(part[0], Point::new(3.0, 4.0));
        assert!((part[1].x - 3.0).abs() < 1e-4 && part[1].x > 3.0);
    }

    #[test]
    fn test_unsupported_record_skipped_by_length() {
        let part: &[(f64, f64)] = &[(1.0, 1.0), (2.0, 2.0)];
        let mut builder = ShpBuilder::new((0.0, 0.0, 10.0, 10.0));
        builder.unsupported_record();
        builder.poly_record(shape_type::POLYLINE, &[part]);

        let geometry = builder.read().unwrap();
        assert_eq!(geometry.part_count(), 1);
        assert_eq!(geometry.parts[0].len(), 2);
    }

    #[test]
    fn test_corrupt_trailer_stops_scan() {
        let part: &[(f64, f64)] = &[(1.0, 1.0), (2.0, 2.0)];
        let mut builder = ShpBuilder::new((0.0, 0.0, 10.0, 10.0));
        builder.poly_record(shape_type::POLYLINE, &[part]);
        // Record header with a zero content length followed by garbage that
        // would desynchronize a naive scan.
        builder.record_header(0);
        builder.raw(&[0xFF; 64]);

        let geometry = builder.read().unwrap();
        assert_eq!(geometry.part_count(), 1);
    }

    #[test]
    fn test_truncated_record_body_is_isolated() {
        let mut builder = ShpBuilder::new((0.0, 0.0, 10.0, 10.0));
        // Declares a polyline with 100 points but the stream ends first.
        builder.record_header(1000);
        builder.raw(&shape_type::POLYLINE.to_le_bytes());
        builder.raw(&[0u8; 32]);
        builder.raw(&1i32.to_le_bytes());
        builder.raw(&100i32.to_le_bytes());

        let geometry = builder.read().unwrap();
        assert!(geometry.parts.is_empty());
    }

    #[test]
    fn test_trailing_bytes_shorter_than_record_header() {
        let mut builder = ShpBuilder::new((0.0, 0.0, 10.0, 10.0));
        builder.point_record(1.0, 1.0);
        builder.raw(&[0x01, 0x02, 0x03]);

        let geometry = builder.read().unwrap();
        assert_eq!(geometry.part_count(), 1);
    }
}
