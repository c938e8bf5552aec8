//! Reading and writing observation sequences.
//!
//! The XML schema is deliberately small:
//!
//! ```xml
//! <ObservationSequence version="1">
//!   <frame>
//!     <observation targetId="1" model="-1" x="1.5" y="2.0" sqrtSize="0.8"/>
//!   </frame>
//! </ObservationSequence>
//! ```
//!
//! When the XML parse fails, [`read_multistate`] falls back once to the
//! plain region-set format: whitespace-separated `frame id x y size` rows,
//! `#` starting a comment line. If both parses fail the read aborts.

use crate::errors::ObservationIoError;
use crate::models::ModelKind;
use crate::types::{Frame, MultiState, Observation};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Schema version this build reads and writes.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "ObservationSequence")]
struct XmlSequence {
    #[serde(rename = "@version")]
    version: u32,
    #[serde(rename = "frame", default)]
    frames: Vec<XmlFrame>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct XmlFrame {
    #[serde(rename = "observation", default)]
    observations: Vec<XmlObservation>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlObservation {
    #[serde(rename = "@targetId")]
    target_id: u32,
    /// Motion model tag: -1 unknown, 0 random walk, 1 linear extrapolation
    #[serde(rename = "@model", default = "model_unknown")]
    model: i8,
    #[serde(rename = "@x")]
    x: f64,
    #[serde(rename = "@y")]
    y: f64,
    #[serde(rename = "@sqrtSize")]
    sqrt_size: f64,
}

fn model_unknown() -> i8 {
    -1
}

fn model_to_tag(model: Option<ModelKind>) -> i8 {
    match model {
        None => -1,
        Some(kind) => kind.index() as i8,
    }
}

fn tag_to_model(tag: i8) -> Option<ModelKind> {
    if tag < 0 {
        None
    } else {
        ModelKind::from_index(tag as usize)
    }
}

impl From<&MultiState> for XmlSequence {
    fn from(ms: &MultiState) -> Self {
        XmlSequence {
            version: SCHEMA_VERSION,
            frames: ms
                .frames
                .iter()
                .map(|frame| XmlFrame {
                    observations: frame
                        .observations
                        .iter()
                        .map(|obs| XmlObservation {
                            target_id: obs.target_id,
                            model: model_to_tag(obs.model),
                            x: obs.x,
                            y: obs.y,
                            sqrt_size: obs.sqrt_size,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl From<XmlSequence> for MultiState {
    fn from(xml: XmlSequence) -> Self {
        MultiState::new(
            xml.frames
                .into_iter()
                .map(|frame| {
                    Frame::new(
                        frame
                            .observations
                            .into_iter()
                            .map(|obs| Observation {
                                x: obs.x,
                                y: obs.y,
                                sqrt_size: obs.sqrt_size,
                                target_id: obs.target_id,
                                model: tag_to_model(obs.model),
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }
}

/// Parse the XML observation format from a string.
fn parse_xml(content: &str) -> Result<MultiState, ObservationIoError> {
    let xml: XmlSequence =
        quick_xml::de::from_str(content).map_err(|e| ObservationIoError::Serialize {
            description: e.to_string(),
        })?;
    if xml.version != SCHEMA_VERSION {
        return Err(ObservationIoError::UnsupportedVersion {
            found: xml.version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(xml.into())
}

/// Parse the plain region-set fallback format from a string.
///
/// Rows are `frame id x y size`; the size column is the region area, so the
/// observation feature becomes its square root. Frames without rows are
/// empty frames.
pub fn read_region_set(content: &str) -> Result<MultiState, ObservationIoError> {
    let mut rows: Vec<(usize, u32, f64, f64, f64)> = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ObservationIoError::Serialize {
                description: format!(
                    "region row {} has {} fields, expected 5 (frame id x y size)",
                    lineno + 1,
                    fields.len()
                ),
            });
        }
        let parse_err = |what: &str| ObservationIoError::Serialize {
            description: format!("region row {}: invalid {}", lineno + 1, what),
        };
        let frame: usize = fields[0].parse().map_err(|_| parse_err("frame"))?;
        let id: u32 = fields[1].parse().map_err(|_| parse_err("id"))?;
        let x: f64 = fields[2].parse().map_err(|_| parse_err("x"))?;
        let y: f64 = fields[3].parse().map_err(|_| parse_err("y"))?;
        let size: f64 = fields[4].parse().map_err(|_| parse_err("size"))?;
        if size < 0.0 {
            return Err(parse_err("size (negative)"));
        }
        rows.push((frame, id, x, y, size));
    }

    if rows.is_empty() {
        return Err(ObservationIoError::Serialize {
            description: "region set contains no rows".to_string(),
        });
    }

    let num_frames = rows.iter().map(|r| r.0).max().unwrap_or(0) + 1;
    let mut frames = vec![Frame::default(); num_frames];
    for (frame, id, x, y, size) in rows {
        frames[frame]
            .observations
            .push(Observation::labeled(x, y, size.sqrt(), id));
    }
    Ok(MultiState::new(frames))
}

/// Read an observation sequence from a file.
///
/// Tries the XML schema first and falls back once to the region-set
/// interpretation; aborts when both fail.
pub fn read_multistate(path: &Path) -> Result<MultiState, ObservationIoError> {
    let content = fs::read_to_string(path).map_err(|source| ObservationIoError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let xml_error = match parse_xml(&content) {
        Ok(ms) => return Ok(ms),
        Err(e) => e.to_string(),
    };

    log::warn!(
        "{}: not a valid observation document ({}); trying region-set fallback",
        path.display(),
        xml_error
    );

    match read_region_set(&content) {
        Ok(ms) => Ok(ms),
        Err(e) => Err(ObservationIoError::Unparseable {
            path: path.to_path_buf(),
            xml_error,
            fallback_error: e.to_string(),
        }),
    }
}

/// Write an observation sequence as XML.
pub fn write_multistate(path: &Path, observations: &MultiState) -> Result<(), ObservationIoError> {
    let xml = XmlSequence::from(observations);
    let body = quick_xml::se::to_string(&xml).map_err(|e| ObservationIoError::Serialize {
        description: e.to_string(),
    })?;
    let document = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n", body);
    fs::write(path, document).map_err(|source| ObservationIoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sequence() -> MultiState {
        MultiState::new(vec![
            Frame::new(vec![
                Observation::labeled(1.5, 2.0, 0.8, 1),
                Observation::labeled(4.0, 4.0, 1.2, 0),
            ]),
            Frame::default(),
            Frame::new(vec![Observation::labeled(1.7, 2.1, 0.8, 1)]),
        ])
    }

    #[test]
    fn test_xml_round_trip() {
        let dir = std::env::temp_dir();
        let path = dir.join("rbmcda_io_roundtrip.observations.xml");

        let ms = sample_sequence();
        write_multistate(&path, &ms).unwrap();
        let back = read_multistate(&path).unwrap();

        assert_eq!(back.len(), ms.len());
        for (a, b) in ms.frames.iter().zip(back.frames.iter()) {
            assert_eq!(a.len(), b.len());
            for (oa, ob) in a.observations.iter().zip(b.observations.iter()) {
                assert_eq!(oa.target_id, ob.target_id);
                assert!((oa.x - ob.x).abs() < 1e-12);
                assert!((oa.sqrt_size - ob.sqrt_size).abs() < 1e-12);
            }
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_version_rejected() {
        let doc = r#"<ObservationSequence version="99"><frame/></ObservationSequence>"#;
        let err = parse_xml(doc).unwrap_err();
        assert!(matches!(
            err,
            ObservationIoError::UnsupportedVersion { found: 99, .. }
        ));
    }

    #[test]
    fn test_region_set_parse() {
        let content = "\
# frame id x y size
0 1 1.5 2.0 0.64
0 0 4.0 4.0 1.44
2 1 1.7 2.1 0.64
";
        let ms = read_region_set(content).unwrap();
        assert_eq!(ms.len(), 3);
        assert_eq!(ms.frames[0].len(), 2);
        assert!(ms.frames[1].is_empty());
        assert_eq!(ms.frames[2].observations[0].target_id, 1);
        assert!((ms.frames[0].observations[0].sqrt_size - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_region_set_rejects_garbage() {
        assert!(read_region_set("not a region file").is_err());
        assert!(read_region_set("").is_err());
        assert!(read_region_set("0 1 2.0 3.0").is_err());
    }

    #[test]
    fn test_fallback_read() {
        let dir = std::env::temp_dir();
        let path = dir.join("rbmcda_io_fallback.regions");
        std::fs::write(&path, "0 1 1.0 2.0 4.0\n1 1 1.5 2.0 4.0\n").unwrap();

        let ms = read_multistate(&path).unwrap();
        assert_eq!(ms.len(), 2);
        assert!((ms.frames[0].observations[0].sqrt_size - 2.0).abs() < 1e-12);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unreadable_both_ways_aborts() {
        let dir = std::env::temp_dir();
        let path = dir.join("rbmcda_io_bad.observations.xml");
        std::fs::write(&path, "<broken<<xml and not a region file either").unwrap();

        let err = read_multistate(&path).unwrap_err();
        assert!(matches!(err, ObservationIoError::Unparseable { .. }));

        let _ = std::fs::remove_file(&path);
    }
}
