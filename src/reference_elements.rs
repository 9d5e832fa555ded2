//! # Reading element dumps back
//!
//! Reader for the osculating-element section of `.check` files, used to compare orbits fitted
//! by this crate with independently computed ones. A block looks like
//!
//! ```text
//! -- Target: (10092, 95232) ----------------------------------------------
//! ...
//! Osculating elements for epoch 2014-05-12T21:18:47 UTC:
//!   a     42164.170 km (IOD)
//!         42165.002 km (28884)
//!   e     0.0002500 (IOD)
//!         0.0002461 (28884)
//! ...
//! Longitude of sub-satellite point: 15.1
//! ```
//!
//! A block opens at an `Osculating elements` line (or at the first element line after a
//! target header) and closes at the sub-satellite longitude line, at the next block or at the
//! end of the file. The target label is the object field of the last `-- Target:` line.

use std::sync::LazyLock;

use camino::Utf8Path;
use regex::Regex;

use crate::constants::Degree;
use crate::geocheck_errors::GeoCheckError;

static TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-- Target: \((.*), (.*)\)").expect("valid target regex"));

static ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^  ([apeiWwM])\s+(\S+)(?:\s+(?:km|deg))?(?:\s+\(([^()]*(?:\([^()]*\))?[^()]*)\))?\s*$")
        .expect("valid element regex")
});

static CONTINUATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {5,}(\S+)(?:\s+(?:km|deg))?\s+\((.*)\)\s*$").expect("valid continuation regex")
});

static SUBLON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Longitude of sub-satellite point:\s+(\S+)").expect("valid longitude regex")
});

/// The six osculating elements of a dump entry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementSet {
    /// Semi-major axis, or semi-latus rectum for near-parabolic orbits (km)
    pub a: f64,
    pub e: f64,
    pub i: Degree,
    pub raan: Degree,
    pub argp: Degree,
    pub mean_anomaly: Degree,
}

#[derive(Debug, Clone, Default)]
struct PartialElements([Option<f64>; 6]);

impl PartialElements {
    fn set(&mut self, element: &str, value: f64) {
        let slot = match element {
            "a" | "p" => 0,
            "e" => 1,
            "i" => 2,
            "W" => 3,
            "w" => 4,
            _ => 5,
        };
        self.0[slot] = Some(value);
    }

    fn complete(&self) -> Option<ElementSet> {
        let [a, e, i, raan, argp, mean_anomaly] = self.0;
        Some(ElementSet {
            a: a?,
            e: e?,
            i: i?,
            raan: raan?,
            argp: argp?,
            mean_anomaly: mean_anomaly?,
        })
    }
}

/// Elements of one dumped track: the fitted orbit and the matched catalog objects.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckElements {
    /// Object field of the target tag
    pub target: String,
    pub fitted: Option<ElementSet>,
    /// Matched objects by label, in dump order
    pub matched: Vec<(String, ElementSet)>,
    pub sublon: Option<Degree>,
}

impl CheckElements {
    /// Fitted orbit paired with the first matched object, when both are present.
    pub fn pair(&self) -> Option<(&ElementSet, &str, &ElementSet)> {
        let fitted = self.fitted.as_ref()?;
        let (label, matched) = self.matched.first()?;
        Some((fitted, label.as_str(), matched))
    }
}

#[derive(Default)]
struct BlockBuilder {
    target: String,
    fitted: PartialElements,
    matched: Vec<(String, PartialElements)>,
    last_element: String,
    sublon: Option<Degree>,
    touched: bool,
}

impl BlockBuilder {
    fn new(target: &str) -> Self {
        BlockBuilder {
            target: target.to_string(),
            ..Default::default()
        }
    }

    fn matched_slot(&mut self, label: &str) -> &mut PartialElements {
        let idx = match self.matched.iter().position(|(l, _)| l == label) {
            Some(idx) => idx,
            None => {
                self.matched.push((label.to_string(), PartialElements::default()));
                self.matched.len() - 1
            }
        };
        &mut self.matched[idx].1
    }

    fn finish(self) -> Option<CheckElements> {
        if !self.touched {
            return None;
        }
        Some(CheckElements {
            target: self.target,
            fitted: self.fitted.complete(),
            matched: self
                .matched
                .iter()
                .filter_map(|(label, p)| p.complete().map(|set| (label.clone(), set)))
                .collect(),
            sublon: self.sublon,
        })
    }
}

fn parse_value(value: &str, line: usize) -> Result<f64, GeoCheckError> {
    value.parse().map_err(|_| {
        GeoCheckError::InvalidParameter(format!("line {line}: invalid element value {value:?}"))
    })
}

/// Parse every element block of a check report.
pub fn parse_check_elements(content: &str) -> Result<Vec<CheckElements>, GeoCheckError> {
    let mut blocks = Vec::new();
    let mut target = String::new();
    let mut current: Option<BlockBuilder> = None;

    for (n, line) in content.lines().enumerate() {
        let n = n + 1;

        if let Some(caps) = TARGET_RE.captures(line) {
            blocks.extend(current.take().and_then(BlockBuilder::finish));
            target = caps[2].trim().to_string();
        } else if line.starts_with("Osculating elements") {
            blocks.extend(current.take().and_then(BlockBuilder::finish));
            current = Some(BlockBuilder::new(&target));
        } else if let Some(caps) = ELEMENT_RE.captures(line) {
            let block = current.get_or_insert_with(|| BlockBuilder::new(&target));
            let element = caps[1].to_string();
            let value = parse_value(&caps[2], n)?;
            match caps.get(3).map(|m| m.as_str()) {
                None | Some("IOD") => block.fitted.set(&element, value),
                Some(label) => block.matched_slot(label).set(&element, value),
            }
            block.last_element = element;
            block.touched = true;
        } else if let Some(caps) = CONTINUATION_RE.captures(line) {
            if let Some(block) = current.as_mut() {
                let value = parse_value(&caps[1], n)?;
                let element = block.last_element.clone();
                block.matched_slot(&caps[2]).set(&element, value);
            }
        } else if let Some(caps) = SUBLON_RE.captures(line) {
            if let Some(mut block) = current.take() {
                block.sublon = Some(parse_value(&caps[1], n)?);
                block.touched = true;
                blocks.extend(block.finish());
            }
        }
    }
    blocks.extend(current.take().and_then(BlockBuilder::finish));
    Ok(blocks)
}

/// Read the element blocks of a check report file.
pub fn read_check_elements(path: &Utf8Path) -> Result<Vec<CheckElements>, GeoCheckError> {
    parse_check_elements(&std::fs::read_to_string(path)?)
}
