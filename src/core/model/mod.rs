use crate::core::error::{PlotError, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

mod plot_config;

pub use plot_config::PlotConfig;

/// Shared, immutable sample identifier.
pub type SampleId = Arc<str>;

/// Hands out one shared allocation per distinct sample name.
#[derive(Debug, Default)]
pub struct Interner {
    seen: HashSet<SampleId>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> SampleId {
        if let Some(id) = self.seen.get(name) {
            return Arc::clone(id);
        }
        let id: SampleId = Arc::from(name);
        self.seen.insert(Arc::clone(&id));
        id
    }
}

/// A raw cell as supplied by the data table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Int(v) => Some(*v as f64),
            RawValue::Float(v) => Some(*v),
            RawValue::Text(_) => None,
        }
    }

    /// Numbers compare numerically and sort before text.
    pub fn rank_cmp(&self, other: &RawValue) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => match (self, other) {
                (RawValue::Text(a), RawValue::Text(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
        }
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Int(v) => write!(f, "{}", v),
            RawValue::Float(v) => write!(f, "{}", v),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

/// Insertion-ordered sample → value mapping with unique sample ids.
#[derive(Clone, Debug)]
pub struct SampleValues<V> {
    entries: Vec<(SampleId, V)>,
    index: HashMap<SampleId, usize>,
}

impl<V> Default for SampleValues<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> SampleValues<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value; gives the sample back if it is already present.
    pub fn insert(&mut self, sample: SampleId, value: V) -> std::result::Result<(), SampleId> {
        if self.index.contains_key(&sample) {
            return Err(sample);
        }
        self.index.insert(Arc::clone(&sample), self.entries.len());
        self.entries.push((sample, value));
        Ok(())
    }

    pub fn get(&self, sample: &str) -> Option<&V> {
        self.index.get(sample).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, sample: &str) -> bool {
        self.index.contains_key(sample)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(SampleId, V)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SampleId, &V)> {
        self.entries.iter().map(|(s, v)| (s, v))
    }

    pub fn samples(&self) -> impl Iterator<Item = &SampleId> {
        self.entries.iter().map(|(s, _)| s)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&SampleId, &V) -> bool,
    {
        self.entries.retain(|(s, v)| keep(s, v));
        self.index.clear();
        for (i, (s, _)) in self.entries.iter().enumerate() {
            self.index.insert(Arc::clone(s), i);
        }
    }
}

impl<V: Clone> SampleValues<V> {
    /// Builds from entries already known to be unique, e.g. a subset of another map.
    pub fn from_unique(entries: Vec<(SampleId, V)>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, (s, _)) in entries.iter().enumerate() {
            index.insert(Arc::clone(s), i);
        }
        Self { entries, index }
    }
}

/// Serialises as a sample → value object in insertion order.
impl<V: Serialize> Serialize for SampleValues<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(s, v)| (s.as_ref(), v)))
    }
}

/// One metric's values across samples, plus its display metadata.
#[derive(Clone, Debug)]
pub struct MetricSeries {
    pub id: String,
    pub title: String,
    pub description: String,
    pub namespace: Option<String>,
    pub suffix: String,
    pub color: Option<String>,
    pub dmin: Option<f64>,
    pub dmax: Option<f64>,
    pub tt_decimals: Option<u32>,
    pub hidden: bool,
    pub values: SampleValues<RawValue>,
}

impl MetricSeries {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            description: String::new(),
            namespace: None,
            suffix: String::new(),
            color: None,
            dmin: None,
            dmax: None,
            tt_decimals: None,
            hidden: false,
            values: SampleValues::new(),
        }
    }

    pub fn push(&mut self, sample: SampleId, value: RawValue) -> Result<()> {
        self.values
            .insert(sample, value)
            .map_err(|sample| PlotError::DuplicateSample {
                metric: self.id.clone(),
                sample: sample.to_string(),
            })
    }
}

/// Metric → sample → value, with unique metric ids in column order.
#[derive(Clone, Debug, Default)]
pub struct MetricTable {
    metrics: Vec<MetricSeries>,
}

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, series: MetricSeries) -> Result<()> {
        if self.metrics.iter().any(|m| m.id == series.id) {
            return Err(PlotError::DuplicateMetric(series.id));
        }
        self.metrics.push(series);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSeries> {
        self.metrics.iter()
    }

    /// Distinct samples across all metrics, in first-seen order.
    pub fn sample_union(&self) -> Vec<SampleId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for m in &self.metrics {
            for s in m.values.samples() {
                if seen.insert(Arc::clone(s)) {
                    out.push(Arc::clone(s));
                }
            }
        }
        out
    }
}
