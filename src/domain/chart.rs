// Doughnut chart observations
use regex::Regex;
use std::sync::LazyLock;

static SLICE_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z\s]+)([0-9.,]+)$").expect("slice text pattern"));

/// Labels and values read from the chart at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartReading {
    pub labels: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl ChartReading {
    pub fn new(labels: Vec<String>, values: Vec<Option<f64>>) -> Self {
        Self { labels, values }
    }

    /// Builds a reading from the raw text of each slice label
    pub fn from_slice_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        let (labels, values) = texts.iter().map(|t| parse_slice_text(t.as_ref())).unzip();
        Self { labels, values }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A reading tagged with its position in the run; index 0 is the initial load.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub index: usize,
    pub reading: ChartReading,
}

impl Snapshot {
    pub fn new(index: usize, reading: ChartReading) -> Self {
        Self { index, reading }
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.reading
            .labels
            .iter()
            .map(String::as_str)
            .zip(self.reading.values.iter().copied())
    }
}

/// Splits slice text such as `"Clinic12,5"` into `("Clinic", Some(12.5))`.
/// With a `.` present, commas are thousands separators: `"Hospital1,234.5"` is 1234.5.
/// Text that does not look like `<letters><number>` keeps its raw form with no value.
pub fn parse_slice_text(raw: &str) -> (String, Option<f64>) {
    let raw = raw.trim();
    match SLICE_TEXT.captures(raw) {
        Some(caps) => {
            let label = caps[1].trim().to_string();
            let number = &caps[2];
            let normalized = if number.contains('.') {
                number.replace(',', "")
            } else {
                number.replacen(',', ".", 1)
            };
            let value = normalized
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite());
            (label, value)
        }
        None => (raw.to_string(), None),
    }
}
