/// One coverage boundary together with the points awarded for reaching it.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ThresholdEntry {
    percentage: f64,
    points: u32,
}

impl ThresholdEntry {
    /// Coverage percentage (0–100) that must be met or exceeded.
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Points awarded when the boundary is met.
    pub fn points(&self) -> u32 {
        self.points
    }
}

/// The ordered list of coverage boundaries derived from a points list.
///
/// The range `[minimum, 100]` is partitioned into `points.len()` equal
/// intervals; the i-th entry (1-based) sits at
/// `minimum + (100 - minimum) * i / N`. Percentages are strictly increasing
/// and the last one is exactly `100`.
#[derive(Debug, PartialEq, Clone)]
pub struct ThresholdSchedule {
    entries: Vec<ThresholdEntry>,
}

impl ThresholdSchedule {
    pub fn build(minimum: f64, points: &[u32]) -> Result<Self, &'static str> {
        if points.is_empty() {
            return Err("points must not be empty");
        }
        if !(0.0..100.0).contains(&minimum) {
            return Err("minimum must be at least 0 and below 100");
        }
        let n = points.len() as f64;
        let entries = points
            .iter()
            .enumerate()
            .map(|(i, &points)| ThresholdEntry {
                // multiply before dividing so the last entry lands on 100 exactly
                percentage: minimum + (100.0 - minimum) * (i as f64 + 1.0) / n,
                points,
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ThresholdEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the points of every entry.
    pub fn max_points(&self) -> u32 {
        self.entries.iter().map(|e| e.points).sum()
    }
}
