use chrono::NaiveDate;

/// Items completed on a single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throughput {
    pub date: NaiveDate,
    pub completed_issues: usize,
}

/// Daily throughput values, oldest first. Input to the Monte-Carlo engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThroughputHistory {
    values: Vec<usize>,
}

impl ThroughputHistory {
    pub fn new(values: Vec<usize>) -> Self {
        Self { values }
    }

    pub fn from_records(records: &[Throughput]) -> Self {
        let mut sorted: Vec<&Throughput> = records.iter().collect();
        sorted.sort_by_key(|record| record.date);
        Self::new(sorted.iter().map(|record| record.completed_issues).collect())
    }

    /// Buckets done dates into one value per calendar day of `[start, end]`.
    pub fn from_done_dates(done_dates: &[NaiveDate], start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            return Self::default();
        }

        let days = (end - start).num_days() as usize + 1;
        let mut values = vec![0; days];
        for date in done_dates {
            if *date < start || *date > end {
                continue;
            }
            values[(*date - start).num_days() as usize] += 1;
        }
        Self::new(values)
    }

    pub fn values(&self) -> &[usize] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn total(&self) -> usize {
        self.values.iter().sum()
    }
}
