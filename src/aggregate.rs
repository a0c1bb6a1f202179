// Aggregations over the catalog
//
// Every function here is a pure read of the entries: counts, distinct
// counts, group-bys, date bounds and percentages. Orderings are stable so
// equal counts keep the order in which values were first seen.

use crate::catalog::{Catalog, CatalogEntry, Column};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// `count / total * 100`, or 0 when there are no rows.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    /// `None` groups the null cells of the column
    pub value: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub distinct: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateRange {
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveSummary {
    pub count: usize,
    pub total: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionStats {
    pub mean: f64,
    pub median: f64,
    pub min: usize,
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossMnemonicItem {
    pub item_code: String,
    pub mnemonics: usize,
    pub item_names: Vec<String>,
}

/// Read-only view computing statistics over a set of entries.
pub struct Aggregator<'a> {
    entries: &'a [CatalogEntry],
}

impl<'a> Aggregator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            entries: catalog.entries(),
        }
    }

    pub fn over(entries: &'a [CatalogEntry]) -> Self {
        Self { entries }
    }

    pub fn total_rows(&self) -> usize {
        self.entries.len()
    }

    /// Number of distinct non-null values in `column`
    pub fn count_distinct(&self, column: Column) -> usize {
        self.entries
            .iter()
            .filter_map(|e| e.value(column))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Occurrences per value, most frequent first.
    ///
    /// Null cells are counted under `value: None`, so the counts always sum
    /// to the number of rows.
    pub fn value_counts(&self, column: Column) -> Vec<ValueCount> {
        let mut index: HashMap<Option<&str>, usize> = HashMap::new();
        let mut counts: Vec<ValueCount> = Vec::new();

        for entry in self.entries {
            let value = entry.value(column);
            match index.get(&value) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(value, counts.len());
                    counts.push(ValueCount {
                        value: value.map(str::to_string),
                        count: 1,
                    });
                }
            }
        }

        // sort_by is stable: ties keep first-seen order
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts
    }

    /// For each non-null `group` value, the number of distinct non-null
    /// `target` values, highest first.
    pub fn group_nunique(&self, group: Column, target: Column) -> Vec<GroupCount> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, HashSet<&str>)> = Vec::new();

        for entry in self.entries {
            let Some(key) = entry.value(group) else {
                continue;
            };
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push((key, HashSet::new()));
                groups.len() - 1
            });
            if let Some(value) = entry.value(target) {
                groups[slot].1.insert(value);
            }
        }

        let mut result: Vec<GroupCount> = groups
            .into_iter()
            .map(|(key, values)| GroupCount {
                key: key.to_string(),
                distinct: values.len(),
            })
            .collect();

        result.sort_by(|a, b| b.distinct.cmp(&a.distinct));
        result
    }

    /// Earliest start date and latest end date, unknown dates ignored
    pub fn date_range(&self) -> DateRange {
        DateRange {
            earliest: self.entries.iter().filter_map(|e| e.start_date).min(),
            latest: self.entries.iter().filter_map(|e| e.end_date).max(),
        }
    }

    /// Rows still in effect (end date in year 9999)
    pub fn active_count(&self) -> ActiveSummary {
        let count = self.entries.iter().filter(|e| e.is_active()).count();
        let total = self.entries.len();
        ActiveSummary {
            count,
            total,
            percentage: percentage(count, total),
        }
    }

    /// Distinct item names recorded under `item_code`, first-seen order
    pub fn item_names(&self, item_code: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| e.item_code.as_deref() == Some(item_code))
            .filter(|e| seen.insert(e.item_name.as_str()))
            .map(|e| e.item_name.clone())
            .collect()
    }

    /// Item codes shared by the most mnemonics
    pub fn cross_mnemonic_items(&self, limit: usize) -> Vec<CrossMnemonicItem> {
        self.group_nunique(Column::ItemCode, Column::Mnemonic)
            .into_iter()
            .take(limit)
            .map(|group| CrossMnemonicItem {
                item_names: self.item_names(&group.key),
                item_code: group.key,
                mnemonics: group.distinct,
            })
            .collect()
    }
}

/// Mean/median/min/max of the non-null counts in a value-count list.
pub fn distribution_stats(counts: &[ValueCount]) -> Option<DistributionStats> {
    let mut values: Vec<usize> = counts
        .iter()
        .filter(|c| c.value.is_some())
        .map(|c| c.count)
        .collect();

    if values.is_empty() {
        return None;
    }

    values.sort_unstable();
    let n = values.len();
    let mean = values.iter().sum::<usize>() as f64 / n as f64;
    let median = if n % 2 == 1 {
        values[n / 2] as f64
    } else {
        (values[n / 2 - 1] + values[n / 2]) as f64 / 2.0
    };

    Some(DistributionStats {
        mean,
        median,
        min: values[0],
        max: values[n - 1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::entry;

    fn sample_catalog() -> Catalog {
        Catalog::from_entries(vec![
            entry("AAAA", "1000", "F", "FormA", "N", "2000-01-01", "9999-12-31"),
            entry("AAAA", "1001", "D", "FormA", "Y", "2001-01-01", "2010-01-01"),
            entry("BBBB", "1000", "F", "", "N", "1995-06-30", "9999-12-31"),
            entry("CCCC", "1000", "P", "FormB", "n", "bad", "bad"),
            entry("CCCC", "", "F", "FormB", "N", "2003-01-01", "2004-01-01"),
            entry("BBBB", "2000", "R", "FormA", "N", "2005-01-01", "9999-12-31"),
        ])
    }

    #[test]
    fn test_value_counts_sum_to_rows_for_every_column() {
        let catalog = sample_catalog();
        let agg = Aggregator::new(&catalog);

        for column in Column::ALL {
            let total: usize = agg.value_counts(column).iter().map(|c| c.count).sum();
            assert_eq!(total, catalog.len(), "column {:?}", column);
        }
    }

    #[test]
    fn test_value_counts_descending_with_stable_ties() {
        let catalog = sample_catalog();
        let counts = Aggregator::new(&catalog).value_counts(Column::Mnemonic);

        let order: Vec<_> = counts.iter().map(|c| c.value.as_deref().unwrap()).collect();
        // all three mnemonics have 2 rows; first-seen order wins
        assert_eq!(order, vec!["AAAA", "BBBB", "CCCC"]);

        let forms = Aggregator::new(&catalog).value_counts(Column::ReportingForm);
        assert_eq!(forms[0].value.as_deref(), Some("FormA"));
        assert_eq!(forms[0].count, 3);
        assert!(forms.iter().any(|c| c.value.is_none() && c.count == 1));
    }

    #[test]
    fn test_count_distinct_ignores_nulls() {
        let catalog = sample_catalog();
        let agg = Aggregator::new(&catalog);

        assert_eq!(agg.count_distinct(Column::Mnemonic), 3);
        assert_eq!(agg.count_distinct(Column::ItemCode), 3);
        assert_eq!(agg.count_distinct(Column::ReportingForm), 2);
        assert_eq!(agg.count_distinct(Column::Confidentiality), 3);
    }

    #[test]
    fn test_group_nunique_is_non_increasing() {
        let catalog = sample_catalog();
        let groups = Aggregator::new(&catalog).group_nunique(Column::ItemCode, Column::Mnemonic);

        assert_eq!(groups[0].key, "1000");
        assert_eq!(groups[0].distinct, 3);
        for pair in groups.windows(2) {
            assert!(pair[0].distinct >= pair[1].distinct);
        }
        // null item code is not a group
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_date_range_ignores_unknown_dates() {
        let catalog = sample_catalog();
        let range = Aggregator::new(&catalog).date_range();

        assert_eq!(range.earliest, NaiveDate::from_ymd_opt(1995, 6, 30));
        assert_eq!(range.latest, NaiveDate::from_ymd_opt(9999, 12, 31));
    }

    #[test]
    fn test_date_range_all_unknown() {
        let catalog = Catalog::from_entries(vec![entry("AAAA", "1", "F", "", "N", "x", "y")]);
        let range = Aggregator::new(&catalog).date_range();

        assert_eq!(range.earliest, None);
        assert_eq!(range.latest, None);
    }

    #[test]
    fn test_active_count() {
        let catalog = sample_catalog();
        let active = Aggregator::new(&catalog).active_count();

        assert_eq!(active.count, 3);
        assert_eq!(active.total, 6);
        assert_eq!(active.percentage, 3.0 / 6.0 * 100.0);
    }

    #[test]
    fn test_zero_rows_reports_zero_percent() {
        let catalog = Catalog::default();
        let agg = Aggregator::new(&catalog);

        let active = agg.active_count();
        assert_eq!(active.count, 0);
        assert_eq!(active.percentage, 0.0);
        assert!(agg.value_counts(Column::ItemType).is_empty());
        assert!(agg.group_nunique(Column::ItemCode, Column::Mnemonic).is_empty());
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn test_two_row_scenario() {
        let catalog = Catalog::from_entries(vec![
            entry("AAAA", "1000", "F", "FormA", "N", "2000-01-01", "9999-12-31"),
            entry("AAAA", "1001", "D", "FormA", "Y", "2001-01-01", "2010-01-01"),
        ]);
        let agg = Aggregator::new(&catalog);

        assert_eq!(agg.count_distinct(Column::Mnemonic), 1);
        let active = agg.active_count();
        assert_eq!(active.count, 1);
        assert_eq!(format!("{:.2}", active.percentage), "50.00");
    }

    #[test]
    fn test_cross_mnemonic_items_with_names() {
        let catalog = sample_catalog();
        let items = Aggregator::new(&catalog).cross_mnemonic_items(2);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_code, "1000");
        assert_eq!(items[0].mnemonics, 3);
        assert_eq!(
            items[0].item_names,
            vec!["Item AAAA1000", "Item BBBB1000", "Item CCCC1000"]
        );
    }

    #[test]
    fn test_distribution_stats() {
        let counts = vec![
            ValueCount { value: Some("A".into()), count: 5 },
            ValueCount { value: Some("B".into()), count: 1 },
            ValueCount { value: Some("C".into()), count: 2 },
            ValueCount { value: Some("D".into()), count: 4 },
            ValueCount { value: None, count: 100 },
        ];

        let stats = distribution_stats(&counts).unwrap();
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.min, 1);
        assert_eq!(stats.max, 5);

        assert!(distribution_stats(&[]).is_none());
    }
}
