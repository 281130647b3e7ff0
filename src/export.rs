//! Export of derived data as `;` separated tables.

use crate::error::InsightsError;
use crate::models::{HistogramRecord, SearchEvolutionRecord, TrafficRecord, VariationRecord};
use crate::transform::{self, HistogramKind};

/// Field separator of exported tables
pub const DELIMITER: u8 = b';';

/// A header and its rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Render the table, one line for the header then one line per row.
    pub fn render(&self) -> Result<String, InsightsError> {
        to_table(&self.header, &self.rows)
    }
}

/// Render a header and rows as `;` separated lines.
///
/// Row order is preserved and every row gives exactly one line.
pub fn to_table<H, R>(header: &[H], rows: &[R]) -> Result<String, InsightsError>
where
    H: AsRef<str>,
    R: AsRef<[String]>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .terminator(csv::Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(vec![]);
    writer.write_record(header.iter().map(|field| field.as_ref()))?;
    for row in rows {
        writer.write_record(row.as_ref())?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|error| csv::Error::from(error.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn histogram_rows(record: &HistogramRecord, kind: HistogramKind) -> Vec<Vec<String>> {
    transform::histogram_bins(&record.histogram, kind, record.total_requests)
        .into_iter()
        .map(|bin| vec![bin.label, bin.value.to_string()])
        .collect()
}

/// Daily searches, unsmoothed.
pub fn time_evolution_table(record: &SearchEvolutionRecord) -> Table {
    Table {
        header: vec!["#Day".to_string(), "Searches".to_string()],
        rows: record
            .time_evolution
            .iter()
            .map(|point| vec![point.label.clone(), point.value.to_string()])
            .collect(),
    }
}

/// Every row of the `data_name` ranking, not only the top ones.
///
/// The first column is named after the first word of the chart title.
pub fn variations_table(record: &VariationRecord, title: &str, data_name: &str) -> Table {
    let first_word = title.split(' ').next().unwrap_or_default();
    Table {
        header: vec![
            format!("#{first_word}"),
            format!(
                "Average number of daily searches in {}",
                record.first_period_label
            ),
            format!(
                "Average number of daily searches in {}",
                record.second_period_label
            ),
            "Delta in %".to_string(),
        ],
        rows: record
            .rows(data_name)
            .into_iter()
            .map(|row| {
                vec![
                    row.ond_code,
                    row.value_period1.to_string(),
                    row.value_period2.to_string(),
                    row.delta_percent.to_string(),
                ]
            })
            .collect(),
    }
}

/// All advance purchase buckets.
pub fn advance_purchase_table(record: &HistogramRecord) -> Table {
    Table {
        header: vec![
            "#Advance purchase (weeks)".to_string(),
            "Average number of daily searches".to_string(),
        ],
        rows: histogram_rows(record, HistogramKind::AdvancePurchase),
    }
}

/// All trip duration buckets, without weekend trimming.
pub fn trip_duration_table(record: &HistogramRecord) -> Table {
    Table {
        header: vec![
            "#Trip duration (days)".to_string(),
            "Number of daily searches".to_string(),
        ],
        rows: histogram_rows(record, HistogramKind::TripDuration),
    }
}

/// Monthly traffic along the traffic calendar, or nothing for an error record.
pub fn traffic_table(record: &TrafficRecord) -> Option<Table> {
    if record.is_error {
        return None;
    }
    Some(Table {
        header: vec!["#Month".to_string(), "Traffic (seats)".to_string()],
        rows: transform::traffic_calendar()
            .into_iter()
            .zip(&record.traffics)
            .map(|(month, value)| vec![month, value.to_string()])
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TimeSeriesPoint, VariationRow};
    use std::collections::BTreeMap;

    fn variation_record() -> VariationRecord {
        let rows: Vec<VariationRow> = (0..12)
            .map(|i| VariationRow::new(&format!("O{i:02}"), 1.5, 3.0, 100.0))
            .collect();
        VariationRecord {
            first_period_label: "2013-01".to_string(),
            second_period_label: "2013-02".to_string(),
            market: "FR".to_string(),
            market_name: "France".to_string(),
            rankings: BTreeMap::from([(
                "by_destination".to_string(),
                serde_json::to_value(
                    rows.iter()
                        .map(|row| {
                            (
                                &row.ond_code,
                                row.value_period1,
                                row.value_period2,
                                row.delta_percent,
                            )
                        })
                        .collect::<Vec<_>>(),
                )
                .unwrap(),
            )]),
        }
    }

    #[test]
    fn test_to_table() {
        let rows = vec![
            vec!["a".to_string(), "1".to_string()],
            vec!["b".to_string(), "2.5".to_string()],
        ];
        let text = to_table(&["#Key", "Value"], &rows).unwrap();
        assert_eq!("#Key;Value\na;1\nb;2.5\n", text);
    }

    #[test]
    fn test_to_table_line_per_row() {
        let rows: Vec<Vec<String>> = (0..7)
            .map(|i| vec![format!("2013-01-{:02}", i + 1), (i * 3).to_string()])
            .collect();
        let text = to_table(&["#Day", "Searches"], &rows).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len() + 1, lines.len());
        for (line, row) in lines[1..].iter().zip(&rows) {
            let fields: Vec<String> = line.split(';').map(str::to_string).collect();
            assert_eq!(*row, fields);
        }
    }

    #[test]
    fn test_to_table_empty() {
        let rows: Vec<Vec<String>> = vec![];
        assert_eq!("#Day;Searches\n", to_table(&["#Day", "Searches"], &rows).unwrap());
    }

    #[test]
    fn test_time_evolution_table_unsmoothed() {
        let record = SearchEvolutionRecord {
            time_evolution: (1..=10)
                .map(|day| TimeSeriesPoint::new(&format!("2013-01-{day:02}"), f64::from(day)))
                .collect(),
            ..Default::default()
        };
        let table = time_evolution_table(&record);
        assert_eq!(10, table.rows.len());
        assert_eq!(vec!["2013-01-04", "4"], table.rows[3]);
        let text = table.render().unwrap();
        assert!(text.starts_with("#Day;Searches\n2013-01-01;1\n"));
    }

    #[test]
    fn test_variations_table_all_rows() {
        let table = variations_table(&variation_record(), "Destinations with highest variations", "by_destination");
        assert_eq!(
            vec![
                "#Destinations",
                "Average number of daily searches in 2013-01",
                "Average number of daily searches in 2013-02",
                "Delta in %"
            ],
            table.header
        );
        assert_eq!(12, table.rows.len());
        assert_eq!(vec!["O00", "1.5", "3", "100"], table.rows[0]);
    }

    #[test]
    fn test_variations_table_missing_ranking() {
        let table = variations_table(&variation_record(), "Origins", "by_origin");
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_histogram_tables() {
        let record = HistogramRecord {
            histogram: vec![1.0, 2.0, 3.0],
            weekend_only: true,
            ..Default::default()
        };
        let table = advance_purchase_table(&record);
        assert_eq!(
            "#Advance purchase (weeks);Average number of daily searches\n0-1;1\n1-2;2\n2+;3\n",
            table.render().unwrap()
        );
        let table = trip_duration_table(&record);
        assert_eq!(
            "#Trip duration (days);Number of daily searches\n0;1\n1;2\n2+;3\n",
            table.render().unwrap()
        );
    }

    #[test]
    fn test_traffic_table() {
        let mut record = TrafficRecord {
            traffics: vec![10.0, 20.0],
            ..Default::default()
        };
        let table = traffic_table(&record).unwrap();
        assert_eq!(vec![vec!["2008-12", "10"], vec!["2009-01", "20"]], table.rows);
        record.is_error = true;
        assert_eq!(None, traffic_table(&record));
    }
}
