use super::{Formatter, GaugeOutput, iso8601_timestamp};

pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, output: &GaugeOutput) -> String {
        format!(
            "{},{},{},{:.1},{:.1},{}",
            iso8601_timestamp(),
            output.raw,
            output.offset,
            output.angle,
            output.displayed_angle,
            output.tier.label().to_lowercase()
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,raw,offset,angle,displayed_angle,tier")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::sample_output;

    #[test]
    fn test_csv_columns_match_header() {
        let line = CsvFormatter.format(&sample_output());
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), CsvFormatter.header().unwrap().split(',').count());
        assert_eq!(&fields[1..], &["412", "100", "93.6", "80.2", "warning"]);
    }
}
