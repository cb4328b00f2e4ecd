use super::{Formatter, GaugeOutput, iso8601_timestamp};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, output: &GaugeOutput) -> String {
        let round1 = |v: f64| (v * 10.0).round() / 10.0;
        serde_json::json!({
            "ts": iso8601_timestamp(),
            "raw": output.raw,
            "offset": output.offset,
            "angle": round1(output.angle),
            "displayed_angle": round1(output.displayed_angle),
            "tier": output.tier,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::sample_output;

    #[test]
    fn test_json_fields() {
        let line = JsonFormatter.format(&sample_output());
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["raw"], 412);
        assert_eq!(value["offset"], 100);
        assert_eq!(value["angle"], 93.6);
        assert_eq!(value["displayed_angle"], 80.2);
        assert_eq!(value["tier"], "warning");
        assert!(value["ts"].as_str().unwrap().ends_with('Z'));
    }
}
