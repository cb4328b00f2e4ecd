use super::{Formatter, GaugeOutput};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, output: &GaugeOutput) -> String {
        if self.verbose {
            format!(
                "Raw: {:>6}  Offset: {:>6}  Angle: {:>5.1}°  Display: {:>5.1}°  [{}]",
                output.raw, output.offset, output.angle, output.displayed_angle, output.tier
            )
        } else {
            format!(
                "Raw: {}  Offset: {}  Angle: {:.1}°",
                output.raw, output.offset, output.angle
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::sample_output;

    #[test]
    fn test_one_decimal_place() {
        let line = TextFormatter::new(false).format(&sample_output());
        assert_eq!(line, "Raw: 412  Offset: 100  Angle: 93.6°");
    }

    #[test]
    fn test_verbose_includes_tier() {
        let line = TextFormatter::new(true).format(&sample_output());
        assert!(line.contains("Display:  80.2°"));
        assert!(line.ends_with("[WARNING]"));
    }
}
