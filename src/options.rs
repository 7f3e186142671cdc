//! Parser configuration.

use serde::{Deserialize, Serialize};

/// Knobs for one parse. `ParseOptions::default()` matches what real-world
/// documents need; every field can be overridden from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Report G, F and C clefs that omit `<line>` as warnings.
    pub strict_clef_lines: bool,
    /// Compare each measure's timeline against its time signature.
    pub check_measure_durations: bool,
    /// MusicXML files include a DOCTYPE declaration, so DTDs are allowed
    /// by default.
    pub allow_dtd: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict_clef_lines: false,
            check_measure_durations: true,
            allow_dtd: true,
        }
    }
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self {
            strict_clef_lines: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let opts: ParseOptions = serde_json::from_str(r#"{"strict_clef_lines": true}"#).unwrap();
        assert!(opts.strict_clef_lines);
        assert!(opts.check_measure_durations);
        assert!(opts.allow_dtd);
    }
}
