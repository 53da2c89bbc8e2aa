use std::fmt::Display;
use std::io::Write;

use nalgebra::{Point3, Vector3};

use crate::datatypes::Triangle;

/// Context captured when a triangle produces a non-finite compliance. All
/// coordinates are in the triangle's local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DegeneracyReport {
    pub triangle_index: usize,
    pub triangle: Triangle,
    pub p1_local: Point3<f64>,
    pub p2_local: Point3<f64>,
    pub p3_local: Point3<f64>,
    pub eval_point_local: Point3<f64>,
    pub compliance: Vector3<f64>,
}

impl DegeneracyReport {
    /// The report as key/value pairs
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let point = |p: &Point3<f64>| format!("({:e}, {:e}, {:e})", p.x, p.y, p.z);
        vec![
            ("triangle_index", self.triangle_index.to_string()),
            ("triangle", format!("{:?}", self.triangle)),
            ("p1_T", point(&self.p1_local)),
            ("p2_T", point(&self.p2_local)),
            ("p3_T", point(&self.p3_local)),
            ("xA_T", point(&self.eval_point_local)),
            (
                "compliance",
                format!(
                    "({:e}, {:e}, {:e})",
                    self.compliance[0], self.compliance[1], self.compliance[2]
                ),
            ),
        ]
    }
}

impl Display for DegeneracyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pairs: Vec<String> = self
            .fields()
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        write!(f, "{}", pairs.join(" "))
    }
}

/// Destination for degeneracy reports.
///
/// Recording is best effort: a sink must swallow its own failures so the
/// degeneracy it reports stays the error the caller sees.
pub trait DiagnosticSink {
    fn record(&mut self, report: &DegeneracyReport);
}

/// Sends reports to the `log` facade at error level
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&mut self, report: &DegeneracyReport) {
        log::error!("degenerate element compliance: {report}");
    }
}

/// Keeps reports in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub reports: Vec<DegeneracyReport>,
}

impl DiagnosticSink for MemorySink {
    fn record(&mut self, report: &DegeneracyReport) {
        self.reports.push(report.clone());
    }
}

/// Writes each report to a text file, replacing the previous one
#[derive(Debug)]
pub struct FileSink {
    path: String,
}

impl FileSink {
    pub fn new(path: &str) -> FileSink {
        FileSink {
            path: path.to_owned(),
        }
    }

    fn write_report(&self, report: &DegeneracyReport) -> std::io::Result<()> {
        let mut file = std::fs::File::create(&self.path)?;
        for (key, value) in report.fields() {
            writeln!(file, "{key}: {value}")?;
        }
        Ok(())
    }
}

impl DiagnosticSink for FileSink {
    fn record(&mut self, report: &DegeneracyReport) {
        if let Err(err) = self.write_report(report) {
            log::warn!("unable to write diagnostics to {}: {err}", self.path);
        }
    }
}
