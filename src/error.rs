use std::fmt::Display;

use crate::diagnostics::DegeneracyReport;

#[derive(Debug)]
pub enum BoussinesqError {
    Input(String),
    Mesh(String),
    DegenerateTriangle(String),
    IntegralDomain(String),
    NonFiniteCompliance(DegeneracyReport),
    PostProcessor(String),
}

impl Display for BoussinesqError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (err_name, value) = match self {
            BoussinesqError::Input(v) => ("Input", v.clone()),
            BoussinesqError::Mesh(v) => ("Mesh", v.clone()),
            BoussinesqError::DegenerateTriangle(v) => ("Degenerate triangle", v.clone()),
            BoussinesqError::IntegralDomain(v) => ("Integral domain", v.clone()),
            BoussinesqError::NonFiniteCompliance(report) => {
                ("Compliance", format!("non-finite element compliance, {report}"))
            }
            BoussinesqError::PostProcessor(v) => ("Post Processor", v.clone()),
        };

        write!(f, "{} error: {}", err_name, value)
    }
}

impl std::error::Error for BoussinesqError {}
