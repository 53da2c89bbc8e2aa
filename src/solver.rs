use indicatif::ProgressBar;
use nalgebra::{DMatrix, DVector, Point3, Vector3};

use crate::{
    datatypes::{DegeneracyPolicy, Mesh, ModelMetadata, Triangle},
    diagnostics::{DegeneracyReport, DiagnosticSink, FileSink, LogSink},
    element::{AnalyticTriangleCompliance, TriangleCompliance},
    error::BoussinesqError,
    geometry::LocalFrame,
};

/// Builds compliance rows for a mesh.
///
/// The evaluator computes each triangle's vertex coefficients, the policy
/// decides what a degenerate triangle does to the row and the sink receives
/// the context of every degeneracy.
pub struct ComplianceAssembler<'a, E: TriangleCompliance> {
    evaluator: E,
    policy: DegeneracyPolicy,
    sink: &'a mut dyn DiagnosticSink,
}

impl<'a, E: TriangleCompliance> ComplianceAssembler<'a, E> {
    pub fn new(
        evaluator: E,
        policy: DegeneracyPolicy,
        sink: &'a mut dyn DiagnosticSink,
    ) -> ComplianceAssembler<'a, E> {
        ComplianceAssembler {
            evaluator,
            policy,
            sink,
        }
    }

    /// Computes the compliance of one triangle in its local frame
    ///
    /// # Returns
    /// The three vertex coefficients, or `None` when the policy skipped the
    /// triangle
    fn element_compliance(
        &mut self,
        triangle_index: usize,
        triangle: &Triangle,
        mesh: &Mesh,
        eval_point: &Point3<f64>,
        k_const: f64,
    ) -> Result<Option<Vector3<f64>>, BoussinesqError> {
        let [p1, p2, p3] = mesh.triangle_points(triangle);

        let frame = match LocalFrame::new(&p1, &p2, &p3, eval_point) {
            Ok(frame) => frame,
            Err(err) if self.policy == DegeneracyPolicy::SkipTriangle => {
                log::warn!("skipping triangle {triangle_index} {:?}: {err}", triangle);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let eval_point_local = frame.to_local(eval_point);
        let p1_local = frame.to_local(&p1);
        let p2_local = frame.to_local(&p2);
        let p3_local = frame.to_local(&p3);

        let compliance = self.evaluator.evaluate(
            eval_point_local.z,
            &p1_local.xy(),
            &p2_local.xy(),
            &p3_local.xy(),
            k_const,
        )?;

        if compliance.iter().all(|c| c.is_finite()) {
            return Ok(Some(compliance));
        }

        let report = DegeneracyReport {
            triangle_index,
            triangle: *triangle,
            p1_local,
            p2_local,
            p3_local,
            eval_point_local,
            compliance,
        };
        self.sink.record(&report);

        match self.policy {
            DegeneracyPolicy::Abort => Err(BoussinesqError::NonFiniteCompliance(report)),
            DegeneracyPolicy::SkipTriangle => {
                log::warn!("skipping triangle {triangle_index} with non-finite compliance");
                Ok(None)
            }
        }
    }

    /// Computes the compliance row for one evaluation point
    ///
    /// # Arguments
    /// * `mesh` - The loaded surface
    /// * `eval_point` - Where the normal displacement is measured
    /// * `k_const` - The elastic compliance constant
    ///
    /// # Returns
    /// One coefficient per mesh node
    pub fn compute_row(
        &mut self,
        mesh: &Mesh,
        eval_point: &Point3<f64>,
        k_const: f64,
    ) -> Result<DVector<f64>, BoussinesqError> {
        let mut compliance: DVector<f64> = DVector::zeros(mesh.num_nodes());

        for (i, triangle) in mesh.triangles().iter().enumerate() {
            let element_compliance =
                match self.element_compliance(i, triangle, mesh, eval_point, k_const)? {
                    Some(c) => c,
                    None => continue,
                };

            for (local, node) in triangle.iter().enumerate() {
                compliance[*node] += element_compliance[local];
            }
        }

        Ok(compliance)
    }

    /// Computes one compliance row per evaluation point
    ///
    /// # Returns
    /// A matrix whose row i belongs to `eval_points[i]`
    pub fn compute_rows(
        &mut self,
        mesh: &Mesh,
        eval_points: &[Point3<f64>],
        k_const: f64,
    ) -> Result<DMatrix<f64>, BoussinesqError> {
        let mut compliance_matrix: DMatrix<f64> =
            DMatrix::zeros(eval_points.len(), mesh.num_nodes());

        let bar = ProgressBar::new(eval_points.len() as u64);
        for (i, eval_point) in eval_points.iter().enumerate() {
            let row = self.compute_row(mesh, eval_point, k_const)?;
            compliance_matrix.set_row(i, &row.transpose());
            bar.inc(1);
        }
        bar.finish_and_clear();

        Ok(compliance_matrix)
    }
}

/// Computes a compliance row with the analytic evaluator, aborting on any
/// degeneracy and logging its context
pub fn compute_row(
    mesh: &Mesh,
    eval_point: &Point3<f64>,
    k_const: f64,
) -> Result<DVector<f64>, BoussinesqError> {
    let mut sink = LogSink;
    ComplianceAssembler::new(AnalyticTriangleCompliance, DegeneracyPolicy::Abort, &mut sink)
        .compute_row(mesh, eval_point, k_const)
}

/// Runs the solver over every evaluation point
///
/// # Arguments
/// * `mesh` - The loaded surface
/// * `eval_points` - The evaluation points, one row each
/// * `model_metadata` - The model metadata
pub fn run(
    mesh: &Mesh,
    eval_points: &[Point3<f64>],
    model_metadata: &ModelMetadata,
) -> Result<DMatrix<f64>, BoussinesqError> {
    let mut log_sink = LogSink;
    let mut file_sink;
    let sink: &mut dyn DiagnosticSink = match &model_metadata.diagnostic_file {
        Some(path) => {
            file_sink = FileSink::new(path);
            &mut file_sink
        }
        None => &mut log_sink,
    };

    log::info!(
        "computing {} compliance rows over {} triangles...",
        eval_points.len(),
        mesh.triangles().len()
    );
    let start = std::time::Instant::now();

    let compliance_matrix = ComplianceAssembler::new(
        AnalyticTriangleCompliance,
        model_metadata.degeneracy_policy,
        sink,
    )
    .compute_rows(mesh, eval_points, model_metadata.k_const)?;

    let elapsed = (std::time::Instant::now() - start).as_secs_f32();
    log::info!("computed compliance rows in {:.3} seconds", elapsed);

    Ok(compliance_matrix)
}
