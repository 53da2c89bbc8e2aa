use nalgebra::Point3;

use crate::error::BoussinesqError;

/// Node indices of a triangle. Vertex order sets the normal by the right-hand rule.
pub type Triangle = [usize; 3];

/// A triangulated surface
#[derive(Debug, Clone)]
pub struct Mesh {
    nodes: Vec<Point3<f64>>,
    triangles: Vec<Triangle>,
}

impl Mesh {
    /// Builds a mesh, checking that every triangle indexes a real node
    ///
    /// # Arguments
    /// * `nodes` - The node coordinates, indexed by position
    /// * `triangles` - Triples of node indices
    ///
    /// # Returns
    /// The validated mesh
    pub fn new(nodes: Vec<Point3<f64>>, triangles: Vec<Triangle>) -> Result<Mesh, BoussinesqError> {
        for (i, triangle) in triangles.iter().enumerate() {
            if let Some(bad) = triangle.iter().find(|&&n| n >= nodes.len()) {
                return Err(BoussinesqError::Mesh(format!(
                    "Triangle {i} references node {bad}, but the mesh has {} nodes",
                    nodes.len()
                )));
            }
        }

        Ok(Mesh { nodes, triangles })
    }

    pub fn nodes(&self) -> &[Point3<f64>] {
        &self.nodes
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The three vertex positions of a triangle
    pub fn triangle_points(&self, triangle: &Triangle) -> [Point3<f64>; 3] {
        triangle.map(|i| self.nodes[i])
    }
}

/// Isotropic elastic half-space
#[derive(Debug, Clone, Copy)]
pub struct MaterialProperties {
    pub youngs_modulus: f64,
    pub poisson_ratio: f64,
}

impl MaterialProperties {
    /// The Boussinesq constant `(1 - v^2) / (pi E)` relating surface pressure
    /// to normal displacement
    pub fn compliance_constant(&self) -> f64 {
        (1.0 - f64::powi(self.poisson_ratio, 2)) / (std::f64::consts::PI * self.youngs_modulus)
    }
}

/// What the assembler does when a triangle yields a non-finite compliance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegeneracyPolicy {
    /// Fail the whole row
    #[default]
    Abort,
    /// Record the triangle and leave its contribution out of the row
    SkipTriangle,
}

impl DegeneracyPolicy {
    pub fn parse(name: &str) -> Option<DegeneracyPolicy> {
        match name.trim().to_lowercase().as_str() {
            "abort" => Some(DegeneracyPolicy::Abort),
            "skip" | "skip_triangle" => Some(DegeneracyPolicy::SkipTriangle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelMetadata {
    pub k_const: f64,
    pub degeneracy_policy: DegeneracyPolicy,
    pub diagnostic_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mesh_rejects_out_of_range_index() {
        let nodes = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        let result = Mesh::new(nodes, vec![[0, 1, 3]]);
        assert!(matches!(result, Err(BoussinesqError::Mesh(_))));
    }

    #[test]
    fn test_triangle_points_follow_indices() {
        let nodes = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        let mesh = Mesh::new(nodes, vec![[2, 0, 1]]).unwrap();
        let [a, b, c] = mesh.triangle_points(&mesh.triangles()[0]);
        assert_eq!(a, Point3::new(0.0, 1.0, 0.0));
        assert_eq!(b, Point3::origin());
        assert_eq!(c, Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_compliance_constant() {
        let material = MaterialProperties {
            youngs_modulus: 1.0,
            poisson_ratio: 0.0,
        };
        assert_relative_eq!(material.compliance_constant(), 1.0 / std::f64::consts::PI);

        let steel = MaterialProperties {
            youngs_modulus: 200e9,
            poisson_ratio: 0.3,
        };
        assert_relative_eq!(
            steel.compliance_constant(),
            0.91 / (std::f64::consts::PI * 200e9),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(DegeneracyPolicy::parse("Abort"), Some(DegeneracyPolicy::Abort));
        assert_eq!(DegeneracyPolicy::parse("skip"), Some(DegeneracyPolicy::SkipTriangle));
        assert_eq!(DegeneracyPolicy::parse("retry"), None);
        assert_eq!(DegeneracyPolicy::default(), DegeneracyPolicy::Abort);
    }
}
