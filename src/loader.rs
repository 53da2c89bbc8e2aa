use std::{collections::HashMap, path::Path, str::FromStr};

use json::JsonValue;
use nalgebra::Point3;

use crate::{
    datatypes::{DegeneracyPolicy, MaterialProperties, Mesh, ModelMetadata, Triangle},
    error::BoussinesqError,
};

/// Gmsh element type of a 3-node triangle
const GMSH_TRIANGLE: usize = 2;

/// Major version of the supported gmsh format
const GMSH_VERSION: f64 = 4.0;

enum MeshParseState {
    Format,
    Nodes,
    Elements,
    Limbo,
}

/// Splits a whitespace separated line into numbers
fn parse_numbers<T: FromStr>(line: &str, context: &str) -> Result<Vec<T>, BoussinesqError> {
    line.split_whitespace()
        .map(|item| {
            item.parse().map_err(|_| {
                BoussinesqError::Mesh(format!("Unexpected value '{item}' in {context}"))
            })
        })
        .collect()
}

fn next_line<'a, I: Iterator<Item = &'a str>>(lines: &mut I, context: &str) -> Result<&'a str, BoussinesqError> {
    lines
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| BoussinesqError::Mesh(format!("Mesh file ended inside {context}")))
}

/// Parses the contents of a gmsh v4 ASCII .msh file
///
/// # Arguments
/// * `contents` - The text of the mesh file
///
/// # Returns
/// The nodes, ordered by tag, and the 3-node triangles
pub fn parse_msh(contents: &str) -> Result<Mesh, BoussinesqError> {
    let mut parser_state = MeshParseState::Limbo;
    let mut parsed_section_metadata = false;
    let mut parsed_format = false;
    let mut lines = contents.lines();

    let mut tagged_nodes: Vec<(usize, Point3<f64>)> = Vec::new();
    let mut tagged_triangles: Vec<[usize; 3]> = Vec::new();

    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with("$End") {
            parser_state = MeshParseState::Limbo;
            continue;
        }

        match parser_state {
            MeshParseState::Limbo => {
                parsed_section_metadata = false;

                if line.starts_with("$MeshFormat") {
                    parser_state = MeshParseState::Format;
                } else if line.starts_with("$Nodes") {
                    parser_state = MeshParseState::Nodes;
                } else if line.starts_with("$Elements") {
                    parser_state = MeshParseState::Elements;
                }
            }
            MeshParseState::Format => {
                let format: Vec<f64> = parse_numbers(line, "mesh format")?;
                match format.as_slice() {
                    [version, file_type, ..]
                        if version.floor() == GMSH_VERSION && *file_type == 0.0 =>
                    {
                        parsed_format = true;
                    }
                    [version, file_type, ..] if version.floor() == GMSH_VERSION => {
                        return Err(BoussinesqError::Mesh(format!(
                            "Only ASCII mesh files are supported, got file type {file_type}"
                        )));
                    }
                    _ => {
                        return Err(BoussinesqError::Mesh(format!(
                            "Unsupported mesh format '{line}', expected version 4.x"
                        )));
                    }
                }
            }
            MeshParseState::Nodes => {
                if !parsed_section_metadata {
                    parsed_section_metadata = true;
                    continue;
                }

                let block: Vec<usize> = parse_numbers(line, "node block header")?;
                if block.len() < 4 {
                    return Err(BoussinesqError::Mesh(format!(
                        "Malformed node block header '{line}'"
                    )));
                }
                let num_nodes_local = block[3];

                let mut node_tags: Vec<usize> = Vec::with_capacity(num_nodes_local);
                for _ in 0..num_nodes_local {
                    let tag: Vec<usize> = parse_numbers(next_line(&mut lines, "node tags")?, "node tags")?;
                    node_tags.extend(tag);
                }

                for tag in node_tags {
                    let coords: Vec<f64> =
                        parse_numbers(next_line(&mut lines, "node coordinates")?, "node coordinates")?;
                    if coords.len() < 3 {
                        return Err(BoussinesqError::Mesh(format!(
                            "Node {tag} has {} coordinates, expected 3",
                            coords.len()
                        )));
                    }
                    tagged_nodes.push((tag, Point3::new(coords[0], coords[1], coords[2])));
                }
            }
            MeshParseState::Elements => {
                if !parsed_section_metadata {
                    parsed_section_metadata = true;
                    continue;
                }

                let block: Vec<usize> = parse_numbers(line, "element block header")?;
                if block.len() < 4 {
                    return Err(BoussinesqError::Mesh(format!(
                        "Malformed element block header '{line}'"
                    )));
                }
                let entity_dim = block[0];
                let element_type = block[2];
                let num_elements = block[3];

                if element_type != GMSH_TRIANGLE {
                    if entity_dim == 2 {
                        return Err(BoussinesqError::Mesh(format!(
                            "Surface elements of gmsh type {element_type} are not supported, \
                             only 3-node triangles"
                        )));
                    }
                    log::debug!(
                        "skipping {num_elements} gmsh type {element_type} elements \
                         of dimension {entity_dim}"
                    );
                }

                for _ in 0..num_elements {
                    let element: Vec<usize> =
                        parse_numbers(next_line(&mut lines, "elements")?, "elements")?;

                    if element_type != GMSH_TRIANGLE {
                        continue;
                    }
                    if element.len() < 4 {
                        return Err(BoussinesqError::Mesh(format!(
                            "Triangle element {:?} has too few nodes",
                            element
                        )));
                    }

                    tagged_triangles.push([element[1], element[2], element[3]]);
                }
            }
        }
    }

    if !parsed_format {
        return Err(BoussinesqError::Mesh(
            "Mesh file has no $MeshFormat section".to_string(),
        ));
    }

    // Order nodes by tag
    tagged_nodes.sort_by_key(|(tag, _)| *tag);
    let tag_to_index: HashMap<usize, usize> = tagged_nodes
        .iter()
        .enumerate()
        .map(|(i, (tag, _))| (*tag, i))
        .collect();

    let mut triangles: Vec<Triangle> = Vec::with_capacity(tagged_triangles.len());
    for tags in tagged_triangles {
        let mut triangle: Triangle = [0; 3];
        for (slot, tag) in triangle.iter_mut().zip(tags) {
            *slot = *tag_to_index.get(&tag).ok_or_else(|| {
                BoussinesqError::Mesh(format!("Triangle references unknown node tag {tag}"))
            })?;
        }
        triangles.push(triangle);
    }

    let nodes = tagged_nodes.into_iter().map(|(_, p)| p).collect();
    Mesh::new(nodes, triangles)
}

fn parse_point(value: &JsonValue, context: &str) -> Result<Point3<f64>, BoussinesqError> {
    let coords: Vec<Option<f64>> = value.members().map(|c| c.as_f64()).collect();

    match coords.as_slice() {
        [Some(x), Some(y), Some(z)] => Ok(Point3::new(*x, *y, *z)),
        _ => Err(BoussinesqError::Input(format!(
            "Bad point {} in {context}, expected [x, y, z]",
            value.dump()
        ))),
    }
}

/// Parses a mesh given inline as `nodes` and `triangles` arrays
fn parse_inline_mesh(mesh_json: &JsonValue) -> Result<Mesh, BoussinesqError> {
    if !mesh_json["nodes"].is_array() || !mesh_json["triangles"].is_array() {
        return Err(BoussinesqError::Input(
            "Input json mesh needs nodes and triangles arrays, or a file".to_string(),
        ));
    }

    let nodes = mesh_json["nodes"]
        .members()
        .map(|n| parse_point(n, "mesh nodes"))
        .collect::<Result<Vec<Point3<f64>>, BoussinesqError>>()?;

    let mut triangles: Vec<Triangle> = Vec::new();
    for triangle_json in mesh_json["triangles"].members() {
        let indices: Vec<Option<usize>> = triangle_json.members().map(|i| i.as_usize()).collect();

        match indices.as_slice() {
            [Some(a), Some(b), Some(c)] => triangles.push([*a, *b, *c]),
            _ => {
                return Err(BoussinesqError::Input(format!(
                    "Bad triangle {} in mesh, expected three node indices",
                    triangle_json.dump()
                )))
            }
        }
    }

    Mesh::new(nodes, triangles)
}

/// Loads the mesh section of the input json
///
/// # Arguments
/// * `input_json` - The input file as a JsonValue object
/// * `base_dir` - Directory that relative mesh file paths resolve against
fn parse_mesh(input_json: &JsonValue, base_dir: &Path) -> Result<Mesh, BoussinesqError> {
    let mesh_json = &input_json["mesh"];

    let mesh = match mesh_json["file"].as_str() {
        Some(file) => {
            let mesh_path = base_dir.join(file);
            let contents = std::fs::read_to_string(&mesh_path).map_err(|err| {
                BoussinesqError::Input(format!(
                    "Unable to open mesh file {}: {err}",
                    mesh_path.display()
                ))
            })?;
            parse_msh(&contents)?
        }
        None => parse_inline_mesh(mesh_json)?,
    };

    log::info!(
        "loaded {} nodes and {} triangles",
        mesh.num_nodes(),
        mesh.triangles().len()
    );

    Ok(mesh)
}

/// Parses the input json into a JsonValue object
///
/// # Arguments
/// * `input_file` - The path to the input file
///
/// # Returns
/// A JsonValue object
fn load_input_file(input_file: &str) -> Result<JsonValue, BoussinesqError> {
    let file_string = match std::fs::read_to_string(input_file) {
        Ok(f) => f,
        Err(_err) => {
            return Err(BoussinesqError::Input(format!(
                "Unable to open input file {}",
                input_file
            )))
        }
    };

    let input_file_json = match json::parse(&file_string) {
        Ok(f) => f,
        Err(err) => {
            return Err(BoussinesqError::Input(format!(
                "Error in input file json: {err}"
            )))
        }
    };

    if !input_file_json.has_key("metadata") {
        return Err(BoussinesqError::Input(
            "Input json missing metadata field".to_string(),
        ));
    }
    if !input_file_json.has_key("mesh") {
        return Err(BoussinesqError::Input(
            "Input json missing mesh field".to_string(),
        ));
    }

    Ok(input_file_json)
}

/// Parses Model Metadata from the input_json
///
/// # Arguments
/// * `input_json`: The input file as a JsonValue object
///
/// # Returns
/// A ModelMetadata instance
pub fn parse_input_metadata(input_json: &JsonValue) -> Result<ModelMetadata, BoussinesqError> {
    let metadata = &input_json["metadata"];

    let k_const = match metadata["k_const"].as_f64() {
        Some(k) => k,
        None => {
            let youngs_modulus = metadata["material_elasticity"].as_f64().ok_or_else(|| {
                BoussinesqError::Input(
                    "Input json needs k_const or material_elasticity in metadata".to_owned(),
                )
            })?;
            let poisson_ratio = metadata["poisson_ratio"].as_f64().ok_or_else(|| {
                BoussinesqError::Input("Input json missing poisson ratio".to_owned())
            })?;

            if youngs_modulus <= 0.0 {
                return Err(BoussinesqError::Input(format!(
                    "Material elasticity must be positive, got {youngs_modulus}"
                )));
            }
            if !(-1.0..=0.5).contains(&poisson_ratio) {
                return Err(BoussinesqError::Input(format!(
                    "Poisson ratio must lie in [-1, 0.5], got {poisson_ratio}"
                )));
            }

            MaterialProperties {
                youngs_modulus,
                poisson_ratio,
            }
            .compliance_constant()
        }
    };

    let degeneracy_policy = match metadata["degeneracy_policy"].as_str() {
        Some(name) => DegeneracyPolicy::parse(name).ok_or_else(|| {
            BoussinesqError::Input(format!(
                "Unknown degeneracy_policy '{name}', expected abort or skip"
            ))
        })?,
        None => DegeneracyPolicy::default(),
    };

    Ok(ModelMetadata {
        k_const,
        degeneracy_policy,
        diagnostic_file: metadata["diagnostic_file"].as_str().map(|s| s.to_owned()),
    })
}

/// Reads the evaluation points. Defaults to every mesh node.
fn parse_evaluation_points(
    input_json: &JsonValue,
    mesh: &Mesh,
) -> Result<Vec<Point3<f64>>, BoussinesqError> {
    if input_json.has_key("evaluation_points") {
        return input_json["evaluation_points"]
            .members()
            .map(|p| parse_point(p, "evaluation_points"))
            .collect();
    }

    if input_json.has_key("evaluation_nodes") {
        let mut points = Vec::new();
        for node_json in input_json["evaluation_nodes"].members() {
            match node_json.as_usize() {
                Some(i) if i < mesh.num_nodes() => points.push(mesh.nodes()[i]),
                _ => {
                    return Err(BoussinesqError::Input(format!(
                        "Bad evaluation node {}",
                        node_json.dump()
                    )))
                }
            }
        }
        return Ok(points);
    }

    Ok(mesh.nodes().to_vec())
}

/// Loads a compliance job
///
/// # Arguments
/// * `input_file` - The input json with metadata, mesh and evaluation points
///
/// # Returns
/// The mesh, the evaluation points and the model metadata
pub fn run(input_file: &str) -> Result<(Mesh, Vec<Point3<f64>>, ModelMetadata), BoussinesqError> {
    let input_file_json = load_input_file(input_file)?;
    let model_metadata = parse_input_metadata(&input_file_json)?;

    let base_dir = Path::new(input_file).parent().unwrap_or(Path::new("."));
    let mesh = parse_mesh(&input_file_json, base_dir)?;
    let eval_points = parse_evaluation_points(&input_file_json, &mesh)?;

    log::info!(
        "loaded {} evaluation points, k = {:e}, policy {:?}",
        eval_points.len(),
        model_metadata.k_const,
        model_metadata.degeneracy_policy
    );

    Ok((mesh, eval_points, model_metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SQUARE_MSH: &str = "$MeshFormat
4.1 0 8
$EndMeshFormat
$Entities
0 0 1 0
1 0 0 0 1 1 0 0 0
$EndEntities
$Nodes
1 4 1 4
2 1 0 4
1
2
4
3
0 0 0
1 0 0
0 1 0
1 1 0
$EndNodes
$Elements
2 3 1 3
1 1 1 1
7 1 2
2 1 2 2
1 1 2 4
2 1 4 3
$EndElements
";

    #[test]
    fn test_parse_msh() {
        let mesh = parse_msh(SQUARE_MSH).unwrap();

        assert_eq!(mesh.num_nodes(), 4);
        assert_eq!(mesh.nodes()[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(mesh.nodes()[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mesh.nodes()[2], Point3::new(1.0, 1.0, 0.0));
        assert_eq!(mesh.nodes()[3], Point3::new(0.0, 1.0, 0.0));
        assert_eq!(mesh.triangles(), &[[0, 1, 3], [0, 3, 2]]);
    }

    #[test]
    fn test_parse_msh_unknown_tag() {
        let broken = SQUARE_MSH.replace("2 1 4 3", "2 1 4 9");
        assert!(matches!(parse_msh(&broken), Err(BoussinesqError::Mesh(_))));
    }

    #[test]
    fn test_parse_msh_truncated() {
        let truncated = &SQUARE_MSH[..SQUARE_MSH.find("1 1 0\n$EndNodes").unwrap()];
        assert!(parse_msh(truncated).is_err());
    }

    #[test]
    fn test_parse_msh_rejects_other_versions() {
        let legacy = SQUARE_MSH.replace("4.1 0 8", "2.2 0 8");
        assert!(matches!(parse_msh(&legacy), Err(BoussinesqError::Mesh(_))));

        let binary = SQUARE_MSH.replace("4.1 0 8", "4.1 1 8");
        assert!(matches!(parse_msh(&binary), Err(BoussinesqError::Mesh(_))));

        let headless = &SQUARE_MSH[SQUARE_MSH.find("$Entities").unwrap()..];
        assert!(matches!(parse_msh(headless), Err(BoussinesqError::Mesh(_))));
    }

    #[test]
    fn test_parse_msh_rejects_quad_surfaces() {
        // One quadrangle (gmsh type 3) covering the square
        let quads = SQUARE_MSH
            .replace("2 3 1 3", "2 2 1 2")
            .replace("2 1 2 2\n1 1 2 4\n2 1 4 3", "2 1 3 1\n1 1 2 4 3");
        assert!(matches!(parse_msh(&quads), Err(BoussinesqError::Mesh(_))));
    }

    #[test]
    fn test_parse_inline_mesh() {
        let input = json::parse(
            r#"{"nodes": [[0, 0, 0], [1, 0, 0], [0, 1, 0.5]], "triangles": [[0, 1, 2]]}"#,
        )
        .unwrap();
        let mesh = parse_inline_mesh(&input).unwrap();

        assert_eq!(mesh.num_nodes(), 3);
        assert_eq!(mesh.nodes()[2], Point3::new(0.0, 1.0, 0.5));
        assert_eq!(mesh.triangles(), &[[0, 1, 2]]);

        let bad = json::parse(r#"{"nodes": [[0, 0]], "triangles": []}"#).unwrap();
        assert!(matches!(parse_inline_mesh(&bad), Err(BoussinesqError::Input(_))));
    }

    #[test]
    fn test_parse_metadata_from_material() {
        let input = json::parse(
            r#"{"metadata": {"material_elasticity": 2.0, "poisson_ratio": 0.5e-1}}"#,
        )
        .unwrap();
        let metadata = parse_input_metadata(&input).unwrap();

        assert_relative_eq!(
            metadata.k_const,
            (1.0 - 0.0025) / (std::f64::consts::PI * 2.0),
            max_relative = 1e-12
        );
        assert_eq!(metadata.degeneracy_policy, DegeneracyPolicy::Abort);
        assert!(metadata.diagnostic_file.is_none());
    }

    #[test]
    fn test_parse_metadata_incompressible() {
        let input = json::parse(
            r#"{"metadata": {"material_elasticity": 3.0, "poisson_ratio": 0.5}}"#,
        )
        .unwrap();
        let metadata = parse_input_metadata(&input).unwrap();

        assert_relative_eq!(
            metadata.k_const,
            0.75 / (std::f64::consts::PI * 3.0),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_parse_metadata_explicit_k() {
        let input = json::parse(
            r#"{"metadata": {"k_const": 0.25, "degeneracy_policy": "skip", "diagnostic_file": "nan_error.txt"}}"#,
        )
        .unwrap();
        let metadata = parse_input_metadata(&input).unwrap();

        assert_eq!(metadata.k_const, 0.25);
        assert_eq!(metadata.degeneracy_policy, DegeneracyPolicy::SkipTriangle);
        assert_eq!(metadata.diagnostic_file.as_deref(), Some("nan_error.txt"));
    }

    #[test]
    fn test_parse_metadata_errors() {
        for input in [
            r#"{"metadata": {}}"#,
            r#"{"metadata": {"material_elasticity": 2.0}}"#,
            r#"{"metadata": {"material_elasticity": -2.0, "poisson_ratio": 0.3}}"#,
            r#"{"metadata": {"material_elasticity": 2.0, "poisson_ratio": 0.7}}"#,
            r#"{"metadata": {"material_elasticity": 2.0, "poisson_ratio": -1.5}}"#,
            r#"{"metadata": {"k_const": 1.0, "degeneracy_policy": "retry"}}"#,
        ] {
            let input = json::parse(input).unwrap();
            assert!(matches!(
                parse_input_metadata(&input),
                Err(BoussinesqError::Input(_))
            ));
        }
    }

    #[test]
    fn test_evaluation_points() {
        let mesh = Mesh::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        )
        .unwrap();

        let all = parse_evaluation_points(&json::parse("{}").unwrap(), &mesh).unwrap();
        assert_eq!(all, mesh.nodes().to_vec());

        let chosen =
            parse_evaluation_points(&json::parse(r#"{"evaluation_nodes": [2]}"#).unwrap(), &mesh)
                .unwrap();
        assert_eq!(chosen, vec![Point3::new(0.0, 1.0, 0.0)]);

        let explicit = parse_evaluation_points(
            &json::parse(r#"{"evaluation_points": [[0.5, 0.5, 1.0]]}"#).unwrap(),
            &mesh,
        )
        .unwrap();
        assert_eq!(explicit, vec![Point3::new(0.5, 0.5, 1.0)]);

        let out_of_range =
            parse_evaluation_points(&json::parse(r#"{"evaluation_nodes": [3]}"#).unwrap(), &mesh);
        assert!(out_of_range.is_err());
    }
}
