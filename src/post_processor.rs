use std::io::Write;

use nalgebra::{DMatrix, Point3};

use crate::error::BoussinesqError;

/// Writes compliance rows to a CSV file
///
/// Each line holds the evaluation point followed by one coefficient per node.
///
/// # Arguments
/// * `compliance_matrix` - One row per evaluation point
/// * `eval_points` - The evaluation points, in row order
/// * `output` - The filename of the output csv
pub fn csv_output(
    compliance_matrix: &DMatrix<f64>,
    eval_points: &[Point3<f64>],
    output: &str,
) -> Result<(), BoussinesqError> {
    let file = std::fs::File::create(output).map_err(|err| {
        BoussinesqError::PostProcessor(format!("Failed to create {output}: {err}"))
    })?;
    let mut writer = std::io::BufWriter::new(file);

    write_rows(&mut writer, compliance_matrix, eval_points)
        .and_then(|_| writer.flush())
        .map_err(|err| BoussinesqError::PostProcessor(format!("Failed to write {output}: {err}")))?;

    log::info!("wrote {} compliance rows to {}", compliance_matrix.nrows(), output);

    Ok(())
}

fn write_rows<W: Write>(
    writer: &mut W,
    compliance_matrix: &DMatrix<f64>,
    eval_points: &[Point3<f64>],
) -> std::io::Result<()> {
    let node_columns: Vec<String> = (0..compliance_matrix.ncols())
        .map(|i| format!("n{i}"))
        .collect();
    writeln!(writer, "x,y,z,{}", node_columns.join(","))?;

    for (row, point) in compliance_matrix.row_iter().zip(eval_points) {
        let values: Vec<String> = row.iter().map(|c| format!("{c:e}")).collect();
        writeln!(writer, "{},{},{},{}", point.x, point.y, point.z, values.join(","))?;
    }

    Ok(())
}
