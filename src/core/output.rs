use crate::domain::model::{OutputFormat, Point, ResultSet};
use crate::utils::error::{Result, SamplerError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct JsonOutput {
    ndims: usize,
    count: usize,
    generated_at: String,
    points: Vec<Point>,
}

/// Serializes accepted points in emission order.
pub fn render(results: &ResultSet, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Txt => {
            let mut out = String::new();
            for point in &results.points {
                let line: Vec<String> = point.iter().map(|c| c.to_string()).collect();
                out.push_str(&line.join(" "));
                out.push('\n');
            }
            Ok(out.into_bytes())
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            let header: Vec<String> = (0..results.ndims).map(|i| format!("x{}", i)).collect();
            writer.write_record(&header)?;
            for point in &results.points {
                writer.write_record(point.iter().map(|c| c.to_string()))?;
            }
            writer.into_inner().map_err(|e| SamplerError::IoError(e.into_error()))
        }
        OutputFormat::Json => {
            let output = JsonOutput {
                ndims: results.ndims,
                count: results.points.len(),
                generated_at: chrono::Utc::now().to_rfc3339(),
                points: results.points.clone(),
            };
            Ok(serde_json::to_vec_pretty(&output)?)
        }
    }
}

/// Reads back a file written by [`render`].
pub fn read_points(data: &[u8], format: OutputFormat) -> Result<Vec<Point>> {
    match format {
        OutputFormat::Txt => {
            let text = String::from_utf8_lossy(data);
            text.lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(i, line)| {
                    line.split_whitespace()
                        .map(|field| {
                            field.parse::<f64>().map_err(|_| SamplerError::InputFormatError {
                                line: i + 1,
                                message: format!("'{}' is not a real number", field),
                            })
                        })
                        .collect::<Result<Vec<f64>>>()
                        .map(Point::new)
                })
                .collect()
        }
        OutputFormat::Csv => {
            let mut reader = csv::Reader::from_reader(data);
            let mut points = Vec::new();
            for record in reader.deserialize::<Vec<f64>>() {
                points.push(Point::new(record?));
            }
            Ok(points)
        }
        OutputFormat::Json => {
            let output: JsonOutput = serde_json::from_slice(data)?;
            Ok(output.points)
        }
    }
}
