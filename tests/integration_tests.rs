use anyhow::Result;
use hyperspace_sampler::core::output::read_points;
use hyperspace_sampler::core::sampler::{build_sampler, Draws};
use hyperspace_sampler::domain::model::{OutputFormat, SamplingStrategy};
use hyperspace_sampler::{
    LocalStorage, Problem, RunConfig, SamplerConfig, SamplingEngine, SamplingPipeline,
    TomlConfig,
};
use std::path::Path;
use tempfile::TempDir;

fn write_input(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

fn run_config(dir: &Path, input: &str, output: &str, n_results: usize) -> RunConfig {
    let input = write_input(dir, "input.txt", input);
    let output = dir.join(output).to_string_lossy().to_string();
    let mut config = RunConfig::new(input, output, n_results);
    config.sampler = config.sampler.with_seed(2024);
    config
}

async fn run(config: RunConfig) -> hyperspace_sampler::Result<String> {
    let pipeline = SamplingPipeline::new(LocalStorage::default(), config);
    let engine = SamplingEngine::new(pipeline);
    Ok(engine.run().await?.output_path)
}

#[tokio::test]
async fn test_half_plane_example() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = run_config(
        temp_dir.path(),
        "2\n0.5 0.5\n# half plane\nx[0] + x[1] - 1.0 <= 0.0\n",
        "out.txt",
        10,
    );

    let output_path = run(config).await?;
    let text = std::fs::read_to_string(output_path)?;

    assert_eq!(text.lines().count(), 10);
    for line in text.lines() {
        let coords: Vec<f64> = line
            .split(' ')
            .map(|c| c.parse::<f64>())
            .collect::<std::result::Result<_, _>>()?;
        assert_eq!(coords.len(), 2);
        assert!(coords[0] + coords[1] - 1.0 <= 0.0, "{} is outside", line);
    }
    Ok(())
}

#[tokio::test]
async fn test_zero_results_writes_empty_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = run_config(temp_dir.path(), "1\n0.5\nx[0] >= 0\n", "empty.txt", 0);

    let output_path = run(config).await?;
    assert!(std::fs::read(output_path)?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_infeasible_seed_is_rejected_before_sampling() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = run_config(temp_dir.path(), "2\n2 2\nx[0] + x[1] <= 1\n", "out.txt", 5);
    let output = config.output_file.clone();

    let err = run(config).await.unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.exit_code(), 1);
    assert!(!Path::new(&output).exists());
    Ok(())
}

#[tokio::test]
async fn test_single_point_region_reports_progress_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = run_config(
        temp_dir.path(),
        "1\n0.5\nx[0] >= 0.5\nx[0] <= 0.5\n",
        "out.txt",
        3,
    );

    let err = run(config).await.unwrap_err();
    assert_eq!(err.exit_code(), 2);
    match err {
        hyperspace_sampler::SamplerError::ProgressError {
            found, requested, anchor, ..
        } => {
            assert_eq!(found, 0);
            assert_eq!(requested, 3);
            assert_eq!(anchor, vec![0.5]);
        }
        other => panic!("unexpected error: {}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_input_file_is_configuration_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let missing = temp_dir.path().join("nope.txt").to_string_lossy().to_string();
    let output = temp_dir.path().join("out.txt").to_string_lossy().to_string();

    let err = run(RunConfig::new(missing, output, 1)).await.unwrap_err();
    assert_eq!(err.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn test_every_format_reads_back() -> Result<()> {
    let input = "3\n1, 1, 1\nx[0] >= 0\nx[0] <= 2\nx[1] >= 0\nx[1] <= 2\nx[2] >= 0\nx[2] <= 2\nx[0] * x[1] <= x[2] + 1\n";

    for format in [OutputFormat::Txt, OutputFormat::Csv, OutputFormat::Json] {
        let temp_dir = TempDir::new()?;
        let mut config = run_config(temp_dir.path(), input, &format!("points.{}", format), 25);
        config.format = format;

        let output_path = run(config).await?;
        let points = read_points(&std::fs::read(output_path)?, format)?;

        assert_eq!(points.len(), 25, "{}", format);
        for point in &points {
            assert_eq!(point.ndims(), 3);
            assert!(point[0] * point[1] <= point[2] + 1.0);
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_trivial_box_accepts_every_candidate() -> Result<()> {
    let problem = Problem::parse("2\n0.5 0.5\nx[0] >= 0\nx[0] <= 1\nx[1] >= 0\nx[1] <= 1\n")?;
    let config = SamplerConfig::new().with_seed(11);

    let mut sampler = build_sampler(&problem, &config)?;
    let drawn = Draws::new(sampler.as_mut()).take(500).filter(|d| d.is_ok()).count();
    assert_eq!(drawn, 500);

    let stats = sampler.stats();
    assert!(stats.acceptance_rate() > 0.99, "rate {}", stats.acceptance_rate());
    Ok(())
}

#[tokio::test]
async fn test_box_strategy_stays_inside_region() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = run_config(
        temp_dir.path(),
        "2\n0 0\nx[0] >= -1\nx[0] <= 1\nx[1] >= -1\nx[1] <= 1\nx[0]**2 + x[1]**2 <= 1\n",
        "disc.csv",
        50,
    );
    config.sampler = config.sampler.with_strategy(SamplingStrategy::Box);
    config.format = OutputFormat::Csv;

    let output_path = run(config).await?;
    let points = read_points(&std::fs::read(output_path)?, OutputFormat::Csv)?;
    assert_eq!(points.len(), 50);
    assert!(points.iter().all(|p| p[0] * p[0] + p[1] * p[1] <= 1.0));
    Ok(())
}

#[tokio::test]
async fn test_settings_file_drives_the_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let settings = TomlConfig::from_toml_str(
        "[sampler]\nseed = 5\nthin = 3\n[output]\nformat = \"json\"\ndistinct = true\nwalks = 2\n",
    )?;

    let mut config = run_config(
        temp_dir.path(),
        "2\n0.2 0.2\nx[0] >= 0\nx[1] >= 0\nx[0] + x[1] <= 1\n",
        "out.json",
        12,
    );
    config.sampler = settings.sampler_config();
    let output = settings.output_config();
    config.format = output.format.unwrap_or_default();
    config.distinct = output.distinct.unwrap_or(false);
    config.walks = output.walks.unwrap_or(1);

    let output_path = run(config).await?;
    let data = std::fs::read(output_path)?;
    let json: serde_json::Value = serde_json::from_slice(&data)?;
    assert_eq!(json["ndims"], 2);
    assert_eq!(json["count"], 12);

    let points = read_points(&data, OutputFormat::Json)?;
    let mut keys: Vec<String> = points.iter().map(|p| format!("{:?}", p.as_slice())).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 12);
    Ok(())
}

#[tokio::test]
async fn test_seeded_runs_are_reproducible() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = "2\n0.1 0.1\nx[0] >= 0\nx[1] >= 0\nx[0] + 2 * x[1] <= 1\n";

    let first = run(run_config(temp_dir.path(), input, "a.txt", 20)).await?;
    let second = run(run_config(temp_dir.path(), input, "b.txt", 20)).await?;
    assert_eq!(std::fs::read(first)?, std::fs::read(second)?);
    Ok(())
}
