use std::path::PathBuf;

use anyhow::{anyhow, Result as AHResult};
use clap::Parser;
use log::{debug, info};

use referendum_map::visualization::{render_choropleth, write_choropleth};
use referendum_map::schema::result;
use referendum_map::{load_inputs, run_pipeline, PipelineConfig};

/// Referendum results by region, rendered as a choropleth map.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// (directory, default "data") Where the input files are looked up.
    #[clap(long, value_parser)]
    data_dir: Option<PathBuf>,

    /// (file name, default "referendum.csv") The ballots table.
    #[clap(long, value_parser)]
    ballots: Option<String>,

    /// (file name, default "regions.csv") The regions table.
    #[clap(long, value_parser)]
    regions: Option<String>,

    /// (file name, default "departments.csv") The departments table.
    #[clap(long, value_parser)]
    departments: Option<String>,

    /// (file name, default "regions.geojson") The region boundaries.
    #[clap(long, value_parser)]
    geometry: Option<String>,

    /// (character, default ';') Field delimiter of the ballots table.
    #[clap(long, value_parser)]
    delimiter: Option<char>,

    /// (file path, default "referendum_map.html") Where the map is written.
    #[clap(long, value_parser)]
    map_output: Option<PathBuf>,

    /// Skip rendering the map.
    #[clap(long)]
    no_map: bool,

    /// If passed as an argument, will turn on verbose logging.
    #[clap(long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> AHResult<PipelineConfig> {
        let mut config = PipelineConfig::default();
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(f) = self.ballots {
            config.ballots_file = f;
        }
        if let Some(f) = self.regions {
            config.regions_file = f;
        }
        if let Some(f) = self.departments {
            config.departments_file = f;
        }
        if let Some(f) = self.geometry {
            config.geometry_file = f;
        }
        if let Some(d) = self.delimiter {
            if !d.is_ascii() {
                return Err(anyhow!("Delimiter must be a single-byte character, got {d:?}"));
            }
            config.ballots_delimiter = d as u8;
        }
        if let Some(p) = self.map_output {
            config.map_output = Some(p);
        }
        if self.no_map {
            config.map_output = None;
        }
        Ok(config)
    }
}

fn main() -> AHResult<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = args.into_config()?;
    debug!("config: {:?}", config);

    let inputs = load_inputs(&config)?;
    let output = run_pipeline(&inputs)?;

    println!("{}", output.region_result);

    if let Some(path) = &config.map_output {
        let html = render_choropleth(&output.geo_result, result::RATIO, &config.map)?;
        write_choropleth(path, &html)?;
    } else {
        info!("Map rendering skipped");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(argv: &[&str]) -> AHResult<PipelineConfig> {
        let mut full = vec!["referendum-map"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full)?.into_config()
    }

    #[test]
    fn no_arguments_give_the_defaults() {
        let config = config_from(&[]).unwrap();
        let defaults = PipelineConfig::default();
        assert_eq!(config.ballots_path(), defaults.ballots_path());
        assert_eq!(config.geometry_path(), defaults.geometry_path());
        assert_eq!(config.ballots_delimiter, b';');
        assert_eq!(config.map_output, defaults.map_output);
    }

    #[test]
    fn no_map_wins_over_map_output() {
        let config = config_from(&["--map-output", "x.html", "--no-map"]).unwrap();
        assert_eq!(config.map_output, None);

        let config = config_from(&["--map-output", "x.html"]).unwrap();
        assert_eq!(config.map_output, Some(PathBuf::from("x.html")));
    }

    #[test]
    fn ascii_delimiter_is_accepted() {
        let config = config_from(&["--delimiter", ","]).unwrap();
        assert_eq!(config.ballots_delimiter, b',');
    }

    #[test]
    fn multi_byte_delimiter_is_rejected() {
        let err = config_from(&["--delimiter", "é"]).unwrap_err();
        assert!(err.to_string().contains("single-byte"), "{err}");
        assert!(config_from(&["--delimiter", "€"]).is_err());
    }
}
