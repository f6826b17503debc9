/*
This code is part of the crown_segmentation library.
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use serde::{Deserialize, Serialize};
use std::io::{Error, ErrorKind};

/// The parameters of the radial-profile crown segmentation. Lengths are in
/// the units of the point cloud (usually metres) and heights are assumed to
/// be normalized above the ground surface.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HamrazParameters {
    /// Nominal point spacing; the thinning cell size and smoothing sigma.
    pub nps: f64,
    /// Height threshold; surface points at or below it are discarded.
    pub th: f64,
    /// Minimum diameter of a tree crown.
    pub mdcw: f64,
    /// Minimum climb angle, in degrees, that ends a profile on a height trend.
    /// The angle is measured upwards from the horizontal, from the running
    /// height minimum of the profile to the rising sample; it is not a
    /// deviation from the vertical.
    pub epsilon: f64,
    /// Crown length ratio of the narrow-cone crown envelope.
    pub clc: f64,
    /// Crown radius overestimate of the narrow-cone crown envelope.
    pub oc: f64,
    /// Crown length ratio of the spherical crown envelope.
    pub cls: f64,
    /// Crown radius overestimate of the spherical crown envelope.
    pub os: f64,
    /// Multiplier applied to the interquartile range of the profile spacing.
    pub gap_sensitivity: usize,
    /// Radius around an apex within which profiles are sampled.
    pub search_radius: f64,
    /// Whether extremity outliers are removed before the hull is built.
    pub filter_profiles: bool,
    pub angular_bins: usize,
    pub max_iterations: Option<usize>,
}

impl Default for HamrazParameters {
    fn default() -> HamrazParameters {
        HamrazParameters {
            nps: 0.25,
            th: 5.0,
            mdcw: 1.5,
            epsilon: 5.0,
            clc: 0.8,
            oc: 2.0 / 3.0,
            cls: 0.7,
            os: 1.0 / 3.0,
            gap_sensitivity: 6,
            search_radius: 15.24,
            filter_profiles: true,
            angular_bins: 64,
            max_iterations: None,
        }
    }
}

impl HamrazParameters {
    pub fn new() -> HamrazParameters {
        HamrazParameters::default()
    }

    /// Checks every parameter against its admissible range. The error names
    /// the first offending parameter.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("nps", self.nps),
            ("th", self.th),
            ("mdcw", self.mdcw),
            ("clc", self.clc),
            ("oc", self.oc),
            ("cls", self.cls),
            ("os", self.os),
            ("search_radius", self.search_radius),
        ] {
            if !value.is_finite() || value <= 0f64 {
                return Err(invalid_parameter(&format!(
                    "The {} parameter must be a positive number (found {}).",
                    name, value
                )));
            }
        }

        if !self.epsilon.is_finite() || self.epsilon <= 0f64 || self.epsilon >= 90f64 {
            return Err(invalid_parameter(&format!(
                "The epsilon parameter must lie between 0 and 90 degrees (found {}).",
                self.epsilon
            )));
        }

        if self.gap_sensitivity < 1 {
            return Err(invalid_parameter(
                "The gap_sensitivity parameter must be at least 1.",
            ));
        }

        if self.angular_bins < 4 {
            return Err(invalid_parameter(&format!(
                "The angular_bins parameter must be at least 4 (found {}).",
                self.angular_bins
            )));
        }

        if self.max_iterations == Some(0) {
            return Err(invalid_parameter(
                "The max_iterations parameter must be at least 1 when set.",
            ));
        }

        Ok(())
    }

    /// Half the minimum crown diameter; below this radius only a gap may end
    /// a profile.
    pub fn min_crown_radius(&self) -> f64 {
        self.mdcw / 2f64
    }

    /// Hull area a crown boundary must exceed to be accepted as a tree.
    pub fn min_crown_area(&self) -> f64 {
        let r = self.min_crown_radius();
        std::f64::consts::PI * r * r
    }

    /// Builds a parameter set from tool-style command-line flags. Flags may be
    /// given as `--flag=value`, `--flag value` or with a single dash, and are
    /// case-insensitive. Unrecognized flags are ignored; parameters that are
    /// not given keep their defaults.
    pub fn from_args(args: &[String]) -> Result<HamrazParameters, Error> {
        let mut params = HamrazParameters::default();
        for i in 0..args.len() {
            let mut arg = args[i].replace("\"", "");
            arg = arg.replace("\'", "");
            let cmd = arg.split("="); // in case an equals sign was used
            let vec = cmd.collect::<Vec<&str>>();
            let keyval = vec.len() > 1;
            let flag_val = vec[0].to_lowercase().replace("--", "-");
            let value = || -> Result<String, Error> {
                if keyval {
                    Ok(vec[1].to_string())
                } else {
                    match args.get(i + 1) {
                        Some(v) => Ok(v.trim().to_string()),
                        None => Err(invalid_parameter(&format!(
                            "No value was provided for the {} flag.",
                            flag_val
                        ))),
                    }
                }
            };
            if flag_val == "-nps" {
                params.nps = parse_value(&flag_val, &value()?)?;
            } else if flag_val == "-th" || flag_val == "-min_height" {
                params.th = parse_value(&flag_val, &value()?)?;
            } else if flag_val == "-mdcw" {
                params.mdcw = parse_value(&flag_val, &value()?)?;
            } else if flag_val == "-epsilon" {
                params.epsilon = parse_value(&flag_val, &value()?)?;
            } else if flag_val == "-clc" {
                params.clc = parse_value(&flag_val, &value()?)?;
            } else if flag_val == "-oc" {
                params.oc = parse_value(&flag_val, &value()?)?;
            } else if flag_val == "-cls" {
                params.cls = parse_value(&flag_val, &value()?)?;
            } else if flag_val == "-os" {
                params.os = parse_value(&flag_val, &value()?)?;
            } else if flag_val == "-gap_sensitivity" {
                params.gap_sensitivity = parse_value(&flag_val, &value()?)?;
            } else if flag_val == "-search_radius" || flag_val == "-radius" {
                params.search_radius = parse_value(&flag_val, &value()?)?;
            } else if flag_val == "-angular_bins" {
                params.angular_bins = parse_value(&flag_val, &value()?)?;
            } else if flag_val == "-max_iterations" {
                params.max_iterations = Some(parse_value(&flag_val, &value()?)?);
            } else if flag_val == "-filter_profiles" {
                params.filter_profiles = if keyval {
                    !vec[1].to_lowercase().contains("false")
                } else {
                    match args.get(i + 1).map(|v| v.trim().to_lowercase()) {
                        Some(v) if v == "false" => false,
                        _ => true,
                    }
                };
            }
        }
        Ok(params)
    }

    /// Serializes the parameter set to JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(&self).map_err(|e| Error::new(ErrorKind::InvalidData, e))
    }

    pub fn from_json(contents: &str) -> Result<HamrazParameters, Error> {
        serde_json::from_str(contents).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Error parsing segmentation parameters: {}", e),
            )
        })
    }
}

fn parse_value<T: std::str::FromStr>(flag_val: &str, value: &str) -> Result<T, Error> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| invalid_parameter(&format!("Error parsing {} (found '{}').", flag_val, value)))
}

fn invalid_parameter(msg: &str) -> Error {
    Error::new(ErrorKind::InvalidInput, msg)
}

#[derive(Serialize, Deserialize, Debug)]
struct ToolParameter {
    name: String,
    flags: Vec<String>,
    description: String,
    parameter_type: ParameterType,
    default_value: Option<String>,
    optional: bool,
}

impl ToolParameter {
    fn new(
        name: &str,
        flags: &[&str],
        description: &str,
        parameter_type: ParameterType,
        default_value: Option<String>,
    ) -> ToolParameter {
        ToolParameter {
            name: name.to_owned(),
            flags: flags.iter().map(|f| f.to_string()).collect(),
            description: description.to_owned(),
            parameter_type,
            default_value,
            optional: true,
        }
    }

    fn to_string(&self) -> String {
        match serde_json::to_string(&self) {
            Ok(json_str) => json_str,
            Err(err) => format!("{:?}", err),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
enum ParameterType {
    Boolean,
    Integer,
    Float,
}

/// Describes the recognized flags as a JSON document of the form
/// `{"parameters": [...]}`.
pub fn parameter_descriptions() -> String {
    let d = HamrazParameters::default();
    let parameters = vec![
        ToolParameter::new(
            "Nominal Point Spacing",
            &["--nps"],
            "Nominal point spacing, used as the thinning cell size and smoothing sigma.",
            ParameterType::Float,
            Some(d.nps.to_string()),
        ),
        ToolParameter::new(
            "Height Threshold",
            &["--th", "--min_height"],
            "Points at or below this height are excluded from crown delineation.",
            ParameterType::Float,
            Some(d.th.to_string()),
        ),
        ToolParameter::new(
            "Minimum Crown Diameter",
            &["--mdcw"],
            "Minimum diameter of a tree crown.",
            ParameterType::Float,
            Some(d.mdcw.to_string()),
        ),
        ToolParameter::new(
            "Height Trend Angle",
            &["--epsilon"],
            "Minimum climb angle (degrees) that ends a profile on a height trend.",
            ParameterType::Float,
            Some(d.epsilon.to_string()),
        ),
        ToolParameter::new(
            "Cone Crown Length Ratio",
            &["--clc"],
            "Crown length to tree height ratio of the narrow-cone envelope.",
            ParameterType::Float,
            Some(d.clc.to_string()),
        ),
        ToolParameter::new(
            "Cone Crown Overestimate",
            &["--oc"],
            "Crown radius overestimate of the narrow-cone envelope.",
            ParameterType::Float,
            Some(d.oc.to_string()),
        ),
        ToolParameter::new(
            "Sphere Crown Length Ratio",
            &["--cls"],
            "Crown diameter to tree height ratio of the spherical envelope.",
            ParameterType::Float,
            Some(d.cls.to_string()),
        ),
        ToolParameter::new(
            "Sphere Crown Overestimate",
            &["--os"],
            "Crown radius overestimate of the spherical envelope.",
            ParameterType::Float,
            Some(d.os.to_string()),
        ),
        ToolParameter::new(
            "Gap Sensitivity",
            &["--gap_sensitivity"],
            "Multiplier of the interquartile range of profile spacing that defines a gap.",
            ParameterType::Integer,
            Some(d.gap_sensitivity.to_string()),
        ),
        ToolParameter::new(
            "Search Radius",
            &["--search_radius", "--radius"],
            "Radius around each apex within which height profiles are sampled.",
            ParameterType::Float,
            Some(d.search_radius.to_string()),
        ),
        ToolParameter::new(
            "Filter Profiles",
            &["--filter_profiles"],
            "Remove outlying profile extremities before building the crown boundary?",
            ParameterType::Boolean,
            Some(d.filter_profiles.to_string()),
        ),
        ToolParameter::new(
            "Angular Bins",
            &["--angular_bins"],
            "Number of angular sectors in which profiles are sampled.",
            ParameterType::Integer,
            Some(d.angular_bins.to_string()),
        ),
        ToolParameter::new(
            "Maximum Iterations",
            &["--max_iterations"],
            "Optional cap on the number of iterations.",
            ParameterType::Integer,
            None,
        ),
    ];

    let mut s = String::from("{\"parameters\": [");
    for i in 0..parameters.len() {
        if i < parameters.len() - 1 {
            s.push_str(&(parameters[i].to_string()));
            s.push_str(",");
        } else {
            s.push_str(&(parameters[i].to_string()));
        }
    }
    s.push_str("]}");
    s
}
