//! Demo documents compiled into the binary.

use anyhow::{anyhow, Result};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "demos/"]
struct Demos;

/// Demo names (file stems), sorted
pub fn names() -> Vec<String> {
    let mut names: Vec<String> = Demos::iter()
        .filter_map(|file| file.strip_suffix(".json").map(str::to_string))
        .collect();
    names.sort();
    names
}

/// Contents of a demo document by name, with or without `.json`
pub fn get(name: &str) -> Result<String> {
    let file = format!("{}.json", name.trim_end_matches(".json"));
    let embedded = Demos::get(&file)
        .ok_or_else(|| anyhow!("Unknown demo '{}'. Available: {}", name, names().join(", ")))?;
    Ok(String::from_utf8(embedded.data.into_owned())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlt_core::{aggregate, load_graph};

    #[test]
    fn test_demos_are_listed() {
        let names = names();
        assert!(names.contains(&"wind_turbine".to_string()));
        assert!(names.contains(&"classic_loads".to_string()));
    }

    #[test]
    fn test_every_demo_aggregates_cleanly() {
        for name in names() {
            let graph = load_graph(&get(&name).unwrap()).unwrap();
            let report = aggregate(&graph).unwrap();
            assert!(report.all_valid(), "demo '{}' has invalid edges", name);
        }
    }

    #[test]
    fn test_unknown_demo() {
        let err = get("no_such_demo").unwrap_err();
        assert!(err.to_string().contains("wind_turbine"));
    }

    #[test]
    fn test_name_with_extension() {
        assert!(get("wind_turbine.json").is_ok());
    }
}
