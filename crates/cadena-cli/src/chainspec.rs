//! Effect-chain specifications.
//!
//! The inline grammar is `name[:arg[,arg...]]` joined with `|`:
//!
//! ```text
//! vol:0.5|trim:10,5|rate
//! ```
//!
//! A chain can also come from a TOML file:
//!
//! ```toml
//! [[effect]]
//! name = "vol"
//! args = ["0.5"]
//!
//! [[effect]]
//! name = "rate"
//! args = ["8000"]
//! ```

use anyhow::Context;
use cadena_engine::EffectRequest;
use serde::Deserialize;
use std::path::Path;

/// Parse an inline chain specification.
pub fn parse_chain(spec: &str) -> Result<Vec<EffectRequest>, String> {
    let mut requests = Vec::new();
    for effect_spec in spec.split('|') {
        let effect_spec = effect_spec.trim();
        if effect_spec.is_empty() {
            continue;
        }
        let (name, args) = match effect_spec.split_once(':') {
            Some((name, args)) => (
                name.trim(),
                args.split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect(),
            ),
            None => (effect_spec, Vec::new()),
        };
        if name.is_empty() {
            return Err(format!("empty effect name in `{effect_spec}`"));
        }
        requests.push(EffectRequest {
            name: name.to_string(),
            args,
        });
    }
    Ok(requests)
}

#[derive(Debug, Deserialize)]
struct ChainFile {
    #[serde(default)]
    effect: Vec<ChainEntry>,
}

#[derive(Debug, Deserialize)]
struct ChainEntry {
    name: String,
    #[serde(default)]
    args: Vec<String>,
}

/// Load a chain from a TOML file.
pub fn load_chain_file(path: &Path) -> anyhow::Result<Vec<EffectRequest>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("can't read effects file `{}`", path.display()))?;
    let file: ChainFile = toml::from_str(&text)
        .with_context(|| format!("can't parse effects file `{}`", path.display()))?;
    Ok(file
        .effect
        .into_iter()
        .map(|e| EffectRequest {
            name: e.name,
            args: e.args,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_effect_no_args() {
        let chain = parse_chain("reverse").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].name, "reverse");
        assert!(chain[0].args.is_empty());
    }

    #[test]
    fn chain_with_args() {
        let chain = parse_chain("vol:0.5|trim:10,5|rate:8000").unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].args, vec!["0.5"]);
        assert_eq!(chain[1].args, vec!["10", "5"]);
        assert_eq!(chain[2].args, vec!["8000"]);
    }

    #[test]
    fn whitespace_is_tolerated() {
        let chain = parse_chain(" vol : 2.0 | trim : 1 , 2 ").unwrap();
        assert_eq!(chain[0].name, "vol");
        assert_eq!(chain[0].args, vec!["2.0"]);
        assert_eq!(chain[1].args, vec!["1", "2"]);
    }

    #[test]
    fn empty_segments_are_skipped() {
        let chain = parse_chain("vol:0.5||").unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn chain_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chain.toml");
        std::fs::write(
            &path,
            r#"
[[effect]]
name = "vol"
args = ["0.5"]

[[effect]]
name = "reverse"
"#,
        )
        .unwrap();

        let chain = load_chain_file(&path).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].name, "vol");
        assert_eq!(chain[1].name, "reverse");
        assert!(chain[1].args.is_empty());
    }

    #[test]
    fn bad_toml_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chain.toml");
        std::fs::write(&path, "not toml [[").unwrap();
        assert!(load_chain_file(&path).is_err());
    }
}
