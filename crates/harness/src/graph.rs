//! Composition graph validation
//!
//! Runs once, before any scenario: every declared dependency must name a
//! registered fixture, and the dependency graph must be acyclic. Both are
//! fatal configuration errors, not per-scenario runtime errors.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::fixture::FixtureRegistry;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Validate the registry's dependency graph
pub fn validate(registry: &FixtureRegistry) -> Result<()> {
    let names = registry.names();

    for name in &names {
        let Some(def) = registry.get(name) else {
            continue;
        };
        for dep in &def.deps {
            if !registry.contains(dep) {
                return Err(Error::Config(format!(
                    "fixture '{}' depends on undeclared fixture '{}'",
                    name, dep
                )));
            }
        }
    }

    let mut marks: HashMap<&str, Mark> = names.iter().map(|n| (*n, Mark::Unvisited)).collect();
    let mut path: Vec<String> = Vec::new();

    for name in &names {
        visit(registry, name, &mut marks, &mut path)?;
    }

    Ok(())
}

fn visit<'a>(
    registry: &'a FixtureRegistry,
    name: &'a str,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<String>,
) -> Result<()> {
    match marks.get(name).copied().unwrap_or(Mark::Unvisited) {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            let mut chain: Vec<String> = path.clone();
            chain.push(name.to_string());
            // Trim the chain to the cycle itself
            if let Some(start) = chain.iter().position(|n| n == name) {
                chain.drain(..start);
            }
            return Err(Error::DependencyCycle(chain.join(" -> ")));
        }
        Mark::Unvisited => {}
    }

    marks.insert(name, Mark::InProgress);
    path.push(name.to_string());

    if let Some(def) = registry.get(name) {
        for dep in &def.deps {
            visit(registry, dep, marks, path)?;
        }
    }

    path.pop();
    marks.insert(name, Mark::Done);
    Ok(())
}
