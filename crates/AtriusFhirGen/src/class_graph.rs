//! Resolution of the derives-from graph.
//!
//! After building, every class must derive (transitively) from a hand-written class
//! and every property must be typed with something resolvable. Classes that fail the
//! second check are pruned together with everything that depends on them; the
//! survivors are put into render order, a breadth-first walk from the abstract roots.

use crate::class_model::{ClassDefinition, ClassRegistry};
use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Result, StructuralError};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info};

/// Outcome of [`resolve`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GraphReport {
    /// Classes removed because they (or something they depend on) could not be resolved.
    pub pruned: Vec<String>,
}

/// Validates inheritance, prunes unresolvable classes and reorders the registry so
/// every class comes after its superclass.
pub fn resolve(registry: &mut ClassRegistry, config: &GeneratorConfig) -> Result<GraphReport> {
    check_superclasses(registry)?;
    detect_inheritance_cycles(registry)?;
    let pruned = prune_unresolvable(registry, config);
    let order = render_order(registry, config)?;
    registry.reorder(&order);
    info!(
        "Resolved {} classes, pruned {}",
        registry.len(),
        pruned.len()
    );
    Ok(GraphReport { pruned })
}

/// A superclass must be a registered class, a manual class, or a class dropped for
/// structural reasons (handled by pruning). Anything else aborts the run.
fn check_superclasses(registry: &ClassRegistry) -> Result<()> {
    for class in registry.classes() {
        let Some(superclass) = class.superclass.as_deref() else {
            return Err(GeneratorError::UnresolvedSuperclass {
                class: class.name.clone(),
                superclass: "(none)".to_string(),
            });
        };
        if !registry.contains(superclass)
            && !registry.is_manual_class(superclass)
            && !registry.was_dropped(superclass)
        {
            return Err(GeneratorError::UnresolvedSuperclass {
                class: class.name.clone(),
                superclass: superclass.to_string(),
            });
        }
    }
    Ok(())
}

/// Walks each superclass chain; revisiting a class within one chain is a cycle.
fn detect_inheritance_cycles(registry: &ClassRegistry) -> Result<()> {
    let mut acyclic: HashSet<&str> = HashSet::new();
    for class in registry.classes() {
        let mut chain: Vec<&str> = Vec::new();
        let mut current = Some(class);
        while let Some(c) = current {
            if acyclic.contains(c.name.as_str()) {
                break;
            }
            if let Some(start) = chain.iter().position(|n| *n == c.name) {
                let mut classes: Vec<String> = chain[start..].iter().map(|n| n.to_string()).collect();
                classes.push(c.name.clone());
                return Err(GeneratorError::InheritanceCycle { classes });
            }
            chain.push(c.name.as_str());
            current = c.superclass.as_deref().and_then(|s| registry.get(s));
        }
        acyclic.extend(chain);
    }
    Ok(())
}

fn is_resolvable_type(
    registry: &ClassRegistry,
    config: &GeneratorConfig,
    alive: &HashSet<usize>,
    fhir_type: &str,
    type_name: &str,
) -> bool {
    registry.is_primitive_type(fhir_type)
        || registry.is_manual_class(fhir_type)
        || registry.is_manual_class(type_name)
        || config.is_native(type_name)
        || registry.index_of(type_name).is_some_and(|i| alive.contains(&i))
}

fn first_problem(
    registry: &ClassRegistry,
    config: &GeneratorConfig,
    alive: &HashSet<usize>,
    class: &ClassDefinition,
) -> Option<String> {
    if let Some(superclass) = class.superclass.as_deref() {
        let superclass_alive = registry
            .index_of(superclass)
            .is_some_and(|i| alive.contains(&i));
        if !superclass_alive && !registry.is_manual_class(superclass) {
            return Some(format!("superclass '{}' was dropped", superclass));
        }
    }
    class
        .properties
        .iter()
        .find(|p| !is_resolvable_type(registry, config, alive, &p.fhir_type, &p.type_name))
        .map(|p| {
            if registry.was_dropped(&p.type_name) || registry.contains(&p.type_name) {
                format!(
                    "property '{}' depends on dropped class '{}'",
                    p.name, p.type_name
                )
            } else {
                format!(
                    "property '{}' has unresolvable type '{}'",
                    p.name, p.fhir_type
                )
            }
        })
}

/// Removes classes until every survivor only refers to resolvable types.
fn prune_unresolvable(registry: &mut ClassRegistry, config: &GeneratorConfig) -> Vec<String> {
    let mut alive: HashSet<usize> = (0..registry.len()).collect();
    let mut errors = Vec::new();
    loop {
        let failing: Vec<(usize, String)> = registry
            .classes()
            .iter()
            .enumerate()
            .filter(|(i, _)| alive.contains(i))
            .filter_map(|(i, class)| {
                first_problem(registry, config, &alive, class).map(|message| (i, message))
            })
            .collect();
        if failing.is_empty() {
            break;
        }
        for (i, message) in failing {
            alive.remove(&i);
            let class = &registry.classes()[i];
            errors.push(
                StructuralError::new(class.name.clone(), message)
                    .in_document(class.document.clone()),
            );
        }
    }

    let pruned: Vec<String> = errors.iter().map(|e| e.class.clone()).collect();
    for name in &pruned {
        registry.mark_dropped(name);
    }
    for error in errors {
        registry.record(error);
    }
    registry.retain_indices(&alive);
    pruned
}

/// Breadth-first walk down the derives-from graph, starting at the two abstract
/// roots and then any other manual class something derives from.
fn render_order(registry: &ClassRegistry, config: &GeneratorConfig) -> Result<Vec<usize>> {
    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, class) in registry.classes().iter().enumerate() {
        if let Some(superclass) = class.superclass.as_deref() {
            children.entry(superclass).or_default().push(i);
        }
    }

    let mut starts: Vec<String> = config.roots();
    for profile in &config.manual_profiles {
        for name in &profile.contains {
            if !starts.contains(name) {
                starts.push(name.clone());
            }
        }
    }

    let mut order = Vec::with_capacity(registry.len());
    let mut visited = vec![false; registry.len()];
    let mut queue: VecDeque<&str> = VecDeque::new();
    for start in &starts {
        queue.push_back(start.as_str());
        while let Some(current) = queue.pop_front() {
            for &child in children.get(current).map(Vec::as_slice).unwrap_or(&[]) {
                if !visited[child] {
                    visited[child] = true;
                    order.push(child);
                    queue.push_back(registry.classes()[child].name.as_str());
                }
            }
        }
    }

    if let Some(missed) = visited.iter().position(|v| !v) {
        let class = &registry.classes()[missed];
        return Err(GeneratorError::UnresolvedSuperclass {
            class: class.name.clone(),
            superclass: class.superclass.clone().unwrap_or_default(),
        });
    }
    debug!("Render order has {} classes", order.len());
    Ok(order)
}
