use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::UpgradeError;
use crate::wizard::UpgradeWizard;

/// Reject duplicate identifiers across the registry.
pub fn check_unique(wizards: &[Box<dyn UpgradeWizard>]) -> Result<(), UpgradeError> {
    let mut seen = HashSet::new();
    for wizard in wizards {
        if !seen.insert(wizard.identifier()) {
            return Err(UpgradeError::DuplicateIdentifier(wizard.identifier().to_string()));
        }
    }
    Ok(())
}

/// Indices of the selected wizards in declaration order. An empty selection
/// picks every wizard.
pub fn select<S: AsRef<str>>(
    wizards: &[Box<dyn UpgradeWizard>],
    selection: &[S],
) -> Result<Vec<usize>, UpgradeError> {
    if selection.is_empty() {
        return Ok((0..wizards.len()).collect());
    }
    let wanted: HashSet<&str> = selection.iter().map(AsRef::as_ref).collect();
    for identifier in &wanted {
        if !wizards.iter().any(|w| w.identifier() == *identifier) {
            return Err(UpgradeError::UnknownWizard((*identifier).to_string()));
        }
    }
    Ok(wizards
        .iter()
        .enumerate()
        .filter(|(_, w)| wanted.contains(w.identifier()))
        .map(|(idx, _)| idx)
        .collect())
}

/// Stable topological order of `selected` over `run_after` edges.
///
/// Among wizards that are ready at the same time, the one declared first
/// goes first. Edges to wizards outside the selection are ignored.
pub fn execution_order(
    wizards: &[Box<dyn UpgradeWizard>],
    selected: &[usize],
) -> Result<Vec<usize>, UpgradeError> {
    let position: HashMap<&str, usize> = selected
        .iter()
        .map(|&idx| (wizards[idx].identifier(), idx))
        .collect();

    let mut indegree: HashMap<usize, usize> = selected.iter().map(|&idx| (idx, 0)).collect();
    let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();
    for &idx in selected {
        let mut seen = HashSet::new();
        for before in wizards[idx].run_after() {
            if let Some(&dep) = position.get(before) {
                if dep != idx && seen.insert(dep) {
                    dependents.entry(dep).or_default().push(idx);
                    *indegree.entry(idx).or_default() += 1;
                }
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(&idx, _)| Reverse(idx))
        .collect();
    let mut order = Vec::with_capacity(selected.len());
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        for &next in dependents.get(&idx).into_iter().flatten() {
            if let Some(degree) = indegree.get_mut(&next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(next));
                }
            }
        }
    }

    if order.len() < selected.len() {
        let mut stuck: Vec<usize> = indegree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(idx, _)| idx)
            .collect();
        stuck.sort_unstable();
        return Err(UpgradeError::DependencyCycle(
            stuck
                .into_iter()
                .map(|idx| wizards[idx].identifier().to_string())
                .collect(),
        ));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedWizard;

    fn ids(wizards: &[Box<dyn UpgradeWizard>], order: &[usize]) -> Vec<&'static str> {
        order.iter().map(|&idx| wizards[idx].identifier()).collect()
    }

    #[test]
    fn declaration_order_without_edges() {
        let wizards: Vec<Box<dyn UpgradeWizard>> = vec![
            Box::new(ScriptedWizard::new("a")),
            Box::new(ScriptedWizard::new("b")),
            Box::new(ScriptedWizard::new("c")),
        ];
        let order = execution_order(&wizards, &[0, 1, 2]).unwrap();
        assert_eq!(ids(&wizards, &order), ["a", "b", "c"]);
    }

    #[test]
    fn run_after_moves_dependents_back() {
        let wizards: Vec<Box<dyn UpgradeWizard>> = vec![
            Box::new(ScriptedWizard::new("media").after(&["text", "image"])),
            Box::new(ScriptedWizard::new("text")),
            Box::new(ScriptedWizard::new("image")),
            Box::new(ScriptedWizard::new("dedupe")),
        ];
        let order = execution_order(&wizards, &[0, 1, 2, 3]).unwrap();
        assert_eq!(ids(&wizards, &order), ["text", "image", "dedupe", "media"]);
    }

    #[test]
    fn edges_outside_selection_are_ignored() {
        let wizards: Vec<Box<dyn UpgradeWizard>> = vec![
            Box::new(ScriptedWizard::new("media").after(&["text", "missing"])),
            Box::new(ScriptedWizard::new("text")),
        ];
        let order = execution_order(&wizards, &[0]).unwrap();
        assert_eq!(ids(&wizards, &order), ["media"]);
    }

    #[test]
    fn cycles_are_reported() {
        let wizards: Vec<Box<dyn UpgradeWizard>> = vec![
            Box::new(ScriptedWizard::new("a").after(&["b"])),
            Box::new(ScriptedWizard::new("b").after(&["a"])),
            Box::new(ScriptedWizard::new("c")),
        ];
        let err = execution_order(&wizards, &[0, 1, 2]).unwrap_err();
        assert_eq!(err, UpgradeError::DependencyCycle(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn selection_is_validated() {
        let wizards: Vec<Box<dyn UpgradeWizard>> = vec![
            Box::new(ScriptedWizard::new("a")),
            Box::new(ScriptedWizard::new("b")),
        ];
        assert_eq!(select(&wizards, &["b", "a"]).unwrap(), vec![0, 1]);
        assert_eq!(select::<&str>(&wizards, &[]).unwrap(), vec![0, 1]);
        assert_eq!(
            select(&wizards, &["nope"]).unwrap_err(),
            UpgradeError::UnknownWizard("nope".into())
        );
    }

    #[test]
    fn duplicates_are_rejected() {
        let wizards: Vec<Box<dyn UpgradeWizard>> = vec![
            Box::new(ScriptedWizard::new("a")),
            Box::new(ScriptedWizard::new("a")),
        ];
        assert_eq!(
            check_unique(&wizards).unwrap_err(),
            UpgradeError::DuplicateIdentifier("a".into())
        );
    }
}
