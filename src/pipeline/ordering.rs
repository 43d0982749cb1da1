//! Stage ordering within one origin.
//!
//! Orders are dense and zero-based: after any operation here the stages of
//! an origin carry `0..n` with no gaps or repeats. The functions are pure;
//! the service layer loads the current stages, computes the new orders and
//! writes them in one store call.

use std::collections::HashSet;
use uuid::Uuid;

use crate::core::shared::error::CrmError;
use crate::core::shared::models::Stage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderingError {
    #[error("stage {0} does not belong to this origin")]
    UnknownStage(Uuid),
    #[error("stage {0} appears more than once")]
    DuplicateStage(Uuid),
    #[error("{0} stage(s) of this origin are missing from the new order")]
    MissingStages(usize),
    #[error("index {index} is out of range for {len} stage(s)")]
    IndexOutOfRange { index: usize, len: usize },
}

impl From<OrderingError> for CrmError {
    fn from(err: OrderingError) -> Self {
        CrmError::InvalidInput(err.to_string())
    }
}

/// Maps `ordered_ids` to `(id, index)` pairs. The ids must be exactly the
/// ids of `current`, each once.
pub fn assign_order(current: &[Stage], ordered_ids: &[Uuid]) -> Result<Vec<(Uuid, i32)>, OrderingError> {
    let known: HashSet<Uuid> = current.iter().map(|s| s.id).collect();
    let mut seen = HashSet::with_capacity(ordered_ids.len());

    for id in ordered_ids {
        if !known.contains(id) {
            return Err(OrderingError::UnknownStage(*id));
        }
        if !seen.insert(*id) {
            return Err(OrderingError::DuplicateStage(*id));
        }
    }
    if seen.len() != known.len() {
        return Err(OrderingError::MissingStages(known.len() - seen.len()));
    }

    Ok(ordered_ids
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index as i32))
        .collect())
}

/// Stage ids sorted by current order, ties broken by id.
pub fn ordered_ids(stages: &[Stage]) -> Vec<Uuid> {
    let mut sorted: Vec<&Stage> = stages.iter().collect();
    sorted.sort_by(|a, b| a.order_num.cmp(&b.order_num).then(a.id.cmp(&b.id)));
    sorted.into_iter().map(|s| s.id).collect()
}

/// Drag-and-drop splice: takes `stage_id` out of `ids` and reinserts it at
/// `to_index`.
pub fn move_to_index(ids: &[Uuid], stage_id: Uuid, to_index: usize) -> Result<Vec<Uuid>, OrderingError> {
    let from = ids
        .iter()
        .position(|id| *id == stage_id)
        .ok_or(OrderingError::UnknownStage(stage_id))?;
    if to_index >= ids.len() {
        return Err(OrderingError::IndexOutOfRange {
            index: to_index,
            len: ids.len(),
        });
    }

    let mut moved = ids.to_vec();
    let id = moved.remove(from);
    moved.insert(to_index, id);
    Ok(moved)
}

/// Dense renumbering that keeps the relative order of `stages`.
pub fn compact(stages: &[Stage]) -> Vec<(Uuid, i32)> {
    ordered_ids(stages)
        .into_iter()
        .enumerate()
        .map(|(index, id)| (id, index as i32))
        .collect()
}

pub fn next_order(stages: &[Stage]) -> i32 {
    stages.iter().map(|s| s.order_num + 1).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages(n: usize) -> Vec<Stage> {
        let origin_id = Uuid::new_v4();
        (0..n)
            .map(|i| Stage {
                id: Uuid::new_v4(),
                origin_id,
                name: format!("Stage {i}"),
                color: "#3B82F6".into(),
                order_num: i as i32,
            })
            .collect()
    }

    #[test]
    fn test_assign_order_follows_supplied_sequence() {
        let current = stages(3);
        let wanted = vec![current[2].id, current[0].id, current[1].id];

        let orders = assign_order(&current, &wanted).unwrap();
        assert_eq!(
            orders,
            vec![(current[2].id, 0), (current[0].id, 1), (current[1].id, 2)]
        );
    }

    #[test]
    fn test_assign_order_rejects_mismatched_sets() {
        let current = stages(3);
        let foreign = Uuid::new_v4();

        assert_eq!(
            assign_order(&current, &[current[0].id, current[1].id]),
            Err(OrderingError::MissingStages(1))
        );
        assert_eq!(
            assign_order(&current, &[current[0].id, current[1].id, foreign]),
            Err(OrderingError::UnknownStage(foreign))
        );
        assert_eq!(
            assign_order(&current, &[current[0].id, current[0].id, current[1].id]),
            Err(OrderingError::DuplicateStage(current[0].id))
        );
    }

    #[test]
    fn test_move_to_index() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

        let moved = move_to_index(&ids, ids[0], 2).unwrap();
        assert_eq!(moved, vec![ids[1], ids[2], ids[0], ids[3]]);

        let moved = move_to_index(&ids, ids[3], 0).unwrap();
        assert_eq!(moved, vec![ids[3], ids[0], ids[1], ids[2]]);

        assert_eq!(move_to_index(&ids, ids[1], 1).unwrap(), ids);
        assert!(matches!(
            move_to_index(&ids, ids[1], 4),
            Err(OrderingError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_compact_closes_gaps() {
        let mut current = stages(3);
        current[0].order_num = 7;
        current[1].order_num = 2;
        current[2].order_num = 5;

        let orders = compact(&current);
        assert_eq!(
            orders,
            vec![(current[1].id, 0), (current[2].id, 1), (current[0].id, 2)]
        );
    }

    #[test]
    fn test_next_order() {
        assert_eq!(next_order(&[]), 0);
        assert_eq!(next_order(&stages(3)), 3);
    }
}
