use crate::helpers::*;
use trellis::Error;
use trellis::attrs::{PermissionLevel, Visibility};
use trellis::events::TreeEvent;
use trellis::facade::Decision;
use trellis::path::AccountId;

#[test]
fn test_move_preserves_subtree_shape() {
    let (trellis, owner) = setup_facade();
    let (root, child, grandchild) = setup_chain(&trellis, owner);
    let dest = trellis.create_root("dest", owner).unwrap();

    let outcome = trellis
        .move_subtree(&child.id, Some(&dest.id), owner)
        .unwrap();
    assert_eq!(outcome.moved_paths.len(), 2);

    // Every node keeps its position relative to the moved root.
    let moved_child = trellis.item(&child.id).unwrap();
    let moved_grandchild = trellis.item(&grandchild.id).unwrap();
    assert_eq!(moved_child.path, dest.path.child(child.id));
    assert_eq!(moved_grandchild.path, moved_child.path.child(grandchild.id));
    assert!(moved_grandchild.path.is_strict_descendant_of(&moved_child.path));
    assert!(moved_grandchild.path.is_strict_descendant_of(&dest.path));
    assert!(!moved_grandchild.path.is_strict_descendant_of(&root.path));

    // The old parent no longer sees the subtree.
    assert!(trellis.descendants_of(&root.id).unwrap().is_empty());
}

#[test]
fn test_move_rejects_cycles_and_leaves_tree_unchanged() {
    let (trellis, owner) = setup_facade();
    let (_, child, grandchild) = setup_chain(&trellis, owner);

    // Into a strict descendant.
    assert!(matches!(
        trellis.move_subtree(&child.id, Some(&grandchild.id), owner),
        Err(Error::CycleDetected)
    ));
    // Under itself.
    assert!(matches!(
        trellis.move_subtree(&child.id, Some(&child.id), owner),
        Err(Error::CycleDetected)
    ));

    // Nothing moved.
    assert_eq!(trellis.item(&child.id).unwrap().path, child.path);
    assert_eq!(trellis.item(&grandchild.id).unwrap().path, grandchild.path);
}

#[test]
fn test_move_to_top_level() {
    let (trellis, owner) = setup_facade();
    let (_, child, grandchild) = setup_chain(&trellis, owner);

    trellis.move_subtree(&child.id, None, owner).unwrap();
    let promoted = trellis.item(&child.id).unwrap();
    assert!(promoted.path.is_root());
    assert_eq!(
        trellis.item(&grandchild.id).unwrap().path,
        promoted.path.child(grandchild.id)
    );
}

#[test]
fn test_move_under_current_parent_is_noop() {
    let (trellis, owner) = setup_facade();
    let (root, child, _) = setup_chain(&trellis, owner);

    let outcome = trellis
        .move_subtree(&child.id, Some(&root.id), owner)
        .unwrap();
    assert!(outcome.moved_paths.is_empty());
    assert_eq!(trellis.item(&child.id).unwrap().path, child.path);
}

#[test]
fn test_move_carries_attribute_rows() {
    let (trellis, owner) = setup_facade();
    let (_, child, grandchild) = setup_chain(&trellis, owner);
    let dest = trellis.create_root("dest", owner).unwrap();
    let bob = AccountId::new();

    trellis
        .grant_membership(&child.path, bob, PermissionLevel::Write, owner)
        .unwrap();
    trellis
        .set_visibility(&child.path, Visibility::Hidden, owner)
        .unwrap();

    trellis
        .move_subtree(&child.id, Some(&dest.id), owner)
        .unwrap();

    // Rows resolved against the new paths, not the old ones.
    let new_grandchild_path = trellis.item(&grandchild.id).unwrap().path;
    assert_eq!(
        trellis
            .check_permission(&new_grandchild_path, &bob, PermissionLevel::Write)
            .unwrap(),
        Decision::Allow
    );
    assert_eq!(
        trellis.effective_visibility(&new_grandchild_path).unwrap(),
        Some(Visibility::Hidden)
    );
}

#[test]
fn test_move_aborts_on_conflicting_inherited_attribute() {
    let (trellis, owner) = setup_facade();
    let (_, child, _) = setup_chain(&trellis, owner);
    let dest = trellis.create_root("dest", owner).unwrap();

    trellis
        .set_visibility(&child.path, Visibility::Hidden, owner)
        .unwrap();
    trellis
        .set_visibility(&dest.path, Visibility::Public, owner)
        .unwrap();

    assert!(matches!(
        trellis.move_subtree(&child.id, Some(&dest.id), owner),
        Err(Error::ConflictingInheritedAttribute(_))
    ));
    // Validation failed before any write: the subtree is where it was.
    assert_eq!(trellis.item(&child.id).unwrap().path, child.path);
}

#[test]
fn test_move_allows_same_kind_visibility_at_destination() {
    let (trellis, owner) = setup_facade();
    let (_, child, _) = setup_chain(&trellis, owner);
    let dest = trellis.create_root("dest", owner).unwrap();

    trellis
        .set_visibility(&child.path, Visibility::Hidden, owner)
        .unwrap();
    trellis
        .set_visibility(&dest.path, Visibility::Hidden, owner)
        .unwrap();

    trellis
        .move_subtree(&child.id, Some(&dest.id), owner)
        .unwrap();
    let moved = trellis.item(&child.id).unwrap();
    assert!(moved.path.is_strict_descendant_of(&dest.path));
}

#[test]
fn test_move_requires_admin_on_source() {
    let (trellis, owner) = setup_facade();
    let (_, child, _) = setup_chain(&trellis, owner);
    let dest = trellis.create_root("dest", owner).unwrap();
    let bob = AccountId::new();

    trellis
        .grant_membership(&child.path, bob, PermissionLevel::Write, owner)
        .unwrap();
    assert!(matches!(
        trellis.move_subtree(&child.id, Some(&dest.id), bob),
        Err(Error::PermissionDenied(_))
    ));
}

#[test]
fn test_delete_subtree_cascades() {
    let (trellis, owner) = setup_facade();
    let (root, child, grandchild) = setup_chain(&trellis, owner);

    trellis
        .set_visibility(&grandchild.path, Visibility::Hidden, owner)
        .unwrap();

    let outcome = trellis.delete_subtree(&child.id, owner).unwrap();
    assert_eq!(outcome.removed_paths.len(), 2);

    assert!(matches!(trellis.item(&child.id), Err(Error::NotFound)));
    assert!(matches!(trellis.item(&grandchild.id), Err(Error::NotFound)));
    assert!(trellis.descendants_of(&root.id).unwrap().is_empty());

    // The grandchild's visibility row went with it: the root chain is free
    // to take a fresh mark of the opposite kind.
    trellis
        .set_visibility(&root.path, Visibility::Public, owner)
        .unwrap();
}

#[test]
fn test_copy_subtree_mints_fresh_ids_and_rows() {
    let (trellis, owner) = setup_facade();
    let (_, child, grandchild) = setup_chain(&trellis, owner);
    let dest = trellis.create_root("dest", owner).unwrap();
    let bob = AccountId::new();

    trellis
        .grant_membership(&child.path, bob, PermissionLevel::Read, owner)
        .unwrap();

    let outcome = trellis
        .copy_subtree(&child.id, Some(&dest.id), owner)
        .unwrap();
    assert_eq!(outcome.copied_paths.len(), 2);
    assert_ne!(outcome.root.id, child.id);
    assert_eq!(outcome.root.name, child.name);
    assert_eq!(outcome.root.path.parent().unwrap(), dest.path);

    // The source is untouched.
    assert_eq!(trellis.item(&child.id).unwrap().path, child.path);
    assert_eq!(trellis.item(&grandchild.id).unwrap().path, grandchild.path);

    // The copied membership row governs the copy.
    let copies = trellis.descendants_of(&dest.id).unwrap();
    assert_eq!(copies.len(), 2);
    assert_eq!(
        trellis
            .check_permission(&outcome.root.path, &bob, PermissionLevel::Read)
            .unwrap(),
        Decision::Allow
    );
}

#[test]
fn test_copy_rechecks_destination_conflicts() {
    let (trellis, owner) = setup_facade();
    let (_, child, _) = setup_chain(&trellis, owner);
    let dest = trellis.create_root("dest", owner).unwrap();

    trellis
        .set_visibility(&child.path, Visibility::Hidden, owner)
        .unwrap();
    trellis
        .set_visibility(&dest.path, Visibility::Public, owner)
        .unwrap();

    assert!(matches!(
        trellis.copy_subtree(&child.id, Some(&dest.id), owner),
        Err(Error::ConflictingInheritedAttribute(_))
    ));
}

#[test]
fn test_mutation_events_are_emitted() {
    let (trellis, notifier, owner) = setup_facade_with_events();
    let (_, child, _) = setup_chain(&trellis, owner);
    let dest = trellis.create_root("dest", owner).unwrap();

    trellis
        .move_subtree(&child.id, Some(&dest.id), owner)
        .unwrap();
    trellis.copy_subtree(&child.id, None, owner).unwrap();
    trellis.delete_subtree(&child.id, owner).unwrap();

    let events = notifier.take();
    assert_eq!(events.len(), 3);
    match &events[0] {
        TreeEvent::SubtreeMoved { moved_paths } => {
            assert_eq!(moved_paths.len(), 2);
            assert_eq!(moved_paths[0].0, child.path);
            assert_eq!(moved_paths[0].1, dest.path.child(child.id));
        }
        other => panic!("Expected SubtreeMoved, got {other:?}"),
    }
    assert!(matches!(events[1], TreeEvent::SubtreeCopied { .. }));
    match &events[2] {
        TreeEvent::SubtreeDeleted { removed_paths } => {
            assert_eq!(removed_paths.len(), 2);
        }
        other => panic!("Expected SubtreeDeleted, got {other:?}"),
    }
}
