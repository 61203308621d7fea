use crate::helpers::*;
use trellis::Error;
use trellis::attrs::{AuthType, PermissionLevel, SchemaStatus, Visibility};
use trellis::facade::{Decision, DenyReason};
use trellis::path::AccountId;

#[test]
fn test_closest_wins_worked_example() {
    // Root R (Admin: alice); child C under R (Write: bob); grandchild G
    // under C.
    let (trellis, owner) = setup_facade();
    let (root, child, grandchild) = setup_chain(&trellis, owner);
    let alice = AccountId::new();
    let bob = AccountId::new();

    trellis
        .grant_membership(&root.path, alice, PermissionLevel::Admin, owner)
        .unwrap();
    trellis
        .grant_membership(&child.path, bob, PermissionLevel::Write, owner)
        .unwrap();

    // bob reads G via the grant on C.
    assert_eq!(
        trellis
            .check_permission(&grandchild.path, &bob, PermissionLevel::Read)
            .unwrap(),
        Decision::Allow
    );
    // alice reads G via R, since no closer row for alice exists.
    assert_eq!(
        trellis
            .check_permission(&grandchild.path, &alice, PermissionLevel::Read)
            .unwrap(),
        Decision::Allow
    );
    assert_eq!(
        trellis
            .check_permission(&grandchild.path, &alice, PermissionLevel::Admin)
            .unwrap(),
        Decision::Allow
    );

    // Add Read: alice directly on C; closest-wins now caps alice at Read on
    // G, regardless of the Admin grant higher up.
    trellis
        .grant_membership(&child.path, alice, PermissionLevel::Read, owner)
        .unwrap();
    assert_eq!(
        trellis
            .check_permission(&grandchild.path, &alice, PermissionLevel::Admin)
            .unwrap(),
        Decision::Deny(DenyReason::InsufficientLevel {
            held: PermissionLevel::Read
        })
    );
    assert_eq!(
        trellis
            .check_permission(&grandchild.path, &alice, PermissionLevel::Read)
            .unwrap(),
        Decision::Allow
    );
    // On R itself alice still holds Admin.
    assert_eq!(
        trellis
            .check_permission(&root.path, &alice, PermissionLevel::Admin)
            .unwrap(),
        Decision::Allow
    );
}

#[test]
fn test_creator_holds_admin_until_a_row_governs() {
    let (trellis, owner) = setup_facade();
    let (_, child, grandchild) = setup_chain(&trellis, owner);

    // The creator acts as Admin over the whole subtree with no rows at all.
    assert_eq!(
        trellis
            .check_permission(&grandchild.path, &owner, PermissionLevel::Admin)
            .unwrap(),
        Decision::Allow
    );

    // A membership row takes precedence over ownership: a closer Read grant
    // caps the creator too.
    trellis
        .grant_membership(&child.path, owner, PermissionLevel::Read, owner)
        .unwrap();
    assert_eq!(
        trellis
            .check_permission(&grandchild.path, &owner, PermissionLevel::Admin)
            .unwrap(),
        Decision::Deny(DenyReason::InsufficientLevel {
            held: PermissionLevel::Read
        })
    );
}

#[test]
fn test_stranger_is_denied_without_membership() {
    let (trellis, owner) = setup_facade();
    let (_, _, grandchild) = setup_chain(&trellis, owner);
    let mallory = AccountId::new();

    assert_eq!(
        trellis
            .check_permission(&grandchild.path, &mallory, PermissionLevel::Read)
            .unwrap(),
        Decision::Deny(DenyReason::NoMembership)
    );
}

#[test]
fn test_check_permission_unknown_path_is_not_found() {
    let (trellis, owner) = setup_facade();
    let other = trellis.create_root("other", owner).unwrap();
    trellis.delete_subtree(&other.id, owner).unwrap();

    assert!(matches!(
        trellis.check_permission(&other.path, &owner, PermissionLevel::Read),
        Err(Error::NotFound)
    ));
}

#[test]
fn test_attribute_writes_require_admin() {
    let (trellis, owner) = setup_facade();
    let (root, child, _) = setup_chain(&trellis, owner);
    let bob = AccountId::new();
    let mallory = AccountId::new();

    trellis
        .grant_membership(&root.path, bob, PermissionLevel::Write, owner)
        .unwrap();

    // Write is not enough to manage attributes.
    assert!(matches!(
        trellis.grant_membership(&child.path, mallory, PermissionLevel::Read, bob),
        Err(Error::PermissionDenied(_))
    ));
    assert!(matches!(
        trellis.set_visibility(&child.path, Visibility::Hidden, bob),
        Err(Error::PermissionDenied(_))
    ));
    // A stranger cannot touch anything.
    assert!(matches!(
        trellis.set_login_schema(
            &child.path,
            AuthType::Username,
            SchemaStatus::Active,
            mallory
        ),
        Err(Error::PermissionDenied(_))
    ));
    // An admin of an ancestor can.
    trellis
        .update_membership_level(&root.path, &bob, PermissionLevel::Admin, owner)
        .unwrap();
    trellis
        .grant_membership(&child.path, mallory, PermissionLevel::Read, bob)
        .unwrap();
}

#[test]
fn test_create_child_requires_write_on_parent() {
    let (trellis, owner) = setup_facade();
    let (root, _, _) = setup_chain(&trellis, owner);
    let reader = AccountId::new();

    trellis
        .grant_membership(&root.path, reader, PermissionLevel::Read, owner)
        .unwrap();
    assert!(matches!(
        trellis.create_child(&root.id, "blocked", reader),
        Err(Error::PermissionDenied(_))
    ));

    trellis
        .update_membership_level(&root.path, &reader, PermissionLevel::Write, owner)
        .unwrap();
    let created = trellis.create_child(&root.id, "allowed", reader).unwrap();
    assert_eq!(created.created_by, reader);
}

#[test]
fn test_visibility_inheritance_and_conflicts() {
    let (trellis, owner) = setup_facade();
    let (root, child, grandchild) = setup_chain(&trellis, owner);

    assert_eq!(trellis.effective_visibility(&grandchild.path).unwrap(), None);
    assert!(!trellis.visible_to_anonymous(&grandchild.path).unwrap());

    trellis
        .set_visibility(&child.path, Visibility::Hidden, owner)
        .unwrap();
    // Existence-wins: the whole subtree under C inherits Hidden.
    assert_eq!(
        trellis.effective_visibility(&grandchild.path).unwrap(),
        Some(Visibility::Hidden)
    );
    // The root above is not covered.
    assert_eq!(trellis.effective_visibility(&root.path).unwrap(), None);

    // Public cannot appear on the same chain, above or below.
    assert!(matches!(
        trellis.set_visibility(&root.path, Visibility::Public, owner),
        Err(Error::ConflictingInheritedAttribute(_))
    ));
    assert!(matches!(
        trellis.set_visibility(&grandchild.path, Visibility::Public, owner),
        Err(Error::ConflictingInheritedAttribute(_))
    ));

    // Clearing at the origin frees the chain for a fresh mark.
    trellis.clear_visibility(&child.path, owner).unwrap();
    trellis
        .set_visibility(&root.path, Visibility::Public, owner)
        .unwrap();
    assert!(trellis.visible_to_anonymous(&grandchild.path).unwrap());

    // An inherited mark cannot be cleared at a covered node.
    assert!(matches!(
        trellis.clear_visibility(&grandchild.path, owner),
        Err(Error::ConflictingInheritedAttribute(_))
    ));
}

#[test]
fn test_login_schema_no_nesting_and_status() {
    let (trellis, owner) = setup_facade();
    let (root, child, grandchild) = setup_chain(&trellis, owner);

    trellis
        .set_login_schema(
            &child.path,
            AuthType::UsernamePassword,
            SchemaStatus::Active,
            owner,
        )
        .unwrap();

    // The descendant resolves the schema from C.
    let effective = trellis
        .effective_login_schema(&grandchild.path)
        .unwrap()
        .unwrap();
    assert_eq!(effective.path, child.path);
    assert_eq!(effective.auth_type, AuthType::UsernamePassword);

    // No nesting in either direction.
    assert!(matches!(
        trellis.set_login_schema(
            &grandchild.path,
            AuthType::Anonymous,
            SchemaStatus::Active,
            owner
        ),
        Err(Error::ConflictingInheritedAttribute(_))
    ));
    assert!(matches!(
        trellis.set_login_schema(&root.path, AuthType::Anonymous, SchemaStatus::Active, owner),
        Err(Error::ConflictingInheritedAttribute(_))
    ));

    let frozen = trellis
        .set_login_schema_status(&child.path, SchemaStatus::Freeze, owner)
        .unwrap();
    assert_eq!(frozen.status, SchemaStatus::Freeze);

    trellis.clear_login_schema(&child.path, owner).unwrap();
    assert_eq!(trellis.effective_login_schema(&grandchild.path).unwrap(), None);
}

#[test]
fn test_revoke_membership_cascades_down() {
    let (trellis, owner) = setup_facade();
    let (root, child, grandchild) = setup_chain(&trellis, owner);
    let bob = AccountId::new();

    trellis
        .grant_membership(&root.path, bob, PermissionLevel::Write, owner)
        .unwrap();
    trellis
        .grant_membership(&grandchild.path, bob, PermissionLevel::Read, owner)
        .unwrap();

    // Revoking where the grant is inherited is refused.
    assert!(matches!(
        trellis.revoke_membership(&child.path, &bob, owner),
        Err(Error::ConflictingInheritedAttribute(_))
    ));

    // Revoking at the origin clears bob's deeper override too.
    trellis.revoke_membership(&root.path, &bob, owner).unwrap();
    assert_eq!(
        trellis
            .check_permission(&grandchild.path, &bob, PermissionLevel::Read)
            .unwrap(),
        Decision::Deny(DenyReason::NoMembership)
    );
}

#[test]
fn test_purge_account_clears_all_grants() {
    let (trellis, owner) = setup_facade();
    let (root, child, _) = setup_chain(&trellis, owner);
    let other_root = trellis.create_root("other", owner).unwrap();
    let bob = AccountId::new();

    trellis
        .grant_membership(&root.path, bob, PermissionLevel::Admin, owner)
        .unwrap();
    trellis
        .grant_membership(&child.path, bob, PermissionLevel::Read, owner)
        .unwrap();
    trellis
        .grant_membership(&other_root.path, bob, PermissionLevel::Write, owner)
        .unwrap();

    assert_eq!(trellis.purge_account(&bob).unwrap(), 3);
    assert_eq!(
        trellis
            .check_permission(&root.path, &bob, PermissionLevel::Read)
            .unwrap(),
        Decision::Deny(DenyReason::NoMembership)
    );
}

#[test]
fn test_rename_and_listing() {
    let (trellis, owner) = setup_facade();
    let (root, child, grandchild) = setup_chain(&trellis, owner);

    let renamed = trellis.rename_item(&child.id, "renamed", owner).unwrap();
    assert_eq!(renamed.name, "renamed");
    assert_eq!(trellis.item(&child.id).unwrap().name, "renamed");

    let children = trellis.children_of(&root.id).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, child.id);

    let descendants = trellis.descendants_of(&root.id).unwrap();
    assert_eq!(descendants.len(), 2);
    assert!(descendants.iter().any(|i| i.id == grandchild.id));

    let roots = trellis.roots().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id, root.id);
}

#[test]
fn test_resolution_is_idempotent_through_facade() {
    let (trellis, owner) = setup_facade();
    let (root, _, grandchild) = setup_chain(&trellis, owner);
    let alice = AccountId::new();
    trellis
        .grant_membership(&root.path, alice, PermissionLevel::Write, owner)
        .unwrap();

    let first = trellis
        .check_permission(&grandchild.path, &alice, PermissionLevel::Write)
        .unwrap();
    let second = trellis
        .check_permission(&grandchild.path, &alice, PermissionLevel::Write)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first, Decision::Allow);
}
