use awc::permissions::{
    merge, PermissionLevel, PermissionScope, PermissionSet, PermissionsDeclaration,
};

const LEVELS: [PermissionLevel; 3] = [
    PermissionLevel::None,
    PermissionLevel::Read,
    PermissionLevel::Write,
];

#[test]
fn merge_is_commutative_and_write_dominates() {
    for left in LEVELS {
        for right in LEVELS {
            let a = PermissionSet::new().with(PermissionScope::Issues, left);
            let b = PermissionSet::new().with(PermissionScope::Issues, right);
            let ab = merge(&a, &b);
            assert_eq!(ab, merge(&b, &a), "{left} vs {right}");
            if left == PermissionLevel::Write || right == PermissionLevel::Write {
                assert_eq!(ab.level(PermissionScope::Issues), PermissionLevel::Write);
            }
        }
    }
}

#[test]
fn merge_keeps_scopes_present_in_either_input() {
    let a = PermissionSet::new().read(PermissionScope::Contents);
    let b = PermissionSet::new().write(PermissionScope::Discussions);
    let merged = merge(&a, &b);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged.level(PermissionScope::Contents), PermissionLevel::Read);
    assert_eq!(
        merged.level(PermissionScope::Discussions),
        PermissionLevel::Write
    );
    assert_eq!(merged.level(PermissionScope::Issues), PermissionLevel::None);
    assert_eq!(merged.get(PermissionScope::Issues), None);
}

#[test]
fn render_is_independent_of_insertion_order() {
    let forward = PermissionSet::new()
        .read(PermissionScope::Contents)
        .write(PermissionScope::PullRequests)
        .write(PermissionScope::Issues);
    let backward = PermissionSet::new()
        .write(PermissionScope::Issues)
        .write(PermissionScope::PullRequests)
        .read(PermissionScope::Contents);
    assert_eq!(forward.render(), backward.render());
    assert_eq!(
        forward.render(),
        "permissions:\n  contents: read\n  issues: write\n  pull-requests: write"
    );
    assert_eq!(PermissionSet::new().render(), "permissions: {}");
}

#[test]
fn declarations_parse_shorthands_and_mappings() {
    let read_all: serde_yaml::Value = serde_yaml::from_str("read-all").expect("yaml");
    assert_eq!(
        PermissionsDeclaration::parse_value(&read_all).expect("shorthand"),
        PermissionsDeclaration::ReadAll
    );

    let explicit: serde_yaml::Value =
        serde_yaml::from_str("contents: read\nissues: write\n").expect("yaml");
    let declaration = PermissionsDeclaration::parse_value(&explicit).expect("mapping");
    let effective = declaration.effective();
    assert_eq!(effective.level(PermissionScope::Issues), PermissionLevel::Write);
    assert_eq!(effective.level(PermissionScope::Contents), PermissionLevel::Read);

    let bogus: serde_yaml::Value = serde_yaml::from_str("wiki: write").expect("yaml");
    assert!(PermissionsDeclaration::parse_value(&bogus).is_err());
}
