mod common;

use common::strings;
use unalias_core::NameMapping;

fn sample() -> NameMapping {
    NameMapping::build(
        "il2cpp",
        &strings(&["il2cpp_init", "il2cpp_domain_get", "il2cpp_thread_attach"]),
        &strings(&["zz1", "zz2", "zz3"]),
    )
}

#[test]
fn pairs_names_by_index() {
    let mapping = sample();
    assert_eq!(mapping.len(), 3);
    assert_eq!(mapping.resolve("il2cpp_init"), "zz1");
    assert_eq!(mapping.resolve("il2cpp_domain_get"), "zz2");
    assert_eq!(mapping.resolve("il2cpp_thread_attach"), "zz3");
}

#[test]
fn unknown_and_foreign_names_pass_through() {
    let mapping = sample();
    assert_eq!(mapping.resolve("il2cpp_unknown"), "il2cpp_unknown");
    assert_eq!(mapping.resolve("gamma"), "gamma");
    assert_eq!(mapping.resolve(""), "");
    assert_eq!(mapping.resolve("il2cp"), "il2cp");
}

#[test]
fn prefix_gate_is_byte_wise() {
    let mapping = NameMapping::build("il2cpp", &strings(&["xil2cpp_a"]), &strings(&["q"]));
    assert!(!mapping.has_prefix("xil2cpp_a"));
    assert_eq!(mapping.resolve("xil2cpp_a"), "xil2cpp_a");
    assert!(mapping.has_prefix("il2cpp"));
}

#[test]
fn length_mismatch_pairs_the_common_prefix() {
    let mapping = NameMapping::build(
        "il2cpp",
        &strings(&["il2cpp_a", "il2cpp_b", "il2cpp_c"]),
        &strings(&["o1", "o2"]),
    );
    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping.resolve("il2cpp_b"), "o2");
    assert_eq!(mapping.resolve("il2cpp_c"), "il2cpp_c");
}

#[test]
fn later_duplicate_wins() {
    let mapping = NameMapping::build(
        "il2cpp",
        &strings(&["il2cpp_a", "il2cpp_a"]),
        &strings(&["first", "second"]),
    );
    assert_eq!(mapping.len(), 1);
    assert_eq!(mapping.get("il2cpp_a"), Some("second"));
}

#[test]
fn empty_mapping_is_passthrough() {
    let mapping = NameMapping::empty("il2cpp");
    assert!(mapping.is_empty());
    assert_eq!(mapping.prefix(), "il2cpp");
    assert_eq!(mapping.resolve("il2cpp_init"), "il2cpp_init");
}

#[test]
fn entries_are_sorted_by_true_name() {
    let mapping = sample();
    let entries = mapping.entries();
    assert_eq!(
        entries,
        vec![("il2cpp_domain_get", "zz2"), ("il2cpp_init", "zz1"), ("il2cpp_thread_attach", "zz3")]
    );
}
