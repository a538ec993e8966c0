use diffable::delta::{DiffOp, DiffScript, full_content_payload};
use diffable::engine::DeltaCodec;
use diffable::hash::config::HashParams;
use diffable::hash::rolling::{Hasher, RollingHash};

fn payload(base: &str, target: &str, block_size: usize) -> Option<String> {
    DeltaCodec::rolling(block_size, HashParams::default()).diff_payload(base, target)
}

#[test]
fn reference_vectors() {
    let cases: &[(&str, &str, usize, &str)] = &[
        ("abcdef", "defghiabc", 3, r#"[3,3,"ghi",0,3,]"#),
        ("abc", "d", 20, r#"["d",]"#),
        ("abc", "defghijk", 20, r#"["defghijk",]"#),
        ("abc", "defabc", 3, r#"["def",0,3,]"#),
    ];
    for (base, target, bs, expected) in cases {
        assert_eq!(
            payload(base, target, *bs).as_deref(),
            Some(*expected),
            "base={base:?} target={target:?} bs={bs}"
        );
    }
}

#[test]
fn long_run_match_extends_past_block() {
    let base = "a".repeat(30);
    let target = format!("{}{}", "b".repeat(15), "a".repeat(15));
    assert_eq!(
        payload(&base, &target, 3).unwrap(),
        r#"["bbbbbbbbbbbbbbb",0,15,]"#
    );
}

#[test]
fn identical_inputs_have_no_payload() {
    assert_eq!(payload("abc", "abc", 3), None);
    assert_eq!(payload("", "", 20), None);
}

#[test]
fn hash_reference_values() {
    let mut small = RollingHash::new(HashParams::with_base(3));
    let abc: Vec<char> = "abc".chars().collect();
    assert_eq!(small.hash(&abc), 1266);

    let mut default = RollingHash::default();
    let abcabc: Vec<char> = "abcabc".chars().collect();
    assert_eq!(default.hash(&abcabc), 232_878_305);
}

#[test]
fn rolled_hash_equals_fresh_hash() {
    let text: Vec<char> = "the quick brown fox jumps over the lazy dog".chars().collect();
    let w = 5;
    let mut rolling = RollingHash::default();
    rolling.hash(&text[..w]);
    for start in 1..=text.len() - w {
        let rolled = rolling.next_hash(text[start + w - 1]).unwrap();
        let fresh = RollingHash::default().hash(&text[start..start + w]);
        assert_eq!(rolled, fresh, "window at {start}");
    }
}

#[test]
fn fallback_payload_parses_as_full_content() {
    let content = "alert(\"hi\");\n";
    let payload = full_content_payload(content);
    assert_eq!(payload, "[\"alert(\\\"hi\\\");\\n\"]");
    let script = DiffScript::from_payload(&payload).unwrap();
    assert_eq!(script.ops(), &[DiffOp::Literal(content.to_string())]);
    assert_eq!(script.apply("whatever was cached").unwrap(), content);
}

#[test]
fn stylesheet_edit_is_mostly_copies() {
    let base: String = (0..40)
        .map(|i| format!(".rule-{i} {{ color: #{i:06x}; margin: {i}px; }}\n"))
        .collect();
    let target = base.replace(".rule-17 {", ".rule-17, .extra {");
    let codec: DeltaCodec = DeltaCodec::default();
    let script = codec.diff(&base, &target).unwrap();
    assert_eq!(script.apply(&base).unwrap(), target);

    let literal_chars: usize = script
        .ops()
        .iter()
        .map(|op| match op {
            DiffOp::Literal(text) => text.chars().count(),
            DiffOp::Copy { .. } => 0,
        })
        .sum();
    assert!(literal_chars < 64, "literal chars: {literal_chars}");
}
