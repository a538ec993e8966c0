// Delta engine: ties block hashing to diff-script generation.
//
// The base text is cut into blocks and indexed by hash. The target is then
// scanned with a window of `block_size` characters: hits become copy ops
// (extended as far as base and target agree), misses accumulate into
// literal ops one character at a time while the hash rolls forward.

use crate::delta::DiffScript;
use crate::hash::config::{DEFAULT_BLOCK_SIZE, HashParams};
use crate::hash::rolling::{Hasher, RollingHash};
use crate::hash::table::BlockIndex;

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Computes diff scripts between two texts.
///
/// The hasher is a prototype: each `diff` call works on its own clone, so a
/// codec can be shared between threads.
#[derive(Debug, Clone)]
pub struct DeltaCodec<H = RollingHash> {
    block_size: usize,
    hasher: H,
}

impl Default for DeltaCodec<RollingHash> {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE, RollingHash::default())
    }
}

impl DeltaCodec<RollingHash> {
    /// Codec over a Rabin-Karp hash with the given parameters.
    pub fn rolling(block_size: usize, params: HashParams) -> Self {
        Self::new(block_size, RollingHash::new(params))
    }
}

impl<H: Hasher + Clone> DeltaCodec<H> {
    /// A zero `block_size` is treated as one.
    pub fn new(block_size: usize, hasher: H) -> Self {
        Self {
            block_size: block_size.max(1),
            hasher,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Diff `base` into `target`.
    ///
    /// Returns `None` when the texts are identical; that is the "no diff"
    /// sentinel and no payload should be stored for it.
    pub fn diff(&self, base: &str, target: &str) -> Option<DiffScript> {
        if base == target {
            return None;
        }
        let base: Vec<char> = base.chars().collect();
        let target: Vec<char> = target.chars().collect();
        Some(self.diff_chars(&base, &target))
    }

    /// Diff and serialize in one step.
    pub fn diff_payload(&self, base: &str, target: &str) -> Option<String> {
        self.diff(base, target).map(|script| script.to_payload())
    }

    fn diff_chars(&self, base: &[char], target: &[char]) -> DiffScript {
        let bs = self.block_size;
        let mut hasher = self.hasher.clone();
        let index = BlockIndex::build(base, bs, &mut hasher);

        let mut script = DiffScript::new();
        let mut literal = String::new();
        let mut pos = 0usize;
        // Hash of the window at `pos` is only rollable right after a miss.
        let mut rolling = false;

        while pos < target.len() {
            if target.len() - pos < bs {
                literal.extend(&target[pos..]);
                break;
            }

            let window = &target[pos..pos + bs];
            let hash = if rolling {
                match hasher.next_hash(window[bs - 1]) {
                    Some(h) => h,
                    None => hasher.hash(window),
                }
            } else {
                hasher.hash(window)
            };

            match index.get_match(hash, &target[pos..]) {
                Some(m) => {
                    script.push_literal(std::mem::take(&mut literal));
                    script.push_copy(m.offset, m.len);
                    pos += m.len;
                    rolling = false;
                }
                None => {
                    literal.push(target[pos]);
                    pos += 1;
                    rolling = true;
                }
            }
        }

        script.push_literal(literal);
        log::trace!(
            "diff: base={} target={} ops={}",
            base.len(),
            target.len(),
            script.len()
        );
        script
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::DiffOp;
    use crate::hash::rolling::FullHash;

    fn codec(bs: usize) -> DeltaCodec {
        DeltaCodec::rolling(bs, HashParams::default())
    }

    fn roundtrip(c: &DeltaCodec<impl Hasher + Clone>, base: &str, target: &str) {
        match c.diff(base, target) {
            None => assert_eq!(base, target),
            Some(script) => assert_eq!(script.apply(base).unwrap(), target),
        }
    }

    #[test]
    fn identical_is_sentinel() {
        assert!(codec(3).diff("abcdef", "abcdef").is_none());
        assert!(codec(3).diff("", "").is_none());
    }

    #[test]
    fn short_target_is_one_literal() {
        assert_eq!(codec(20).diff_payload("abc", "d").unwrap(), r#"["d",]"#);
    }

    #[test]
    fn no_match_is_one_literal() {
        assert_eq!(
            codec(20).diff_payload("abc", "defghijk").unwrap(),
            r#"["defghijk",]"#
        );
    }

    #[test]
    fn literal_then_copy() {
        assert_eq!(codec(3).diff_payload("abc", "defabc").unwrap(), r#"["def",0,3,]"#);
    }

    #[test]
    fn copy_literal_copy() {
        let script = codec(3).diff("abcdef", "defghiabc").unwrap();
        assert_eq!(
            script.ops(),
            &[
                DiffOp::Copy { offset: 3, len: 3 },
                DiffOp::Literal("ghi".into()),
                DiffOp::Copy { offset: 0, len: 3 },
            ]
        );
        assert_eq!(script.to_payload(), r#"[3,3,"ghi",0,3,]"#);
    }

    #[test]
    fn copy_extends_beyond_block() {
        let base = "a".repeat(30);
        let target = format!("{}{}", "b".repeat(15), "a".repeat(15));
        assert_eq!(
            codec(3).diff_payload(&base, &target).unwrap(),
            r#"["bbbbbbbbbbbbbbb",0,15,]"#
        );
    }

    #[test]
    fn empty_base_is_all_literal() {
        assert_eq!(codec(3).diff_payload("", "hello").unwrap(), r#"["hello",]"#);
    }

    #[test]
    fn empty_target_is_empty_script() {
        let script = codec(3).diff("abc", "").unwrap();
        assert!(script.is_empty());
        assert_eq!(script.to_payload(), "[]");
    }

    #[test]
    fn block_size_one_flushes_trailing_literal() {
        let c = codec(1);
        let script = c.diff("ab", "abx").unwrap();
        assert_eq!(script.apply("ab").unwrap(), "abx");
        roundtrip(&c, "xyz", "zzq");
    }

    #[test]
    fn oversized_block_degenerates() {
        let c = codec(64);
        assert_eq!(c.diff_payload("short", "other").unwrap(), r#"["other",]"#);
    }

    #[test]
    fn zero_block_size_is_clamped() {
        assert_eq!(DeltaCodec::rolling(0, HashParams::default()).block_size(), 1);
    }

    #[test]
    fn non_rolling_hasher_gives_same_script() {
        let full = DeltaCodec::new(
            4,
            FullHash(|w: &[char]| {
                w.iter()
                    .fold(0u64, |h, &c| h.wrapping_mul(31).wrapping_add(u64::from(u32::from(c))))
            }),
        );
        let base = "function add(a, b) { return a + b; }";
        let target = "function add(a, b, c) { return a + b + c; }";
        roundtrip(&full, base, target);
        let rolled = codec(4).diff(base, target).unwrap();
        assert_eq!(full.diff(base, target).unwrap(), rolled);
    }

    #[test]
    fn unicode_offsets_are_characters() {
        let c = codec(2);
        let base = "\u{e9}t\u{e9} caf\u{e9}";
        let target = "caf\u{e9} \u{e9}t\u{e9}!";
        roundtrip(&c, base, target);
    }

    #[test]
    fn typical_script_edit_roundtrips() {
        let base = "var x = 1;\nfunction f() {\n  return x * 2;\n}\n".repeat(8);
        let target = base.replace("x * 2", "x * 3") + "f();\n";
        let c = codec(20);
        let script = c.diff(&base, &target).unwrap();
        assert_eq!(script.apply(&base).unwrap(), target);
        assert!(script.to_payload().len() < target.len());
    }
}
