// Block index over a reference text.
//
// The reference is cut into fixed-size blocks (the last one may be short).
// Each block is filed under its hash; colliding blocks are chained in
// insertion order, so the earliest block wins among equal candidates.

use std::collections::HashMap;

use super::rolling::Hasher;

/// One block of the reference text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Character offset of the block in the reference text.
    pub offset: usize,
    /// Block length in characters.
    pub len: usize,
}

/// A verified match against the reference text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Character offset in the reference text.
    pub offset: usize,
    /// Match length in characters (at least one block).
    pub len: usize,
}

/// Partition of a reference text into fixed-size blocks.
pub struct BlockText<'a> {
    text: &'a [char],
    block_size: usize,
}

impl<'a> BlockText<'a> {
    pub fn new(text: &'a [char], block_size: usize) -> Self {
        Self {
            text,
            block_size: block_size.max(1),
        }
    }

    /// Blocks in offset order.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        (0..self.text.len())
            .step_by(self.block_size)
            .map(move |offset| Block {
                offset,
                len: self.block_size.min(self.text.len() - offset),
            })
    }

    pub fn text(&self) -> &'a [char] {
        self.text
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

/// Hash-keyed index of reference blocks with chained collisions.
pub struct BlockIndex<'a> {
    text: &'a [char],
    block_size: usize,
    buckets: HashMap<u64, Vec<Block>>,
}

impl<'a> BlockIndex<'a> {
    /// Index every block of `text` under `hasher.hash(block)`.
    pub fn build<H: Hasher + ?Sized>(text: &'a [char], block_size: usize, hasher: &mut H) -> Self {
        let blocks = BlockText::new(text, block_size);
        let mut buckets: HashMap<u64, Vec<Block>> = HashMap::new();
        for block in blocks.blocks() {
            let key = hasher.hash(&text[block.offset..block.offset + block.len]);
            buckets.entry(key).or_default().push(block);
        }
        Self {
            text,
            block_size: blocks.block_size(),
            buckets,
        }
    }

    /// Number of distinct hash buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Find the first block under `hash` whose text equals the leading
    /// `block_size` characters of `target`, then extend the match greedily
    /// while the reference and `target` keep agreeing.
    ///
    /// `target` starts at the current window and runs to the end of the
    /// target text. Returns `None` on a miss or on a spurious collision.
    pub fn get_match(&self, hash: u64, target: &[char]) -> Option<Match> {
        let bs = self.block_size;
        if target.len() < bs {
            return None;
        }
        let candidates = self.buckets.get(&hash)?;
        let window = &target[..bs];
        let block = candidates
            .iter()
            .find(|b| b.len == bs && &self.text[b.offset..b.offset + bs] == window)?;

        let tail = &self.text[block.offset + bs..];
        let extension = tail
            .iter()
            .zip(&target[bs..])
            .take_while(|(a, b)| a == b)
            .count();

        Some(Match {
            offset: block.offset,
            len: bs + extension,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
