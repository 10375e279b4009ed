//! Alignment: classifies finished operations against fixed block sizes.

use super::model::{Alignment, Operation};

/// Block sizes checked unless configured otherwise.
pub const DEFAULT_BLOCK_SIZES: [u64; 2] = [512, 4096];

/// Classify one range against one block size. `None` when no alignment
/// property holds (or the block size is zero / the range overflows).
pub fn classify(offset: u64, len: u64, block_size: u64) -> Option<Alignment> {
    if block_size == 0 {
        return None;
    }
    let end = offset.checked_add(len)?;

    if offset % block_size == 0 {
        if end % block_size == 0 {
            Some(Alignment::Full)
        } else {
            Some(Alignment::StartOnly)
        }
    } else if len % block_size == 0 {
        Some(Alignment::LengthOnly)
    } else {
        None
    }
}

/// Fill `alignment` on every operation, independently per block size.
pub fn analyze(ops: &mut [Operation], block_sizes: &[u64]) {
    for op in ops.iter_mut() {
        op.alignment.clear();
        for &block_size in block_sizes {
            if let Some(class) = classify(op.offset, op.len, block_size) {
                op.alignment.insert(block_size, class);
            }
        }
    }
}

/// Number of operations not `Full` at `block_size`.
pub fn count_not_full(ops: &[Operation], block_size: u64) -> usize {
    ops.iter()
        .filter(|op| op.alignment.get(&block_size) != Some(&Alignment::Full))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::parser::model::{ObjectId, OpLine, OpType};

    fn op(offset: u64, len: u64) -> Operation {
        Operation::from_line(&OpLine {
            op_type: OpType::Write,
            pg_id: "17.5d5_head".into(),
            object_id: ObjectId {
                pool: 17,
                hash: "aba88e4f".into(),
                namespace: String::new(),
                name: "obj".into(),
                snap: "head".into(),
                generation: String::new(),
            },
            offset,
            len,
            len_completed: None,
        })
    }

    #[test]
    fn test_full_alignment() {
        assert_eq!(classify(0x1000, 0x2000, 4096), Some(Alignment::Full));
        assert_eq!(classify(0, 0, 4096), Some(Alignment::Full));
    }

    #[test]
    fn test_start_only() {
        assert_eq!(classify(0x1000, 0x200, 4096), Some(Alignment::StartOnly));
    }

    #[test]
    fn test_length_only() {
        assert_eq!(classify(0x200, 0x1000, 4096), Some(Alignment::LengthOnly));
    }

    #[test]
    fn test_unaligned() {
        assert_eq!(classify(0x316201, 0x1ff, 512), None);
        assert_eq!(classify(0x6576, 0x9, 4096), None);
    }

    #[test]
    fn test_full_at_4096_implies_full_at_512() {
        for (offset, len) in [(0u64, 4096u64), (0x3c0000, 0x4000), (0x7ffff000, 0x1000)] {
            assert_eq!(classify(offset, len, 4096), Some(Alignment::Full));
            assert_eq!(classify(offset, len, 512), Some(Alignment::Full));
        }
    }

    proptest! {
        #[test]
        fn full_at_4096_is_full_at_512(a in any::<u64>(), b in any::<u64>()) {
            let offset = a & !4095;
            let len = b & !4095;
            if offset.checked_add(len).is_some() {
                prop_assert_eq!(classify(offset, len, 4096), Some(Alignment::Full));
                prop_assert_eq!(classify(offset, len, 512), Some(Alignment::Full));
            } else {
                prop_assert_eq!(classify(offset, len, 4096), None);
                prop_assert_eq!(classify(offset, len, 512), None);
            }
        }

        #[test]
        fn coarse_alignment_implies_fine(offset in any::<u64>(), len in 0u64..0x1000_0000) {
            // Anything aligned at 4096 keeps at least that property at 512
            if let Some(coarse) = classify(offset, len, 4096) {
                let fine = classify(offset, len, 512);
                match coarse {
                    Alignment::Full => {
                        prop_assert_eq!(fine, Some(Alignment::Full));
                    }
                    Alignment::StartOnly => {
                        prop_assert!(matches!(fine, Some(Alignment::Full | Alignment::StartOnly)));
                    }
                    Alignment::LengthOnly => {
                        prop_assert!(fine.is_some());
                    }
                }
            }
        }
    }

    #[test]
    fn test_zero_block_size_and_overflow() {
        assert_eq!(classify(0, 4096, 0), None);
        assert_eq!(classify(u64::MAX, 1, 512), None);
    }

    #[test]
    fn test_analyze_per_block_size() {
        // 512-aligned on both ends, 4096-aligned on neither
        let mut ops = vec![op(0x316200, 0x200), op(0x1000, 0x1000)];
        analyze(&mut ops, &DEFAULT_BLOCK_SIZES);

        assert_eq!(ops[0].alignment.get(&512), Some(&Alignment::Full));
        assert_eq!(ops[0].alignment.get(&4096), None);
        assert_eq!(ops[1].alignment.get(&512), Some(&Alignment::Full));
        assert_eq!(ops[1].alignment.get(&4096), Some(&Alignment::Full));
        assert_eq!(count_not_full(&ops, 4096), 1);
        assert_eq!(count_not_full(&ops, 512), 0);
    }
}
