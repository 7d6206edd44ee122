//! Coarse per-chromosome index for random access into format 7 (genomic
//! coordinates) by `(chrom, pos1)`, grounded on
//! `original_source/src/row_finder.c`'s `init_finder`/`row_finder_search`.
//!
//! The C version walks a `row_reader_t` directly against `cdata_t`; here the
//! walk is expressed over anything producing [`RowLoc`]s, so `yame_formats`'s
//! format-7 sequential reader can feed it without `yame_core` depending on
//! format internals.

use std::collections::HashMap;

/// One row's coordinate as seen by a sequential scan over a coordinates column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLoc {
    pub pos1: u64,
    pub row_index: u64,
}

struct Bucket {
    /// `pos1` and `row_index` of the first row seen in this `pos1 >> 17` bucket.
    pos1: u64,
    row_index: u64,
}

struct ChromEntry {
    buckets: Vec<Bucket>,
}

/// A coarse index over one coordinates column, bucketed at `pos1 >> 17`
/// (matches the source's fixed 17-bit bucket width).
pub struct RowFinder {
    chroms: HashMap<String, ChromEntry>,
}

impl RowFinder {
    /// Builds the index from a single ordered pass over every row of every
    /// chromosome, in file order. `rows_by_chrom` must yield each
    /// chromosome's rows contiguously and each chromosome at most once,
    /// mirroring the source's "appeared twice in unsorted manner" fatal check.
    pub fn build<I>(rows_by_chrom: I) -> Result<Self, crate::error::Error>
    where
        I: IntoIterator<Item = (String, Vec<RowLoc>)>,
    {
        let mut chroms = HashMap::new();
        for (chrom, locs) in rows_by_chrom {
            if chroms.contains_key(&chrom) {
                return Err(crate::error::Error::CorruptAux {
                    detail: format!("chromosome {chrom} appeared twice in unsorted manner"),
                });
            }
            let mut buckets: Vec<Bucket> = Vec::new();
            for loc in locs {
                let bucket_of = (loc.pos1 >> 17) as usize;
                while buckets.len() <= bucket_of {
                    buckets.push(Bucket { pos1: loc.pos1, row_index: loc.row_index });
                }
            }
            chroms.insert(chrom, ChromEntry { buckets });
        }
        Ok(RowFinder { chroms })
    }

    /// Returns the row index of the row whose `pos1` exactly matches `beg1`
    /// within `chrom`, scanning `remaining_from_bucket` forward from the
    /// coarse bucket to pin down the exact row (the source re-walks the
    /// underlying stream from `rdr`; here the caller supplies that walk as an
    /// iterator of the rows from the bucket's starting row index onward).
    ///
    /// Returns `Ok(None)` if `chrom` is unindexed, `beg1` falls past the end
    /// of the chromosome's bucket table, or no row matches exactly (the
    /// source's sentinel `0` return folds "not found" and "chromosome
    /// exhausted" together; this keeps them distinct via `Option`/`Result`).
    pub fn find_row<I>(
        &self,
        chrom: &str,
        beg1: u64,
        remaining_from_bucket: impl FnOnce(u64) -> I,
    ) -> Result<Option<u64>, crate::error::Error>
    where
        I: IntoIterator<Item = RowLoc>,
    {
        let entry = self.chroms.get(chrom).ok_or_else(|| crate::error::Error::CorruptAux {
            detail: format!("chromosome {chrom} not found in coordinate index"),
        })?;
        let bucket_of = (beg1 >> 17) as usize;
        if bucket_of >= entry.buckets.len() {
            return Err(crate::error::Error::CorruptAux {
                detail: format!(
                    "coordinate {beg1} exceeds indexed range (max bucket {})",
                    entry.buckets.len()
                ),
            });
        }
        let start = &entry.buckets[bucket_of];
        for loc in remaining_from_bucket(start.row_index) {
            if loc.pos1 == beg1 {
                return Ok(Some(loc.row_index));
            } else if loc.pos1 > beg1 {
                return Ok(None);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locs(positions: &[u64]) -> Vec<RowLoc> {
        positions.iter().enumerate().map(|(i, &pos1)| RowLoc { pos1, row_index: i as u64 }).collect()
    }

    #[test]
    fn finds_exact_match_within_bucket() {
        let rows = locs(&[10, 20, 1 << 17, (1 << 17) + 5, (1 << 17) + 50]);
        let finder = RowFinder::build(vec![("chr1".to_string(), rows.clone())]).unwrap();

        let found = finder
            .find_row("chr1", (1 << 17) + 5, |from_index| {
                rows.iter().filter(move |l| l.row_index >= from_index).copied().collect::<Vec<_>>()
            })
            .unwrap();
        assert_eq!(found, Some(3));
    }

    #[test]
    fn missing_position_returns_none() {
        let rows = locs(&[10, 20, 30]);
        let finder = RowFinder::build(vec![("chr1".to_string(), rows.clone())]).unwrap();
        let found = finder
            .find_row("chr1", 25, |from_index| {
                rows.iter().filter(move |l| l.row_index >= from_index).copied().collect::<Vec<_>>()
            })
            .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn unknown_chromosome_is_corrupt_aux() {
        let finder = RowFinder::build(vec![("chr1".to_string(), locs(&[1]))]).unwrap();
        let err = finder.find_row("chr2", 1, |_| Vec::<RowLoc>::new()).unwrap_err();
        assert!(matches!(err, crate::error::Error::CorruptAux { .. }));
    }

    #[test]
    fn duplicate_chromosome_is_rejected() {
        let err = RowFinder::build(vec![
            ("chr1".to_string(), locs(&[1])),
            ("chr1".to_string(), locs(&[2])),
        ])
        .unwrap_err();
        assert!(matches!(err, crate::error::Error::CorruptAux { .. }));
    }
}
