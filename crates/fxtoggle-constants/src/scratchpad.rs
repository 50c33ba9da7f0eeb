use fxtoggle_api::BufferRange;

use crate::ConstantError;

/// Per-group constant snapshot.
///
/// `previous` always holds what `current` contained right before the latest [`refresh`], so
/// effects can read last-draw values (e.g. previous-frame view matrices).
///
/// [`refresh`]: Scratchpad::refresh
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Scratchpad {
    current: Vec<u8>,
    previous: Vec<u8>,
    source: Option<BufferRange>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<BufferRange> {
        self.source
    }

    pub fn set_source(&mut self, range: BufferRange) {
        self.source = Some(range);
    }

    pub fn current(&self) -> &[u8] {
        &self.current
    }

    pub fn previous(&self) -> &[u8] {
        &self.previous
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Shift `current` into `previous` and take `bytes` as the new `current`.
    ///
    /// Both halves follow the source size; growth zero-fills the tail of `previous`.
    pub fn refresh(&mut self, bytes: &[u8]) {
        self.current.resize(bytes.len(), 0);
        self.previous.resize(bytes.len(), 0);
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.copy_from_slice(bytes);
    }

    /// Read `count` consecutive values starting at byte `offset`.
    pub fn read<T: bytemuck::Pod>(
        &self,
        use_previous: bool,
        offset: usize,
        count: usize,
    ) -> Result<Vec<T>, ConstantError> {
        let bytes = if use_previous {
            &self.previous
        } else {
            &self.current
        };

        let elem = std::mem::size_of::<T>();
        let len = count.saturating_mul(elem);
        let end = offset.checked_add(len).filter(|&end| end <= bytes.len()).ok_or(
            ConstantError::OutOfBounds {
                offset,
                len,
                size: bytes.len(),
            },
        )?;

        Ok(bytes[offset..end]
            .chunks_exact(elem)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn refresh_keeps_one_generation() {
        let mut pad = Scratchpad::new();
        pad.refresh(&[1, 2, 3, 4]);
        assert_eq!(pad.current(), &[1, 2, 3, 4]);
        assert_eq!(pad.previous(), &[0, 0, 0, 0]);

        pad.refresh(&[5, 6, 7, 8]);
        assert_eq!(pad.current(), &[5, 6, 7, 8]);
        assert_eq!(pad.previous(), &[1, 2, 3, 4]);
    }

    #[test]
    fn refresh_resizes_transparently() {
        let mut pad = Scratchpad::new();
        pad.refresh(&[1, 2]);
        pad.refresh(&[3, 4, 5, 6]);
        assert_eq!(pad.previous(), &[1, 2, 0, 0]);
        pad.refresh(&[7]);
        assert_eq!(pad.current(), &[7]);
        assert_eq!(pad.previous(), &[3]);
    }

    #[test]
    fn read_allows_exact_fit_and_rejects_overrun() {
        let mut pad = Scratchpad::new();
        let bytes: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        pad.refresh(&bytes);

        assert_eq!(pad.read::<f32>(false, 4, 3).unwrap(), vec![2.0, 3.0, 4.0]);
        assert_eq!(
            pad.read::<f32>(false, 8, 3),
            Err(ConstantError::OutOfBounds {
                offset: 8,
                len: 12,
                size: 16
            })
        );
        assert_eq!(pad.read::<u32>(true, 0, 1).unwrap(), vec![0]);
    }

    #[test]
    fn unaligned_offsets_are_fine() {
        let mut pad = Scratchpad::new();
        let mut bytes = vec![0u8; 9];
        bytes[1..5].copy_from_slice(&(-7i32).to_le_bytes());
        pad.refresh(&bytes);
        assert_eq!(pad.read::<i32>(false, 1, 1).unwrap(), vec![-7]);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            rng_algorithm: proptest::test_runner::RngAlgorithm::ChaCha,
            rng_seed: proptest::test_runner::RngSeed::Fixed(0x5EED_CB01),
            .. ProptestConfig::default()
        })]

        #[test]
        fn previous_lags_current_by_one_refresh(
            generations in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..48), 1..6)
        ) {
            let mut pad = Scratchpad::new();
            let mut before = Vec::new();
            for bytes in &generations {
                pad.refresh(bytes);
                prop_assert_eq!(pad.current(), bytes.as_slice());

                let mut expected = before.clone();
                expected.resize(bytes.len(), 0);
                prop_assert_eq!(pad.previous(), expected.as_slice());

                before = bytes.clone();
            }
        }
    }
}
