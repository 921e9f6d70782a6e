//! Fixed-shape 2-D and 3-D buffers used by the decoding engine.
//!
//! Provides [`TokenBuffer`] (token id grid), [`AttentionMask`] (validity
//! grid), and [`Logits`] (per-position score volume). All three are dense
//! row-major `Vec`s with shape checked at construction; shape errors here
//! are programmer errors and panic, like malformed tensor construction.

use tracing::debug;

/// 2-D grid of token ids, shape `[batch, len]`.
///
/// Rows are independent sequences. The grid's shape is fixed for its
/// lifetime; generation writes into pre-padded positions rather than
/// growing rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBuffer {
    batch: usize,
    len: usize,
    data: Vec<u32>,
}

impl TokenBuffer {
    /// Create a buffer from row-major data.
    ///
    /// # Panics
    /// Panics if `data.len() != batch * len`.
    pub fn new(batch: usize, len: usize, data: Vec<u32>) -> Self {
        assert_eq!(
            data.len(),
            batch * len,
            "Data length {} does not match shape [{}, {}]",
            data.len(),
            batch,
            len
        );
        debug!(batch, len, "Created token buffer");
        Self { batch, len, data }
    }

    /// Create a buffer with every position set to `fill`.
    pub fn filled(batch: usize, len: usize, fill: u32) -> Self {
        Self {
            batch,
            len,
            data: vec![fill; batch * len],
        }
    }

    /// Build a buffer from per-row slices of equal length.
    ///
    /// # Panics
    /// Panics if `rows` is empty or the rows have differing lengths.
    pub fn from_rows(rows: &[Vec<u32>]) -> Self {
        assert!(!rows.is_empty(), "from_rows requires at least one row");
        let len = rows[0].len();
        let mut data = Vec::with_capacity(rows.len() * len);
        for row in rows {
            assert_eq!(
                row.len(),
                len,
                "All rows must have the same length ({} != {})",
                row.len(),
                len
            );
            data.extend_from_slice(row);
        }
        Self::new(rows.len(), len, data)
    }

    /// Number of sequences (first dimension).
    pub fn rows(&self) -> usize {
        self.batch
    }

    /// Sequence length (second dimension).
    pub fn cols(&self) -> usize {
        self.len
    }

    /// Token id at `(row, pos)`.
    ///
    /// # Panics
    /// Panics if the position is out of bounds.
    pub fn get(&self, row: usize, pos: usize) -> u32 {
        assert!(row < self.batch && pos < self.len, "index out of bounds");
        self.data[row * self.len + pos]
    }

    /// Write the token id at `(row, pos)`.
    ///
    /// # Panics
    /// Panics if the position is out of bounds.
    pub fn set(&mut self, row: usize, pos: usize, id: u32) {
        assert!(row < self.batch && pos < self.len, "index out of bounds");
        self.data[row * self.len + pos] = id;
    }

    /// One sequence as a slice.
    pub fn row(&self, row: usize) -> &[u32] {
        assert!(row < self.batch, "row {} out of bounds", row);
        &self.data[row * self.len..(row + 1) * self.len]
    }

    /// The raw row-major data.
    pub fn data(&self) -> &[u32] {
        &self.data
    }
}

/// 2-D validity grid, shape `[batch, len]`. `true` marks a position the
/// model should attend to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttentionMask {
    batch: usize,
    len: usize,
    data: Vec<bool>,
}

impl AttentionMask {
    /// Create a mask from row-major data.
    ///
    /// # Panics
    /// Panics if `data.len() != batch * len`.
    pub fn new(batch: usize, len: usize, data: Vec<bool>) -> Self {
        assert_eq!(
            data.len(),
            batch * len,
            "Mask length {} does not match shape [{}, {}]",
            data.len(),
            batch,
            len
        );
        Self { batch, len, data }
    }

    /// Mask where positions `< valid` are true in every row.
    ///
    /// # Panics
    /// Panics if `valid > len`.
    pub fn prefix(batch: usize, len: usize, valid: usize) -> Self {
        assert!(valid <= len, "valid prefix {} exceeds length {}", valid, len);
        let mut data = vec![false; batch * len];
        for row in 0..batch {
            for pos in 0..valid {
                data[row * len + pos] = true;
            }
        }
        Self { batch, len, data }
    }

    /// Number of rows (first dimension).
    pub fn rows(&self) -> usize {
        self.batch
    }

    /// Row length (second dimension).
    pub fn cols(&self) -> usize {
        self.len
    }

    /// Whether `(row, pos)` is a valid position.
    pub fn is_valid(&self, row: usize, pos: usize) -> bool {
        assert!(row < self.batch && pos < self.len, "index out of bounds");
        self.data[row * self.len + pos]
    }

    /// Number of valid positions in one row.
    pub fn valid_len(&self, row: usize) -> usize {
        self.row(row).iter().filter(|&&v| v).count()
    }

    fn row(&self, row: usize) -> &[bool] {
        assert!(row < self.batch, "row {} out of bounds", row);
        &self.data[row * self.len..(row + 1) * self.len]
    }
}

/// 3-D score volume, shape `[batch, seq_len, vocab]`.
///
/// Returned by the model capability; the engine reads one `[vocab]` row
/// per sequence per step.
#[derive(Debug, Clone)]
pub struct Logits {
    batch: usize,
    seq_len: usize,
    vocab: usize,
    data: Vec<f32>,
}

impl Logits {
    /// Create a logits volume from row-major data.
    ///
    /// # Panics
    /// Panics if `data.len() != batch * seq_len * vocab`.
    pub fn new(batch: usize, seq_len: usize, vocab: usize, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            batch * seq_len * vocab,
            "Data length {} does not match shape [{}, {}, {}]",
            data.len(),
            batch,
            seq_len,
            vocab
        );
        Self {
            batch,
            seq_len,
            vocab,
            data,
        }
    }

    /// Zero-filled logits volume.
    pub fn zeros(batch: usize, seq_len: usize, vocab: usize) -> Self {
        Self {
            batch,
            seq_len,
            vocab,
            data: vec![0.0; batch * seq_len * vocab],
        }
    }

    /// Shape as `[batch, seq_len, vocab]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.batch, self.seq_len, self.vocab]
    }

    /// The score row for one sequence at one position.
    ///
    /// # Panics
    /// Panics if the position is out of bounds.
    pub fn row(&self, row: usize, pos: usize) -> &[f32] {
        assert!(
            row < self.batch && pos < self.seq_len,
            "index [{}, {}] out of bounds for shape [{}, {}, {}]",
            row,
            pos,
            self.batch,
            self.seq_len,
            self.vocab
        );
        let start = (row * self.seq_len + pos) * self.vocab;
        &self.data[start..start + self.vocab]
    }

    /// Mutable score row for one sequence at one position.
    pub fn row_mut(&mut self, row: usize, pos: usize) -> &mut [f32] {
        assert!(
            row < self.batch && pos < self.seq_len,
            "index [{}, {}] out of bounds",
            row,
            pos
        );
        let start = (row * self.seq_len + pos) * self.vocab;
        &mut self.data[start..start + self.vocab]
    }
}
