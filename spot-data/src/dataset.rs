use anyhow::anyhow;
use ndarray::{Array2, ArrayD};
use std::collections::HashMap;

/// Storage class of a named feature channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureClass {
    /// Per-spot matrix storage, one row per spot (`obsm`-like)
    SpotMatrix,
    /// Global unstructured storage, not indexed per spot (`uns`-like)
    Global,
}

/// A per-spot matrix payload, one row per spot.
#[derive(Debug, Clone)]
pub enum SpotArray {
    Real(Array2<f64>),
    Integer(Array2<i64>),
}

impl SpotArray {
    pub fn nrows(&self) -> usize {
        match self {
            SpotArray::Real(xx) => xx.nrows(),
            SpotArray::Integer(xx) => xx.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            SpotArray::Real(xx) => xx.ncols(),
            SpotArray::Integer(xx) => xx.ncols(),
        }
    }

    /// Real-valued copy; integer entries are promoted.
    pub fn to_real(&self) -> Array2<f64> {
        match self {
            SpotArray::Real(xx) => xx.clone(),
            SpotArray::Integer(xx) => xx.mapv(|v| v as f64),
        }
    }
}

impl From<Array2<f64>> for SpotArray {
    fn from(xx: Array2<f64>) -> Self {
        SpotArray::Real(xx)
    }
}

impl From<Array2<i64>> for SpotArray {
    fn from(xx: Array2<i64>) -> Self {
        SpotArray::Integer(xx)
    }
}

/// An in-memory container of spot-level annotations
///
/// Three keyed stores, all indexed by channel name:
/// - per-spot matrices (one row per spot)
/// - global values (e.g., a `height x width x 3` histology image)
/// - spot-pair graphs (`n x n` matrices written by graph transforms)
///
pub struct SpotData {
    n_spots: usize,
    obsm: HashMap<Box<str>, SpotArray>,
    uns: HashMap<Box<str>, ArrayD<f64>>,
    obsp: HashMap<Box<str>, Array2<f32>>,
}

impl SpotData {
    pub fn new(n_spots: usize) -> Self {
        SpotData {
            n_spots,
            obsm: HashMap::new(),
            uns: HashMap::new(),
            obsp: HashMap::new(),
        }
    }

    pub fn n_spots(&self) -> usize {
        self.n_spots
    }

    /// Register a per-spot matrix under `channel`
    ///
    /// Fails if the number of rows does not match the number of spots.
    pub fn insert_spot_matrix(
        &mut self,
        channel: &str,
        xx: impl Into<SpotArray>,
    ) -> anyhow::Result<()> {
        let xx = xx.into();
        if xx.nrows() != self.n_spots {
            anyhow::bail!(
                "channel '{}' has {} rows but the dataset has {} spots",
                channel,
                xx.nrows(),
                self.n_spots
            );
        }
        self.obsm.insert(channel.into(), xx);
        Ok(())
    }

    /// Register a global (not per-spot) value under `channel`
    pub fn insert_global(&mut self, channel: &str, xx: ArrayD<f64>) {
        self.uns.insert(channel.into(), xx);
    }

    /// Generic retrieval of a named feature channel
    ///
    /// Per-spot integer matrices are promoted to `f64`. The caller is
    /// responsible for checking the rank of the returned array.
    pub fn get_feature(&self, channel: &str, class: FeatureClass) -> anyhow::Result<ArrayD<f64>> {
        match class {
            FeatureClass::SpotMatrix => Ok(self.spot_matrix(channel)?.to_real().into_dyn()),
            FeatureClass::Global => Ok(self.global(channel)?.clone()),
        }
    }

    pub fn spot_matrix(&self, channel: &str) -> anyhow::Result<&SpotArray> {
        self.obsm
            .get(channel)
            .ok_or_else(|| anyhow!("no spot matrix channel '{}'", channel))
    }

    /// A per-spot integer matrix, e.g., pixel coordinates
    ///
    /// Fails if the slot holds a real-valued matrix, since silently
    /// truncating coordinates would misplace spots.
    pub fn integer_spot_matrix(&self, channel: &str) -> anyhow::Result<&Array2<i64>> {
        match self.spot_matrix(channel)? {
            SpotArray::Integer(xx) => Ok(xx),
            SpotArray::Real(_) => Err(anyhow!(
                "spot matrix channel '{}' is real-valued, expected integer",
                channel
            )),
        }
    }

    pub fn global(&self, channel: &str) -> anyhow::Result<&ArrayD<f64>> {
        self.uns
            .get(channel)
            .ok_or_else(|| anyhow!("no global channel '{}'", channel))
    }

    /// Store a spot-pair graph under `key`, overwriting any previous one
    ///
    /// Fails unless the matrix is `n_spots x n_spots`.
    pub fn insert_pair_graph(&mut self, key: &str, graph: Array2<f32>) -> anyhow::Result<()> {
        let nn = self.n_spots;
        if graph.dim() != (nn, nn) {
            anyhow::bail!(
                "pair graph '{}' has shape {:?}, expected ({}, {})",
                key,
                graph.dim(),
                nn,
                nn
            );
        }
        self.obsp.insert(key.into(), graph);
        Ok(())
    }

    pub fn pair_graph(&self, key: &str) -> Option<&Array2<f32>> {
        self.obsp.get(key)
    }
}
