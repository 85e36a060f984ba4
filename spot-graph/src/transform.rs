use spot_data::dataset::SpotData;

/// A one-shot transform over a spot-level dataset
///
/// `apply` reads named feature channels and, on success, writes exactly
/// one spot-pair graph back into the dataset. Deterministic given the
/// same inputs; any failure leaves the dataset unchanged.
pub trait SpotTransform {
    fn apply(&self, data: &mut SpotData) -> anyhow::Result<()>;
}
