use ndarray::{arr2, Array2, Array3};
use spot_data::dataset::{FeatureClass, SpotData};

#[test]
fn spot_dataset_workflow() -> anyhow::Result<()> {
    let mut data = SpotData::new(3);

    data.insert_spot_matrix("spatial", arr2(&[[0.5, 0.5], [1.5, 0.5], [0.5, 1.5]]))?;
    data.insert_spot_matrix("spatial_pixel", arr2(&[[0_i64, 0], [1, 0], [0, 1]]))?;
    data.insert_global("image", Array3::<f64>::ones((2, 2, 3)).into_dyn());

    let xy = data.get_feature("spatial", FeatureClass::SpotMatrix)?;
    assert_eq!(xy.shape(), &[3, 2]);

    let img = data.get_feature("image", FeatureClass::Global)?;
    assert_eq!(img.shape(), &[2, 2, 3]);

    // graph slots overwrite by key, last write wins
    data.insert_pair_graph("graph", Array2::<f32>::zeros((3, 3)))?;
    data.insert_pair_graph("graph", Array2::<f32>::ones((3, 3)))?;
    let graph = data.pair_graph("graph").unwrap();
    assert_eq!(graph[[0, 0]], 1.0);

    Ok(())
}

#[test]
fn channel_classes_are_separate_namespaces() {
    let mut data = SpotData::new(2);
    data.insert_spot_matrix("xx", arr2(&[[1.0], [2.0]])).unwrap();

    assert!(data.get_feature("xx", FeatureClass::SpotMatrix).is_ok());
    assert!(data.get_feature("xx", FeatureClass::Global).is_err());
}
