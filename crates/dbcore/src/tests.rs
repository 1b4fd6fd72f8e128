use super::*;

#[test]
fn unplaced_rid_is_not_placed() {
    assert!(!Rid::UNPLACED.is_placed());
    assert_eq!(Rid::UNPLACED, Rid::new(-1, -1));
}

#[test]
fn placed_rid_requires_non_negative_fields() {
    assert!(Rid::new(0, 0).is_placed());
    assert!(!Rid::new(-1, 0).is_placed());
    assert!(!Rid::new(0, -1).is_placed());
}

#[test]
fn config_defaults_match_builder_defaults() {
    let built = Config::builder().build();
    let default = Config::default();
    assert_eq!(built.data_dir, default.data_dir);
    assert_eq!(built.buffer_pool_pages, default.buffer_pool_pages);
}

#[test]
fn rid_display_is_paren_pair() {
    assert_eq!(format!("{}", Rid::new(3, 7)), "(3, 7)");
}
