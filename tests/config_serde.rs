use nek_boundaries::prelude::*;

#[test]
fn config_round_trips_through_json() {
    let cfg = BoundaryConfig {
        save_domain_info: true,
        ghost_array_name: "vtkGhostType".into(),
        coordinator: 3,
    };
    let json = serde_json::to_string(&cfg).unwrap();
    let back: BoundaryConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}

#[test]
fn missing_config_fields_take_defaults() {
    let cfg: BoundaryConfig = serde_json::from_str(r#"{ "save_domain_info": true }"#).unwrap();
    assert!(cfg.save_domain_info);
    assert_eq!(cfg.ghost_array_name, "ghost_nodes");
    assert_eq!(cfg.coordinator, 0);
}

#[test]
fn custom_array_names_are_honoured() {
    let mut blocks = vec![
        StructuredBlock::uniform([2, 2, 2], [0.0; 3], [1.0; 3]),
        StructuredBlock::uniform([2, 2, 2], [0.0, 1.0, 0.0], [1.0; 3]),
    ];
    let cfg: BoundaryConfig = serde_json::from_str(r#"{ "ghost_array_name": "vtkGhostType" }"#).unwrap();
    let mut nek = NekDomainBoundaries::with_config(NoComm, cfg);
    nek.configure(2, [2, 2, 2], false).unwrap();
    nek.create_ghost_nodes(&[0, 1], &mut blocks, &[0, 1]).unwrap();
    assert!(blocks[0].point_array("ghost_nodes").is_none());
    // +y layer of D0: nodes with j == 1.
    assert_eq!(blocks[0].point_array("vtkGhostType").unwrap(), &[0, 0, 1, 1, 0, 0, 1, 1]);
}

#[test]
fn layouts_round_trip_through_json() {
    let layout = DomainLayout::new(12, [4, 4, 1], true).unwrap();
    let json = serde_json::to_string(&layout).unwrap();
    let back: DomainLayout = serde_json::from_str(&json).unwrap();
    assert_eq!(back, layout);
    assert_eq!(back.spatial_dims(), 2);
    assert_eq!(back.points_per_domain(), 16);
}

#[test]
fn adjacency_tables_serialize_flat() {
    let table = AdjacencyTable::new(1);
    assert_eq!(serde_json::to_string(&table).unwrap(), r#"{"neighbors":[-1,-1,-1,-1,-1,-1]}"#);
}
